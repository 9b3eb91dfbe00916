//! Public index surface: a typed `BTreeIndex<K>` per key domain, generic
//! B+-tree internals, and the `Index` enum that dispatches the untyped
//! public API (§9's "tagged sum" design note) to the right monomorphisation.

pub mod key;
pub mod node;

mod btree;

pub use btree::BTreeIndex;
pub use key::{AttrType, F64Key, IndexKey, Int32Key, RecordId, Str10Key};

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::error::{IndexError, Opcode};
use crate::storage::buffer::BufferPool;
use crate::storage::paged_file::PagedFile;
use crate::storage::relation::RelationScanner;

/// A key value carried across the untyped public API, tagged with the
/// domain it belongs to. Must match the `Index` variant it is passed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue {
    Int32(i32),
    F64(f64),
    Str10([u8; 10]),
}

/// Top-level index handle: one `BTreeIndex<K>` monomorphisation per key
/// domain, selected once at construction and fixed for the file's lifetime.
pub enum Index {
    Int32(BTreeIndex<Int32Key>),
    F64(BTreeIndex<F64Key>),
    Str10(BTreeIndex<Str10Key>),
}

impl Index {
    /// The index file's on-disk name, deterministic from its relation and
    /// attribute offset.
    pub fn file_name(relation_name: &str, attr_byte_offset: i32) -> String {
        format!("{relation_name}.{attr_byte_offset}")
    }

    /// Opens the index file at `dir/<relation>.<offset>` if it exists, or
    /// creates it (without populating it — see `bootstrap`) if it does not.
    /// Tries `PagedFile::open` first and falls back to `create` only on
    /// `IndexError::FileNotFound`, the same catch-and-dispatch shape
    /// `bootstrap` uses for `IndexError::EndOfFile` — existence and header
    /// validity stay orthogonal failures, per §4.1.
    pub fn open_or_create<P: AsRef<Path>>(
        dir: P,
        relation_name: &str,
        attr_byte_offset: i32,
        attr_type: AttrType,
        buffer_pool_size: usize,
    ) -> Result<Self> {
        let path: PathBuf = dir.as_ref().join(Self::file_name(relation_name, attr_byte_offset));
        let (pf, created) = open_or_create_file(&path)?;
        let buf = BufferPool::new(pf, buffer_pool_size);

        Ok(match attr_type {
            AttrType::Int32 => Index::Int32(if created {
                BTreeIndex::create(relation_name, attr_byte_offset, buf)?
            } else {
                BTreeIndex::open(relation_name, attr_byte_offset, buf)?
            }),
            AttrType::F64 => Index::F64(if created {
                BTreeIndex::create(relation_name, attr_byte_offset, buf)?
            } else {
                BTreeIndex::open(relation_name, attr_byte_offset, buf)?
            }),
            AttrType::Str10 => Index::Str10(if created {
                BTreeIndex::create(relation_name, attr_byte_offset, buf)?
            } else {
                BTreeIndex::open(relation_name, attr_byte_offset, buf)?
            }),
        })
    }

    pub fn bootstrap<S: RelationScanner>(&mut self, scanner: &mut S) -> Result<usize> {
        match self {
            Index::Int32(i) => i.bootstrap(scanner),
            Index::F64(i) => i.bootstrap(scanner),
            Index::Str10(i) => i.bootstrap(scanner),
        }
    }

    pub fn insert(&mut self, key: KeyValue, rid: RecordId) -> Result<()> {
        match (self, key) {
            (Index::Int32(i), KeyValue::Int32(v)) => i.insert(Int32Key(v), rid),
            (Index::F64(i), KeyValue::F64(v)) => i.insert(F64Key(v), rid),
            (Index::Str10(i), KeyValue::Str10(v)) => i.insert(Str10Key(v), rid),
            _ => bail!("key domain does not match this index's attribute type"),
        }
    }

    pub fn start_scan(&mut self, low: KeyValue, low_op: Opcode, high: KeyValue, high_op: Opcode) -> Result<()> {
        match (self, low, high) {
            (Index::Int32(i), KeyValue::Int32(lo), KeyValue::Int32(hi)) => {
                i.start_scan(Int32Key(lo), low_op, Int32Key(hi), high_op)
            }
            (Index::F64(i), KeyValue::F64(lo), KeyValue::F64(hi)) => {
                i.start_scan(F64Key(lo), low_op, F64Key(hi), high_op)
            }
            (Index::Str10(i), KeyValue::Str10(lo), KeyValue::Str10(hi)) => {
                i.start_scan(Str10Key(lo), low_op, Str10Key(hi), high_op)
            }
            _ => bail!("key domain does not match this index's attribute type"),
        }
    }

    pub fn scan_next(&mut self) -> Result<RecordId> {
        match self {
            Index::Int32(i) => i.scan_next(),
            Index::F64(i) => i.scan_next(),
            Index::Str10(i) => i.scan_next(),
        }
    }

    pub fn end_scan(&mut self) -> Result<()> {
        match self {
            Index::Int32(i) => i.end_scan(),
            Index::F64(i) => i.end_scan(),
            Index::Str10(i) => i.end_scan(),
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            Index::Int32(i) => i.close(),
            Index::F64(i) => i.close(),
            Index::Str10(i) => i.close(),
        }
    }
}

/// Opens `path` as a paged file, catching `IndexError::FileNotFound` and
/// creating it instead. Returns whether the file was freshly created so the
/// caller knows whether to `BTreeIndex::create` or `BTreeIndex::open`.
fn open_or_create_file(path: &Path) -> Result<(PagedFile, bool)> {
    match PagedFile::open(path) {
        Ok(pf) => Ok((pf, false)),
        Err(e) if matches!(e.downcast_ref::<IndexError>(), Some(IndexError::FileNotFound(_))) => {
            Ok((PagedFile::create(path)?, true))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::relation::{RelationFile, SequentialScanner};
    use tempfile::tempdir;

    #[test]
    fn open_or_create_roundtrips_through_close_and_reopen() {
        let dir = tempdir().unwrap();
        let rel_path = dir.path().join("orders.heap");
        let mut rel = RelationFile::create(&rel_path, 4).unwrap();
        for v in 0..50i32 {
            rel.insert_record(&v.to_le_bytes()).unwrap();
        }

        let mut idx = Index::open_or_create(dir.path(), "orders", 0, AttrType::Int32, 32).unwrap();
        {
            let mut scanner = SequentialScanner::new(&mut rel);
            idx.bootstrap(&mut scanner).unwrap();
        }
        idx.close().unwrap();

        let mut reopened = Index::open_or_create(dir.path(), "orders", 0, AttrType::Int32, 32).unwrap();
        reopened
            .start_scan(KeyValue::Int32(i32::MIN), Opcode::GTE, KeyValue::Int32(i32::MAX), Opcode::LTE)
            .unwrap();
        let mut count = 0;
        while reopened.scan_next().is_ok() {
            count += 1;
        }
        assert_eq!(count, 50);
    }

    #[test]
    fn open_or_create_file_dispatches_on_file_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(Index::file_name("orders", 0));
        assert!(!path.exists());
        let (pf, created) = open_or_create_file(&path).unwrap();
        assert!(created);
        assert_eq!(pf.num_pages(), 0);
        drop(pf);

        let (_pf, created_again) = open_or_create_file(&path).unwrap();
        assert!(!created_again);
    }

    #[test]
    fn wrong_attr_offset_on_reopen_is_bad_index_info() {
        let dir = tempdir().unwrap();
        let rel_path = dir.path().join("orders.heap");
        let mut rel = RelationFile::create(&rel_path, 4).unwrap();
        rel.insert_record(&1i32.to_le_bytes()).unwrap();

        let mut idx = Index::open_or_create(dir.path(), "orders", 0, AttrType::Int32, 32).unwrap();
        {
            let mut scanner = SequentialScanner::new(&mut rel);
            idx.bootstrap(&mut scanner).unwrap();
        }
        idx.close().unwrap();

        // Same file name at a different offset doesn't exist, so this opens
        // a *different* fresh index. To exercise BadIndexInfo we must reuse
        // the same path directly against a mismatched BTreeIndex::open call.
        let path = dir.path().join(Index::file_name("orders", 0));
        let pf = PagedFile::open(&path).unwrap();
        let buf = BufferPool::new(pf, 32);
        let err = BTreeIndex::<Int32Key>::open("orders", 4, buf).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::IndexError>(),
            Some(crate::error::IndexError::BadIndexInfo { .. })
        ));
    }
}
