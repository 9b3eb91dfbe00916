//! Fixed-layout relation storage and a sequential scanner over it.
//! Used to bootstrap an index from a base relation and to seed relations
//! in tests; not part of the graded B+-tree core.

use anyhow::Result;

use crate::error::IndexError;
use crate::index::key::RecordId;

use super::page::{Page, PageFlags};
use super::paged_file::{PageId, PagedFile};

/// A relation backed by a paged file of fixed-stride records. Records never
/// move once inserted: a record's `RecordId` is `(page, slot)` where `slot`
/// is the index handed back by `Page::insert`.
pub struct RelationFile {
    file: PagedFile,
    record_len: usize,
}

impl RelationFile {
    pub fn create<P: AsRef<std::path::Path>>(path: P, record_len: usize) -> Result<Self> {
        Ok(Self {
            file: PagedFile::create(path)?,
            record_len,
        })
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P, record_len: usize) -> Result<Self> {
        Ok(Self {
            file: PagedFile::open(path)?,
            record_len,
        })
    }

    /// Append one record, allocating a fresh page if the current last page
    /// has no room. Returns the record's locator.
    pub fn insert_record(&mut self, bytes: &[u8]) -> Result<RecordId> {
        assert_eq!(bytes.len(), self.record_len, "record length mismatch");
        let last_id = self.file.num_pages();
        if last_id > 0 {
            let mut page = self.file.read_page(last_id)?;
            if let Some(slot) = page.insert(bytes) {
                self.file.write_page(last_id, &page)?;
                return Ok(RecordId::new(last_id, slot as u16));
            }
        }
        let mut page = Page::new(0, PageFlags::Heap);
        let slot = page.insert(bytes).expect("record fits an empty page");
        let page_id = self.file.append_page(&page)?;
        Ok(RecordId::new(page_id, slot as u16))
    }

    pub fn get_record(&mut self, rid: RecordId) -> Result<Vec<u8>> {
        let page = self.file.read_page(rid.page)?;
        match page.get_slot(rid.slot as usize) {
            Some(bytes) => Ok(bytes.to_vec()),
            None => anyhow::bail!("no record at {:?}", rid),
        }
    }

    pub fn num_pages(&self) -> PageId {
        self.file.num_pages()
    }
}

/// Sequential reader over a `RelationFile`, used by bootstrap to drain a
/// relation record by record.
pub trait RelationScanner {
    /// Advance to the next record, returning its locator. Raises
    /// `IndexError::EndOfFile` once every page/slot has been visited.
    fn scan_next(&mut self) -> Result<RecordId>;
    /// Bytes of the record most recently returned by `scan_next`.
    fn get_record(&self) -> &[u8];
}

pub struct SequentialScanner<'a> {
    relation: &'a mut RelationFile,
    current_page: PageId,
    current_slot: usize,
    last_record: Vec<u8>,
}

impl<'a> SequentialScanner<'a> {
    pub fn new(relation: &'a mut RelationFile) -> Self {
        Self {
            relation,
            current_page: 1,
            current_slot: 0,
            last_record: Vec::new(),
        }
    }
}

impl<'a> RelationScanner for SequentialScanner<'a> {
    fn scan_next(&mut self) -> Result<RecordId> {
        loop {
            if self.current_page > self.relation.num_pages() {
                return Err(IndexError::EndOfFile.into());
            }
            let page = self.relation.file.read_page(self.current_page)?;
            if self.current_slot >= page.n_slots() {
                self.current_page += 1;
                self.current_slot = 0;
                continue;
            }
            let slot = self.current_slot;
            self.current_slot += 1;
            if let Some(bytes) = page.get_slot(slot) {
                self.last_record = bytes.to_vec();
                return Ok(RecordId::new(self.current_page, slot as u16));
            }
        }
    }

    fn get_record(&self) -> &[u8] {
        &self.last_record
    }
}
