//! Paged file: create/open/remove, append pages, read/write pages by id.
//! One file backs one index or one relation. PageIds are 1-based; id `0` is
//! reserved crate-wide to mean "no page" (see `RecordId`, `rightSibPageNo`),
//! so page 1 is always the first page a fresh file allocates.

use anyhow::{ensure, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::IndexError;

use super::page::{Page, PAGE_SIZE};

pub type PageId = u32;

/// Sentinel meaning "no page". PageId 0 is never assigned to a live page.
pub const NO_PAGE: PageId = 0;

/// A paged file stores fixed-size pages sequentially: page N (1-based)
/// lives at byte offset `(N - 1) * PAGE_SIZE`.
pub struct PagedFile {
    path: PathBuf,
    file: File,
    num_pages: PageId,
}

impl PagedFile {
    /// Create a new paged file. Fails if `path` already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            num_pages: 0,
        })
    }

    /// Open an existing paged file. Raises `IndexError::FileNotFound` if the
    /// file doesn't exist; callers that want create-on-missing semantics
    /// should catch that and call `create` instead, the same way bootstrap
    /// catches `IndexError::EndOfFile`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::FileNotFound(path.display().to_string()).into());
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        ensure!(
            len % (PAGE_SIZE as u64) == 0,
            "paged file size not a multiple of page size"
        );
        let num_pages = (len / (PAGE_SIZE as u64)) as PageId;
        Ok(Self {
            path,
            file,
            num_pages,
        })
    }

    /// Remove a paged file by path, for rebuild paths. No-op if absent.
    pub fn remove<P: AsRef<Path>>(path: P) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append a page to the end of the file, assigning it the next PageId.
    /// Returns the assigned (1-based) PageId.
    pub fn append_page(&mut self, page: &Page) -> Result<PageId> {
        let id = self.num_pages + 1;
        let mut p = page.clone();
        p.set_page_id(id);
        let mut w = BufWriter::new(&mut self.file);
        p.write_at(&mut w, id - 1)?;
        w.flush()?;
        self.num_pages = id;
        Ok(id)
    }

    /// Read a page by (1-based) id.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        ensure!(
            page_id >= 1 && page_id <= self.num_pages,
            "page id {} out of range",
            page_id
        );
        Page::read_at(&mut self.file, page_id - 1)
    }

    /// Overwrite a page by (1-based) id. The page must already exist.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        ensure!(
            page_id >= 1 && page_id <= self.num_pages,
            "page id {} out of range",
            page_id
        );
        page.write_at(&mut self.file, page_id - 1)
    }

    pub fn num_pages(&self) -> PageId {
        self.num_pages
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
