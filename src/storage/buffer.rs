//! Pinned-page buffer manager. Single-threaded: one caller, no locking.
//! Every `read_page`/`alloc_page` hands back a pin that the caller must
//! release with exactly one `unpin_page` call, on every exit path.

use anyhow::{bail, Result};
use std::collections::HashMap;

use super::page::Page;
use super::paged_file::{PagedFile, PageId};

/// The pinned-page interface the B+-tree is built against.
pub trait BufferManager {
    fn read_page(&mut self, page_id: PageId) -> Result<Page>;
    fn alloc_page(&mut self) -> Result<(PageId, Page)>;
    /// Write mutated bytes back into a still-pinned frame. Callers mutate
    /// their own `Page` clone and put it back here before unpinning dirty.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;
    fn unpin_page(&mut self, page_id: PageId, dirty: bool) -> Result<()>;
    fn flush_file(&mut self) -> Result<()>;
    /// Sum of pin counts across all resident frames. Zero at quiescence is
    /// one of this crate's testable invariants.
    fn pinned_count(&self) -> usize;
}

struct Frame {
    page: Page,
    pin_count: u32,
    dirty: bool,
}

/// A buffer pool backed by one `PagedFile`. Frames for unpinned pages are
/// evicted (flushed if dirty, then dropped) in FIFO order once the pool
/// exceeds `capacity` resident frames.
pub struct BufferPool {
    file: PagedFile,
    capacity: usize,
    frames: HashMap<PageId, Frame>,
    fifo: Vec<PageId>,
}

impl BufferPool {
    pub fn new(file: PagedFile, capacity: usize) -> Self {
        Self {
            file,
            capacity: capacity.max(1),
            frames: HashMap::new(),
            fifo: Vec::new(),
        }
    }

    pub fn into_file(self) -> PagedFile {
        self.file
    }

    pub fn file_mut(&mut self) -> &mut PagedFile {
        &mut self.file
    }

    fn touch_fifo(&mut self, page_id: PageId) {
        if !self.fifo.contains(&page_id) {
            self.fifo.push(page_id);
        }
    }

    fn evict_if_needed(&mut self) -> Result<()> {
        if self.frames.len() <= self.capacity {
            return Ok(());
        }
        let mut i = 0;
        while self.frames.len() > self.capacity && i < self.fifo.len() {
            let candidate = self.fifo[i];
            let evictable = self
                .frames
                .get(&candidate)
                .map(|f| f.pin_count == 0)
                .unwrap_or(false);
            if evictable {
                if let Some(frame) = self.frames.remove(&candidate) {
                    if frame.dirty {
                        self.file.write_page(candidate, &frame.page)?;
                    }
                }
                self.fifo.remove(i);
            } else {
                i += 1;
            }
        }
        Ok(())
    }
}

impl BufferManager for BufferPool {
    fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if let Some(frame) = self.frames.get_mut(&page_id) {
            frame.pin_count += 1;
            return Ok(frame.page.clone());
        }
        let page = self.file.read_page(page_id)?;
        self.evict_if_needed()?;
        self.frames.insert(
            page_id,
            Frame {
                page: page.clone(),
                pin_count: 1,
                dirty: false,
            },
        );
        self.touch_fifo(page_id);
        Ok(page)
    }

    fn alloc_page(&mut self) -> Result<(PageId, Page)> {
        let blank = Page::new(0, super::page::PageFlags::Heap);
        let page_id = self.file.append_page(&blank)?;
        let page = self.file.read_page(page_id)?;
        self.evict_if_needed()?;
        self.frames.insert(
            page_id,
            Frame {
                page: page.clone(),
                pin_count: 1,
                dirty: false,
            },
        );
        self.touch_fifo(page_id);
        Ok((page_id, page))
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let frame = match self.frames.get_mut(&page_id) {
            Some(f) => f,
            None => bail!("page {} not pinned", page_id),
        };
        frame.page = page.clone();
        Ok(())
    }

    fn unpin_page(&mut self, page_id: PageId, dirty: bool) -> Result<()> {
        let frame = match self.frames.get_mut(&page_id) {
            Some(f) => f,
            None => bail!("unpin of page {} that isn't pinned", page_id),
        };
        if frame.pin_count == 0 {
            bail!("unpin of page {} with zero pin count", page_id);
        }
        frame.pin_count -= 1;
        frame.dirty |= dirty;
        Ok(())
    }

    fn flush_file(&mut self) -> Result<()> {
        for (page_id, frame) in self.frames.iter_mut() {
            if frame.dirty {
                self.file.write_page(*page_id, &frame.page)?;
                frame.dirty = false;
            }
        }
        Ok(())
    }

    fn pinned_count(&self) -> usize {
        self.frames.values().map(|f| f.pin_count as usize).sum()
    }
}

impl BufferPool {
    /// Mutate the in-memory copy of a pinned page before unpinning it dirty.
    /// The B+-tree uses this instead of round-tripping through the file on
    /// every field write.
    pub fn with_page_mut<F, T>(&mut self, page_id: PageId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Page) -> T,
    {
        let frame = match self.frames.get_mut(&page_id) {
            Some(f) => f,
            None => bail!("page {} not pinned", page_id),
        };
        Ok(f(&mut frame.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PageFlags;
    use tempfile::NamedTempFile;

    fn fresh_file() -> PagedFile {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);
        PagedFile::create(&path).unwrap()
    }

    #[test]
    fn alloc_pin_unpin_roundtrip() {
        let mut bp = BufferPool::new(fresh_file(), 8);
        let (id, _page) = bp.alloc_page().unwrap();
        assert_eq!(bp.pinned_count(), 1);
        bp.unpin_page(id, true).unwrap();
        assert_eq!(bp.pinned_count(), 0);
    }

    #[test]
    fn write_through_with_page_mut_and_flush() {
        let mut bp = BufferPool::new(fresh_file(), 8);
        let (id, _) = bp.alloc_page().unwrap();
        bp.with_page_mut(id, |p| p.insert(b"hello").unwrap())
            .unwrap();
        bp.unpin_page(id, true).unwrap();
        bp.flush_file().unwrap();
        let mut pf = bp.into_file();
        let reread = pf.read_page(id).unwrap();
        assert_eq!(reread.get_slot(0).unwrap(), b"hello");
    }

    #[test]
    fn unpin_without_pin_errors() {
        let mut bp = BufferPool::new(fresh_file(), 8);
        assert!(bp.unpin_page(1, false).is_err());
    }

    #[test]
    fn eviction_respects_pin_count() {
        let mut bp = BufferPool::new(fresh_file(), 1);
        let (id1, _) = bp.alloc_page().unwrap();
        bp.unpin_page(id1, false).unwrap();
        let (id2, _) = bp.alloc_page().unwrap();
        // id1 was unpinned and evictable, capacity 1 keeps only id2 resident.
        assert_eq!(bp.frames.len(), 1);
        bp.unpin_page(id2, false).unwrap();
        let _ = PageFlags::Heap;
    }
}
