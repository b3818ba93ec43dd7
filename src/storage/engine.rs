//! # Storage Engine
//!
//! `StorageEngine` owns the database file: a growable array of 4096-byte
//! pages with the `DatabaseHeader` in page 0. It provides the paged heap
//! (allocate / free / read / write), header persistence, and the monotonic
//! id counters that every index and record manager builds on.
//!
//! ## Locking Discipline
//!
//! One `parking_lot::Mutex` guards the file handle, the in-memory header,
//! and the page cache — nothing else in the crate takes a lock. The engine
//! is split in two so the mutex can never be acquired re-entrantly:
//!
//! - `EngineInner` holds the guarded state and implements the short leaf
//!   operations (`read_page`, `write_page`, `write_header`) against
//!   `&mut self`. These never lock.
//! - `StorageEngine` composes them: each public method locks once, runs one
//!   or more inner operations, and releases.
//!
//! `allocate_page` and `free_page` therefore mutate the free-list head and
//! persist the header inside a single lock acquisition instead of the
//! lock-release-relock dance a re-entrant mutex would force.
//!
//! Higher-level components (B+Tree, hash table, blob chunker) never hold the
//! mutex across multiple page accesses; they go through the public methods
//! and lock per page. Concurrent writers touching the same index pages are
//! not serialized here — see the index types for their ownership rules.
//!
//! ## Durability
//!
//! Every page and header write goes straight through an unbuffered
//! `std::fs::File`, so each write boundary reaches the OS immediately. No
//! fsync escalation is performed; the engine is best-effort durable and
//! relies on per-page checksums to detect torn or corrupted pages on read.
//!
//! ## Checksums
//!
//! Checksums are recomputed on every write and verified on every disk read.
//! A mismatch on a data page is a diagnostic, not an error: the page is
//! returned as read so callers can attempt best-effort recovery. The header
//! page is the exception — `open` refuses a database whose header fails
//! verification.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::Result;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::{MAX_CACHE_SIZE, PAGE_SIZE};
use crate::error::EngineError;
use crate::storage::{DatabaseHeader, Page, PageCache, PageType};

#[derive(Debug)]
pub struct StorageEngine {
    path: PathBuf,
    inner: Mutex<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    file: std::fs::File,
    header: DatabaseHeader,
    cache: PageCache,
}

impl EngineInner {
    fn read_page_from_disk(&mut self, page_id: u64) -> Result<Page> {
        let mut buffer = [0u8; PAGE_SIZE];
        self.file
            .seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))
            .map_err(EngineError::Io)?;
        self.file
            .read_exact(&mut buffer)
            .map_err(EngineError::Io)?;
        Page::from_bytes(&buffer)
    }

    fn read_page(&mut self, page_id: u64) -> Result<Page> {
        if let Some(page) = self.cache.get(page_id) {
            return Ok(page.clone());
        }

        let page = self.read_page_from_disk(page_id)?;
        if !page.verify_checksum() {
            warn!(
                page = page_id,
                stored = page.header.checksum(),
                computed = page.calculate_checksum(),
                "page checksum mismatch, returning page as read"
            );
        }

        self.cache.insert(page_id, page.clone());
        Ok(page)
    }

    fn write_page(&mut self, page_id: u64, page: &Page) -> Result<()> {
        let mut written = page.clone();
        written.update_checksum();

        let mut buffer = [0u8; PAGE_SIZE];
        written.write_to(&mut buffer)?;

        self.file
            .seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))
            .map_err(EngineError::Io)?;
        self.file.write_all(&buffer).map_err(EngineError::Io)?;

        self.cache.insert(page_id, written);
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        let mut page = Page::new(PageType::Free);
        self.header.write_to(&mut page.data)?;
        self.write_page(0, &page)
    }
}

impl StorageEngine {
    /// Creates a new database file, truncating any existing one, and writes
    /// a fresh header to page 0.
    pub fn initialize(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(EngineError::Io)?;

        let mut inner = EngineInner {
            file,
            header: DatabaseHeader::new(),
            cache: PageCache::new(MAX_CACHE_SIZE),
        };
        inner.write_header()?;

        info!(path = %path.display(), "database initialized");
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Opens an existing database file, verifying the header page checksum,
    /// magic, version, and page size.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(EngineError::Io)?;

        let mut inner = EngineInner {
            file,
            header: DatabaseHeader::new(),
            cache: PageCache::new(MAX_CACHE_SIZE),
        };

        let header_page = inner.read_page_from_disk(0)?;
        if !header_page.verify_checksum() {
            return Err(EngineError::ChecksumMismatch {
                page: 0,
                stored: header_page.header.checksum(),
                computed: header_page.calculate_checksum(),
            }
            .into());
        }
        inner.header = DatabaseHeader::from_bytes(&header_page.data)?;

        info!(
            path = %path.display(),
            total_pages = inner.header.total_pages(),
            "database opened"
        );
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current in-memory header.
    pub fn header(&self) -> DatabaseHeader {
        self.inner.lock().header
    }

    /// Mutates the in-memory header under the engine lock. The change is not
    /// durable until [`write_header`](Self::write_header) runs.
    pub fn update_header(&self, f: impl FnOnce(&mut DatabaseHeader)) {
        f(&mut self.inner.lock().header);
    }

    /// Serializes the header into page 0 and writes it out.
    pub fn write_header(&self) -> Result<()> {
        self.inner.lock().write_header()
    }

    pub fn total_pages(&self) -> u64 {
        self.inner.lock().header.total_pages()
    }

    /// Returns an unused page id: the free-list head if one exists,
    /// otherwise a fresh page appended past the current end of file. The
    /// header is persisted before returning.
    pub fn allocate_page(&self) -> Result<u64> {
        let mut inner = self.inner.lock();

        let page_id = if inner.header.free_list_head() != 0 {
            let head = inner.header.free_list_head();
            let free_page = inner.read_page(head)?;
            inner
                .header
                .set_free_list_head(free_page.header.next_free_page());
            head
        } else {
            let id = inner.header.total_pages();
            inner.header.set_total_pages(id + 1);
            id
        };

        inner.write_header()?;
        Ok(page_id)
    }

    /// Pushes a page onto the free list (LIFO) and persists the header.
    pub fn free_page(&self, page_id: u64) -> Result<()> {
        let mut inner = self.inner.lock();

        let prev_head = inner.header.free_list_head();
        inner.header.set_free_list_head(page_id);

        let mut page = Page::new(PageType::Free);
        page.header.set_next_free_page(prev_head);
        inner.write_page(page_id, &page)?;

        inner.write_header()
    }

    /// Reads a page, preferring the cache. Disk reads are checksum-verified;
    /// a mismatch is logged and the page returned as read.
    pub fn read_page(&self, page_id: u64) -> Result<Page> {
        self.inner.lock().read_page(page_id)
    }

    /// Recomputes the checksum, writes the page through to the file, and
    /// refreshes the cache entry.
    pub fn write_page(&self, page_id: u64, page: &Page) -> Result<()> {
        self.inner.lock().write_page(page_id, page)
    }

    pub fn next_user_id(&self) -> u64 {
        self.inner.lock().header.next_user_id()
    }

    pub fn next_meeting_id(&self) -> u64 {
        self.inner.lock().header.next_meeting_id()
    }

    pub fn next_message_id(&self) -> u64 {
        self.inner.lock().header.next_message_id()
    }

    pub fn next_file_id(&self) -> u64 {
        self.inner.lock().header.next_file_id()
    }

    pub fn next_whiteboard_id(&self) -> u64 {
        self.inner.lock().header.next_whiteboard_id()
    }

    /// Persists the header and drops the engine. Equivalent to letting the
    /// engine fall out of scope, but surfaces the final write's error.
    pub fn close(self) -> Result<()> {
        self.inner.lock().write_header()
    }
}

impl Drop for StorageEngine {
    fn drop(&mut self) {
        if let Err(e) = self.inner.lock().write_header() {
            warn!(path = %self.path.display(), "failed to persist header on drop: {e:#}");
        }
    }
}
