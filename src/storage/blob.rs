//! # Blob Chunking
//!
//! Payloads larger than one page body are stored as a singly linked chain of
//! `DataOverflow` pages. Each page reserves the first 8 body bytes for the
//! next-page pointer (0 at the tail) and carries up to [`BLOB_CHUNK_SIZE`]
//! payload bytes after it.
//!
//! ```text
//! first_page                     next                        next
//! +---------+----------+       +---------+----------+      +---------+-----+
//! | next=P2 | chunk 0  |  -->  | next=P3 | chunk 1  | -->  | next=0  | ... |
//! +---------+----------+       +---------+----------+      +---------+-----+
//! ```
//!
//! The chain stores no length; callers keep `total_size` alongside the first
//! page id (the file record does exactly that) and pass it back to
//! [`StorageEngine::read_blob`]. A chain that ends before `total_size` bytes
//! have been produced is a [`ShortRead`](crate::error::EngineError::ShortRead).
//!
//! Blob pages are never reclaimed when the owning record is deleted; chains
//! are written once and only ever grow the file.

use eyre::Result;

use crate::config::BLOB_CHUNK_SIZE;
use crate::error::EngineError;
use crate::storage::{Page, PageType, StorageEngine};

/// Number of chain pages a payload of `total_size` bytes occupies.
pub fn blob_page_count(total_size: usize) -> usize {
    total_size.div_ceil(BLOB_CHUNK_SIZE)
}

impl StorageEngine {
    /// Chunks `bytes` into a linked chain of `DataOverflow` pages and
    /// returns the first page id. An empty payload writes nothing and
    /// returns 0.
    pub fn write_blob(&self, bytes: &[u8]) -> Result<u64> {
        let mut first_page_id = 0u64;
        let mut prev_page_id = 0u64;
        let mut written = 0usize;

        while written < bytes.len() {
            let page_id = self.allocate_page()?;
            if first_page_id == 0 {
                first_page_id = page_id;
            }

            let chunk = &bytes[written..(written + BLOB_CHUNK_SIZE).min(bytes.len())];

            let mut page = Page::new(PageType::DataOverflow);
            page.data[0..8].copy_from_slice(&0u64.to_le_bytes());
            page.data[8..8 + chunk.len()].copy_from_slice(chunk);
            self.write_page(page_id, &page)?;

            if prev_page_id != 0 {
                let mut prev_page = self.read_page(prev_page_id)?;
                prev_page.data[0..8].copy_from_slice(&page_id.to_le_bytes());
                self.write_page(prev_page_id, &prev_page)?;
            }

            prev_page_id = page_id;
            written += chunk.len();
        }

        Ok(first_page_id)
    }

    /// Follows a blob chain from `first_page_id`, accumulating exactly
    /// `total_size` bytes.
    pub fn read_blob(&self, first_page_id: u64, total_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(total_size);
        let mut current = first_page_id;

        while current != 0 && out.len() < total_size {
            let page = self.read_page(current)?;

            let next = u64::from_le_bytes(page.data[0..8].try_into().unwrap());
            let chunk_len = (total_size - out.len()).min(BLOB_CHUNK_SIZE);
            out.extend_from_slice(&page.data[8..8 + chunk_len]);

            current = next;
        }

        if out.len() < total_size {
            return Err(EngineError::ShortRead {
                got: out.len(),
                expected: total_size,
            }
            .into());
        }

        Ok(out)
    }
}
