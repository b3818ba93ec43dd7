//! # Storage Module
//!
//! The foundational storage layer: one growable file laid out as an array of
//! 4096-byte pages, accessed through a mutex-guarded engine with a bounded
//! page cache.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  B+Tree index   │  Hash index  │  Records   │
//! ├─────────────────────────────────────────────┤
//! │        StorageEngine (engine.rs)            │
//! │   allocate / free / read / write / header   │
//! ├──────────────────────┬──────────────────────┤
//! │  PageCache (SIEVE)   │  DatabaseHeader      │
//! ├──────────────────────┴──────────────────────┤
//! │     std::fs::File — seek / read / write     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! offset 0        page 0: DatabaseHeader (as a Free-typed page)
//! offset 4096     page 1
//! offset 8192     page 2
//! ...             appended as the file grows
//! ```
//!
//! Freed pages are not returned to the filesystem; they are threaded into an
//! in-file LIFO free list via their header's `next_free_page` field and
//! handed out again by `allocate_page`.
//!
//! ## Module Organization
//!
//! - `page`: page types, 64-byte header, body checksum
//! - `header`: the page-0 database header (roots, counters, free list)
//! - `cache`: bounded SIEVE page cache
//! - `engine`: the mutex-guarded paged heap and id allocator
//! - `blob`: multi-page chunking for oversized payloads

mod blob;
mod cache;
mod engine;
mod header;
mod page;

pub use blob::blob_page_count;
pub use cache::PageCache;
pub use engine::StorageEngine;
pub use header::{DatabaseHeader, CURRENT_VERSION, DB_HEADER_SIZE, DB_MAGIC};
pub use page::{Page, PageHeader, PageType};

use eyre::{ensure, Result};
use zerocopy::little_endian::{U16, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Serialized footprint of a [`RecordLocation`].
pub const RECORD_LOCATION_SIZE: usize = 12;

/// Where a serialized record lives: a byte range inside one page.
///
/// Both indexes embed these as values. When an index is used as a set of
/// page ids (blob chains, inverted keyword postings) only `page_id` is
/// meaningful and `offset`/`size` stay zero.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
pub struct RecordLocation {
    page_id: U64,
    offset: U16,
    size: U16,
}

const _: () = assert!(std::mem::size_of::<RecordLocation>() == RECORD_LOCATION_SIZE);

impl RecordLocation {
    pub fn new(page_id: u64, offset: u16, size: u16) -> Self {
        Self {
            page_id: U64::new(page_id),
            offset: U16::new(offset),
            size: U16::new(size),
        }
    }

    pub fn page_id(&self) -> u64 {
        self.page_id.get()
    }

    pub fn offset(&self) -> u16 {
        self.offset.get()
    }

    pub fn size(&self) -> u16 {
        self.size.get()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= RECORD_LOCATION_SIZE,
            "buffer too small for RecordLocation: {} < {}",
            data.len(),
            RECORD_LOCATION_SIZE
        );

        Self::read_from_bytes(&data[..RECORD_LOCATION_SIZE])
            .map_err(|e| eyre::eyre!("failed to read RecordLocation: {:?}", e))
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= RECORD_LOCATION_SIZE,
            "buffer too small for RecordLocation: {} < {}",
            data.len(),
            RECORD_LOCATION_SIZE
        );

        data[..RECORD_LOCATION_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }
}

impl Default for RecordLocation {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}
