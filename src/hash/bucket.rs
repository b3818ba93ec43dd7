//! # Hash Index On-Disk Layouts
//!
//! Three zerocopy structs back the hash index:
//!
//! - [`HashEntry`] (150 bytes): stored hash, a 128-byte C-string key buffer,
//!   the key length, and the record location
//! - [`HashBucket`] (3610 bytes): entry count, overflow link, and a fixed
//!   array of 24 entries — one per bucket page body
//! - [`HashTableHeader`] (2052 bytes): bucket count and the 256 primary
//!   bucket page ids — the body of a table's header page
//!
//! ```text
//! HashEntry:   hash(8) | key(128) | key_len(2) | page(8) | offset(2) | size(2)
//! HashBucket:  entry_count(2) | overflow_page(8) | entries(24 × 150)
//! Header:      bucket_count(4) | bucket_pages(256 × 8)
//! ```
//!
//! Both the stored 64-bit hash and the key bytes must match for an entry to
//! count as the same key; the hash comparison makes misses cheap, the byte
//! comparison makes collisions harmless.

use eyre::{ensure, Result};
use zerocopy::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{BUCKET_COUNT, HASH_KEY_CAPACITY, MAX_ENTRIES_PER_BUCKET, PAGE_DATA_SIZE};
use crate::error::EngineError;
use crate::storage::RecordLocation;

pub const HASH_ENTRY_SIZE: usize = std::mem::size_of::<HashEntry>();
pub const BUCKET_SIZE: usize = std::mem::size_of::<HashBucket>();
pub const HASH_HEADER_SIZE: usize = std::mem::size_of::<HashTableHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HashEntry {
    hash_value: U64,
    key: [u8; HASH_KEY_CAPACITY],
    key_length: U16,
    location: RecordLocation,
}

const _: () = assert!(HASH_ENTRY_SIZE == 150);

impl HashEntry {
    pub fn set(&mut self, hash_value: u64, key: &str, location: RecordLocation) {
        self.hash_value = U64::new(hash_value);
        self.key = [0u8; HASH_KEY_CAPACITY];
        self.key[..key.len()].copy_from_slice(key.as_bytes());
        self.key_length = U16::new(key.len() as u16);
        self.location = location;
    }

    pub fn hash_value(&self) -> u64 {
        self.hash_value.get()
    }

    pub fn key_bytes(&self) -> &[u8] {
        let len = (self.key_length.get() as usize).min(HASH_KEY_CAPACITY);
        &self.key[..len]
    }

    pub fn key_string(&self) -> String {
        String::from_utf8_lossy(self.key_bytes()).into_owned()
    }

    pub fn matches(&self, hash_value: u64, key: &str) -> bool {
        self.hash_value.get() == hash_value && self.key_bytes() == key.as_bytes()
    }

    pub fn location(&self) -> RecordLocation {
        self.location
    }

    pub fn set_location(&mut self, location: RecordLocation) {
        self.location = location;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HashBucket {
    entry_count: U16,
    overflow_page: U64,
    entries: [HashEntry; MAX_ENTRIES_PER_BUCKET],
}

const _: () = assert!(BUCKET_SIZE == 3610);
const _: () = assert!(BUCKET_SIZE <= PAGE_DATA_SIZE);

impl HashBucket {
    pub fn new() -> Self {
        Self::new_zeroed()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= BUCKET_SIZE,
            "buffer too small for HashBucket: {} < {}",
            data.len(),
            BUCKET_SIZE
        );

        let bucket = Self::read_from_bytes(&data[..BUCKET_SIZE])
            .map_err(|e| eyre::eyre!("failed to read HashBucket: {:?}", e))?;
        if bucket.entry_count.get() as usize > MAX_ENTRIES_PER_BUCKET {
            return Err(EngineError::StructuralViolation(format!(
                "bucket claims {} entries (max {MAX_ENTRIES_PER_BUCKET})",
                bucket.entry_count.get()
            ))
            .into());
        }
        Ok(bucket)
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= BUCKET_SIZE,
            "buffer too small for HashBucket: {} < {}",
            data.len(),
            BUCKET_SIZE
        );

        data[..BUCKET_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count.get() as usize
    }

    pub fn overflow_page(&self) -> u64 {
        self.overflow_page.get()
    }

    pub fn set_overflow_page(&mut self, page_id: u64) {
        self.overflow_page = U64::new(page_id);
    }

    pub fn is_full(&self) -> bool {
        self.entry_count() >= MAX_ENTRIES_PER_BUCKET
    }

    /// Live entries.
    pub fn entries(&self) -> &[HashEntry] {
        &self.entries[..self.entry_count()]
    }

    pub fn entries_mut(&mut self) -> &mut [HashEntry] {
        let count = self.entry_count();
        &mut self.entries[..count]
    }

    /// Appends an entry in the next free slot.
    pub fn push(&mut self, hash_value: u64, key: &str, location: RecordLocation) -> Result<()> {
        if self.is_full() {
            return Err(EngineError::StructuralViolation(
                "push into a full hash bucket".into(),
            )
            .into());
        }

        let idx = self.entry_count();
        self.entries[idx].set(hash_value, key, location);
        self.entry_count = U16::new((idx + 1) as u16);
        Ok(())
    }

    /// Removes the entry at `idx`, shifting later entries left by one.
    pub fn remove_at(&mut self, idx: usize) {
        let count = self.entry_count();
        debug_assert!(idx < count);

        for i in idx..count - 1 {
            self.entries[i] = self.entries[i + 1];
        }
        self.entry_count = U16::new((count - 1) as u16);
    }
}

impl Default for HashBucket {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HashTableHeader {
    bucket_count: U32,
    bucket_pages: [U64; BUCKET_COUNT],
}

const _: () = assert!(HASH_HEADER_SIZE == 2052);
const _: () = assert!(HASH_HEADER_SIZE <= PAGE_DATA_SIZE);

impl HashTableHeader {
    pub fn new() -> Self {
        let mut header = Self::new_zeroed();
        header.bucket_count = U32::new(BUCKET_COUNT as u32);
        header
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= HASH_HEADER_SIZE,
            "buffer too small for HashTableHeader: {} < {}",
            data.len(),
            HASH_HEADER_SIZE
        );

        let header = Self::read_from_bytes(&data[..HASH_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read HashTableHeader: {:?}", e))?;
        if header.bucket_count.get() as usize != BUCKET_COUNT {
            return Err(EngineError::StructuralViolation(format!(
                "hash header claims {} buckets (expected {BUCKET_COUNT})",
                header.bucket_count.get()
            ))
            .into());
        }
        Ok(header)
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= HASH_HEADER_SIZE,
            "buffer too small for HashTableHeader: {} < {}",
            data.len(),
            HASH_HEADER_SIZE
        );

        data[..HASH_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count.get() as usize
    }

    pub fn bucket_page(&self, idx: usize) -> u64 {
        self.bucket_pages[idx].get()
    }

    pub fn set_bucket_page(&mut self, idx: usize, page_id: u64) {
        self.bucket_pages[idx] = U64::new(page_id);
    }
}

impl Default for HashTableHeader {
    fn default() -> Self {
        Self::new()
    }
}
