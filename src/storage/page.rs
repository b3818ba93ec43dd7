//! # Page Types and Header Layout
//!
//! This module defines the page structure for the storage layer. Every 4KB
//! page begins with a 64-byte header containing metadata about the page
//! contents; the remaining 4032 bytes are an opaque body owned by whichever
//! component wrote the page.
//!
//! ## Page Header Layout (64 bytes)
//!
//! ```text
//! Offset  Size  Field           Description
//! ------  ----  --------------  ----------------------------------------
//! 0       1     page_type       Type of page (Free, BTreeLeaf, etc.)
//! 1       7     reserved1       Padding to align the link field
//! 8       8     next_free_page  Free-list link / overflow chain pointer
//! 16      4     checksum        Body checksum (wrapping byte sum)
//! 20      44    reserved2       Reserved for future use
//! ```
//!
//! ## Page Types
//!
//! - **Free** (0): On the free list, or page 0 (the file header)
//! - **BTreeInternal** (1): B+Tree node with separator keys and children
//! - **BTreeLeaf** (2): B+Tree node with keys and record locations
//! - **HashBucket** (3): Hash table header or bucket page
//! - **DataOverflow** (4): One link of a blob chain
//!
//! ## Checksum
//!
//! The checksum covers the body only: it is the arithmetic sum of the 4032
//! body bytes, wrapping modulo 2^32. It is recomputed on every write and
//! verified on every disk read; cache hits skip verification since the cached
//! copy was either verified on load or produced by a local write.

use eyre::{ensure, Result};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{PAGE_DATA_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Free = 0,
    BTreeInternal = 1,
    BTreeLeaf = 2,
    HashBucket = 3,
    DataOverflow = 4,
}

impl PageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(PageType::Free),
            1 => Some(PageType::BTreeInternal),
            2 => Some(PageType::BTreeLeaf),
            3 => Some(PageType::HashBucket),
            4 => Some(PageType::DataOverflow),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PageHeader {
    page_type: u8,
    reserved1: [u8; 7],
    next_free_page: U64,
    checksum: U32,
    reserved2: [u8; 44],
}

const _: () = assert!(std::mem::size_of::<PageHeader>() == PAGE_HEADER_SIZE);

impl PageHeader {
    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type: page_type as u8,
            reserved1: [0u8; 7],
            next_free_page: U64::new(0),
            checksum: U32::new(0),
            reserved2: [0u8; 44],
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= PAGE_HEADER_SIZE,
            "buffer too small for PageHeader: {} < {}",
            data.len(),
            PAGE_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..PAGE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read PageHeader: {:?}", e))
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= PAGE_HEADER_SIZE,
            "buffer too small for PageHeader: {} < {}",
            data.len(),
            PAGE_HEADER_SIZE
        );

        data[..PAGE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_byte(self.page_type)
    }

    pub fn type_byte(&self) -> u8 {
        self.page_type
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.page_type = page_type as u8;
    }

    pub fn next_free_page(&self) -> u64 {
        self.next_free_page.get()
    }

    pub fn set_next_free_page(&mut self, page_id: u64) {
        self.next_free_page = U64::new(page_id);
    }

    pub fn checksum(&self) -> u32 {
        self.checksum.get()
    }

    pub fn set_checksum(&mut self, checksum: u32) {
        self.checksum = U32::new(checksum);
    }
}

/// One 4096-byte page: typed header plus opaque body.
///
/// Pages move by value between the engine and its callers, exactly one page
/// of stack at a time. The body is zero-filled on construction so partially
/// written pages never leak stale bytes to disk.
#[derive(Clone, Debug)]
pub struct Page {
    pub header: PageHeader,
    pub data: [u8; PAGE_DATA_SIZE],
}

impl Page {
    pub fn new(page_type: PageType) -> Self {
        Self {
            header: PageHeader::new(page_type),
            data: [0u8; PAGE_DATA_SIZE],
        }
    }

    /// Wrapping sum of the body bytes, modulo 2^32.
    pub fn calculate_checksum(&self) -> u32 {
        self.data
            .iter()
            .fold(0u32, |sum, &b| sum.wrapping_add(b as u32))
    }

    pub fn update_checksum(&mut self) {
        let checksum = self.calculate_checksum();
        self.header.set_checksum(checksum);
    }

    pub fn verify_checksum(&self) -> bool {
        self.header.checksum() == self.calculate_checksum()
    }

    pub fn write_to(&self, buffer: &mut [u8]) -> Result<()> {
        ensure!(
            buffer.len() >= PAGE_SIZE,
            "buffer too small for Page: {} < {}",
            buffer.len(),
            PAGE_SIZE
        );

        self.header.write_to(buffer)?;
        buffer[PAGE_HEADER_SIZE..PAGE_SIZE].copy_from_slice(&self.data);
        Ok(())
    }

    pub fn from_bytes(buffer: &[u8]) -> Result<Self> {
        ensure!(
            buffer.len() >= PAGE_SIZE,
            "buffer too small for Page: {} < {}",
            buffer.len(),
            PAGE_SIZE
        );

        let header = *PageHeader::from_bytes(buffer)?;
        let mut data = [0u8; PAGE_DATA_SIZE];
        data.copy_from_slice(&buffer[PAGE_HEADER_SIZE..PAGE_SIZE]);

        Ok(Self { header, data })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(PageType::Free)
    }
}
