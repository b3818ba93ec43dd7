//! # Configuration Constants
//!
//! This module centralizes the on-disk geometry and index sizing constants.
//! Most of these values are wired into the file format: changing any of them
//! makes existing database files unreadable. Interdependent values are
//! co-located and guarded by compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (4096 bytes)
//!       │
//!       ├─> PAGE_HEADER_SIZE (64 bytes, fixed)
//!       │
//!       ├─> PAGE_DATA_SIZE (derived: PAGE_SIZE - PAGE_HEADER_SIZE)
//!       │
//!       ├─> BLOB_CHUNK_SIZE (derived: PAGE_DATA_SIZE - 16)
//!       │     Each blob page reserves its first 8 body bytes for the
//!       │     next-page pointer; the rest of the reservation is slack.
//!       │
//!       └─> MAX_ENTRIES_PER_BUCKET (24)
//!             A serialized bucket (2 + 8 + 24 * 150 bytes) must fit in
//!             PAGE_DATA_SIZE. 24 entries leaves ~420 bytes of headroom.
//!
//! BTREE_ORDER (64)
//!       │
//!       ├─> MAX_KEYS (ORDER - 1 = 63)
//!       │
//!       └─> MIN_KEYS ((ORDER / 2) - 1 = 31)
//!             Every non-root node keeps at least this many keys; deletion
//!             borrows or merges below it.
//! ```
//!
//! ## Critical Invariants
//!
//! 1. A serialized B+Tree node (leaf footprint, the larger variant) fits in
//!    `PAGE_DATA_SIZE` — asserted in `btree::node`.
//! 2. A serialized hash bucket fits in `PAGE_DATA_SIZE` — asserted in
//!    `hash::bucket`.
//! 3. The database header fits in `PAGE_DATA_SIZE` — asserted in
//!    `storage::header`.

// ============================================================================
// PAGE GEOMETRY
// These define the fundamental unit of I/O; all on-disk layouts derive from
// them
// ============================================================================

/// Size of each database page in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Size of the typed page header in bytes.
/// Every page begins with this header (type tag, free-list link, checksum).
pub const PAGE_HEADER_SIZE: usize = 64;

/// Usable body bytes in a page after the header.
pub const PAGE_DATA_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

const _: () = assert!(
    PAGE_DATA_SIZE == PAGE_SIZE - PAGE_HEADER_SIZE,
    "PAGE_DATA_SIZE derivation mismatch"
);

// ============================================================================
// PAGE CACHE
// ============================================================================

/// Maximum number of pages held in the in-memory cache.
/// Eviction is approximate (SIEVE); writes always refresh the cached copy.
pub const MAX_CACHE_SIZE: usize = 100;

// ============================================================================
// B+TREE SIZING
// ============================================================================

/// Maximum branching factor: an internal node holds up to this many children.
pub const BTREE_ORDER: usize = 64;

/// Maximum keys per node.
pub const MAX_KEYS: usize = BTREE_ORDER - 1;

/// Minimum keys per non-root node; deletion restores this via borrow/merge.
pub const MIN_KEYS: usize = (BTREE_ORDER / 2) - 1;

const _: () = assert!(MAX_KEYS == 63 && MIN_KEYS == 31, "B+Tree order mismatch");

// ============================================================================
// HASH INDEX SIZING
// ============================================================================

/// Number of primary buckets in a hash table.
pub const BUCKET_COUNT: usize = 256;

/// Entries per bucket page. Dictated by the page body size: one serialized
/// entry is 150 bytes, so 24 entries plus the bucket header stay under
/// `PAGE_DATA_SIZE`.
pub const MAX_ENTRIES_PER_BUCKET: usize = 24;

/// Byte capacity of an entry's key buffer (C-string, so one byte is the
/// terminator).
pub const HASH_KEY_CAPACITY: usize = 128;

/// Longest accepted hash key in bytes.
pub const MAX_KEY_LEN: usize = HASH_KEY_CAPACITY - 1;

// ============================================================================
// BLOB CHUNKING
// ============================================================================

/// Payload bytes per blob page. The first 8 body bytes hold the next-page
/// pointer; the remaining reservation keeps chunk arithmetic stable if the
/// link field ever grows.
pub const BLOB_CHUNK_SIZE: usize = PAGE_DATA_SIZE - 16;

const _: () = assert!(BLOB_CHUNK_SIZE == 4016, "blob chunk derivation mismatch");
