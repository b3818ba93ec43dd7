//! # Engine Error Kinds
//!
//! The crate propagates errors as `eyre::Result` throughout, but the failure
//! modes callers may want to branch on are typed here. Every variant is a
//! `std::error::Error`, so a handler can recover the kind from a report with
//! `report.downcast_ref::<EngineError>()`.
//!
//! Absence of a key is not an error anywhere in the engine: lookups return
//! `Option` and removals return `bool`.

use thiserror::Error;

/// Failure kinds surfaced by the storage engine and its indexes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An underlying read, write, or seek failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A page body checksum did not match on read.
    ///
    /// Raised as a hard error only for the header page during `open`; data
    /// page mismatches are downgraded to a diagnostic so callers can attempt
    /// best-effort recovery.
    #[error("page {page} checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { page: u64, stored: u32, computed: u32 },

    /// The file header's magic, version, or page size was unexpected.
    #[error("invalid database file: {reason}")]
    InvalidFile { reason: String },

    /// A hash key exceeded the 127-byte limit.
    #[error("hash key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    /// A B+Tree or hash invariant was broken on disk (wrong payload variant,
    /// missing child, insertion into a node that should have been split).
    #[error("structural violation: {0}")]
    StructuralViolation(String),

    /// A blob chain ended before the expected byte count was read.
    #[error("blob chain ended after {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },

    /// A record string field exceeded its fixed-width buffer.
    #[error("field `{field}` too long: {len} bytes (max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
