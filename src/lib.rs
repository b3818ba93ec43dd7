//! # mtdb — Embedded Page-Based Storage Engine
//!
//! mtdb is the storage kernel for a meeting collaboration platform: a single
//! growable database file of 4096-byte pages carrying durable, indexed,
//! fixed-schema records. It provides two disk-resident indexes over a shared
//! paged heap — a B+Tree over `u64` keys and a chained-bucket hash table over
//! string keys — plus a page allocator with an in-file free list, a bounded
//! page cache, multi-page blob chunking, and persistent id counters.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │   Application managers (users, meetings, chat,    │
//! │     files, whiteboard — out of crate scope)       │
//! ├──────────────┬───────────────┬────────────────────┤
//! │ BTree        │ HashTable     │ Record codecs      │
//! │ u64 → loc    │ str → loc     │ fixed-width rows   │
//! ├──────────────┴───────────────┴────────────────────┤
//! │ StorageEngine: paged heap + free list + header +  │
//! │ id counters, one mutex, SIEVE page cache          │
//! ├───────────────────────────────────────────────────┤
//! │ Single database file (page 0 = header, "MTDB")    │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use mtdb::{BTree, HashTable, Page, PageType, RecordLocation, StorageEngine, User};
//!
//! let engine = StorageEngine::initialize("./meetings.db")?;
//!
//! // Store one user record.
//! let user = User { user_id: engine.next_user_id(), ..Default::default() };
//! let page_id = engine.allocate_page()?;
//! let mut page = Page::new(PageType::DataOverflow);
//! user.serialize(&mut page.data)?;
//! engine.write_page(page_id, &page)?;
//!
//! // Index it by id and by email.
//! let loc = RecordLocation::new(page_id, 0, User::SERIALIZED_SIZE as u16);
//! let mut users = BTree::new(&engine);
//! users.insert(user.user_id, loc)?;
//! let mut logins = HashTable::new(&engine);
//! logins.initialize()?;
//! logins.insert(&user.email, loc)?;
//!
//! // Register the index roots and commit the header.
//! engine.update_header(|h| {
//!     h.set_users_root(users.root_page_id());
//!     h.set_login_hash(logins.header_page_id());
//! });
//! engine.write_header()?;
//! ```
//!
//! ## Consistency Model
//!
//! Every individual page or header access is serialized by the engine mutex,
//! and every write flushes through to the file with a fresh body checksum.
//! Nothing larger is atomic: index operations touch several pages without
//! holding the lock across them, and callers composing "write record, index
//! it, persist header" must serialize that compound themselves. Mutating
//! index operations take `&mut self`, so a shared index requires an external
//! lock. There is no write-ahead log and no recovery beyond the per-page
//! checksums.
//!
//! ## Module Overview
//!
//! - [`storage`]: paged heap, file header, page cache, blob chains
//! - [`btree`]: ordered index with leaf-chain range scans
//! - [`hash`]: FNV-1a chained-bucket index
//! - [`records`]: fixed-width domain record codecs
//! - [`config`]: on-disk geometry and sizing constants
//! - [`error`]: typed failure kinds

pub mod btree;
pub mod config;
pub mod error;
pub mod hash;
pub mod records;
pub mod storage;

pub use btree::BTree;
pub use error::EngineError;
pub use hash::HashTable;
pub use records::{FileRecord, Meeting, Message, User, WhiteboardElement};
pub use storage::{
    DatabaseHeader, Page, PageType, RecordLocation, StorageEngine, RECORD_LOCATION_SIZE,
};
