//! # Database File Header
//!
//! Page 0 of the database file carries the `DatabaseHeader` in its body. The
//! header records where everything else lives: the five B+Tree roots, the
//! four hash-table header pages, the free-list head, and the monotonic id
//! counters. It is (re)written by `write_header` as a regular `Free`-typed
//! page with a body checksum, so the same page codec and integrity check
//! cover it.
//!
//! ## Header Layout (140 bytes, little-endian)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -------------------------------
//! 0       4     magic ("MTDB")
//! 4       4     version
//! 8       4     page_size
//! 12      8     total_pages
//! 20      40    B+Tree roots (users, meetings, messages, files, whiteboard)
//! 60      32    hash headers (login, meeting-code, chat-search, file-dedup)
//! 92      8     free_list_head
//! 100     40    id counters (user, meeting, message, file, whiteboard)
//! ```
//!
//! A root or hash-header field of 0 means "not created yet"; page 0 can never
//! be a valid index page. Counters hold the last id handed out, so a fresh
//! database starts them all at 0 and the first allocation returns 1.

use eyre::Result;
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{PAGE_DATA_SIZE, PAGE_SIZE};
use crate::error::EngineError;

pub const DB_MAGIC: &[u8; 4] = b"MTDB";
pub const CURRENT_VERSION: u32 = 1;

pub const DB_HEADER_SIZE: usize = std::mem::size_of::<DatabaseHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct DatabaseHeader {
    magic: [u8; 4],
    version: U32,
    page_size: U32,
    total_pages: U64,

    users_root: U64,
    meetings_root: U64,
    messages_root: U64,
    files_root: U64,
    whiteboard_root: U64,

    login_hash: U64,
    meeting_code_hash: U64,
    chat_search_hash: U64,
    file_dedup_hash: U64,

    free_list_head: U64,

    last_user_id: U64,
    last_meeting_id: U64,
    last_message_id: U64,
    last_file_id: U64,
    last_whiteboard_id: U64,
}

const _: () = assert!(DB_HEADER_SIZE == 140);
const _: () = assert!(DB_HEADER_SIZE <= PAGE_DATA_SIZE);

impl DatabaseHeader {
    /// A fresh header: one page (the header itself), empty indexes, zeroed
    /// counters.
    pub fn new() -> Self {
        Self {
            magic: *DB_MAGIC,
            version: U32::new(CURRENT_VERSION),
            page_size: U32::new(PAGE_SIZE as u32),
            total_pages: U64::new(1),
            users_root: U64::new(0),
            meetings_root: U64::new(0),
            messages_root: U64::new(0),
            files_root: U64::new(0),
            whiteboard_root: U64::new(0),
            login_hash: U64::new(0),
            meeting_code_hash: U64::new(0),
            chat_search_hash: U64::new(0),
            file_dedup_hash: U64::new(0),
            free_list_head: U64::new(0),
            last_user_id: U64::new(0),
            last_meeting_id: U64::new(0),
            last_message_id: U64::new(0),
            last_file_id: U64::new(0),
            last_whiteboard_id: U64::new(0),
        }
    }

    /// Parses and validates a header from a page-0 body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DB_HEADER_SIZE {
            return Err(EngineError::InvalidFile {
                reason: format!("header truncated: {} < {} bytes", bytes.len(), DB_HEADER_SIZE),
            }
            .into());
        }

        let header = Self::read_from_bytes(&bytes[..DB_HEADER_SIZE])
            .map_err(|e| EngineError::InvalidFile {
                reason: format!("unparseable header: {e:?}"),
            })?;

        if &header.magic != DB_MAGIC {
            return Err(EngineError::InvalidFile {
                reason: format!("bad magic {:02x?}", header.magic),
            }
            .into());
        }
        if header.version.get() != CURRENT_VERSION {
            return Err(EngineError::InvalidFile {
                reason: format!(
                    "unsupported version {} (expected {})",
                    header.version.get(),
                    CURRENT_VERSION
                ),
            }
            .into());
        }
        if header.page_size.get() as usize != PAGE_SIZE {
            return Err(EngineError::InvalidFile {
                reason: format!(
                    "page size {} (expected {})",
                    header.page_size.get(),
                    PAGE_SIZE
                ),
            }
            .into());
        }

        Ok(header)
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        eyre::ensure!(
            data.len() >= DB_HEADER_SIZE,
            "buffer too small for DatabaseHeader: {} < {}",
            data.len(),
            DB_HEADER_SIZE
        );

        data[..DB_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version.get()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.get()
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages.get()
    }

    pub fn set_total_pages(&mut self, count: u64) {
        self.total_pages = U64::new(count);
    }

    pub fn users_root(&self) -> u64 {
        self.users_root.get()
    }

    pub fn set_users_root(&mut self, page_id: u64) {
        self.users_root = U64::new(page_id);
    }

    pub fn meetings_root(&self) -> u64 {
        self.meetings_root.get()
    }

    pub fn set_meetings_root(&mut self, page_id: u64) {
        self.meetings_root = U64::new(page_id);
    }

    pub fn messages_root(&self) -> u64 {
        self.messages_root.get()
    }

    pub fn set_messages_root(&mut self, page_id: u64) {
        self.messages_root = U64::new(page_id);
    }

    pub fn files_root(&self) -> u64 {
        self.files_root.get()
    }

    pub fn set_files_root(&mut self, page_id: u64) {
        self.files_root = U64::new(page_id);
    }

    pub fn whiteboard_root(&self) -> u64 {
        self.whiteboard_root.get()
    }

    pub fn set_whiteboard_root(&mut self, page_id: u64) {
        self.whiteboard_root = U64::new(page_id);
    }

    pub fn login_hash(&self) -> u64 {
        self.login_hash.get()
    }

    pub fn set_login_hash(&mut self, page_id: u64) {
        self.login_hash = U64::new(page_id);
    }

    pub fn meeting_code_hash(&self) -> u64 {
        self.meeting_code_hash.get()
    }

    pub fn set_meeting_code_hash(&mut self, page_id: u64) {
        self.meeting_code_hash = U64::new(page_id);
    }

    pub fn chat_search_hash(&self) -> u64 {
        self.chat_search_hash.get()
    }

    pub fn set_chat_search_hash(&mut self, page_id: u64) {
        self.chat_search_hash = U64::new(page_id);
    }

    pub fn file_dedup_hash(&self) -> u64 {
        self.file_dedup_hash.get()
    }

    pub fn set_file_dedup_hash(&mut self, page_id: u64) {
        self.file_dedup_hash = U64::new(page_id);
    }

    pub fn free_list_head(&self) -> u64 {
        self.free_list_head.get()
    }

    pub fn set_free_list_head(&mut self, page_id: u64) {
        self.free_list_head = U64::new(page_id);
    }

    pub fn last_user_id(&self) -> u64 {
        self.last_user_id.get()
    }

    pub fn next_user_id(&mut self) -> u64 {
        let id = self.last_user_id.get() + 1;
        self.last_user_id = U64::new(id);
        id
    }

    pub fn last_meeting_id(&self) -> u64 {
        self.last_meeting_id.get()
    }

    pub fn next_meeting_id(&mut self) -> u64 {
        let id = self.last_meeting_id.get() + 1;
        self.last_meeting_id = U64::new(id);
        id
    }

    pub fn last_message_id(&self) -> u64 {
        self.last_message_id.get()
    }

    pub fn next_message_id(&mut self) -> u64 {
        let id = self.last_message_id.get() + 1;
        self.last_message_id = U64::new(id);
        id
    }

    pub fn last_file_id(&self) -> u64 {
        self.last_file_id.get()
    }

    pub fn next_file_id(&mut self) -> u64 {
        let id = self.last_file_id.get() + 1;
        self.last_file_id = U64::new(id);
        id
    }

    pub fn last_whiteboard_id(&self) -> u64 {
        self.last_whiteboard_id.get()
    }

    pub fn next_whiteboard_id(&mut self) -> u64 {
        let id = self.last_whiteboard_id.get() + 1;
        self.last_whiteboard_id = U64::new(id);
        id
    }
}

impl Default for DatabaseHeader {
    fn default() -> Self {
        Self::new()
    }
}
