//! Uploaded file metadata record.

use eyre::{ensure, Result};

use super::{get_str, put_str};

pub const FILENAME_LEN: usize = 256;
pub const CONTENT_HASH_LEN: usize = 64;

/// Metadata for an uploaded file. The bytes themselves live in a blob chain
/// starting at `data_page_id`; deleting the record leaves that chain in
/// place. Keyed by `file_id` in the files B+Tree and by `content_hash` in
/// the dedup hash table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileRecord {
    pub file_id: u64,
    pub meeting_id: u64,
    pub uploader_id: u64,
    pub filename: String,
    pub content_hash: String,
    pub file_size: u64,
    pub uploaded_at: u64,
    pub data_page_id: u64,
}

impl FileRecord {
    pub const SERIALIZED_SIZE: usize = 8 + 8 + 8 + FILENAME_LEN + CONTENT_HASH_LEN + 8 + 8 + 8;

    pub fn serialized_size() -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn serialize(&self, buf: &mut [u8]) -> Result<()> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for FileRecord: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        buf[at..at + 8].copy_from_slice(&self.file_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.meeting_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.uploader_id.to_le_bytes());
        at += 8;
        put_str(&mut buf[at..at + FILENAME_LEN], "filename", &self.filename)?;
        at += FILENAME_LEN;
        put_str(
            &mut buf[at..at + CONTENT_HASH_LEN],
            "content_hash",
            &self.content_hash,
        )?;
        at += CONTENT_HASH_LEN;
        buf[at..at + 8].copy_from_slice(&self.file_size.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.uploaded_at.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.data_page_id.to_le_bytes());

        Ok(())
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for FileRecord: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        let file_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let meeting_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let uploader_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let filename = get_str(&buf[at..at + FILENAME_LEN]);
        at += FILENAME_LEN;
        let content_hash = get_str(&buf[at..at + CONTENT_HASH_LEN]);
        at += CONTENT_HASH_LEN;
        let file_size = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let uploaded_at = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let data_page_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());

        Ok(Self {
            file_id,
            meeting_id,
            uploader_id,
            filename,
            content_hash,
            file_size,
            uploaded_at,
            data_page_id,
        })
    }
}
