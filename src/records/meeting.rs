//! Meeting record.

use eyre::{ensure, Result};

use super::{get_str, put_str};

pub const MEETING_CODE_LEN: usize = 16;
pub const TITLE_LEN: usize = 128;

/// A meeting room. Keyed by `meeting_id` in the meetings B+Tree and by
/// `meeting_code` in the meeting-code hash table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Meeting {
    pub meeting_id: u64,
    pub meeting_code: String,
    pub title: String,
    pub creator_id: u64,
    pub created_at: u64,
    pub started_at: u64,
    pub ended_at: u64,
    pub is_active: bool,
}

impl Meeting {
    pub const SERIALIZED_SIZE: usize = 8 + MEETING_CODE_LEN + TITLE_LEN + 8 + 8 + 8 + 8 + 1;

    pub fn serialized_size() -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn serialize(&self, buf: &mut [u8]) -> Result<()> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for Meeting: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        buf[at..at + 8].copy_from_slice(&self.meeting_id.to_le_bytes());
        at += 8;
        put_str(
            &mut buf[at..at + MEETING_CODE_LEN],
            "meeting_code",
            &self.meeting_code,
        )?;
        at += MEETING_CODE_LEN;
        put_str(&mut buf[at..at + TITLE_LEN], "title", &self.title)?;
        at += TITLE_LEN;
        buf[at..at + 8].copy_from_slice(&self.creator_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.created_at.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.started_at.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.ended_at.to_le_bytes());
        at += 8;
        buf[at] = self.is_active as u8;

        Ok(())
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for Meeting: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        let meeting_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let meeting_code = get_str(&buf[at..at + MEETING_CODE_LEN]);
        at += MEETING_CODE_LEN;
        let title = get_str(&buf[at..at + TITLE_LEN]);
        at += TITLE_LEN;
        let creator_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let created_at = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let started_at = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let ended_at = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let is_active = buf[at] == 1;

        Ok(Self {
            meeting_id,
            meeting_code,
            title,
            creator_id,
            created_at,
            started_at,
            ended_at,
            is_active,
        })
    }
}
