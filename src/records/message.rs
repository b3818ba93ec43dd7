//! Chat message record.

use eyre::{ensure, Result};

use super::{get_str, put_str};

pub const MSG_USERNAME_LEN: usize = 64;
pub const CONTENT_LEN: usize = 2048;

/// One chat message. Keyed by `message_id` in the messages B+Tree; the chat
/// search hash table stores keyword → message postings on top.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub message_id: u64,
    pub meeting_id: u64,
    pub user_id: u64,
    pub username: String,
    pub content: String,
    pub timestamp: u64,
}

impl Message {
    pub const SERIALIZED_SIZE: usize = 8 + 8 + 8 + MSG_USERNAME_LEN + CONTENT_LEN + 8;

    pub fn serialized_size() -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn serialize(&self, buf: &mut [u8]) -> Result<()> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for Message: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        buf[at..at + 8].copy_from_slice(&self.message_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.meeting_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.user_id.to_le_bytes());
        at += 8;
        put_str(&mut buf[at..at + MSG_USERNAME_LEN], "username", &self.username)?;
        at += MSG_USERNAME_LEN;
        put_str(&mut buf[at..at + CONTENT_LEN], "content", &self.content)?;
        at += CONTENT_LEN;
        buf[at..at + 8].copy_from_slice(&self.timestamp.to_le_bytes());

        Ok(())
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for Message: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        let message_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let meeting_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let user_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let username = get_str(&buf[at..at + MSG_USERNAME_LEN]);
        at += MSG_USERNAME_LEN;
        let content = get_str(&buf[at..at + CONTENT_LEN]);
        at += CONTENT_LEN;
        let timestamp = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());

        Ok(Self {
            message_id,
            meeting_id,
            user_id,
            username,
            content,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_size_is_2144() {
        assert_eq!(Message::SERIALIZED_SIZE, 2144);
    }

    #[test]
    fn roundtrip() {
        let message = Message {
            message_id: 99,
            meeting_id: 12,
            user_id: 7,
            username: "ulrich".into(),
            content: "see the whiteboard for the new layout".into(),
            timestamp: 1_700_000_123,
        };

        let mut buf = vec![0u8; Message::SERIALIZED_SIZE];
        message.serialize(&mut buf).unwrap();

        assert_eq!(Message::deserialize(&buf).unwrap(), message);
    }

    #[test]
    fn near_capacity_content_roundtrips() {
        let message = Message {
            content: "m".repeat(CONTENT_LEN - 1),
            ..Default::default()
        };

        let mut buf = vec![0u8; Message::SERIALIZED_SIZE];
        message.serialize(&mut buf).unwrap();

        assert_eq!(Message::deserialize(&buf).unwrap().content.len(), CONTENT_LEN - 1);
    }

    #[test]
    fn full_capacity_content_is_rejected() {
        let message = Message {
            content: "m".repeat(CONTENT_LEN),
            ..Default::default()
        };

        let mut buf = vec![0u8; Message::SERIALIZED_SIZE];
        assert!(message.serialize(&mut buf).is_err());
    }
}
