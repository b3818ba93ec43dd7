//! User account record.

use eyre::{ensure, Result};

use super::{get_str, put_str};

pub const EMAIL_LEN: usize = 128;
pub const PASSWORD_HASH_LEN: usize = 64;
pub const USERNAME_LEN: usize = 64;

/// A registered user. Keyed by `user_id` in the users B+Tree and by `email`
/// in the login hash table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub user_id: u64,
    pub email: String,
    pub password_hash: String,
    pub username: String,
    pub created_at: u64,
}

impl User {
    pub const SERIALIZED_SIZE: usize = 8 + EMAIL_LEN + PASSWORD_HASH_LEN + USERNAME_LEN + 8;

    pub fn serialized_size() -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn serialize(&self, buf: &mut [u8]) -> Result<()> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for User: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        buf[at..at + 8].copy_from_slice(&self.user_id.to_le_bytes());
        at += 8;
        put_str(&mut buf[at..at + EMAIL_LEN], "email", &self.email)?;
        at += EMAIL_LEN;
        put_str(
            &mut buf[at..at + PASSWORD_HASH_LEN],
            "password_hash",
            &self.password_hash,
        )?;
        at += PASSWORD_HASH_LEN;
        put_str(&mut buf[at..at + USERNAME_LEN], "username", &self.username)?;
        at += USERNAME_LEN;
        buf[at..at + 8].copy_from_slice(&self.created_at.to_le_bytes());

        Ok(())
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for User: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        let user_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let email = get_str(&buf[at..at + EMAIL_LEN]);
        at += EMAIL_LEN;
        let password_hash = get_str(&buf[at..at + PASSWORD_HASH_LEN]);
        at += PASSWORD_HASH_LEN;
        let username = get_str(&buf[at..at + USERNAME_LEN]);
        at += USERNAME_LEN;
        let created_at = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());

        Ok(Self {
            user_id,
            email,
            password_hash,
            username,
            created_at,
        })
    }
}
