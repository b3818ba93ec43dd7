//! Whiteboard element record.

use eyre::{ensure, Result};

use super::{get_str, put_str};

pub const ELEMENT_TEXT_LEN: usize = 256;

/// Shape kinds a whiteboard element can take.
pub const ELEMENT_LINE: u8 = 0;
pub const ELEMENT_RECT: u8 = 1;
pub const ELEMENT_CIRCLE: u8 = 2;
pub const ELEMENT_TEXT: u8 = 3;

/// One drawn element on a meeting's whiteboard. Keyed by `element_id` in the
/// whiteboard B+Tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WhiteboardElement {
    pub element_id: u64,
    pub meeting_id: u64,
    pub user_id: u64,
    pub element_type: u8,
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
    pub color_r: u8,
    pub color_g: u8,
    pub color_b: u8,
    pub stroke_width: u16,
    pub text: String,
    pub timestamp: u64,
}

impl WhiteboardElement {
    pub const SERIALIZED_SIZE: usize = 8 + 8 + 8 + 1 + 4 * 2 + 3 + 2 + ELEMENT_TEXT_LEN + 8;

    pub fn serialized_size() -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn serialize(&self, buf: &mut [u8]) -> Result<()> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for WhiteboardElement: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        buf[at..at + 8].copy_from_slice(&self.element_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.meeting_id.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.user_id.to_le_bytes());
        at += 8;
        buf[at] = self.element_type;
        at += 1;
        for coord in [self.x1, self.y1, self.x2, self.y2] {
            buf[at..at + 2].copy_from_slice(&coord.to_le_bytes());
            at += 2;
        }
        buf[at] = self.color_r;
        buf[at + 1] = self.color_g;
        buf[at + 2] = self.color_b;
        at += 3;
        buf[at..at + 2].copy_from_slice(&self.stroke_width.to_le_bytes());
        at += 2;
        put_str(&mut buf[at..at + ELEMENT_TEXT_LEN], "text", &self.text)?;
        at += ELEMENT_TEXT_LEN;
        buf[at..at + 8].copy_from_slice(&self.timestamp.to_le_bytes());

        Ok(())
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= Self::SERIALIZED_SIZE,
            "buffer too small for WhiteboardElement: {} < {}",
            buf.len(),
            Self::SERIALIZED_SIZE
        );

        let mut at = 0;
        let element_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let meeting_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let user_id = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
        at += 8;
        let element_type = buf[at];
        at += 1;
        let mut coords = [0i16; 4];
        for coord in coords.iter_mut() {
            *coord = i16::from_le_bytes(buf[at..at + 2].try_into().unwrap());
            at += 2;
        }
        let color_r = buf[at];
        let color_g = buf[at + 1];
        let color_b = buf[at + 2];
        at += 3;
        let stroke_width = u16::from_le_bytes(buf[at..at + 2].try_into().unwrap());
        at += 2;
        let text = get_str(&buf[at..at + ELEMENT_TEXT_LEN]);
        at += ELEMENT_TEXT_LEN;
        let timestamp = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());

        Ok(Self {
            element_id,
            meeting_id,
            user_id,
            element_type,
            x1: coords[0],
            y1: coords[1],
            x2: coords[2],
            y2: coords[3],
            color_r,
            color_g,
            color_b,
            stroke_width,
            text,
            timestamp,
        })
    }
}
