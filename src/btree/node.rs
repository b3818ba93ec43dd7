//! # B+Tree Node Codec
//!
//! One node per page. Nodes are fixed-size: arrays sized for the maximum key
//! count, with `num_keys` marking how much of each array is live. The two
//! node kinds (records for leaves, children for internal nodes) share a
//! [`NodePayload`] enum, and both variants serialize into the same fixed
//! footprint so any node page can be repurposed as either kind.
//!
//! ## Node Layout (page body)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  --------------------------------------
//! 0       1     is_leaf (1 = leaf, 0 = internal)
//! 1       2     num_keys (u16)
//! 3       8     parent_page (informational only)
//! 11      8     next_leaf (0 at the rightmost leaf)
//! 19      504   keys (63 × u64)
//! 523     756   payload union:
//!                 leaf:     records (63 × RecordLocation, 756 bytes)
//!                 internal: children (64 × u64, 512 bytes; rest zero)
//! ```
//!
//! `parent_page` is written during splits but never relied on for
//! correctness; descent always starts from the root.

use eyre::{ensure, Result};

use crate::config::{BTREE_ORDER, MAX_KEYS, PAGE_DATA_SIZE};
use crate::error::EngineError;
use crate::storage::{PageType, RecordLocation, RECORD_LOCATION_SIZE};

const NUM_KEYS_OFFSET: usize = 1;
const PARENT_OFFSET: usize = 3;
const NEXT_LEAF_OFFSET: usize = 11;
const KEYS_OFFSET: usize = 19;
const PAYLOAD_OFFSET: usize = KEYS_OFFSET + MAX_KEYS * 8;

/// Serialized footprint of a node: header, keys, and the larger payload
/// variant (leaf records).
pub const NODE_SIZE: usize = PAYLOAD_OFFSET + MAX_KEYS * RECORD_LOCATION_SIZE;

const _: () = assert!(NODE_SIZE <= PAGE_DATA_SIZE, "node must fit in a page body");
const _: () = assert!(
    MAX_KEYS * RECORD_LOCATION_SIZE >= BTREE_ORDER * 8,
    "leaf payload is the union footprint and must cover the child array"
);

/// Leaf nodes carry record locations; internal nodes carry child page ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload {
    Leaf([RecordLocation; MAX_KEYS]),
    Internal([u64; BTREE_ORDER]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BTreeNode {
    pub num_keys: u16,
    pub parent_page: u64,
    pub next_leaf: u64,
    pub keys: [u64; MAX_KEYS],
    pub payload: NodePayload,
}

impl BTreeNode {
    pub fn new_leaf() -> Self {
        Self {
            num_keys: 0,
            parent_page: 0,
            next_leaf: 0,
            keys: [0u64; MAX_KEYS],
            payload: NodePayload::Leaf([RecordLocation::default(); MAX_KEYS]),
        }
    }

    pub fn new_internal() -> Self {
        Self {
            num_keys: 0,
            parent_page: 0,
            next_leaf: 0,
            keys: [0u64; MAX_KEYS],
            payload: NodePayload::Internal([0u64; BTREE_ORDER]),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.payload, NodePayload::Leaf(_))
    }

    pub fn page_type(&self) -> PageType {
        if self.is_leaf() {
            PageType::BTreeLeaf
        } else {
            PageType::BTreeInternal
        }
    }

    /// Live keys.
    pub fn live_keys(&self) -> &[u64] {
        &self.keys[..self.num_keys as usize]
    }

    pub fn records(&self) -> Result<&[RecordLocation; MAX_KEYS]> {
        match &self.payload {
            NodePayload::Leaf(records) => Ok(records),
            NodePayload::Internal(_) => Err(EngineError::StructuralViolation(
                "expected leaf payload on an internal node".into(),
            )
            .into()),
        }
    }

    pub fn records_mut(&mut self) -> Result<&mut [RecordLocation; MAX_KEYS]> {
        match &mut self.payload {
            NodePayload::Leaf(records) => Ok(records),
            NodePayload::Internal(_) => Err(EngineError::StructuralViolation(
                "expected leaf payload on an internal node".into(),
            )
            .into()),
        }
    }

    pub fn children(&self) -> Result<&[u64; BTREE_ORDER]> {
        match &self.payload {
            NodePayload::Internal(children) => Ok(children),
            NodePayload::Leaf(_) => Err(EngineError::StructuralViolation(
                "expected child pointers on a leaf node".into(),
            )
            .into()),
        }
    }

    pub fn children_mut(&mut self) -> Result<&mut [u64; BTREE_ORDER]> {
        match &mut self.payload {
            NodePayload::Internal(children) => Ok(children),
            NodePayload::Leaf(_) => Err(EngineError::StructuralViolation(
                "expected child pointers on a leaf node".into(),
            )
            .into()),
        }
    }

    pub fn serialize(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= NODE_SIZE,
            "buffer too small for BTreeNode: {} < {}",
            data.len(),
            NODE_SIZE
        );

        data[0] = self.is_leaf() as u8;
        data[NUM_KEYS_OFFSET..NUM_KEYS_OFFSET + 2].copy_from_slice(&self.num_keys.to_le_bytes());
        data[PARENT_OFFSET..PARENT_OFFSET + 8].copy_from_slice(&self.parent_page.to_le_bytes());
        data[NEXT_LEAF_OFFSET..NEXT_LEAF_OFFSET + 8].copy_from_slice(&self.next_leaf.to_le_bytes());

        for (i, key) in self.keys.iter().enumerate() {
            let at = KEYS_OFFSET + i * 8;
            data[at..at + 8].copy_from_slice(&key.to_le_bytes());
        }

        match &self.payload {
            NodePayload::Leaf(records) => {
                for (i, record) in records.iter().enumerate() {
                    let at = PAYLOAD_OFFSET + i * RECORD_LOCATION_SIZE;
                    record.write_to(&mut data[at..at + RECORD_LOCATION_SIZE])?;
                }
            }
            NodePayload::Internal(children) => {
                for (i, child) in children.iter().enumerate() {
                    let at = PAYLOAD_OFFSET + i * 8;
                    data[at..at + 8].copy_from_slice(&child.to_le_bytes());
                }
            }
        }

        Ok(())
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= NODE_SIZE,
            "buffer too small for BTreeNode: {} < {}",
            data.len(),
            NODE_SIZE
        );

        let is_leaf = data[0] == 1;
        let num_keys = u16::from_le_bytes(data[NUM_KEYS_OFFSET..NUM_KEYS_OFFSET + 2].try_into().unwrap());
        if num_keys as usize > MAX_KEYS {
            return Err(EngineError::StructuralViolation(format!(
                "node claims {num_keys} keys (max {MAX_KEYS})"
            ))
            .into());
        }
        let parent_page =
            u64::from_le_bytes(data[PARENT_OFFSET..PARENT_OFFSET + 8].try_into().unwrap());
        let next_leaf =
            u64::from_le_bytes(data[NEXT_LEAF_OFFSET..NEXT_LEAF_OFFSET + 8].try_into().unwrap());

        let mut keys = [0u64; MAX_KEYS];
        for (i, key) in keys.iter_mut().enumerate() {
            let at = KEYS_OFFSET + i * 8;
            *key = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
        }

        let payload = if is_leaf {
            let mut records = [RecordLocation::default(); MAX_KEYS];
            for (i, record) in records.iter_mut().enumerate() {
                let at = PAYLOAD_OFFSET + i * RECORD_LOCATION_SIZE;
                *record = RecordLocation::from_bytes(&data[at..at + RECORD_LOCATION_SIZE])?;
            }
            NodePayload::Leaf(records)
        } else {
            let mut children = [0u64; BTREE_ORDER];
            for (i, child) in children.iter_mut().enumerate() {
                let at = PAYLOAD_OFFSET + i * 8;
                *child = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
            }
            NodePayload::Internal(children)
        };

        Ok(Self {
            num_keys,
            parent_page,
            next_leaf,
            keys,
            payload,
        })
    }
}
