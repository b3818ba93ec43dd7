//! # B+Tree Implementation
//!
//! A disk-resident B+Tree mapping `u64` keys to [`RecordLocation`]s. Every
//! node occupies one page; the tree stores page ids rather than pointers, so
//! the whole structure round-trips through the paged heap.
//!
//! ## Architecture Overview
//!
//! - All bindings live in leaf nodes; internal nodes hold separator keys and
//!   child page ids and only route descents
//! - All leaves sit at the same depth
//! - Leaves form a forward-linked list in ascending key order for range scans
//!
//! ```text
//!                    [Internal page 7]
//!                    /       |        \
//!           [Leaf 2]    [Leaf 3]    [Leaf 4]
//!              |----------->|---------->|  (next_leaf chain)
//! ```
//!
//! ## Separator Convention
//!
//! A separator at index `i` bounds its subtrees as `c[i] < keys[i] <= c[i+1]`:
//! descents take the right child on an equal key. When a leaf splits, the
//! separator pushed into the parent is a *copy* of the new right leaf's first
//! key — the entry itself stays in the leaf. When an internal node splits,
//! the middle key moves up and drops out of both halves (it routes, it does
//! not bind). Separators may go stale after deletions; that is harmless
//! because they still bound their subtrees.
//!
//! ## Insert Algorithm
//!
//! Top-down preventive splitting: before descending into a full child, split
//! it, so there is always room when the insertion reaches a leaf. If the root
//! itself is full, a new internal root adopts it first.
//!
//! ## Delete Algorithm
//!
//! Top-down fill-on-descent: before descending into a child at minimum
//! occupancy, fatten it by borrowing from a sibling with spare keys, or merge
//! it with a sibling around their separator. Borrows between leaves move a
//! real (key, record) entry and update the separator to match; borrows
//! between internal nodes rotate the separator through the parent. An
//! internal root left with zero keys is collapsed onto its only child and
//! freed.
//!
//! ## Duplicate Keys
//!
//! `insert` places a duplicate key in sorted position rather than replacing
//! the existing binding; `search` then returns one of the matching records.
//! Callers hand out monotonic ids, so duplicates do not arise in practice.
//!
//! ## Thread Safety
//!
//! The tree is not internally synchronized. Mutating operations take
//! `&mut self`, so one tree value has at most one writer at a time; wrap the
//! tree in a lock to share it across threads. Individual page reads and
//! writes are serialized by the engine underneath, but a concurrent reader
//! of the same tree may observe intermediate states of a multi-page rewrite.

use eyre::Result;
use tracing::debug;

use super::node::BTreeNode;
use crate::config::{MAX_KEYS, MIN_KEYS};
use crate::error::EngineError;
use crate::storage::{Page, RecordLocation, StorageEngine};

pub struct BTree<'a> {
    engine: &'a StorageEngine,
    root_page_id: u64,
}

impl<'a> BTree<'a> {
    /// A tree with no root yet; the first `insert` creates one.
    pub fn new(engine: &'a StorageEngine) -> Self {
        Self {
            engine,
            root_page_id: 0,
        }
    }

    /// Adopts an existing root page (from the database header).
    pub fn load(engine: &'a StorageEngine, root_page_id: u64) -> Self {
        Self {
            engine,
            root_page_id,
        }
    }

    /// Allocates a page for an empty leaf root.
    pub fn initialize(&mut self) -> Result<()> {
        let root_page_id = self.engine.allocate_page()?;
        self.save_node(root_page_id, &BTreeNode::new_leaf())?;
        self.root_page_id = root_page_id;

        debug!(root = root_page_id, "b+tree initialized");
        Ok(())
    }

    /// The current root page id. Callers persist this into the database
    /// header after operations that can move the root (splits, collapses).
    pub fn root_page_id(&self) -> u64 {
        self.root_page_id
    }

    fn load_node(&self, page_id: u64) -> Result<BTreeNode> {
        let page = self.engine.read_page(page_id)?;
        BTreeNode::deserialize(&page.data)
    }

    fn save_node(&self, page_id: u64, node: &BTreeNode) -> Result<()> {
        let mut page = Page::new(node.page_type());
        node.serialize(&mut page.data)?;
        self.engine.write_page(page_id, &page)
    }

    /// First index whose key is >= `key`; the insertion point if absent.
    fn key_position(node: &BTreeNode, key: u64) -> usize {
        node.live_keys().partition_point(|&k| k < key)
    }

    /// Child slot to descend into: equal keys live in the right subtree.
    fn descend_index(node: &BTreeNode, key: u64) -> usize {
        let pos = Self::key_position(node, key);
        if pos < node.num_keys as usize && node.keys[pos] == key {
            pos + 1
        } else {
            pos
        }
    }

    pub fn search(&self, key: u64) -> Result<Option<RecordLocation>> {
        if self.root_page_id == 0 {
            return Ok(None);
        }

        let mut current = self.root_page_id;
        loop {
            let node = self.load_node(current)?;

            if node.is_leaf() {
                let pos = Self::key_position(&node, key);
                if pos < node.num_keys as usize && node.keys[pos] == key {
                    return Ok(Some(node.records()?[pos]));
                }
                return Ok(None);
            }

            current = node.children()?[Self::descend_index(&node, key)];
        }
    }

    pub fn insert(&mut self, key: u64, record: RecordLocation) -> Result<()> {
        if self.root_page_id == 0 {
            self.initialize()?;
        }

        let root = self.load_node(self.root_page_id)?;
        if root.num_keys as usize == MAX_KEYS {
            let old_root_id = self.root_page_id;
            let new_root_id = self.engine.allocate_page()?;

            let mut new_root = BTreeNode::new_internal();
            new_root.children_mut()?[0] = old_root_id;
            self.save_node(new_root_id, &new_root)?;

            self.split_child(new_root_id, 0, old_root_id)?;
            self.root_page_id = new_root_id;
        }

        self.insert_non_full(self.root_page_id, key, record)
    }

    fn insert_non_full(&self, page_id: u64, key: u64, record: RecordLocation) -> Result<()> {
        let mut node = self.load_node(page_id)?;

        if node.is_leaf() {
            let n = node.num_keys as usize;
            if n >= MAX_KEYS {
                return Err(EngineError::StructuralViolation(format!(
                    "insert reached full leaf {page_id} after preventive splitting"
                ))
                .into());
            }

            let pos = Self::key_position(&node, key);
            for i in ((pos + 1)..=n).rev() {
                node.keys[i] = node.keys[i - 1];
            }
            {
                let records = node.records_mut()?;
                for i in ((pos + 1)..=n).rev() {
                    records[i] = records[i - 1];
                }
                records[pos] = record;
            }
            node.keys[pos] = key;
            node.num_keys += 1;

            return self.save_node(page_id, &node);
        }

        let mut pos = Self::descend_index(&node, key);
        let child_id = node.children()?[pos];
        let child = self.load_node(child_id)?;

        if child.num_keys as usize == MAX_KEYS {
            self.split_child(page_id, pos, child_id)?;
            node = self.load_node(page_id)?;
            if key >= node.keys[pos] {
                pos += 1;
            }
        }

        let next_id = node.children()?[pos];
        self.insert_non_full(next_id, key, record)
    }

    /// Splits the full child at `child_index` of `parent_id` in two, pushing
    /// a separator into the parent.
    fn split_child(&self, parent_id: u64, child_index: usize, child_id: u64) -> Result<()> {
        let mut parent = self.load_node(parent_id)?;
        let mut child = self.load_node(child_id)?;
        let new_page_id = self.engine.allocate_page()?;

        let mid = MAX_KEYS / 2;
        let move_count = MAX_KEYS - (mid + 1);

        let separator;
        let mut new_node = if child.is_leaf() {
            // The child keeps keys[..=mid]; the separator is a copy of the
            // new leaf's first key so equal keys route right of it.
            let mut new_leaf = BTreeNode::new_leaf();
            new_leaf.num_keys = move_count as u16;
            new_leaf.keys[..move_count].copy_from_slice(&child.keys[mid + 1..]);
            {
                let src = child.records()?;
                let dst = new_leaf.records_mut()?;
                dst[..move_count].copy_from_slice(&src[mid + 1..]);
            }
            new_leaf.next_leaf = child.next_leaf;
            child.next_leaf = new_page_id;
            child.num_keys = (mid + 1) as u16;

            separator = new_leaf.keys[0];
            new_leaf
        } else {
            // The middle key moves up and drops out of both halves.
            let mut new_internal = BTreeNode::new_internal();
            new_internal.num_keys = move_count as u16;
            new_internal.keys[..move_count].copy_from_slice(&child.keys[mid + 1..]);
            {
                let src = child.children()?;
                let dst = new_internal.children_mut()?;
                dst[..=move_count].copy_from_slice(&src[mid + 1..]);
            }
            child.num_keys = mid as u16;

            separator = child.keys[mid];
            new_internal
        };
        new_node.parent_page = parent_id;

        let pn = parent.num_keys as usize;
        for i in ((child_index + 1)..=pn).rev() {
            parent.keys[i] = parent.keys[i - 1];
        }
        {
            let children = parent.children_mut()?;
            for i in ((child_index + 1)..=pn).rev() {
                children[i + 1] = children[i];
            }
            children[child_index + 1] = new_page_id;
        }
        parent.keys[child_index] = separator;
        parent.num_keys += 1;

        self.save_node(child_id, &child)?;
        self.save_node(new_page_id, &new_node)?;
        self.save_node(parent_id, &parent)
    }

    pub fn remove(&mut self, key: u64) -> Result<bool> {
        if self.root_page_id == 0 {
            return Ok(false);
        }

        let removed = self.remove_recursive(self.root_page_id, key)?;

        let root = self.load_node(self.root_page_id)?;
        if !root.is_leaf() && root.num_keys == 0 {
            let old_root = self.root_page_id;
            self.root_page_id = root.children()?[0];
            self.engine.free_page(old_root)?;
        }

        Ok(removed)
    }

    fn remove_recursive(&self, page_id: u64, key: u64) -> Result<bool> {
        let mut node = self.load_node(page_id)?;

        if node.is_leaf() {
            let pos = Self::key_position(&node, key);
            if pos >= node.num_keys as usize || node.keys[pos] != key {
                return Ok(false);
            }

            let n = node.num_keys as usize;
            for i in pos..n - 1 {
                node.keys[i] = node.keys[i + 1];
            }
            {
                let records = node.records_mut()?;
                for i in pos..n - 1 {
                    records[i] = records[i + 1];
                }
            }
            node.num_keys -= 1;
            self.save_node(page_id, &node)?;
            return Ok(true);
        }

        // Internal nodes only route; separators are copies that may go
        // stale, so nothing is deleted at this level.
        let mut idx = Self::descend_index(&node, key);
        let child_id = node.children()?[idx];
        let child = self.load_node(child_id)?;

        if child.num_keys as usize <= MIN_KEYS {
            self.fill_child(page_id, idx)?;
            node = self.load_node(page_id)?;
            idx = Self::descend_index(&node, key);
        }

        let next_id = node.children()?[idx];
        self.remove_recursive(next_id, key)
    }

    /// Brings the child at `child_idx` above minimum occupancy before a
    /// descent: borrow from a sibling with spare keys, else merge.
    fn fill_child(&self, page_id: u64, child_idx: usize) -> Result<()> {
        let node = self.load_node(page_id)?;

        if child_idx > 0 {
            let prev = self.load_node(node.children()?[child_idx - 1])?;
            if prev.num_keys as usize > MIN_KEYS {
                return self.borrow_from_prev(page_id, child_idx);
            }
        }

        if child_idx < node.num_keys as usize {
            let next = self.load_node(node.children()?[child_idx + 1])?;
            if next.num_keys as usize > MIN_KEYS {
                return self.borrow_from_next(page_id, child_idx);
            }
        }

        if child_idx < node.num_keys as usize {
            self.merge_children(page_id, child_idx)
        } else {
            self.merge_children(page_id, child_idx - 1)
        }
    }

    fn borrow_from_prev(&self, page_id: u64, child_idx: usize) -> Result<()> {
        let mut node = self.load_node(page_id)?;
        let child_id = node.children()?[child_idx];
        let sibling_id = node.children()?[child_idx - 1];
        let mut child = self.load_node(child_id)?;
        let mut sibling = self.load_node(sibling_id)?;

        let cn = child.num_keys as usize;
        let sn = sibling.num_keys as usize;

        for i in (1..=cn).rev() {
            child.keys[i] = child.keys[i - 1];
        }

        if child.is_leaf() {
            // Move the sibling's last entry over; the separator becomes a
            // copy of the moved key.
            {
                let moved = sibling.records()?[sn - 1];
                let records = child.records_mut()?;
                for i in (1..=cn).rev() {
                    records[i] = records[i - 1];
                }
                records[0] = moved;
            }
            child.keys[0] = sibling.keys[sn - 1];
            node.keys[child_idx - 1] = sibling.keys[sn - 1];
        } else {
            // Rotate through the parent: separator drops into the child,
            // the sibling's last key replaces it.
            {
                let moved = sibling.children()?[sn];
                let children = child.children_mut()?;
                for i in (1..=cn + 1).rev() {
                    children[i] = children[i - 1];
                }
                children[0] = moved;
            }
            child.keys[0] = node.keys[child_idx - 1];
            node.keys[child_idx - 1] = sibling.keys[sn - 1];
        }

        child.num_keys += 1;
        sibling.num_keys -= 1;

        self.save_node(sibling_id, &sibling)?;
        self.save_node(child_id, &child)?;
        self.save_node(page_id, &node)
    }

    fn borrow_from_next(&self, page_id: u64, child_idx: usize) -> Result<()> {
        let mut node = self.load_node(page_id)?;
        let child_id = node.children()?[child_idx];
        let sibling_id = node.children()?[child_idx + 1];
        let mut child = self.load_node(child_id)?;
        let mut sibling = self.load_node(sibling_id)?;

        let cn = child.num_keys as usize;
        let sn = sibling.num_keys as usize;

        if child.is_leaf() {
            child.keys[cn] = sibling.keys[0];
            {
                let moved = sibling.records()?[0];
                child.records_mut()?[cn] = moved;
            }

            for i in 0..sn - 1 {
                sibling.keys[i] = sibling.keys[i + 1];
            }
            {
                let records = sibling.records_mut()?;
                for i in 0..sn - 1 {
                    records[i] = records[i + 1];
                }
            }

            // New separator: what the sibling now starts with.
            node.keys[child_idx] = sibling.keys[0];
        } else {
            child.keys[cn] = node.keys[child_idx];
            {
                let moved = sibling.children()?[0];
                child.children_mut()?[cn + 1] = moved;
            }
            node.keys[child_idx] = sibling.keys[0];

            for i in 0..sn - 1 {
                sibling.keys[i] = sibling.keys[i + 1];
            }
            {
                let children = sibling.children_mut()?;
                for i in 0..sn {
                    children[i] = children[i + 1];
                }
            }
        }

        child.num_keys += 1;
        sibling.num_keys -= 1;

        self.save_node(child_id, &child)?;
        self.save_node(sibling_id, &sibling)?;
        self.save_node(page_id, &node)
    }

    /// Merges the child at `child_idx` with its right sibling and frees the
    /// sibling page.
    fn merge_children(&self, page_id: u64, child_idx: usize) -> Result<()> {
        let mut node = self.load_node(page_id)?;
        let child_id = node.children()?[child_idx];
        let sibling_id = node.children()?[child_idx + 1];
        let mut child = self.load_node(child_id)?;
        let sibling = self.load_node(sibling_id)?;

        let cn = child.num_keys as usize;
        let sn = sibling.num_keys as usize;

        if child.is_leaf() {
            // The separator is a copy of a leaf entry; appending the sibling
            // directly keeps the key set intact.
            child.keys[cn..cn + sn].copy_from_slice(&sibling.keys[..sn]);
            {
                let src = sibling.records()?;
                let dst = child.records_mut()?;
                dst[cn..cn + sn].copy_from_slice(&src[..sn]);
            }
            child.next_leaf = sibling.next_leaf;
            child.num_keys = (cn + sn) as u16;
        } else {
            // The separator routes between the two child arrays; pull it
            // down to keep them apart.
            child.keys[cn] = node.keys[child_idx];
            child.keys[cn + 1..cn + 1 + sn].copy_from_slice(&sibling.keys[..sn]);
            {
                let src = sibling.children()?;
                let dst = child.children_mut()?;
                dst[cn + 1..cn + 2 + sn].copy_from_slice(&src[..=sn]);
            }
            child.num_keys = (cn + sn + 1) as u16;
        }

        let pn = node.num_keys as usize;
        for i in child_idx..pn - 1 {
            node.keys[i] = node.keys[i + 1];
        }
        {
            let children = node.children_mut()?;
            for i in child_idx + 1..pn {
                children[i] = children[i + 1];
            }
        }
        node.num_keys -= 1;

        self.save_node(child_id, &child)?;
        self.save_node(page_id, &node)?;
        self.engine.free_page(sibling_id)
    }

    /// All record locations whose key lies in `[start_key, end_key]`, in
    /// ascending key order.
    pub fn range_search(&self, start_key: u64, end_key: u64) -> Result<Vec<RecordLocation>> {
        let mut results = Vec::new();
        if self.root_page_id == 0 {
            return Ok(results);
        }

        // Descend toward the leftmost leaf that could hold start_key. An
        // equal separator may land one leaf early; the chain walk covers it.
        let mut node = self.load_node(self.root_page_id)?;
        while !node.is_leaf() {
            let pos = Self::key_position(&node, start_key);
            node = self.load_node(node.children()?[pos])?;
        }

        loop {
            for i in 0..node.num_keys as usize {
                if node.keys[i] > end_key {
                    return Ok(results);
                }
                if node.keys[i] >= start_key {
                    results.push(node.records()?[i]);
                }
            }

            if node.next_leaf == 0 {
                return Ok(results);
            }
            node = self.load_node(node.next_leaf)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BTREE_ORDER;

    fn temp_engine() -> (StorageEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::initialize(dir.path().join("btree.db")).unwrap();
        (engine, dir)
    }

    fn loc(key: u64) -> RecordLocation {
        RecordLocation::new(key, (key % 16) as u16 * 100, 272)
    }

    /// Walks the whole tree checking in-node key ordering, subtree bounds,
    /// uniform leaf depth, and minimum occupancy, then returns the key
    /// sequence observed along the leaf chain.
    fn check_invariants(tree: &BTree) -> Vec<u64> {
        if tree.root_page_id == 0 {
            return Vec::new();
        }

        fn walk(
            tree: &BTree,
            page_id: u64,
            lo: Option<u64>,
            hi: Option<u64>,
            depth: usize,
            leaf_depths: &mut Vec<usize>,
            is_root: bool,
        ) {
            let node = tree.load_node(page_id).unwrap();
            let n = node.num_keys as usize;

            if !is_root {
                assert!(n >= MIN_KEYS, "node {page_id} underfull: {n} keys");
            }
            for i in 1..n {
                assert!(node.keys[i - 1] < node.keys[i], "keys out of order in {page_id}");
            }
            for i in 0..n {
                if let Some(lo) = lo {
                    assert!(node.keys[i] >= lo, "key below subtree bound in {page_id}");
                }
                if let Some(hi) = hi {
                    assert!(node.keys[i] < hi, "key above subtree bound in {page_id}");
                }
            }

            if node.is_leaf() {
                leaf_depths.push(depth);
            } else {
                for i in 0..=n {
                    let child_lo = if i == 0 { lo } else { Some(node.keys[i - 1]) };
                    let child_hi = if i == n { hi } else { Some(node.keys[i]) };
                    walk(
                        tree,
                        node.children().unwrap()[i],
                        child_lo,
                        child_hi,
                        depth + 1,
                        leaf_depths,
                        false,
                    );
                }
            }
        }

        let mut leaf_depths = Vec::new();
        walk(tree, tree.root_page_id, None, None, 0, &mut leaf_depths, true);
        let first_depth = leaf_depths[0];
        assert!(
            leaf_depths.iter().all(|&d| d == first_depth),
            "leaves at differing depths: {leaf_depths:?}"
        );

        // Leaf chain: find the leftmost leaf, then follow next_leaf.
        let mut node = tree.load_node(tree.root_page_id).unwrap();
        while !node.is_leaf() {
            node = tree.load_node(node.children().unwrap()[0]).unwrap();
        }
        let mut chain_keys = Vec::new();
        loop {
            chain_keys.extend_from_slice(node.live_keys());
            if node.next_leaf == 0 {
                break;
            }
            node = tree.load_node(node.next_leaf).unwrap();
        }
        for w in chain_keys.windows(2) {
            assert!(w[0] < w[1], "leaf chain out of order");
        }
        chain_keys
    }

    #[test]
    fn search_on_empty_tree_returns_none() {
        let (engine, _dir) = temp_engine();
        let tree = BTree::new(&engine);

        assert!(tree.search(1).unwrap().is_none());
        assert!(tree.range_search(0, 100).unwrap().is_empty());
    }

    #[test]
    fn insert_then_search_single_key() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        tree.insert(42, loc(42)).unwrap();

        assert_eq!(tree.search(42).unwrap(), Some(loc(42)));
        assert!(tree.search(41).unwrap().is_none());
        assert!(tree.search(43).unwrap().is_none());
    }

    #[test]
    fn order_minus_one_keys_fill_root_without_split() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=(BTREE_ORDER as u64 - 1) {
            tree.insert(key, loc(key)).unwrap();
        }

        let root = tree.load_node(tree.root_page_id).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.num_keys as usize, MAX_KEYS);
    }

    #[test]
    fn order_keys_split_root_once() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=(BTREE_ORDER as u64) {
            tree.insert(key, loc(key)).unwrap();
        }

        let root = tree.load_node(tree.root_page_id).unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.num_keys, 1);

        for key in 1..=(BTREE_ORDER as u64) {
            assert_eq!(tree.search(key).unwrap(), Some(loc(key)), "key {key}");
        }
        let chain = check_invariants(&tree);
        assert_eq!(chain, (1..=BTREE_ORDER as u64).collect::<Vec<_>>());
    }

    #[test]
    fn thousand_ascending_keys() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=1000u64 {
            tree.insert(key, loc(key)).unwrap();
        }

        for key in 1..=1000u64 {
            assert_eq!(tree.search(key).unwrap(), Some(loc(key)), "key {key}");
        }
        assert!(tree.search(0).unwrap().is_none());
        assert!(tree.search(1001).unwrap().is_none());

        let chain = check_invariants(&tree);
        assert_eq!(chain, (1..=1000u64).collect::<Vec<_>>());

        // Depth stays shallow at this order.
        let mut depth = 0;
        let mut node = tree.load_node(tree.root_page_id).unwrap();
        while !node.is_leaf() {
            node = tree.load_node(node.children().unwrap()[0]).unwrap();
            depth += 1;
        }
        assert!((1..=3).contains(&depth), "unexpected depth {depth}");
    }

    #[test]
    fn interleaved_inserts_stay_ordered() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        // Descending then low/high interleave to exercise non-append splits.
        for key in (1..=400u64).rev() {
            tree.insert(key, loc(key)).unwrap();
        }
        for i in 0..400u64 {
            let key = if i % 2 == 0 { 401 + i / 2 } else { 800 - i / 2 };
            tree.insert(key, loc(key)).unwrap();
        }

        let chain = check_invariants(&tree);
        assert_eq!(chain.len(), 800);
        for &key in &chain {
            assert_eq!(tree.search(key).unwrap(), Some(loc(key)));
        }
    }

    #[test]
    fn range_search_inclusive_bounds() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=1000u64 {
            tree.insert(key, loc(key)).unwrap();
        }

        let results = tree.range_search(250, 260).unwrap();
        assert_eq!(results.len(), 11);
        for (i, record) in results.iter().enumerate() {
            assert_eq!(*record, loc(250 + i as u64));
        }
    }

    #[test]
    fn range_search_clips_to_present_keys() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in [10u64, 20, 30, 40, 50] {
            tree.insert(key, loc(key)).unwrap();
        }

        let all = tree.range_search(0, 100).unwrap();
        assert_eq!(all, vec![loc(10), loc(20), loc(30), loc(40), loc(50)]);

        let mid = tree.range_search(15, 40).unwrap();
        assert_eq!(mid, vec![loc(20), loc(30), loc(40)]);

        assert!(tree.range_search(51, 100).unwrap().is_empty());
    }

    #[test]
    fn remove_from_single_leaf() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in [10u64, 20, 30, 40, 50] {
            tree.insert(key, loc(key)).unwrap();
        }

        assert!(tree.remove(30).unwrap());
        assert!(tree.search(30).unwrap().is_none());

        let rest = tree.range_search(0, 100).unwrap();
        assert_eq!(rest, vec![loc(10), loc(20), loc(40), loc(50)]);
    }

    #[test]
    fn remove_missing_key_returns_false() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        assert!(!tree.remove(5).unwrap());

        tree.insert(1, loc(1)).unwrap();
        assert!(!tree.remove(5).unwrap());
        assert!(tree.remove(1).unwrap());
        assert!(!tree.remove(1).unwrap());
    }

    #[test]
    fn remove_every_other_key_from_large_tree() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=500u64 {
            tree.insert(key, loc(key)).unwrap();
        }
        for key in (2..=500u64).step_by(2) {
            assert!(tree.remove(key).unwrap(), "remove {key}");
        }

        for key in 1..=500u64 {
            let found = tree.search(key).unwrap();
            if key % 2 == 0 {
                assert!(found.is_none(), "key {key} should be gone");
            } else {
                assert_eq!(found, Some(loc(key)), "key {key} should remain");
            }
        }

        let chain = check_invariants(&tree);
        assert_eq!(chain, (1..=500u64).step_by(2).collect::<Vec<_>>());
    }

    #[test]
    fn remove_all_keys_collapses_to_empty_leaf_root() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=200u64 {
            tree.insert(key, loc(key)).unwrap();
        }
        for key in 1..=200u64 {
            assert!(tree.remove(key).unwrap(), "remove {key}");
        }

        let root = tree.load_node(tree.root_page_id).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.num_keys, 0);
        assert!(tree.search(100).unwrap().is_none());
    }

    #[test]
    fn freed_merge_pages_are_reused() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        for key in 1..=300u64 {
            tree.insert(key, loc(key)).unwrap();
        }
        let pages_after_insert = engine.total_pages();

        for key in 1..=300u64 {
            tree.remove(key).unwrap();
        }
        // Merging released node pages onto the free list; growing the tree
        // again must not extend the file beyond a fresh root's worth.
        for key in 1..=300u64 {
            tree.insert(key, loc(key)).unwrap();
        }

        assert!(engine.total_pages() <= pages_after_insert + 1);
        check_invariants(&tree);
    }

    #[test]
    fn duplicate_key_keeps_a_matching_record() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);

        tree.insert(7, RecordLocation::new(1, 0, 10)).unwrap();
        tree.insert(7, RecordLocation::new(2, 0, 10)).unwrap();

        let found = tree.search(7).unwrap().unwrap();
        assert!(found.page_id() == 1 || found.page_id() == 2);
    }

    #[test]
    fn load_adopts_existing_root() {
        let (engine, _dir) = temp_engine();
        let mut tree = BTree::new(&engine);
        for key in 1..=100u64 {
            tree.insert(key, loc(key)).unwrap();
        }
        let root = tree.root_page_id();

        let reloaded = BTree::load(&engine, root);
        assert_eq!(reloaded.search(57).unwrap(), Some(loc(57)));
    }
}
