//! B+ tree operations: insert, search, remove, and cost-accounted scans.

use std::collections::HashSet;

use strata_common::{BlockId, RecordHandle, Result, StrataError};
use tracing::{debug, trace};

use super::constants::max_keys_for;
use super::node::{InternalNode, LeafNode, Node};
use super::store::{NodeId, NodeStore};
use super::Key;

/// Cost accounting for a range scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeScanStats {
    /// Internal nodes visited while descending to the first candidate leaf.
    pub internal_nodes_visited: usize,
    /// Leaf nodes that contributed at least one matching key.
    pub leaf_nodes_visited: usize,
    /// Records resolved through their handles.
    pub records_visited: usize,
    /// Distinct storage blocks the resolved handles live in.
    pub distinct_blocks_touched: usize,
    /// Arithmetic mean of the selected field across visited records
    /// (0.0 when nothing matched).
    pub mean_of_field: f64,
}

/// B+ tree secondary index over arena record handles.
///
/// The branching factor is derived from the simulated block capacity at
/// construction and never changes. Leaves hold one insertion-ordered bucket
/// of handles per distinct key and are chained left-to-right; internal nodes
/// route by separator keys that always equal the smallest key of their right
/// subtree.
#[derive(Debug)]
pub struct BPlusTree {
    store: NodeStore,
    root: Option<NodeId>,
    max_keys: usize,
    height: usize,
    node_count: usize,
}

impl BPlusTree {
    /// Creates an index whose nodes fit the given simulated block capacity.
    ///
    /// Fails with [`StrataError::InvalidParameter`] when the capacity cannot
    /// hold even one key/child pair.
    pub fn new(block_capacity: usize) -> Result<Self> {
        let max_keys = max_keys_for(block_capacity);
        if max_keys == 0 {
            return Err(StrataError::InvalidParameter {
                name: "block_capacity".to_string(),
                value: block_capacity.to_string(),
            });
        }
        Ok(Self {
            store: NodeStore::new(),
            root: None,
            max_keys,
            height: 0,
            node_count: 0,
        })
    }

    /// Maximum separator keys per node.
    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Tree height: number of internal levels plus one, 0 when empty.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of distinct keys, counted along the leaf chain.
    pub fn key_count(&self) -> Result<usize> {
        let Some(root) = self.root else { return Ok(0) };
        let mut current = root;
        let mut leaf_id = loop {
            match self.node(current)? {
                Node::Internal(internal) => current = internal.children[0],
                Node::Leaf(_) => break Some(current),
            }
        };
        let mut count = 0;
        while let Some(id) = leaf_id {
            let leaf = self.leaf(id)?;
            count += leaf.keys.len();
            leaf_id = leaf.next_leaf;
        }
        Ok(count)
    }

    fn min_leaf_keys(&self) -> usize {
        (self.max_keys + 1) / 2
    }

    fn min_internal_keys(&self) -> usize {
        (self.max_keys + 2) / 2 - 1
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts a record handle under `key`.
    ///
    /// A key already present grows its bucket without structural change; a
    /// new key goes to its sorted leaf position, splitting the leaf (and
    /// possibly ancestors) when full.
    pub fn insert(&mut self, key: Key, handle: RecordHandle) -> Result<()> {
        let Some(root) = self.root else {
            let leaf = LeafNode {
                keys: vec![key],
                buckets: vec![vec![handle]],
                next_leaf: None,
            };
            let id = self.store.allocate(Node::Leaf(leaf));
            self.root = Some(id);
            self.height = 1;
            self.node_count = 1;
            return Ok(());
        };

        let (leaf_id, path) = self.find_path(root, key)?;
        let max_keys = self.max_keys;
        let leaf = self.leaf_mut(leaf_id)?;

        if let Some(idx) = leaf.position_of(key) {
            // Duplicate key: the bucket grows, the tree shape does not.
            leaf.buckets[idx].push(handle);
            return Ok(());
        }
        if leaf.keys.len() < max_keys {
            let idx = leaf.insertion_point(key);
            leaf.insert_at(idx, key, vec![handle]);
            return Ok(());
        }
        self.split_leaf(leaf_id, key, handle, &path)
    }

    /// Splits a full leaf around a new entry and propagates the split upward.
    fn split_leaf(
        &mut self,
        leaf_id: NodeId,
        key: Key,
        handle: RecordHandle,
        path: &[NodeId],
    ) -> Result<()> {
        let left_keep = (self.max_keys + 1) / 2;
        let (split_key, right) = {
            let leaf = self.leaf_mut(leaf_id)?;
            // Merge existing entries and the new one in order, then cut.
            let idx = leaf.insertion_point(key);
            leaf.insert_at(idx, key, vec![handle]);
            let right_keys = leaf.keys.split_off(left_keep);
            let right_buckets = leaf.buckets.split_off(left_keep);
            let split_key = right_keys[0];
            let right = LeafNode {
                keys: right_keys,
                buckets: right_buckets,
                next_leaf: leaf.next_leaf,
            };
            (split_key, right)
        };
        let right_id = self.store.allocate(Node::Leaf(right));
        self.node_count += 1;
        self.leaf_mut(leaf_id)?.next_leaf = Some(right_id);
        debug!(left = %leaf_id, right = %right_id, split_key, "split leaf");
        self.insert_into_parent(split_key, leaf_id, right_id, path)
    }

    /// Inserts the separator for a freshly split node into its ancestors,
    /// splitting them in turn while they are full.
    fn insert_into_parent(
        &mut self,
        mut sep: Key,
        mut split_left: NodeId,
        mut new_child: NodeId,
        path: &[NodeId],
    ) -> Result<()> {
        let max_keys = self.max_keys;
        let left_keep = (max_keys + 1) / 2;

        for &parent_id in path.iter().rev() {
            let inserted = {
                let parent = self.internal_mut(parent_id)?;
                if parent.keys.len() < max_keys {
                    parent.insert_separator(sep, new_child);
                    true
                } else {
                    false
                }
            };
            if inserted {
                return Ok(());
            }

            // Parent is full: merge into a temporary over-full node, then cut.
            let (right_keys, right_children) = {
                let parent = self.internal_mut(parent_id)?;
                parent.insert_separator(sep, new_child);
                let mut right_keys = parent.keys.split_off(left_keep);
                let right_children = parent.children.split_off(left_keep + 1);
                // The key at the cut is promoted, not copied: its value is
                // recovered as the minimum of the new right subtree.
                right_keys.remove(0);
                (right_keys, right_children)
            };
            let right_id = self.store.allocate(Node::Internal(InternalNode {
                keys: right_keys,
                children: right_children,
            }));
            self.node_count += 1;
            sep = self.smallest_key(right_id)?;
            debug!(left = %parent_id, right = %right_id, sep, "split internal node");
            split_left = parent_id;
            new_child = right_id;
        }

        // The split reached the root: synthesize a new one.
        let root = InternalNode {
            keys: vec![sep],
            children: vec![split_left, new_child],
        };
        let root_id = self.store.allocate(Node::Internal(root));
        self.node_count += 1;
        self.root = Some(root_id);
        self.height += 1;
        debug!(root = %root_id, height = self.height, "grew tree");
        Ok(())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Removes `key` and its entire bucket, rebalancing as needed.
    ///
    /// Returns the number of cascading structural removals (node merges)
    /// the deletion triggered.
    pub fn remove(&mut self, key: Key) -> Result<usize> {
        let root = self.root.ok_or(StrataError::EmptyTree)?;
        let (leaf_id, path) = self.find_path(root, key)?;
        let min_leaf = self.min_leaf_keys();

        let leaf = self.leaf_mut(leaf_id)?;
        let idx = leaf.position_of(key).ok_or(StrataError::KeyNotFound(key))?;
        let was_smallest = idx == 0;
        leaf.remove_at(idx);
        let underfull = leaf.keys.len() < min_leaf;
        debug!(key, leaf = %leaf_id, "removed key bucket");

        let mut cascades = 0;
        if underfull && !path.is_empty() {
            cascades = self.rebalance(leaf_id, &path)?;
            if cascades > 0 {
                self.collapse_root_if_empty()?;
            }
        }
        if was_smallest {
            self.rewrite_separators(key, leaf_id)?;
        }
        Ok(cascades)
    }

    /// Repairs underflow from `current` upward along the recorded ancestor
    /// path: borrow from a richer sibling when possible, otherwise merge and
    /// cascade the separator removal one level up.
    fn rebalance(&mut self, mut current: NodeId, path: &[NodeId]) -> Result<usize> {
        let mut cascades = 0;
        let mut level = path.len();

        while level > 0 {
            let (is_leaf, key_count) = {
                let node = self.node(current)?;
                (node.is_leaf(), node.key_count())
            };
            let min = if is_leaf {
                self.min_leaf_keys()
            } else {
                self.min_internal_keys()
            };
            if key_count >= min {
                break;
            }

            let parent_id = path[level - 1];
            let (pos, left, right) = {
                let parent = self.internal(parent_id)?;
                let pos = parent.position_of(current).ok_or_else(|| {
                    StrataError::Corrupted(format!("node {current} not under its parent"))
                })?;
                let left = (pos > 0).then(|| parent.children[pos - 1]);
                let right = (pos + 1 < parent.children.len()).then(|| parent.children[pos + 1]);
                (pos, left, right)
            };

            if let Some(left_id) = left {
                if self.node(left_id)?.key_count() > min {
                    self.borrow_from_left(parent_id, pos, left_id, current)?;
                    break;
                }
            }
            if let Some(right_id) = right {
                if self.node(right_id)?.key_count() > min {
                    self.borrow_from_right(parent_id, pos, current, right_id)?;
                    break;
                }
            }

            if let Some(left_id) = left {
                self.merge_into_left(parent_id, pos, left_id, current)?;
            } else if let Some(right_id) = right {
                self.absorb_right(parent_id, pos, current, right_id)?;
            } else {
                return Err(StrataError::Corrupted(format!(
                    "underfull node {current} has no siblings"
                )));
            }
            cascades += 1;
            current = parent_id;
            level -= 1;
        }
        Ok(cascades)
    }

    /// Rotates the left sibling's last key/child into the front of the
    /// underfull node and refreshes the separator between them.
    fn borrow_from_left(
        &mut self,
        parent_id: NodeId,
        pos: usize,
        left_id: NodeId,
        node_id: NodeId,
    ) -> Result<()> {
        let sep_idx = pos - 1;
        let old_sep = self.internal(parent_id)?.keys[sep_idx];
        let mut node = self.take_node(node_id)?;
        let new_sep = match (self.node_mut(left_id)?, &mut node) {
            (Node::Leaf(left), Node::Leaf(n)) => {
                let key = left
                    .keys
                    .pop()
                    .ok_or_else(|| StrataError::Corrupted("borrow from empty leaf".into()))?;
                let bucket = left
                    .buckets
                    .pop()
                    .ok_or_else(|| StrataError::Corrupted("leaf bucket missing".into()))?;
                n.insert_at(0, key, bucket);
                key
            }
            (Node::Internal(left), Node::Internal(n)) => {
                // The parent separator moves down, the sibling's last key up.
                let child = left
                    .children
                    .pop()
                    .ok_or_else(|| StrataError::Corrupted("borrow from childless node".into()))?;
                let key = left
                    .keys
                    .pop()
                    .ok_or_else(|| StrataError::Corrupted("borrow from empty node".into()))?;
                n.keys.insert(0, old_sep);
                n.children.insert(0, child);
                key
            }
            _ => return Err(StrataError::Corrupted("sibling variant mismatch".into())),
        };
        self.store.put(node_id, node);
        self.internal_mut(parent_id)?.keys[sep_idx] = new_sep;
        trace!(node = %node_id, from = %left_id, "borrowed from left sibling");
        Ok(())
    }

    /// Mirror of [`Self::borrow_from_left`] using the right sibling's first
    /// key/child.
    fn borrow_from_right(
        &mut self,
        parent_id: NodeId,
        pos: usize,
        node_id: NodeId,
        right_id: NodeId,
    ) -> Result<()> {
        let sep_idx = pos;
        let old_sep = self.internal(parent_id)?.keys[sep_idx];
        let mut node = self.take_node(node_id)?;
        let new_sep = match (self.node_mut(right_id)?, &mut node) {
            (Node::Leaf(right), Node::Leaf(n)) => {
                let (key, bucket) = right.remove_at(0);
                n.keys.push(key);
                n.buckets.push(bucket);
                *right
                    .keys
                    .first()
                    .ok_or_else(|| StrataError::Corrupted("emptied sibling leaf".into()))?
            }
            (Node::Internal(right), Node::Internal(n)) => {
                let child = right.children.remove(0);
                let key = right.keys.remove(0);
                n.keys.push(old_sep);
                n.children.push(child);
                key
            }
            _ => return Err(StrataError::Corrupted("sibling variant mismatch".into())),
        };
        self.store.put(node_id, node);
        self.internal_mut(parent_id)?.keys[sep_idx] = new_sep;
        trace!(node = %node_id, from = %right_id, "borrowed from right sibling");
        Ok(())
    }

    /// Absorbs the underfull node into its left sibling, re-threading the
    /// leaf chain, and removes its separator/pointer from the parent. The
    /// intervening separator is folded in for internal merges only.
    fn merge_into_left(
        &mut self,
        parent_id: NodeId,
        pos: usize,
        left_id: NodeId,
        node_id: NodeId,
    ) -> Result<()> {
        let sep_idx = pos - 1;
        let old_sep = self.internal(parent_id)?.keys[sep_idx];
        let node = self
            .store
            .release(node_id)
            .ok_or_else(|| StrataError::Corrupted(format!("missing node {node_id}")))?;
        match (self.node_mut(left_id)?, node) {
            (Node::Leaf(left), Node::Leaf(n)) => {
                left.keys.extend(n.keys);
                left.buckets.extend(n.buckets);
                left.next_leaf = n.next_leaf;
            }
            (Node::Internal(left), Node::Internal(n)) => {
                left.keys.push(old_sep);
                left.keys.extend(n.keys);
                left.children.extend(n.children);
            }
            _ => return Err(StrataError::Corrupted("sibling variant mismatch".into())),
        }
        let parent = self.internal_mut(parent_id)?;
        parent.keys.remove(sep_idx);
        parent.children.remove(pos);
        self.node_count -= 1;
        debug!(merged = %node_id, into = %left_id, "merged into left sibling");
        Ok(())
    }

    /// No left sibling: the underfull node absorbs its right sibling instead,
    /// so the surviving node keeps its place in the leaf chain.
    fn absorb_right(
        &mut self,
        parent_id: NodeId,
        pos: usize,
        node_id: NodeId,
        right_id: NodeId,
    ) -> Result<()> {
        let sep_idx = pos;
        let old_sep = self.internal(parent_id)?.keys[sep_idx];
        let right = self
            .store
            .release(right_id)
            .ok_or_else(|| StrataError::Corrupted(format!("missing node {right_id}")))?;
        match (self.node_mut(node_id)?, right) {
            (Node::Leaf(n), Node::Leaf(r)) => {
                n.keys.extend(r.keys);
                n.buckets.extend(r.buckets);
                n.next_leaf = r.next_leaf;
            }
            (Node::Internal(n), Node::Internal(r)) => {
                n.keys.push(old_sep);
                n.keys.extend(r.keys);
                n.children.extend(r.children);
            }
            _ => return Err(StrataError::Corrupted("sibling variant mismatch".into())),
        }
        let parent = self.internal_mut(parent_id)?;
        parent.keys.remove(sep_idx);
        parent.children.remove(pos + 1);
        self.node_count -= 1;
        debug!(merged = %right_id, into = %node_id, "absorbed right sibling");
        Ok(())
    }

    /// Replaces an internal root left with no separators by its only child.
    fn collapse_root_if_empty(&mut self) -> Result<()> {
        let Some(root_id) = self.root else {
            return Ok(());
        };
        let child = match self.node(root_id)? {
            Node::Internal(internal) if internal.keys.is_empty() => internal.children[0],
            _ => return Ok(()),
        };
        self.store.release(root_id);
        self.root = Some(child);
        self.height -= 1;
        self.node_count -= 1;
        debug!(new_root = %child, height = self.height, "collapsed empty root");
        Ok(())
    }

    /// Rewrites ancestor separators equal to the removed key with the owning
    /// leaf's new smallest key, in one top-down sweep from the root.
    fn rewrite_separators(&mut self, removed: Key, leaf_id: NodeId) -> Result<()> {
        let replacement = match self.store.get(leaf_id) {
            Some(Node::Leaf(leaf)) => match leaf.keys.first() {
                Some(&k) => k,
                None => return Ok(()),
            },
            // The leaf was merged away; the cascade already removed the
            // separator that referenced it.
            _ => return Ok(()),
        };
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut current = root;
        loop {
            let next = match self.node_mut(current)? {
                Node::Internal(internal) => {
                    for k in internal.keys.iter_mut() {
                        if *k == removed {
                            *k = replacement;
                        }
                    }
                    internal.children[internal.child_index(removed)]
                }
                Node::Leaf(_) => return Ok(()),
            };
            current = next;
        }
    }

    // =========================================================================
    // Lookup & range scan
    // =========================================================================

    /// Returns the bucket of handles stored under `key`.
    pub fn search(&self, key: Key) -> Result<&[RecordHandle]> {
        let root = self.root.ok_or(StrataError::EmptyTree)?;
        let leaf_id = self.find_leaf(root, key)?;
        let leaf = self.leaf(leaf_id)?;
        match leaf.position_of(key) {
            Some(idx) => Ok(&leaf.buckets[idx]),
            None => Err(StrataError::KeyNotFound(key)),
        }
    }

    /// Returns every `(key, handle)` pair with key in `[low, high]`, in
    /// increasing key order, duplicates expanded in bucket order.
    pub fn range_entries(&self, low: Key, high: Key) -> Result<Vec<(Key, RecordHandle)>> {
        let root = self.root.ok_or(StrataError::EmptyTree)?;
        let mut entries = Vec::new();
        let mut next = Some(self.find_leaf(root, low)?);
        'chain: while let Some(leaf_id) = next {
            let leaf = self.leaf(leaf_id)?;
            for (idx, &key) in leaf.keys.iter().enumerate() {
                if key > high {
                    break 'chain;
                }
                if key < low {
                    continue;
                }
                for &handle in &leaf.buckets[idx] {
                    entries.push((key, handle));
                }
            }
            next = leaf.next_leaf;
        }
        Ok(entries)
    }

    /// Scans `[low, high]` while accounting for the simulated I/O performed.
    ///
    /// The descent happens once; the rest of the scan walks the leaf chain.
    /// `selector` resolves the designated non-key numeric field of a record
    /// against the arena via its handle; its values are averaged over all
    /// matching records. A single lookup is the `low == high` degenerate
    /// case.
    pub fn range_scan<F>(&self, low: Key, high: Key, mut selector: F) -> Result<RangeScanStats>
    where
        F: FnMut(RecordHandle) -> f64,
    {
        let root = self.root.ok_or(StrataError::EmptyTree)?;

        let mut internal_nodes = 0;
        let mut current = root;
        let first_leaf = loop {
            match self.node(current)? {
                Node::Internal(internal) => {
                    internal_nodes += 1;
                    current = internal.children[internal.child_index(low)];
                }
                Node::Leaf(_) => break current,
            }
        };

        let mut leaf_nodes = 0;
        let mut records = 0;
        let mut sum = 0.0;
        let mut blocks: HashSet<BlockId> = HashSet::new();
        let mut next = Some(first_leaf);
        'chain: while let Some(leaf_id) = next {
            let leaf = self.leaf(leaf_id)?;
            let mut touched = false;
            for (idx, &key) in leaf.keys.iter().enumerate() {
                if key > high {
                    break 'chain;
                }
                if key < low {
                    continue;
                }
                if !touched {
                    leaf_nodes += 1;
                    touched = true;
                }
                for &handle in &leaf.buckets[idx] {
                    records += 1;
                    blocks.insert(handle.block);
                    sum += selector(handle);
                }
            }
            next = leaf.next_leaf;
        }

        let mean = if records == 0 { 0.0 } else { sum / records as f64 };
        Ok(RangeScanStats {
            internal_nodes_visited: internal_nodes,
            leaf_nodes_visited: leaf_nodes,
            records_visited: records,
            distinct_blocks_touched: blocks.len(),
            mean_of_field: mean,
        })
    }

    // =========================================================================
    // Node access helpers
    // =========================================================================

    /// Walks from `root` to the leaf that owns `key` (ties routed right),
    /// recording the internal nodes along the way for later rebalancing.
    fn find_path(&self, root: NodeId, key: Key) -> Result<(NodeId, Vec<NodeId>)> {
        let mut path = Vec::new();
        let mut current = root;
        loop {
            match self.node(current)? {
                Node::Internal(internal) => {
                    path.push(current);
                    current = internal.children[internal.child_index(key)];
                }
                Node::Leaf(_) => return Ok((current, path)),
            }
        }
    }

    /// Walks from `root` to the leaf that owns `key` without recording the
    /// path.
    fn find_leaf(&self, root: NodeId, key: Key) -> Result<NodeId> {
        let mut current = root;
        loop {
            match self.node(current)? {
                Node::Internal(internal) => current = internal.children[internal.child_index(key)],
                Node::Leaf(_) => return Ok(current),
            }
        }
    }

    /// Smallest key reachable under `start`, found by walking leftmost
    /// children down to a leaf.
    fn smallest_key(&self, start: NodeId) -> Result<Key> {
        let mut current = start;
        loop {
            match self.node(current)? {
                Node::Internal(internal) => current = internal.children[0],
                Node::Leaf(leaf) => {
                    return leaf.keys.first().copied().ok_or_else(|| {
                        StrataError::Corrupted("empty leaf under internal node".into())
                    });
                }
            }
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.store
            .get(id)
            .ok_or_else(|| StrataError::Corrupted(format!("missing node {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.store
            .get_mut(id)
            .ok_or_else(|| StrataError::Corrupted(format!("missing node {id}")))
    }

    fn take_node(&mut self, id: NodeId) -> Result<Node> {
        self.store
            .take(id)
            .ok_or_else(|| StrataError::Corrupted(format!("missing node {id}")))
    }

    fn leaf(&self, id: NodeId) -> Result<&LeafNode> {
        match self.node(id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(StrataError::Corrupted(format!("expected leaf at {id}"))),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> Result<&mut LeafNode> {
        match self.node_mut(id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(StrataError::Corrupted(format!("expected leaf at {id}"))),
        }
    }

    fn internal(&self, id: NodeId) -> Result<&InternalNode> {
        match self.node(id)? {
            Node::Internal(internal) => Ok(internal),
            Node::Leaf(_) => Err(StrataError::Corrupted(format!("expected internal at {id}"))),
        }
    }

    fn internal_mut(&mut self, id: NodeId) -> Result<&mut InternalNode> {
        match self.node_mut(id)? {
            Node::Internal(internal) => Ok(internal),
            Node::Leaf(_) => Err(StrataError::Corrupted(format!("expected internal at {id}"))),
        }
    }
}

#[cfg(test)]
impl BPlusTree {
    /// Walks the whole tree asserting the four structural invariants.
    fn check_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.height, 0);
            assert_eq!(self.node_count, 0);
            return;
        };

        let mut leaf_depth = None;
        let mut node_total = 0;
        let mut tree_keys = Vec::new();
        self.check_node(root, root, 0, &mut leaf_depth, &mut node_total, &mut tree_keys);

        assert_eq!(node_total, self.node_count, "node counter drifted");
        assert_eq!(
            self.height,
            leaf_depth.expect("tree without leaves") + 1,
            "height counter drifted"
        );

        // The leaf chain covers every key in strictly increasing order.
        let mut chain_keys = Vec::new();
        let mut current = root;
        let mut leaf_id = loop {
            match self.store.get(current).expect("dangling node id") {
                Node::Internal(internal) => current = internal.children[0],
                Node::Leaf(_) => break Some(current),
            }
        };
        while let Some(id) = leaf_id {
            match self.store.get(id).expect("dangling leaf id") {
                Node::Leaf(leaf) => {
                    chain_keys.extend_from_slice(&leaf.keys);
                    leaf_id = leaf.next_leaf;
                }
                Node::Internal(_) => panic!("internal node on leaf chain"),
            }
        }
        assert!(
            chain_keys.windows(2).all(|w| w[0] < w[1]),
            "leaf chain out of order: {chain_keys:?}"
        );
        assert_eq!(chain_keys, tree_keys, "leaf chain misses keys");
    }

    fn check_node(
        &self,
        id: NodeId,
        root: NodeId,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        node_total: &mut usize,
        tree_keys: &mut Vec<Key>,
    ) {
        *node_total += 1;
        match self.store.get(id).expect("dangling node id") {
            Node::Internal(internal) => {
                assert_eq!(internal.children.len(), internal.keys.len() + 1);
                assert!(internal.keys.windows(2).all(|w| w[0] < w[1]));
                assert!(internal.keys.len() <= self.max_keys);
                if id != root {
                    assert!(
                        internal.keys.len() >= self.min_internal_keys(),
                        "internal node {id} under-full"
                    );
                }
                for (i, &child) in internal.children.iter().enumerate() {
                    if i > 0 {
                        assert_eq!(
                            internal.keys[i - 1],
                            self.smallest_key(child).unwrap(),
                            "separator is not the minimum of its right subtree"
                        );
                    }
                    self.check_node(child, root, depth + 1, leaf_depth, node_total, tree_keys);
                }
            }
            Node::Leaf(leaf) => {
                assert_eq!(leaf.keys.len(), leaf.buckets.len());
                assert!(leaf.keys.windows(2).all(|w| w[0] < w[1]));
                assert!(leaf.keys.len() <= self.max_keys);
                if id != root {
                    assert!(
                        leaf.keys.len() >= self.min_leaf_keys(),
                        "leaf {id} under-full: {} < {}",
                        leaf.keys.len(),
                        self.min_leaf_keys()
                    );
                }
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(d) => assert_eq!(d, depth, "leaves at different depths"),
                }
                tree_keys.extend_from_slice(&leaf.keys);
            }
        }
    }
}
