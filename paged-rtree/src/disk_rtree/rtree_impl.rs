//! DiskRTree implementation.
//!
//! The engine works on the node arena: descents materialize pages on
//! demand, mutations only touch loaded nodes and mark them dirty, and
//! nothing reaches the file until [`DiskRTree::save`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::bounding_box::BoundingBox;

use super::rtree_node::{decode_page, ChildRef, Entry, Node, NodeArena, NodeKind, Slot};
use super::rtree_split::quadratic_split;
use super::rtree_storage::Storage;
use super::rtree_types::{
    NodeId, PageId, RTreeStats, RowId, SpatialError, SpatialResult, TreeState,
};

/// A persistent, paged R-Tree over one backing file.
///
/// Mutations take `&mut self` and queries borrow the tree mutably, since
/// reading a node materializes it in the arena.
///
/// # Example
/// ```no_run
/// use paged_rtree::{BoundingBox, DiskRTree, IndexConfig};
///
/// let mut tree = DiskRTree::create("points.rtree", IndexConfig::default())?;
/// tree.insert(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1)?;
/// tree.insert(&BoundingBox::new(5.0, 5.0, 6.0, 6.0), 2)?;
///
/// let hits = tree.query_vec(&BoundingBox::new(0.0, 0.0, 2.0, 2.0))?;
/// assert_eq!(hits, vec![1]);
/// tree.close()?;
/// # Ok::<(), paged_rtree::SpatialError>(())
/// ```
pub struct DiskRTree {
    pub(super) storage: Option<Storage>,
    pub(super) arena: NodeArena,
    pub(super) root: NodeId,
    pub(super) branching_factor: usize,
    pub(super) min_entries: usize,
    pub(super) size: u64,
    pub(super) height: u32,
    pub(super) state: TreeState,
    /// Pages superseded since the last commit, freed once the header no
    /// longer references them
    pub(super) retired_pages: Vec<PageId>,
}

impl std::fmt::Debug for DiskRTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskRTree")
            .field("branching_factor", &self.branching_factor)
            .field("size", &self.size)
            .field("height", &self.height)
            .field("state", &self.state)
            .finish()
    }
}

impl DiskRTree {
    pub(super) fn from_parts(
        storage: Storage,
        root: Slot,
        branching_factor: usize,
        size: u64,
        height: u32,
    ) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(root);
        Self {
            storage: Some(storage),
            arena,
            root,
            branching_factor,
            min_entries: branching_factor.div_ceil(2),
            size,
            height,
            state: TreeState::Open,
            retired_pages: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of live entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Levels from the root to the leaves; a lone leaf root has height 1
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    pub fn state(&self) -> TreeState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == TreeState::Closed
    }

    /// Get comprehensive statistics
    pub fn stats(&self) -> RTreeStats {
        let mut stats = RTreeStats {
            total_entries: self.size,
            tree_height: self.height,
            loaded_nodes: self.arena.loaded_count() as u64,
            ..RTreeStats::default()
        };
        if let Some(storage) = &self.storage {
            stats.page_count = storage.page_count();
            stats.free_pages = storage.free_page_count();
            stats.disk_reads = storage.disk_reads();
            stats.disk_writes = storage.disk_writes();
        }
        stats
    }

    pub(super) fn check_open(&self) -> SpatialResult<()> {
        match self.state {
            TreeState::Open => Ok(()),
            TreeState::Poisoned => Err(SpatialError::Poisoned),
            TreeState::Closed => Err(SpatialError::Closed),
        }
    }

    /// Runs a mutation whose failure would leave the arena half edited.
    fn poison_on_error<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> SpatialResult<T>,
    ) -> SpatialResult<T> {
        let result = op(self);
        if let Err(err) = &result {
            log::error!("Mutation failed part way, tree is poisoned: {}", err);
            self.state = TreeState::Poisoned;
        }
        result
    }

    // ========================================================================
    // Node loading
    // ========================================================================

    /// Materialize a node from its page. No-op for loaded nodes.
    pub(super) fn ensure_loaded(&mut self, id: NodeId) -> SpatialResult<()> {
        let (page, parent) = match self.arena.slot(id) {
            Some(Slot::Loaded(_)) => return Ok(()),
            Some(Slot::Unloaded { page, parent }) => (*page, *parent),
            _ => {
                return Err(SpatialError::InvalidOperation(format!(
                    "Node {} does not exist",
                    id
                )))
            }
        };

        let storage = self.storage.as_mut().ok_or(SpatialError::Closed)?;
        let image = decode_page(&storage.read(page)?)?;
        if image.records.len() > self.branching_factor {
            return Err(SpatialError::CorruptIndex(format!(
                "Page {} holds {} records, branching factor is {}",
                page,
                image.records.len(),
                self.branching_factor
            )));
        }

        let kind = if image.leaf {
            NodeKind::Leaf(
                image
                    .records
                    .into_iter()
                    .map(|(bbox, row_id)| Entry { bbox, row_id })
                    .collect(),
            )
        } else {
            let mut children = Vec::with_capacity(image.records.len());
            for (bbox, child_page) in image.records {
                let node = self.arena.insert(Slot::Unloaded {
                    page: child_page,
                    parent: Some(id),
                });
                children.push(ChildRef { bbox, node });
            }
            NodeKind::Internal(children)
        };

        self.arena.fill(id, Node::loaded(kind, page, parent));
        Ok(())
    }

    /// Load `id` and everything below it
    pub(super) fn load_subtree(&mut self, id: NodeId) -> SpatialResult<()> {
        self.ensure_loaded(id)?;
        let children: Vec<NodeId> = self.arena.get(id)?.children().iter().map(|c| c.node).collect();
        for child in children {
            self.load_subtree(child)?;
        }
        Ok(())
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Add an entry. Duplicate row ids are allowed.
    pub fn insert(&mut self, bbox: &BoundingBox, row_id: RowId) -> SpatialResult<()> {
        self.check_open()?;
        validate_box(bbox)?;

        // every page read happens here, before the first mutation
        let leaf = self.choose_leaf(bbox)?;
        self.poison_on_error(|tree| {
            tree.insert_at_leaf(leaf, Entry { bbox: *bbox, row_id })?;
            tree.size += 1;
            Ok(())
        })
    }

    /// Descend by least enlargement, then smaller area, then lower index
    fn choose_leaf(&mut self, bbox: &BoundingBox) -> SpatialResult<NodeId> {
        let mut current = self.root;
        loop {
            self.ensure_loaded(current)?;
            let node = self.arena.get(current)?;
            let children = match node.kind() {
                NodeKind::Leaf(_) => return Ok(current),
                NodeKind::Internal(children) => children,
            };
            if children.is_empty() {
                return Err(SpatialError::CorruptIndex(format!(
                    "Internal node {} has no children",
                    current
                )));
            }

            let mut best = 0;
            let mut best_enlargement = f64::INFINITY;
            let mut best_area = f64::INFINITY;
            for (i, child) in children.iter().enumerate() {
                let enlargement = child.bbox.enlargement(bbox);
                let area = child.bbox.union(bbox).area();
                if enlargement < best_enlargement
                    || (enlargement == best_enlargement && area < best_area)
                {
                    best = i;
                    best_enlargement = enlargement;
                    best_area = area;
                }
            }
            current = children[best].node;
        }
    }

    fn insert_at_leaf(&mut self, leaf: NodeId, entry: Entry) -> SpatialResult<()> {
        self.arena.get_mut(leaf)?.add_entry(entry)?;
        self.adjust_tree(leaf)
    }

    /// Split overflowing nodes bottom-up, then refresh ancestor boxes
    fn adjust_tree(&mut self, start: NodeId) -> SpatialResult<()> {
        let mut current = start;
        while self.arena.get(current)?.len() > self.branching_factor {
            let sibling = self.split_node(current)?;
            let Some(parent) = self.arena.get(current)?.parent else {
                return self.grow_root(current, sibling);
            };

            let current_box = self.arena.get(current)?.bounding_box();
            let sibling_box = self.arena.get(sibling)?.bounding_box();
            let parent_node = self.arena.get_mut(parent)?;
            let index = parent_node
                .child_index(current)
                .ok_or_else(|| broken_link(parent, current))?;
            parent_node.set_child_bbox(index, current_box);
            parent_node.add_child(ChildRef {
                bbox: sibling_box,
                node: sibling,
            })?;
            current = parent;
        }
        self.refresh_ancestors(current)
    }

    /// Moves half of an overflowing node into a new sibling. The original
    /// keeps its slot and page.
    fn split_node(&mut self, id: NodeId) -> SpatialResult<NodeId> {
        let min_entries = self.min_entries;
        let node = self.arena.get_mut(id)?;
        let parent = node.parent;
        let (kept, moved) = match node.replace_kind(NodeKind::Leaf(Vec::new())) {
            NodeKind::Leaf(entries) => {
                let (a, b) = quadratic_split(entries, min_entries);
                (NodeKind::Leaf(a), NodeKind::Leaf(b))
            }
            NodeKind::Internal(children) => {
                let (a, b) = quadratic_split(children, min_entries);
                (NodeKind::Internal(a), NodeKind::Internal(b))
            }
        };
        node.replace_kind(kept);

        let sibling = self.arena.insert(Slot::Loaded(Node::new(moved, parent)));
        let moved_children: Vec<NodeId> =
            self.arena.get(sibling)?.children().iter().map(|c| c.node).collect();
        for child in moved_children {
            self.arena.set_parent(child, Some(sibling));
        }

        log::debug!(
            "Split node {} into {} + {} items",
            id,
            self.arena.get(id)?.len(),
            self.arena.get(sibling)?.len()
        );
        Ok(sibling)
    }

    fn grow_root(&mut self, old_root: NodeId, sibling: NodeId) -> SpatialResult<()> {
        let children = vec![
            ChildRef {
                bbox: self.arena.get(old_root)?.bounding_box(),
                node: old_root,
            },
            ChildRef {
                bbox: self.arena.get(sibling)?.bounding_box(),
                node: sibling,
            },
        ];
        let new_root = self
            .arena
            .insert(Slot::Loaded(Node::new(NodeKind::Internal(children), None)));
        self.arena.set_parent(old_root, Some(new_root));
        self.arena.set_parent(sibling, Some(new_root));
        self.root = new_root;
        self.height += 1;
        log::debug!("Root split, tree height is now {}", self.height);
        Ok(())
    }

    /// Rewrite the stored box of `id` in its parent, and so on upwards
    /// while something changes.
    fn refresh_ancestors(&mut self, id: NodeId) -> SpatialResult<()> {
        let mut current = id;
        while let Some(parent) = self.arena.get(current)?.parent {
            let bbox = self.arena.get(current)?.bounding_box();
            let parent_node = self.arena.get_mut(parent)?;
            let index = parent_node
                .child_index(current)
                .ok_or_else(|| broken_link(parent, current))?;
            if !parent_node.set_child_bbox(index, bbox) {
                break;
            }
            current = parent;
        }
        Ok(())
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove the entry with exactly this box and row id.
    ///
    /// Returns `false` when no such entry exists.
    pub fn delete(&mut self, bbox: &BoundingBox, row_id: RowId) -> SpatialResult<bool> {
        self.check_open()?;
        validate_box(bbox)?;

        let Some((leaf, index)) = self.find_entry(self.root, bbox, row_id)? else {
            return Ok(false);
        };
        if self.size == 0 {
            return Err(SpatialError::CorruptIndex(format!(
                "Found row {} in a tree whose entry count is zero",
                row_id
            )));
        }

        // subtrees dissolved by the condense step are read up front
        for doomed in self.plan_condense(leaf)? {
            self.load_subtree(doomed)?;
        }

        self.poison_on_error(|tree| tree.remove_and_condense(leaf, index))?;
        Ok(true)
    }

    fn find_entry(
        &mut self,
        id: NodeId,
        bbox: &BoundingBox,
        row_id: RowId,
    ) -> SpatialResult<Option<(NodeId, usize)>> {
        self.ensure_loaded(id)?;
        let candidates: Vec<NodeId> = match self.arena.get(id)?.kind() {
            NodeKind::Leaf(entries) => {
                let found = entries
                    .iter()
                    .position(|e| e.row_id == row_id && e.bbox == *bbox);
                return Ok(found.map(|index| (id, index)));
            }
            NodeKind::Internal(children) => children
                .iter()
                .filter(|c| c.bbox.intersects(bbox))
                .map(|c| c.node)
                .collect(),
        };

        for child in candidates {
            if let Some(found) = self.find_entry(child, bbox, row_id)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Nodes on the leaf-to-root path that will underflow once one entry
    /// leaves `leaf`
    fn plan_condense(&self, leaf: NodeId) -> SpatialResult<Vec<NodeId>> {
        let mut doomed = Vec::new();
        let mut current = leaf;
        let mut remaining = self.arena.get(leaf)?.len().saturating_sub(1);
        while let Some(parent) = self.arena.get(current)?.parent {
            let parent_len = self.arena.get(parent)?.len();
            if remaining < self.min_entries {
                doomed.push(current);
                remaining = parent_len - 1;
            } else {
                remaining = parent_len;
            }
            current = parent;
        }
        Ok(doomed)
    }

    fn remove_and_condense(&mut self, leaf: NodeId, index: usize) -> SpatialResult<()> {
        self.arena
            .get_mut(leaf)?
            .remove_entry(index)
            .ok_or_else(|| SpatialError::InvalidOperation(format!(
                "Leaf {} has no entry at {}",
                leaf, index
            )))?;
        self.size = self
            .size
            .checked_sub(1)
            .ok_or_else(|| SpatialError::CorruptIndex("Entry count underflow".into()))?;

        let mut orphans = Vec::new();
        let mut dissolved = 0;
        let mut current = leaf;
        while let Some(parent) = self.arena.get(current)?.parent {
            let len = self.arena.get(current)?.len();
            let bbox = self.arena.get(current)?.bounding_box();
            let parent_node = self.arena.get_mut(parent)?;
            let index = parent_node
                .child_index(current)
                .ok_or_else(|| broken_link(parent, current))?;

            if len < self.min_entries {
                parent_node.remove_child(index);
                self.dissolve(current, &mut orphans)?;
                dissolved += 1;
            } else {
                parent_node.set_child_bbox(index, bbox);
            }
            current = parent;
        }

        self.shrink_root()?;

        if dissolved > 0 {
            log::debug!(
                "Condensed {} nodes, reinserting {} entries",
                dissolved,
                orphans.len()
            );
        }
        for entry in orphans {
            let leaf = self.choose_leaf(&entry.bbox)?;
            self.insert_at_leaf(leaf, entry)?;
        }
        Ok(())
    }

    /// Drop a subtree from the arena, keeping its leaf entries and retiring
    /// its pages
    fn dissolve(&mut self, id: NodeId, orphans: &mut Vec<Entry>) -> SpatialResult<()> {
        self.ensure_loaded(id)?;
        let Slot::Loaded(node) = self.arena.remove(id) else {
            return Err(SpatialError::InvalidOperation(format!(
                "Node {} vanished while dissolving",
                id
            )));
        };
        if let Some(page) = node.page {
            self.retired_pages.push(page);
        }
        match node.into_kind() {
            NodeKind::Leaf(entries) => orphans.extend(entries),
            NodeKind::Internal(children) => {
                for child in children {
                    self.dissolve(child.node, orphans)?;
                }
            }
        }
        Ok(())
    }

    /// Collapse single-child internal roots; an emptied internal root
    /// becomes an empty leaf
    fn shrink_root(&mut self) -> SpatialResult<()> {
        // an unloaded root was a valid non-root node, so it needs no collapse
        while self.arena.is_loaded(self.root) {
            let only_child = match self.arena.get(self.root)?.kind() {
                NodeKind::Internal(children) if children.len() == 1 => Some(children[0].node),
                NodeKind::Internal(children) if children.is_empty() => None,
                _ => break,
            };
            let Some(only_child) = only_child else {
                self.arena
                    .get_mut(self.root)?
                    .replace_kind(NodeKind::Leaf(Vec::new()));
                self.height = 1;
                log::debug!("Root emptied, reset to a leaf");
                break;
            };

            let height = self.height.checked_sub(1).filter(|h| *h > 0).ok_or_else(|| {
                SpatialError::CorruptIndex(format!(
                    "Internal root at recorded height {}",
                    self.height
                ))
            })?;
            if let Slot::Loaded(old_root) = self.arena.remove(self.root) {
                if let Some(page) = old_root.page {
                    self.retired_pages.push(page);
                }
            }
            self.arena.set_parent(only_child, None);
            self.root = only_child;
            self.height = height;
            log::debug!("Root collapsed, tree height is now {}", self.height);
        }
        Ok(())
    }

    /// Remove every entry. Every page of the old tree is released at the
    /// next save.
    pub fn clear(&mut self) -> SpatialResult<()> {
        self.check_open()?;
        self.load_subtree(self.root)?;

        self.poison_on_error(|tree| {
            let mut discarded = Vec::new();
            tree.dissolve(tree.root, &mut discarded)?;
            tree.root = tree
                .arena
                .insert(Slot::Loaded(Node::new(NodeKind::Leaf(Vec::new()), None)));
            tree.size = 0;
            tree.height = 1;
            log::debug!("Cleared {} entries", discarded.len());
            Ok(())
        })
    }

    // ========================================================================
    // Searches
    // ========================================================================

    /// Every `(box, row id)` pair in the tree. Loads the whole tree.
    pub fn entries(&mut self) -> SpatialResult<Vec<(BoundingBox, RowId)>> {
        self.check_open()?;
        let mut result = Vec::with_capacity(self.size as usize);
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            self.ensure_loaded(id)?;
            match self.arena.get(id)?.kind() {
                NodeKind::Leaf(entries) => {
                    result.extend(entries.iter().map(|e| (e.bbox, e.row_id)))
                }
                NodeKind::Internal(children) => stack.extend(children.iter().map(|c| c.node)),
            }
        }
        Ok(result)
    }

    /// Find the `k` entries closest to a point, nearest first.
    ///
    /// Distance is measured from the point to the closest point of each
    /// entry box. Entries farther than `max_distance` are skipped. Nodes are
    /// expanded best-first, so only pages that may hold a closer entry than
    /// the current k-th are read.
    pub fn nearest(
        &mut self,
        x: f64,
        y: f64,
        k: usize,
        max_distance: Option<f64>,
    ) -> SpatialResult<Vec<(RowId, f64)>> {
        self.check_open()?;
        if k == 0 || x.is_nan() || y.is_nan() {
            return Ok(Vec::new());
        }
        let limit = max_distance.unwrap_or(f64::INFINITY);

        let mut results = Vec::with_capacity(k.min(self.size as usize));
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;
        heap.push(Candidate {
            distance: 0.0,
            seq,
            target: Target::Node(self.root),
        });

        while let Some(candidate) = heap.pop() {
            match candidate.target {
                Target::Entry(row_id) => {
                    results.push((row_id, candidate.distance));
                    if results.len() == k {
                        break;
                    }
                }
                Target::Node(id) => {
                    self.ensure_loaded(id)?;
                    let node = self.arena.get(id)?;
                    let items: Vec<(BoundingBox, Target)> = match node.kind() {
                        NodeKind::Leaf(entries) => entries
                            .iter()
                            .map(|e| (e.bbox, Target::Entry(e.row_id)))
                            .collect(),
                        NodeKind::Internal(children) => children
                            .iter()
                            .map(|c| (c.bbox, Target::Node(c.node)))
                            .collect(),
                    };
                    for (bbox, target) in items {
                        let distance = bbox.distance_to_point(x, y);
                        if distance <= limit {
                            seq += 1;
                            heap.push(Candidate {
                                distance,
                                seq,
                                target,
                            });
                        }
                    }
                }
            }
        }
        Ok(results)
    }

    // ========================================================================
    // Structural check
    // ========================================================================

    /// Verify every structural invariant of the whole tree.
    ///
    /// Loads every node. Reports the first violation found as
    /// [`SpatialError::InvariantViolation`].
    pub fn check_tree(&mut self) -> SpatialResult<()> {
        self.check_open()?;
        self.load_subtree(self.root)?;

        let mut leaf_depth = None;
        let count = self.check_node(self.root, None, 1, &mut leaf_depth)?;
        if count != self.size {
            return Err(self.violation(
                self.root,
                format!("tree holds {} entries, size is {}", count, self.size),
            ));
        }
        if let Some(depth) = leaf_depth {
            if depth != self.height {
                return Err(self.violation(
                    self.root,
                    format!("leaves are at depth {}, height is {}", depth, self.height),
                ));
            }
        }
        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        expected_parent: Option<NodeId>,
        depth: u32,
        leaf_depth: &mut Option<u32>,
    ) -> SpatialResult<u64> {
        let node = self.arena.get(id)?;
        if node.parent != expected_parent {
            return Err(self.violation(
                id,
                format!("parent is {:?}, expected {:?}", node.parent, expected_parent),
            ));
        }

        let len = node.len();
        if len > self.branching_factor {
            return Err(self.violation(
                id,
                format!("{} items exceed the branching factor {}", len, self.branching_factor),
            ));
        }
        if id != self.root && len < self.min_entries {
            return Err(self.violation(
                id,
                format!("{} items, minimum is {}", len, self.min_entries),
            ));
        }

        match node.kind() {
            NodeKind::Leaf(entries) => {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(self.violation(
                            id,
                            format!("leaf at depth {}, other leaves at {}", depth, expected),
                        ))
                    }
                    Some(_) => {}
                }
                if let Some(bad) = entries.iter().find(|e| !e.bbox.is_valid()) {
                    return Err(self.violation(
                        id,
                        format!("row {} has invalid box {}", bad.row_id, bad.bbox),
                    ));
                }
                Ok(entries.len() as u64)
            }
            NodeKind::Internal(children) => {
                if children.is_empty() {
                    return Err(self.violation(id, "internal node without children".into()));
                }
                let mut count = 0;
                for child in children {
                    let actual = self.arena.get(child.node)?.bounding_box();
                    if actual != child.bbox {
                        return Err(self.violation(
                            id,
                            format!(
                                "stored box {} of child {} differs from its union {}",
                                child.bbox, child.node, actual
                            ),
                        ));
                    }
                    count += self.check_node(child.node, Some(id), depth + 1, leaf_depth)?;
                }
                Ok(count)
            }
        }
    }

    fn violation(&self, id: NodeId, reason: String) -> SpatialError {
        let node = match self.arena.page(id) {
            Some(page) => format!("node {} (page {})", id, page),
            None => format!("node {} (unsaved)", id),
        };
        SpatialError::InvariantViolation { node, reason }
    }
}

fn validate_box(bbox: &BoundingBox) -> SpatialResult<()> {
    if bbox.is_valid() {
        Ok(())
    } else {
        Err(SpatialError::InvalidOperation(format!(
            "Invalid bounding box {}",
            bbox
        )))
    }
}

fn broken_link(parent: NodeId, child: NodeId) -> SpatialError {
    SpatialError::InvalidOperation(format!(
        "Node {} is not listed as a child of its parent {}",
        child, parent
    ))
}

// ============================================================================
// Nearest neighbour queue
// ============================================================================

enum Target {
    Node(NodeId),
    Entry(RowId),
}

/// Heap item ordered so that [`BinaryHeap`] pops the smallest distance,
/// earliest pushed first
struct Candidate {
    distance: f64,
    seq: u64,
    target: Target,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ============================================================================
// Tests
// ============================================================================
