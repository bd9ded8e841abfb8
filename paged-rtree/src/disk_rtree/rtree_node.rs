//! Node model: in-memory R-Tree nodes, the arena that owns them, and the
//! byte layout of a node page.
//!
//! Page layout (little endian):
//!
//! ```text
//! +----------+-----+-------+------------------------------------------+
//! | crc32 u32| tag | count | count x (min_x, min_y, max_x, max_y, id) |
//! |          | u8  | u32   |           4 x f64 + u64                  |
//! +----------+-----+-------+------------------------------------------+
//! ```
//!
//! `id` is a row id in leaf pages and a child page id in internal pages.
//! The checksum covers every byte after itself, padding included. Free
//! pages use the same preamble with [`FREE_TAG`] and a `u64` link instead
//! of a count.

use std::cell::Cell;

use crate::bounding_box::BoundingBox;

use super::rtree_constants::{
    FREE_TAG, INTERNAL_TAG, LEAF_TAG, PAGE_PREAMBLE_SIZE, RECORD_SIZE,
};
use super::rtree_types::{NodeId, PageId, RowId, SpatialError, SpatialResult};

// ============================================================================
// Records
// ============================================================================

/// An entry in a leaf node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub bbox: BoundingBox,
    pub row_id: RowId,
}

/// A child reference in an internal node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildRef {
    pub bbox: BoundingBox,
    pub node: NodeId,
}

/// Anything stored under a bounding box
pub trait Bounded {
    fn bbox(&self) -> BoundingBox;
}

impl Bounded for Entry {
    fn bbox(&self) -> BoundingBox {
        self.bbox
    }
}

impl Bounded for ChildRef {
    fn bbox(&self) -> BoundingBox {
        self.bbox
    }
}

/// Union of the boxes of `items`
pub fn union_of<T: Bounded>(items: &[T]) -> BoundingBox {
    items.iter().fold(BoundingBox::empty(), |acc, item| acc.union(&item.bbox()))
}

// ============================================================================
// Nodes
// ============================================================================

/// Node content in the R-Tree
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Leaf node containing actual entries
    Leaf(Vec<Entry>),
    /// Internal node containing child references
    Internal(Vec<ChildRef>),
}

/// A materialized node.
///
/// Mutators never split or merge; they only edit the list and drop the
/// cached bounding box. Structural policy lives in the engine.
#[derive(Debug, Clone)]
pub struct Node {
    /// Page holding the last flushed image, `None` until first flushed
    pub page: Option<PageId>,
    /// Non-owning back reference used for upward propagation
    pub parent: Option<NodeId>,
    pub dirty: bool,
    kind: NodeKind,
    bbox_cache: Cell<Option<BoundingBox>>,
}

impl Node {
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            page: None,
            parent,
            dirty: true,
            kind,
            bbox_cache: Cell::new(None),
        }
    }

    /// A clean node just read from `page`
    pub fn loaded(kind: NodeKind, page: PageId, parent: Option<NodeId>) -> Self {
        Self {
            page: Some(page),
            parent,
            dirty: false,
            kind,
            bbox_cache: Cell::new(None),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal(children) => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of every contained box, cached until the next mutation
    pub fn bounding_box(&self) -> BoundingBox {
        if let Some(bbox) = self.bbox_cache.get() {
            return bbox;
        }
        let bbox = match &self.kind {
            NodeKind::Leaf(entries) => union_of(entries),
            NodeKind::Internal(children) => union_of(children),
        };
        self.bbox_cache.set(Some(bbox));
        bbox
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.bbox_cache.set(None);
    }

    pub fn entries(&self) -> &[Entry] {
        match &self.kind {
            NodeKind::Leaf(entries) => entries,
            NodeKind::Internal(_) => &[],
        }
    }

    pub fn children(&self) -> &[ChildRef] {
        match &self.kind {
            NodeKind::Internal(children) => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    pub fn add_entry(&mut self, entry: Entry) -> SpatialResult<()> {
        match &mut self.kind {
            NodeKind::Leaf(entries) => entries.push(entry),
            NodeKind::Internal(_) => {
                return Err(SpatialError::InvalidOperation(
                    "Expected leaf node for entry insertion".into(),
                ))
            }
        }
        self.touch();
        Ok(())
    }

    pub fn remove_entry(&mut self, index: usize) -> Option<Entry> {
        let removed = match &mut self.kind {
            NodeKind::Leaf(entries) if index < entries.len() => entries.remove(index),
            _ => return None,
        };
        self.touch();
        Some(removed)
    }

    pub fn add_child(&mut self, child: ChildRef) -> SpatialResult<()> {
        match &mut self.kind {
            NodeKind::Internal(children) => children.push(child),
            NodeKind::Leaf(_) => {
                return Err(SpatialError::InvalidOperation(
                    "Expected internal node for child insertion".into(),
                ))
            }
        }
        self.touch();
        Ok(())
    }

    pub fn remove_child(&mut self, index: usize) -> Option<ChildRef> {
        let removed = match &mut self.kind {
            NodeKind::Internal(children) if index < children.len() => children.remove(index),
            _ => return None,
        };
        self.touch();
        Some(removed)
    }

    pub fn child_index(&self, node: NodeId) -> Option<usize> {
        self.children().iter().position(|c| c.node == node)
    }

    /// Replace the stored box of one child. Returns whether it changed.
    pub fn set_child_bbox(&mut self, index: usize, bbox: BoundingBox) -> bool {
        let changed = match &mut self.kind {
            NodeKind::Internal(children) if index < children.len() => {
                if children[index].bbox == bbox {
                    false
                } else {
                    children[index].bbox = bbox;
                    true
                }
            }
            _ => false,
        };
        if changed {
            self.touch();
        }
        changed
    }

    /// Swap the whole content, used by splits
    pub fn replace_kind(&mut self, kind: NodeKind) -> NodeKind {
        let old = std::mem::replace(&mut self.kind, kind);
        self.touch();
        old
    }

    pub fn into_kind(self) -> NodeKind {
        self.kind
    }
}

// ============================================================================
// Arena
// ============================================================================

/// One arena slot
#[derive(Debug, Clone)]
pub enum Slot {
    /// Known only by its page; materialized on first access
    Unloaded {
        page: PageId,
        parent: Option<NodeId>,
    },
    Loaded(Node),
    Vacant,
}

/// Owns every node of a tree, addressed by [`NodeId`]
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    vacant: Vec<NodeId>,
    loaded: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: Slot) -> NodeId {
        if matches!(slot, Slot::Loaded(_)) {
            self.loaded += 1;
        }
        match self.vacant.pop() {
            Some(id) => {
                self.slots[id] = slot;
                id
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Free a slot, returning what it held
    pub fn remove(&mut self, id: NodeId) -> Slot {
        match self.slots.get_mut(id) {
            Some(slot) if !matches!(slot, Slot::Vacant) => {
                let old = std::mem::replace(slot, Slot::Vacant);
                if matches!(old, Slot::Loaded(_)) {
                    self.loaded -= 1;
                }
                self.vacant.push(id);
                old
            }
            _ => Slot::Vacant,
        }
    }

    pub fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// Materialize an unloaded slot
    pub fn fill(&mut self, id: NodeId, node: Node) {
        if let Some(slot) = self.slots.get_mut(id) {
            if !matches!(slot, Slot::Loaded(_)) {
                self.loaded += 1;
            }
            *slot = Slot::Loaded(node);
        }
    }

    pub fn get(&self, id: NodeId) -> SpatialResult<&Node> {
        match self.slots.get(id) {
            Some(Slot::Loaded(node)) => Ok(node),
            _ => Err(not_loaded(id)),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> SpatialResult<&mut Node> {
        match self.slots.get_mut(id) {
            Some(Slot::Loaded(node)) => Ok(node),
            _ => Err(not_loaded(id)),
        }
    }

    pub fn is_loaded(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id), Some(Slot::Loaded(_)))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self.slots.get(id) {
            Some(Slot::Loaded(node)) => node.parent,
            Some(Slot::Unloaded { parent, .. }) => *parent,
            _ => None,
        }
    }

    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>) {
        match self.slots.get_mut(id) {
            Some(Slot::Loaded(node)) => node.parent = new_parent,
            Some(Slot::Unloaded { parent, .. }) => *parent = new_parent,
            _ => {}
        }
    }

    pub fn page(&self, id: NodeId) -> Option<PageId> {
        match self.slots.get(id) {
            Some(Slot::Loaded(node)) => node.page,
            Some(Slot::Unloaded { page, .. }) => Some(*page),
            _ => None,
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
        self.loaded = 0;
    }
}

fn not_loaded(id: NodeId) -> SpatialError {
    SpatialError::InvalidOperation(format!("Node {} is not loaded", id))
}

// ============================================================================
// Page codec
// ============================================================================

/// Disk image of a node: the records with child node ids already
/// translated to page ids
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub leaf: bool,
    pub records: Vec<(BoundingBox, u64)>,
}

/// How many records fit in one page
pub fn page_capacity(page_size: usize) -> usize {
    page_size.saturating_sub(PAGE_PREAMBLE_SIZE) / RECORD_SIZE
}

pub fn encode_page(image: &PageImage, page_size: usize) -> SpatialResult<Vec<u8>> {
    let capacity = page_capacity(page_size);
    if image.records.len() > capacity {
        return Err(SpatialError::InvalidOperation(format!(
            "Node with {} records does not fit a page of {} records",
            image.records.len(),
            capacity
        )));
    }

    let mut buffer = vec![0u8; page_size];
    buffer[4] = if image.leaf { LEAF_TAG } else { INTERNAL_TAG };
    buffer[5..9].copy_from_slice(&(image.records.len() as u32).to_le_bytes());

    let mut offset = PAGE_PREAMBLE_SIZE;
    for (bbox, id) in &image.records {
        for value in [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y] {
            buffer[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
            offset += 8;
        }
        buffer[offset..offset + 8].copy_from_slice(&id.to_le_bytes());
        offset += 8;
    }

    seal(&mut buffer);
    Ok(buffer)
}

pub fn decode_page(bytes: &[u8]) -> SpatialResult<PageImage> {
    verify(bytes)?;

    let leaf = match bytes[4] {
        LEAF_TAG => true,
        INTERNAL_TAG => false,
        FREE_TAG => {
            return Err(SpatialError::CorruptIndex(
                "Expected a node page, found a free page".into(),
            ))
        }
        tag => {
            return Err(SpatialError::CorruptIndex(format!(
                "Unknown page kind tag {:#04x}",
                tag
            )))
        }
    };

    let count = read_u32(bytes, 5) as usize;
    let capacity = page_capacity(bytes.len());
    if count > capacity {
        return Err(SpatialError::CorruptIndex(format!(
            "Page declares {} records but holds at most {}",
            count, capacity
        )));
    }

    let mut records = Vec::with_capacity(count);
    let mut offset = PAGE_PREAMBLE_SIZE;
    for _ in 0..count {
        let min_x = read_f64(bytes, offset);
        let min_y = read_f64(bytes, offset + 8);
        let max_x = read_f64(bytes, offset + 16);
        let max_y = read_f64(bytes, offset + 24);
        let id = read_u64(bytes, offset + 32);
        records.push((BoundingBox::new(min_x, min_y, max_x, max_y), id));
        offset += RECORD_SIZE;
    }

    Ok(PageImage { leaf, records })
}

/// Free-page marker carrying the next link of the free chain
pub fn encode_free_page(next: PageId, page_size: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; page_size];
    buffer[4] = FREE_TAG;
    buffer[5..13].copy_from_slice(&next.to_le_bytes());
    seal(&mut buffer);
    buffer
}

pub fn decode_free_page(bytes: &[u8]) -> SpatialResult<PageId> {
    verify(bytes)?;
    if bytes[4] != FREE_TAG {
        return Err(SpatialError::CorruptIndex(format!(
            "Expected a free page, found kind tag {:#04x}",
            bytes[4]
        )));
    }
    Ok(read_u64(bytes, 5))
}

fn seal(buffer: &mut [u8]) {
    let checksum = crc32fast::hash(&buffer[4..]);
    buffer[0..4].copy_from_slice(&checksum.to_le_bytes());
}

fn verify(bytes: &[u8]) -> SpatialResult<()> {
    if bytes.len() < PAGE_PREAMBLE_SIZE + 8 {
        return Err(SpatialError::CorruptIndex(format!(
            "Page of {} bytes is too small",
            bytes.len()
        )));
    }
    let stored = read_u32(bytes, 0);
    let actual = crc32fast::hash(&bytes[4..]);
    if stored != actual {
        return Err(SpatialError::CorruptIndex(format!(
            "Page checksum mismatch - possible corruption (expected: {:x}, got: {:x})",
            actual, stored
        )));
    }
    Ok(())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    f64::from_bits(read_u64(bytes, offset))
}
