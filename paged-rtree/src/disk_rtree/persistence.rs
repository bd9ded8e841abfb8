//! Persistence controller: creating and opening index files, committing the
//! in-memory tree, and closing.
//!
//! Commits are shadow paged. A save never overwrites a page the current
//! header can reach:
//!
//! 1. every dirty node is written, children first, to a newly allocated
//!    page; its previous page is retired (a parent whose child moved is
//!    dirty as well),
//! 2. the file is synced,
//! 3. the header is rewritten to point at the new root and synced; this is
//!    the commit point,
//! 4. retired pages join the free chain and the header is written again.
//!
//! A crash before step 3 leaves the previous generation intact. A crash
//! between steps 3 and 4 only leaks the retired pages.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::bounding_box::BoundingBox;
use crate::config::IndexConfig;
use crate::hilbert::{hilbert_index_bounded, DEFAULT_ORDER};

use super::rtree_constants::{HEADER_PAGE, MIN_BRANCHING_FACTOR};
use super::rtree_impl::DiskRTree;
use super::rtree_node::{encode_page, page_capacity, Node, NodeKind, PageImage, Slot};
use super::rtree_storage::Storage;
use super::rtree_types::{NodeId, RowId, SpatialError, SpatialResult, TreeState};

impl DiskRTree {
    /// Create a new, empty index file, replacing any file at `path`.
    ///
    /// If anything fails the partial file is removed.
    pub fn create(path: impl AsRef<Path>, config: IndexConfig) -> SpatialResult<Self> {
        config.validate()?;
        let path = path.as_ref();

        let guard = PartialFile::new(path);
        let mut storage = Storage::create(path, config.page_size())?;
        storage.header_mut().branching_factor = config.branching_factor() as u32;

        let root = Slot::Loaded(Node::new(NodeKind::Leaf(Vec::new()), None));
        let mut tree = Self::from_parts(storage, root, config.branching_factor(), 0, 1);
        if let Err(err) = tree.save() {
            tree.release();
            return Err(err);
        }
        guard.disarm();

        log::info!(
            "Created R-Tree {:?} (branching factor {}, page size {})",
            path,
            config.branching_factor(),
            config.page_size()
        );
        Ok(tree)
    }

    /// Open an existing index file.
    ///
    /// IMPORTANT: only the header and the free page chain are read. The
    /// root and every other node stay on disk until a descent reaches them.
    pub fn open(path: impl AsRef<Path>) -> SpatialResult<Self> {
        let path = path.as_ref();
        let storage = Storage::open(path)?;
        let header = storage.header();

        let branching_factor = header.branching_factor as usize;
        let capacity = page_capacity(storage.page_size());
        if branching_factor < MIN_BRANCHING_FACTOR || branching_factor > capacity {
            return Err(SpatialError::CorruptIndex(format!(
                "Branching factor {} is invalid for {} byte pages",
                branching_factor,
                storage.page_size()
            )));
        }
        if header.root_page == HEADER_PAGE {
            return Err(SpatialError::CorruptIndex("Index has no root page".into()));
        }

        let root = Slot::Unloaded {
            page: header.root_page,
            parent: None,
        };
        let size = header.entry_count;
        let height = header.height;

        log::info!(
            "Opened R-Tree {:?}: {} entries, height {}, {} pages",
            path,
            size,
            height,
            header.page_count
        );
        Ok(Self::from_parts(storage, root, branching_factor, size, height))
    }

    /// Build a new index from a batch of entries.
    ///
    /// Entries are inserted in Hilbert order of their centers, which keeps
    /// spatially close entries in the same leaves. Every box is validated
    /// before the file is created.
    pub fn bulk_load<I>(
        path: impl AsRef<Path>,
        config: IndexConfig,
        entries: I,
    ) -> SpatialResult<Self>
    where
        I: IntoIterator<Item = (BoundingBox, RowId)>,
    {
        let entries: Vec<(BoundingBox, RowId)> = entries.into_iter().collect();
        if let Some((bbox, row_id)) = entries.iter().find(|(bbox, _)| !bbox.is_valid()) {
            return Err(SpatialError::InvalidOperation(format!(
                "Invalid bounding box {} for row {}",
                bbox, row_id
            )));
        }

        let bounds = entries
            .iter()
            .fold(BoundingBox::empty(), |acc, (bbox, _)| acc.union(bbox));
        let mut ordered: Vec<(u64, BoundingBox, RowId)> = entries
            .into_iter()
            .map(|(bbox, row_id)| {
                let (cx, cy) = bbox.center();
                (hilbert_index_bounded(cx, cy, &bounds, DEFAULT_ORDER), bbox, row_id)
            })
            .collect();
        ordered.sort_by_key(|(index, _, _)| *index);

        let mut tree = Self::create(path, config)?;
        for (_, bbox, row_id) in ordered {
            tree.insert(&bbox, row_id)?;
        }
        tree.save()?;
        log::debug!("Bulk loaded {} entries, height {}", tree.size(), tree.height());
        Ok(tree)
    }

    /// Commit every change since the last save.
    pub fn save(&mut self) -> SpatialResult<()> {
        self.check_open()?;

        let mut written = 0usize;
        self.write_dirty(self.root, &mut written)?;
        let root_page = self.arena.page(self.root).ok_or_else(|| {
            SpatialError::InvalidOperation("Root has no page after writing dirty nodes".into())
        })?;

        let storage = self.storage.as_mut().ok_or(SpatialError::Closed)?;
        storage.flush()?;

        let header = storage.header_mut();
        header.root_page = root_page;
        header.entry_count = self.size;
        header.height = self.height;
        header.branching_factor = self.branching_factor as u32;
        storage.write_header()?;

        // the committed header no longer reaches these
        let retired = std::mem::take(&mut self.retired_pages);
        let freed = retired.len();
        if !retired.is_empty() {
            let mut pending = retired.into_iter();
            while let Some(page) = pending.next() {
                if let Err(err) = storage.free(page) {
                    self.retired_pages.push(page);
                    self.retired_pages.extend(pending);
                    return Err(err);
                }
            }
            storage.write_header()?;
        }

        log::debug!(
            "Saved R-Tree: {} nodes written, {} pages freed, root page {}",
            written,
            freed,
            root_page
        );
        Ok(())
    }

    /// Post-order write of dirty nodes. Unloaded subtrees are clean.
    fn write_dirty(&mut self, id: NodeId, written: &mut usize) -> SpatialResult<()> {
        if !self.arena.is_loaded(id) {
            return Ok(());
        }
        let children: Vec<NodeId> = self.arena.get(id)?.children().iter().map(|c| c.node).collect();
        for child in children {
            self.write_dirty(child, written)?;
        }

        let node = self.arena.get(id)?;
        if !node.dirty && node.page.is_some() {
            return Ok(());
        }

        let image = self.page_image(id)?;
        let storage = self.storage.as_mut().ok_or(SpatialError::Closed)?;
        let bytes = encode_page(&image, storage.page_size())?;
        let page = storage.allocate()?;
        if let Err(err) = storage.write(page, &bytes) {
            // never reachable from a header, released after the next commit
            self.retired_pages.push(page);
            return Err(err);
        }

        let node = self.arena.get_mut(id)?;
        node.dirty = false;
        let parent = node.parent;
        if let Some(old) = node.page.replace(page) {
            self.retired_pages.push(old);
        }
        if let Some(parent) = parent {
            self.arena.get_mut(parent)?.dirty = true;
        }
        *written += 1;
        Ok(())
    }

    fn page_image(&self, id: NodeId) -> SpatialResult<PageImage> {
        let node = self.arena.get(id)?;
        let records = match node.kind() {
            NodeKind::Leaf(entries) => entries.iter().map(|e| (e.bbox, e.row_id)).collect(),
            NodeKind::Internal(children) => children
                .iter()
                .map(|c| {
                    self.arena.page(c.node).map(|page| (c.bbox, page)).ok_or_else(|| {
                        SpatialError::InvalidOperation(format!(
                            "Child {} of node {} has no page",
                            c.node, id
                        ))
                    })
                })
                .collect::<SpatialResult<Vec<_>>>()?,
        };
        Ok(PageImage {
            leaf: node.is_leaf(),
            records,
        })
    }

    /// Save and release the file.
    ///
    /// The file is released even when the save fails; the error is still
    /// returned. Closing a closed tree does nothing. A poisoned tree is
    /// released without saving and reports [`SpatialError::Poisoned`].
    pub fn close(&mut self) -> SpatialResult<()> {
        match self.state {
            TreeState::Closed => Ok(()),
            TreeState::Poisoned => {
                log::warn!("Closing poisoned R-Tree without saving");
                self.release();
                Err(SpatialError::Poisoned)
            }
            TreeState::Open => {
                let result = self.save();
                let path = self.storage.as_ref().map(|s| s.path().to_path_buf());
                self.release();
                match &result {
                    Ok(()) => log::info!("Closed R-Tree {:?}", path),
                    Err(err) => log::error!("Closed R-Tree {:?} after failed save: {}", path, err),
                }
                result
            }
        }
    }

    pub(super) fn release(&mut self) {
        self.state = TreeState::Closed;
        self.storage = None;
        self.arena.clear();
        self.retired_pages.clear();
    }
}

impl Drop for DiskRTree {
    fn drop(&mut self) {
        // Best effort save on drop
        if self.state == TreeState::Open {
            log::warn!("R-Tree dropped without close, saving");
            if let Err(err) = self.save() {
                log::error!("Implicit save on drop failed: {}", err);
            }
        }
    }
}

/// Removes a half-created index file unless disarmed
struct PartialFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = fs::remove_file(self.path) {
            if err.kind() != ErrorKind::NotFound {
                log::warn!("Could not remove partial index {:?}: {}", self.path, err);
            }
        }
    }
}
