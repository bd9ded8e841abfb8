//! Shared-handle interface over a [`DiskRTree`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bounding_box::BoundingBox;
use crate::config::IndexConfig;
use crate::disk_rtree::rtree_types::{RTreeStats, RowId, SpatialResult};
use crate::disk_rtree::DiskRTree;

/// Spatial index operations through a shared reference.
///
/// Implementations serialize access internally, so one index can be handed
/// to several threads. Query results are collected eagerly.
pub trait SpatialIndex: Send + Sync {
    /// Adds a key to the index.
    fn add(&self, key: &BoundingBox, row_id: RowId) -> SpatialResult<()>;

    /// Removes a key from the index. Returns whether it was present.
    fn remove(&self, key: &BoundingBox, row_id: RowId) -> SpatialResult<bool>;

    /// Row ids of the entries whose box intersects `key`.
    fn find_intersecting_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<RowId>>;

    /// Row ids of the entries whose box lies inside `key`.
    fn find_contained_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<RowId>>;

    /// The `k` entries nearest to a point, nearest first.
    fn find_nearest(
        &self,
        x: f64,
        y: f64,
        k: usize,
        max_distance: Option<f64>,
    ) -> SpatialResult<Vec<(RowId, f64)>>;

    /// Every entry within `distance` of a point, nearest first.
    fn find_within_distance(
        &self,
        x: f64,
        y: f64,
        distance: f64,
    ) -> SpatialResult<Vec<(RowId, f64)>> {
        self.find_nearest(x, y, usize::MAX, Some(distance))
    }

    /// Number of entries.
    fn size(&self) -> u64;

    /// Commits pending changes.
    fn save(&self) -> SpatialResult<()>;

    /// Commits pending changes and releases the file.
    fn close(&self) -> SpatialResult<()>;

    /// Removes every entry.
    fn clear(&self) -> SpatialResult<()>;

    /// Closes the index and deletes its file.
    fn drop_tree(&self) -> SpatialResult<()>;
}

/// Cloneable, thread-safe handle to one [`DiskRTree`].
#[derive(Clone, Debug)]
pub struct SharedRTree {
    inner: Arc<Mutex<DiskRTree>>,
    path: PathBuf,
}

impl SharedRTree {
    pub fn create(path: impl AsRef<Path>, config: IndexConfig) -> SpatialResult<Self> {
        let tree = DiskRTree::create(path.as_ref(), config)?;
        Ok(Self::wrap(tree, path.as_ref()))
    }

    pub fn open(path: impl AsRef<Path>) -> SpatialResult<Self> {
        let tree = DiskRTree::open(path.as_ref())?;
        Ok(Self::wrap(tree, path.as_ref()))
    }

    fn wrap(tree: DiskRTree, path: &Path) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> RTreeStats {
        self.inner.lock().stats()
    }

    pub fn check_tree(&self) -> SpatialResult<()> {
        self.inner.lock().check_tree()
    }
}

impl SpatialIndex for SharedRTree {
    fn add(&self, key: &BoundingBox, row_id: RowId) -> SpatialResult<()> {
        self.inner.lock().insert(key, row_id)
    }

    fn remove(&self, key: &BoundingBox, row_id: RowId) -> SpatialResult<bool> {
        self.inner.lock().delete(key, row_id)
    }

    fn find_intersecting_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<RowId>> {
        self.inner.lock().query_vec(key)
    }

    fn find_contained_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<RowId>> {
        let mut tree = self.inner.lock();
        let keys = tree.query_contained(key)?.collect();
        keys
    }

    fn find_nearest(
        &self,
        x: f64,
        y: f64,
        k: usize,
        max_distance: Option<f64>,
    ) -> SpatialResult<Vec<(RowId, f64)>> {
        self.inner.lock().nearest(x, y, k, max_distance)
    }

    fn size(&self) -> u64 {
        self.inner.lock().size()
    }

    fn save(&self) -> SpatialResult<()> {
        self.inner.lock().save()
    }

    fn close(&self) -> SpatialResult<()> {
        self.inner.lock().close()
    }

    fn clear(&self) -> SpatialResult<()> {
        self.inner.lock().clear()
    }

    fn drop_tree(&self) -> SpatialResult<()> {
        let mut tree = self.inner.lock();
        // the file goes away, so a failed save does not matter
        if let Err(err) = tree.close() {
            log::debug!("Ignoring close failure while dropping {:?}: {}", self.path, err);
        }
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
