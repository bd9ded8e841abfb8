use crate::disk_rtree::rtree_constants::{
    DEFAULT_BRANCHING_FACTOR, DEFAULT_PAGE_SIZE, MIN_BRANCHING_FACTOR, MIN_PAGE_SIZE,
};
use crate::disk_rtree::rtree_node::page_capacity;
use crate::disk_rtree::rtree_types::{SpatialError, SpatialResult};

/// Construction parameters of a new index.
///
/// Both values are written into the file header, so [`DiskRTree::open`]
/// never needs a config.
///
/// ```rust
/// use paged_rtree::IndexConfig;
///
/// let config = IndexConfig::new()
///     .with_branching_factor(16)
///     .with_page_size(1024);
/// assert!(config.validate().is_ok());
/// ```
///
/// [`DiskRTree::open`]: crate::DiskRTree::open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    branching_factor: usize,
    page_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of entries (leaf) or children (internal) per node
    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    /// Size in bytes of every page of the backing file, header included
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Minimum fill of every non-root node: `ceil(N / 2)`
    pub fn min_entries(&self) -> usize {
        self.branching_factor.div_ceil(2)
    }

    /// Rejects values below the minimums and pages too small for one node.
    pub fn validate(&self) -> SpatialResult<()> {
        if self.branching_factor < MIN_BRANCHING_FACTOR {
            return Err(SpatialError::InvalidConfiguration(format!(
                "Branching factor {} is below the minimum of {}",
                self.branching_factor, MIN_BRANCHING_FACTOR
            )));
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err(SpatialError::InvalidConfiguration(format!(
                "Page size {} is below the minimum of {}",
                self.page_size, MIN_PAGE_SIZE
            )));
        }
        if u32::try_from(self.page_size).is_err() || u32::try_from(self.branching_factor).is_err() {
            return Err(SpatialError::InvalidConfiguration(
                "Page size and branching factor must fit in 32 bits".into(),
            ));
        }
        let capacity = page_capacity(self.page_size);
        if capacity < self.branching_factor {
            return Err(SpatialError::InvalidConfiguration(format!(
                "A {} byte page holds {} records, fewer than the branching factor {}",
                self.page_size, capacity, self.branching_factor
            )));
        }
        Ok(())
    }
}
