//! # Paged R-Tree
//!
//! A persistent spatial index over `(bounding box, row id)` pairs, stored
//! as fixed-size pages in a single file.
//!
//! ## Features
//!
//! - **Lazy loading**: opening an index reads only its header; nodes are
//!   read the first time a descent reaches them
//! - **Crash safe saves**: shadow paging keeps the last committed tree
//!   intact until the new header is on disk
//! - **Checksummed pages**: every node page carries a CRC32
//! - **Page reuse**: freed pages form a persisted chain
//! - **Queries**: intersection, containment and k nearest neighbours
//!
//! ## Example
//!
//! ```rust,no_run
//! use paged_rtree::{BoundingBox, DiskRTree, IndexConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IndexConfig::new().with_branching_factor(16);
//! let mut tree = DiskRTree::create("parcels.rtree", config)?;
//! tree.insert(&BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1)?;
//! tree.insert(&BoundingBox::new(20.0, 20.0, 30.0, 30.0), 2)?;
//! tree.close()?;
//!
//! let mut tree = DiskRTree::open("parcels.rtree")?;
//! for row_id in tree.query(&BoundingBox::new(5.0, 5.0, 15.0, 15.0))? {
//!     println!("hit {}", row_id?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod config;
pub mod disk_rtree;
pub mod hilbert;
pub mod spatial_index;

pub use bounding_box::BoundingBox;
pub use config::IndexConfig;
pub use disk_rtree::{
    DiskRTree, QueryIter, RTreeStats, RowId, SpatialError, SpatialResult, TreeState,
};
pub use spatial_index::{SharedRTree, SpatialIndex};
