//! Paged, disk-backed R-Tree.
//!
//! - Fixed-size pages in one file, page 0 holding the header
//! - Nodes materialized lazily into an arena as descents reach them
//! - Quadratic split on overflow, condense-and-reinsert on underflow
//! - Shadow-paged commits: a save never overwrites a reachable page

pub mod rtree_constants;
pub mod rtree_node;
pub mod rtree_split;
pub mod rtree_storage;
pub mod rtree_types;
mod persistence;
mod rtree_impl;
mod rtree_query;

pub use rtree_impl::DiskRTree;
pub use rtree_query::QueryIter;
pub use rtree_storage::Storage;
pub use rtree_types::{
    FileHeader, NodeId, PageId, RTreeStats, RowId, SpatialError, SpatialResult, TreeState,
};
