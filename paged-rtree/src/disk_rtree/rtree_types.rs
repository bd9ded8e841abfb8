//! Core types shared by the paged R-Tree:
//! - Error types and result types
//! - Identifier aliases
//! - Statistics
//! - File header

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

use super::rtree_constants::{HEADER_PAGE, MAGIC, MIN_PAGE_SIZE, VERSION};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial indexing operations
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Invalid page id {0}")]
    InvalidPage(PageId),

    #[error("Page size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invariant violation at {node}: {reason}")]
    InvariantViolation { node: String, reason: String },

    #[error("Tree is poisoned by an earlier failure and must be reopened")]
    Poisoned,

    #[error("Tree is closed")]
    Closed,
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Caller supplied identifier stored with each entry
pub type RowId = u64;

/// Page ID - location of a node/page in the backing file
pub type PageId = u64;

/// Index of a node slot in the in-memory arena
pub type NodeId = usize;

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle of a tree instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Open,
    /// A mutation failed half way; the in-memory tree can no longer be trusted
    Poisoned,
    Closed,
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about R-Tree operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub total_entries: u64,
    pub tree_height: u32,
    /// Nodes currently materialized in memory
    pub loaded_nodes: u64,
    /// Pages in the backing file, header included
    pub page_count: u64,
    pub free_pages: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

// ============================================================================
// File Header
// ============================================================================

/// File header stored in page 0 of the backing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub page_size: u32,
    pub branching_factor: u32,
    pub root_page: PageId,
    pub page_count: u64,
    pub free_list_head: PageId,
    pub free_page_count: u64,
    pub entry_count: u64,
    pub height: u32,
}

impl FileHeader {
    pub fn new(page_size: u32, branching_factor: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            page_size,
            branching_factor,
            root_page: HEADER_PAGE,
            page_count: 1,
            free_list_head: HEADER_PAGE,
            free_page_count: 0,
            entry_count: 0,
            height: 1,
        }
    }

    /// Structural checks that do not depend on the file length
    pub fn validate(&self) -> SpatialResult<()> {
        if self.magic != MAGIC {
            return Err(SpatialError::CorruptIndex(
                "Invalid file format (bad magic)".into(),
            ));
        }
        if self.version != VERSION {
            return Err(SpatialError::CorruptIndex(format!(
                "Unsupported file format version {}",
                self.version
            )));
        }
        if (self.page_size as usize) < MIN_PAGE_SIZE {
            return Err(SpatialError::CorruptIndex(format!(
                "Page size {} is below the minimum of {}",
                self.page_size, MIN_PAGE_SIZE
            )));
        }
        if self.page_count == 0 {
            return Err(SpatialError::CorruptIndex("Page count is zero".into()));
        }
        if self.root_page >= self.page_count {
            return Err(SpatialError::CorruptIndex(format!(
                "Root page {} is outside the file ({} pages)",
                self.root_page, self.page_count
            )));
        }
        if self.free_list_head >= self.page_count {
            return Err(SpatialError::CorruptIndex(format!(
                "Free list head {} is outside the file ({} pages)",
                self.free_list_head, self.page_count
            )));
        }
        if self.height == 0 {
            return Err(SpatialError::CorruptIndex("Tree height is zero".into()));
        }
        Ok(())
    }
}
