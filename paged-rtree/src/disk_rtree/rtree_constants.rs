//! Constants for the paged R-Tree file format and defaults.

/// Default page size (4KB), fits up to 102 records per node
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page size accepted; the header must fit in one page
pub const MIN_PAGE_SIZE: usize = 256;

/// Default maximum number of entries/children per node
pub const DEFAULT_BRANCHING_FACTOR: usize = 64;

/// Smallest branching factor accepted
pub const MIN_BRANCHING_FACTOR: usize = 3;

/// Magic number for file format identification
pub const MAGIC: u32 = 0x5052_5452; // "PRTR" - Paged R-Tree

/// File format version
pub const VERSION: u32 = 1;

/// Page 0 holds the header; it also terminates the free page chain
pub const HEADER_PAGE: u64 = 0;

/// Bytes before the first record: checksum (u32), kind tag (u8), count (u32)
pub const PAGE_PREAMBLE_SIZE: usize = 4 + 1 + 4;

/// One record: four f64 box coordinates and a u64 row id or child page id
pub const RECORD_SIZE: usize = 4 * 8 + 8;

/// Page kind tags
pub const LEAF_TAG: u8 = 1;
pub const INTERNAL_TAG: u8 = 2;
pub const FREE_TAG: u8 = 0xFF;
