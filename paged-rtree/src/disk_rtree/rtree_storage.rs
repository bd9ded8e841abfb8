//! Page Store: fixed-size block storage on a single random-access file.
//!
//! Page 0 holds the [`FileHeader`], followed by a CRC32 of its encoded
//! bytes; data pages follow. Every read or write touches exactly one page
//! (one seek plus one read or write), nothing is preloaded.
//!
//! Free pages form a persisted chain running from `free_list_head` to a
//! tail whose link is [`HEADER_PAGE`]. Freed pages are pushed at the head,
//! allocation takes the tail and re-terminates the chain at its new tail.
//! Neither operation rewrites a link reachable from the last committed
//! header in a way that could make it point at a live page, so a crash
//! between header writes only ever truncates that chain.

use std::collections::{HashSet, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::rtree_constants::{HEADER_PAGE, MIN_PAGE_SIZE};
use super::rtree_node::{decode_free_page, encode_free_page};
use super::rtree_types::{FileHeader, PageId, SpatialError, SpatialResult};

/// Handles reading/writing individual pages of the index file.
pub struct Storage {
    file: File,
    path: PathBuf,
    page_size: usize,
    header: FileHeader,
    /// Free pages ordered head first
    free_chain: VecDeque<PageId>,
    free_set: HashSet<PageId>,
    disk_reads: u64,
    disk_writes: u64,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("page_count", &self.header.page_count)
            .field("free_pages", &self.free_chain.len())
            .finish()
    }
}

impl Storage {
    /// Create a new, empty storage file holding only the header page.
    pub fn create(path: &Path, page_size: usize) -> SpatialResult<Self> {
        if page_size < MIN_PAGE_SIZE || page_size > u32::MAX as usize {
            return Err(SpatialError::InvalidConfiguration(format!(
                "Page size {} must be between {} and {}",
                page_size,
                MIN_PAGE_SIZE,
                u32::MAX
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut storage = Self {
            file,
            path: path.to_path_buf(),
            page_size,
            header: FileHeader::new(page_size as u32, 0),
            free_chain: VecDeque::new(),
            free_set: HashSet::new(),
            disk_reads: 0,
            disk_writes: 0,
        };
        storage.write_header()?;
        Ok(storage)
    }

    /// Open an existing storage file.
    ///
    /// Only the header and the free page chain are read.
    pub fn open(path: &Path) -> SpatialResult<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < MIN_PAGE_SIZE as u64 {
            return Err(SpatialError::CorruptIndex(format!(
                "File is {} bytes, too short to hold a header",
                file_len
            )));
        }

        let mut buffer = vec![0u8; MIN_PAGE_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buffer)?;
        let header = decode_header(&buffer)?;
        header.validate()?;

        let page_size = header.page_size as usize;
        let expected_len = header.page_count.saturating_mul(page_size as u64);
        if file_len < expected_len {
            return Err(SpatialError::CorruptIndex(format!(
                "File is {} bytes but header declares {} pages of {} bytes",
                file_len, header.page_count, page_size
            )));
        }

        let mut storage = Self {
            file,
            path: path.to_path_buf(),
            page_size,
            header,
            free_chain: VecDeque::new(),
            free_set: HashSet::new(),
            disk_reads: 1,
            disk_writes: 0,
        };
        storage.load_free_chain()?;
        Ok(storage)
    }

    /// Walk the persisted free chain.
    ///
    /// The walk stops at the first link that is out of range, repeats, or
    /// does not lead to a free-page marker. Such a chain is the leftover of
    /// an interrupted save: the pages beyond the break leak but no live
    /// page is ever treated as free.
    fn load_free_chain(&mut self) -> SpatialResult<()> {
        let mut current = self.header.free_list_head;
        while current != HEADER_PAGE {
            if current >= self.header.page_count || self.free_set.contains(&current) {
                break;
            }
            let bytes = self.read_raw(current)?;
            match decode_free_page(&bytes) {
                Ok(next) => {
                    self.free_chain.push_back(current);
                    self.free_set.insert(current);
                    current = next;
                }
                Err(_) => break,
            }
        }

        let found = self.free_chain.len() as u64;
        if found != self.header.free_page_count {
            log::warn!(
                "Free page chain of {:?} holds {} pages, header recorded {}",
                self.path,
                found,
                self.header.free_page_count
            );
            self.header.free_page_count = found;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages including the header page
    pub fn page_count(&self) -> u64 {
        self.header.page_count
    }

    pub fn free_page_count(&self) -> u64 {
        self.free_chain.len() as u64
    }

    pub fn is_free(&self, page_id: PageId) -> bool {
        self.free_set.contains(&page_id)
    }

    pub fn disk_reads(&self) -> u64 {
        self.disk_reads
    }

    pub fn disk_writes(&self) -> u64 {
        self.disk_writes
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Tree-level header fields (root, counts, branching factor) are owned
    /// by the persistence layer; page bookkeeping stays with the store.
    pub(crate) fn header_mut(&mut self) -> &mut FileHeader {
        &mut self.header
    }

    /// Write the header page and sync the file.
    pub fn write_header(&mut self) -> SpatialResult<()> {
        self.header.free_list_head = self.free_chain.front().copied().unwrap_or(HEADER_PAGE);
        self.header.free_page_count = self.free_chain.len() as u64;

        let mut padded = encode_header(&self.header)?;
        padded.resize(self.page_size, 0);

        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&padded)?;
        self.disk_writes += 1;
        self.file.sync_all()?;
        Ok(())
    }

    /// Hand out a page id, reusing the oldest free page when there is one.
    pub fn allocate(&mut self) -> SpatialResult<PageId> {
        if let Some(page_id) = self.free_chain.pop_back() {
            self.free_set.remove(&page_id);
            if let Some(&new_tail) = self.free_chain.back() {
                let marker = encode_free_page(HEADER_PAGE, self.page_size);
                self.write_raw(new_tail, &marker)?;
            }
            return Ok(page_id);
        }

        let page_id = self.header.page_count;
        self.header.page_count += 1;
        Ok(page_id)
    }

    /// Read one page.
    pub fn read(&mut self, page_id: PageId) -> SpatialResult<Vec<u8>> {
        self.check_live(page_id)?;
        self.read_raw(page_id)
    }

    /// Overwrite one page. `bytes` must be exactly one page long.
    pub fn write(&mut self, page_id: PageId, bytes: &[u8]) -> SpatialResult<()> {
        if bytes.len() != self.page_size {
            log::error!(
                "Refusing to write {} bytes to page {} of {:?} (page size {})",
                bytes.len(),
                page_id,
                self.path,
                self.page_size
            );
            return Err(SpatialError::SizeMismatch {
                expected: self.page_size,
                actual: bytes.len(),
            });
        }
        self.check_live(page_id)?;
        self.write_raw(page_id, bytes)
    }

    /// Mark a page reusable by later [`Storage::allocate`] calls.
    pub fn free(&mut self, page_id: PageId) -> SpatialResult<()> {
        self.check_live(page_id)?;

        let next = self.free_chain.front().copied().unwrap_or(HEADER_PAGE);
        let marker = encode_free_page(next, self.page_size);
        self.write_raw(page_id, &marker)?;

        self.free_chain.push_front(page_id);
        self.free_set.insert(page_id);
        Ok(())
    }

    /// Force all pending writes to stable storage
    pub fn flush(&mut self) -> SpatialResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn check_live(&self, page_id: PageId) -> SpatialResult<()> {
        if page_id == HEADER_PAGE || page_id >= self.header.page_count || self.is_free(page_id) {
            log::error!(
                "Invalid page id {} for {:?} ({} pages)",
                page_id,
                self.path,
                self.header.page_count
            );
            return Err(SpatialError::InvalidPage(page_id));
        }
        Ok(())
    }

    fn offset(&self, page_id: PageId) -> u64 {
        page_id * self.page_size as u64
    }

    fn read_raw(&mut self, page_id: PageId) -> SpatialResult<Vec<u8>> {
        let offset = self.offset(page_id);
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; self.page_size];
        self.file.read_exact(&mut buffer)?;
        self.disk_reads += 1;
        Ok(buffer)
    }

    fn write_raw(&mut self, page_id: PageId, bytes: &[u8]) -> SpatialResult<()> {
        let offset = self.offset(page_id);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        self.disk_writes += 1;
        Ok(())
    }
}

/// Header bytes followed by their CRC32
fn encode_header(header: &FileHeader) -> SpatialResult<Vec<u8>> {
    let mut bytes = bincode::serde::encode_to_vec(header, bincode::config::legacy())
        .map_err(|e| SpatialError::Serialization(e.to_string()))?;
    let checksum = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&checksum.to_le_bytes());
    Ok(bytes)
}

fn decode_header(buffer: &[u8]) -> SpatialResult<FileHeader> {
    let (header, len): (FileHeader, usize) =
        bincode::serde::decode_from_slice(buffer, bincode::config::legacy())
            .map_err(|e| SpatialError::CorruptIndex(format!("Unreadable header: {}", e)))?;

    let stored = buffer
        .get(len..len + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| SpatialError::CorruptIndex("Header checksum is missing".into()))?;
    let computed = crc32fast::hash(&buffer[..len]);
    if stored != computed {
        return Err(SpatialError::CorruptIndex(format!(
            "Header checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored, computed
        )));
    }
    Ok(header)
}
