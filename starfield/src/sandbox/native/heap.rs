//! Emulated linear memory with a first-fit allocator.
//!
//! Memory grows in 64 KiB pages like a WebAssembly memory. Address 0 is
//! never handed out so a null pointer always means failure.

use std::collections::BTreeMap;

use crate::sandbox::SandboxError;

/// Size of one memory page.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Upper bound on memory size (2 GiB).
pub const MAX_MEMORY: usize = 2 * 1024 * 1024 * 1024;

const ALIGN: usize = 8;

/// First address the allocator may return.
const HEAP_BASE: usize = ALIGN;

/// Linear memory plus allocator bookkeeping.
#[derive(Debug)]
pub struct LinearHeap {
    memory: Vec<u8>,
    /// Free blocks by start address.
    free: BTreeMap<usize, usize>,
    /// Live blocks by start address, with their rounded size.
    allocated: BTreeMap<usize, usize>,
}

impl LinearHeap {
    /// Creates a heap with one page of memory.
    pub fn new() -> Self {
        let mut free = BTreeMap::new();
        free.insert(HEAP_BASE, PAGE_SIZE - HEAP_BASE);
        Self {
            memory: vec![0; PAGE_SIZE],
            free,
            allocated: BTreeMap::new(),
        }
    }

    /// Allocates `len` bytes, growing memory if needed.
    ///
    /// Returns `None` when memory cannot grow any further.
    pub fn alloc(&mut self, len: usize) -> Option<usize> {
        let size = round_up(len.max(1))?;
        let start = match self.first_fit(size) {
            Some(start) => start,
            None => {
                self.grow(size)?;
                self.first_fit(size)?
            }
        };

        let block = self.free.remove(&start)?;
        if block > size {
            self.free.insert(start + size, block - size);
        }
        self.allocated.insert(start, size);
        Some(start)
    }

    /// Returns a block to the free list, merging it with its neighbours.
    ///
    /// `len` must be the length the block was allocated with.
    pub fn release(&mut self, ptr: usize, len: usize) -> Result<(), SandboxError> {
        let invalid = || SandboxError::InvalidFree {
            ptr: ptr as u32,
            len: len as u32,
        };
        let size = round_up(len.max(1)).ok_or_else(invalid)?;
        if self.allocated.get(&ptr) != Some(&size) {
            return Err(invalid());
        }
        self.allocated.remove(&ptr);
        self.insert_free(ptr, size);
        Ok(())
    }

    /// Size of the live block starting at `ptr`.
    pub fn block_len(&self, ptr: usize) -> Option<usize> {
        self.allocated.get(&ptr).copied()
    }

    /// Total bytes in live blocks.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.values().sum()
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn first_fit(&self, size: usize) -> Option<usize> {
        self.free
            .iter()
            .find(|(_, len)| **len >= size)
            .map(|(start, _)| *start)
    }

    /// Adds enough pages that a block of `size` fits at the end of memory.
    fn grow(&mut self, size: usize) -> Option<()> {
        let old_len = self.memory.len();
        let trailing = self
            .free
            .range(..old_len)
            .next_back()
            .filter(|&(&start, &len)| start + len == old_len)
            .map(|(_, &len)| len)
            .unwrap_or(0);

        let needed = size - trailing.min(size);
        let pages = needed.div_ceil(PAGE_SIZE).max(1);
        let new_len = old_len.checked_add(pages * PAGE_SIZE)?;
        if new_len > MAX_MEMORY {
            return None;
        }

        self.memory.resize(new_len, 0);
        self.insert_free(old_len, new_len - old_len);
        Some(())
    }

    fn insert_free(&mut self, mut start: usize, mut len: usize) {
        if let Some((&prev, &prev_len)) = self.free.range(..start).next_back() {
            if prev + prev_len == start {
                self.free.remove(&prev);
                start = prev;
                len += prev_len;
            }
        }
        if let Some(next_len) = self.free.remove(&(start + len)) {
            len += next_len;
        }
        self.free.insert(start, len);
    }
}

impl Default for LinearHeap {
    fn default() -> Self {
        Self::new()
    }
}

fn round_up(len: usize) -> Option<usize> {
    len.checked_add(ALIGN - 1).map(|n| n & !(ALIGN - 1))
}
