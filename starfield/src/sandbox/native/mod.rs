//! In-process reference kernel.
//!
//! [`NativeKernel`] implements the kernel ABI over an emulated linear
//! memory, so the pool and the marshaling layer run exactly as they would
//! against a compiled module. Its catalog rows are
//! `right_ascension_deg,declination_deg,brightness`.

mod heap;
mod sky;

pub use heap::{LinearHeap, MAX_MEMORY, PAGE_SIZE};
#[cfg(test)]
pub(crate) use sky::local_sidereal_angle;

use sky::Star;

use super::{log_kernel_message, Kernel, KernelLoader, SandboxError};
use crate::coord::{Coordinate, ProjectedPoint};
use crate::layout::{Marshal, PrimitiveKind, Scalar, Value};
use crate::marshal;

/// Reference kernel backed by a [`LinearHeap`].
#[derive(Debug, Default)]
pub struct NativeKernel {
    heap: LinearHeap,
    stars: Vec<Star>,
}

impl NativeKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heap(&self) -> &LinearHeap {
        &self.heap
    }

    /// Number of stars loaded by `initialize`.
    pub fn star_count(&self) -> usize {
        self.stars.len()
    }
}

fn trap(entry: &'static str, reason: impl ToString) -> SandboxError {
    SandboxError::Trap {
        entry,
        reason: reason.to_string(),
    }
}

impl Kernel for NativeKernel {
    fn alloc(&mut self, len: u32) -> Result<u32, SandboxError> {
        // Like a compiled allocator, failure is reported as a null pointer.
        Ok(self.heap.alloc(len as usize).map_or(0, |ptr| ptr as u32))
    }

    fn free(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError> {
        self.heap.release(ptr as usize, len as usize)
    }

    fn memory(&self) -> &[u8] {
        self.heap.memory()
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.heap.memory_mut()
    }

    fn initialize(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError> {
        const ENTRY: &str = super::abi::INITIALIZE;
        let start = ptr as usize;
        let end = marshal::check_bounds(start, len as usize, self.heap.memory().len())
            .map_err(|e| trap(ENTRY, e))?;
        let text = std::str::from_utf8(&self.heap.memory()[start..end]).map_err(|e| trap(ENTRY, e))?;

        let (stars, malformed) = sky::parse_catalog(text);
        if malformed > 0 {
            log_kernel_message(&format!("Skipped {} malformed star rows", malformed));
        }
        log_kernel_message(&format!("Loaded {} stars", stars.len()));
        self.stars = stars;
        Ok(())
    }

    fn project_stars(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp_ms: i64,
        len_ptr: u32,
        result_ptr: u32,
    ) -> Result<(), SandboxError> {
        const ENTRY: &str = super::abi::PROJECT_STARS;
        if len_ptr == 0 || result_ptr == 0 {
            return Err(trap(ENTRY, "null result pointer"));
        }

        let observer = Coordinate::new(latitude, longitude);
        let points = sky::project(&self.stars, observer, timestamp_ms);
        let needed = points.len() * ProjectedPoint::descriptor().size_of();
        let available = self.heap.block_len(result_ptr as usize).unwrap_or(0);
        if needed > available {
            return Err(trap(
                ENTRY,
                format!("{} points need {} bytes, result block has {}", points.len(), needed, available),
            ));
        }

        let values: Vec<Value> = points.iter().map(Marshal::to_value).collect();
        let memory = self.heap.memory_mut();
        marshal::write_records(memory, &values, ProjectedPoint::descriptor(), result_ptr as usize)
            .map_err(|e| trap(ENTRY, e))?;
        marshal::write_primitive(
            memory,
            Scalar::U32(points.len() as u32),
            PrimitiveKind::U32,
            len_ptr as usize,
        )
        .map_err(|e| trap(ENTRY, e))?;
        Ok(())
    }

    fn find_waypoints(
        &mut self,
        start_ptr: u32,
        end_ptr: u32,
        count: u32,
    ) -> Result<u32, SandboxError> {
        const ENTRY: &str = super::abi::FIND_WAYPOINTS;
        let memory = self.heap.memory();
        let start: Coordinate =
            marshal::decode(memory, start_ptr as usize).map_err(|e| trap(ENTRY, e))?;
        let end: Coordinate = marshal::decode(memory, end_ptr as usize).map_err(|e| trap(ENTRY, e))?;

        let path = sky::great_circle(start, end, count as usize);
        let len = path.len() * Coordinate::descriptor().size_of();
        let Some(ptr) = self.heap.alloc(len) else {
            return Ok(0);
        };

        let values: Vec<Value> = path.iter().map(Marshal::to_value).collect();
        marshal::write_records(self.heap.memory_mut(), &values, Coordinate::descriptor(), ptr)
            .map_err(|e| trap(ENTRY, e))?;
        Ok(ptr as u32)
    }

    fn allocated_bytes(&self) -> Option<usize> {
        Some(self.heap.allocated_bytes())
    }
}

/// Loader for [`NativeKernel`]. The binary is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLoader;

impl KernelLoader for NativeLoader {
    fn name(&self) -> &str {
        "native"
    }

    fn load(&self, _binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError> {
        Ok(Box::new(NativeKernel::new()))
    }
}
