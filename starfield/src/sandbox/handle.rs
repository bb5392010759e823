//! Typed access to one kernel instance.

use tracing::{debug, error};

use super::{Kernel, KernelLoader, Pointer, SandboxError};
use crate::coord::{Coordinate, ProjectedPoint};
use crate::layout::{Descriptor, Marshal, PrimitiveKind, Scalar, Value};
use crate::marshal::{self, MarshalError};

/// Reusable buffers a kernel writes projection results into.
///
/// Allocated once per worker and passed back with every PROJECT so the
/// kernel memory does not churn between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultBuffers {
    /// Four bytes holding the `u32` point count.
    pub len_ptr: Pointer,
    /// Room for `capacity` projected points.
    pub result_ptr: Pointer,
    pub capacity: u32,
}

/// One loaded kernel plus the marshaling needed to talk to it.
///
/// All memory access goes through the marshal functions, bounds-checked
/// against the kernel's current linear memory.
pub struct SandboxHandle {
    kernel: Box<dyn Kernel>,
}

impl SandboxHandle {
    pub fn new(kernel: Box<dyn Kernel>) -> Self {
        Self { kernel }
    }

    /// Loads `binary` with `loader`.
    pub fn load(loader: &dyn KernelLoader, binary: &[u8]) -> Result<Self, SandboxError> {
        Ok(Self::new(loader.load(binary)?))
    }

    /// Allocates `len` bytes in kernel memory.
    pub fn alloc_bytes(&mut self, len: usize) -> Result<Pointer, SandboxError> {
        let len = u32::try_from(len).map_err(|_| SandboxError::TooLarge(len))?;
        let addr = self.kernel.alloc(len)?;
        Pointer::new(addr).ok_or(SandboxError::NullPointer(super::abi::ALLOC))
    }

    pub fn free_bytes(&mut self, ptr: Pointer, len: usize) -> Result<(), SandboxError> {
        let len = u32::try_from(len).map_err(|_| SandboxError::TooLarge(len))?;
        self.kernel.free(ptr.addr(), len)
    }

    /// Decodes `len` bytes at `ptr` as UTF-8, replacing invalid sequences.
    pub fn read_string(&self, ptr: Pointer, len: usize) -> Result<String, SandboxError> {
        let memory = self.kernel.memory();
        let end = marshal_bounds(ptr.offset(), len, memory.len())?;
        Ok(String::from_utf8_lossy(&memory[ptr.offset()..end]).into_owned())
    }

    /// Copies `text` into kernel memory as UTF-8, returning the pointer and
    /// byte length.
    pub fn alloc_string(&mut self, text: &str) -> Result<(Pointer, usize), SandboxError> {
        let bytes = text.as_bytes();
        let ptr = self.alloc_bytes(bytes.len())?;
        let memory = self.kernel.memory_mut();
        match marshal_bounds(ptr.offset(), bytes.len(), memory.len()) {
            Ok(end) => {
                memory[ptr.offset()..end].copy_from_slice(bytes);
                Ok((ptr, bytes.len()))
            }
            Err(e) => {
                self.release(ptr, bytes.len());
                Err(e)
            }
        }
    }

    /// Allocates and writes a single primitive.
    ///
    /// If the write fails the block is freed again; bounds failures are
    /// logged with the attempted and available sizes.
    pub fn alloc_primitive(
        &mut self,
        value: Scalar,
        kind: PrimitiveKind,
    ) -> Result<Pointer, SandboxError> {
        let ptr = self.alloc_bytes(kind.size())?;
        let written = marshal::write_primitive(self.kernel.memory_mut(), value, kind, ptr.offset());
        if let Err(e) = written {
            if let MarshalError::OutOfBounds {
                size, available, ..
            } = e
            {
                error!(
                    ptr = %ptr,
                    attempted = size,
                    available = available.saturating_sub(ptr.offset()),
                    "Could not write primitive into kernel memory"
                );
            }
            self.release(ptr, kind.size());
            return Err(e.into());
        }
        Ok(ptr)
    }

    pub fn read_primitive(
        &self,
        ptr: Pointer,
        kind: PrimitiveKind,
    ) -> Result<Scalar, SandboxError> {
        Ok(marshal::read_primitive(
            self.kernel.memory(),
            kind,
            ptr.offset(),
        )?)
    }

    /// Allocates and writes one record.
    pub fn alloc_object<T: Marshal>(&mut self, item: &T) -> Result<Pointer, SandboxError> {
        self.alloc_records(std::slice::from_ref(&item.to_value()), T::descriptor())
    }

    pub fn read_object<T: Marshal>(&self, ptr: Pointer) -> Result<T, SandboxError> {
        Ok(marshal::decode(self.kernel.memory(), ptr.offset())?)
    }

    /// Allocates `items.len() * size_of` bytes and writes the items back to
    /// back.
    pub fn alloc_array<T: Marshal>(&mut self, items: &[T]) -> Result<Pointer, SandboxError> {
        let values: Vec<Value> = items.iter().map(Marshal::to_value).collect();
        self.alloc_records(&values, T::descriptor())
    }

    /// Reads `count` records at `ptr` without allocating kernel memory.
    pub fn read_array<T: Marshal>(
        &self,
        ptr: Pointer,
        count: usize,
    ) -> Result<Vec<T>, SandboxError> {
        let values = self.read_records(ptr, count, T::descriptor())?;
        Ok(values.iter().map(T::from_value).collect())
    }

    /// Allocates and writes dynamic records laid out as `descriptor`.
    ///
    /// # Panics
    ///
    /// Panics if a value does not match `descriptor`.
    pub fn alloc_records(
        &mut self,
        values: &[Value],
        descriptor: &Descriptor,
    ) -> Result<Pointer, SandboxError> {
        let len = descriptor.size_of() * values.len();
        let ptr = self.alloc_bytes(len)?;
        let written =
            marshal::write_records(self.kernel.memory_mut(), values, descriptor, ptr.offset());
        if let Err(e) = written {
            self.release(ptr, len);
            return Err(e.into());
        }
        Ok(ptr)
    }

    pub fn read_records(
        &self,
        ptr: Pointer,
        count: usize,
        descriptor: &Descriptor,
    ) -> Result<Vec<Value>, SandboxError> {
        Ok(marshal::read_records(
            self.kernel.memory(),
            descriptor,
            ptr.offset(),
            count,
        )?)
    }

    /// Allocates projection buffers with room for `rows` points.
    pub fn alloc_result_buffers(&mut self, rows: usize) -> Result<ResultBuffers, SandboxError> {
        let capacity = u32::try_from(rows).map_err(|_| SandboxError::TooLarge(rows))?;
        let len_ptr = self.alloc_bytes(PrimitiveKind::U32.size())?;
        let result_ptr = match self.alloc_bytes(rows * ProjectedPoint::descriptor().size_of()) {
            Ok(ptr) => ptr,
            Err(e) => {
                self.release(len_ptr, PrimitiveKind::U32.size());
                return Err(e);
            }
        };
        Ok(ResultBuffers {
            len_ptr,
            result_ptr,
            capacity,
        })
    }

    /// Frees buffers from [`alloc_result_buffers`](Self::alloc_result_buffers).
    pub fn free_result_buffers(&mut self, buffers: ResultBuffers) -> Result<(), SandboxError> {
        self.free_bytes(buffers.len_ptr, PrimitiveKind::U32.size())?;
        self.free_bytes(
            buffers.result_ptr,
            buffers.capacity as usize * ProjectedPoint::descriptor().size_of(),
        )
    }

    /// Hands the star catalog to the kernel.
    ///
    /// The catalog text stays in kernel memory; the kernel owns it from
    /// here on.
    pub fn initialize(&mut self, stars: &str) -> Result<(), SandboxError> {
        let (ptr, len) = self.alloc_string(stars)?;
        debug!(ptr = %ptr, bytes = len, "Initializing kernel");
        self.kernel.initialize(ptr.addr(), len as u32)
    }

    /// Projects the catalog for an observer into `buffers` and reads the
    /// points back.
    pub fn project_stars(
        &mut self,
        observer: Coordinate,
        timestamp_ms: i64,
        buffers: &ResultBuffers,
    ) -> Result<Vec<ProjectedPoint>, SandboxError> {
        self.kernel.project_stars(
            observer.latitude,
            observer.longitude,
            timestamp_ms,
            buffers.len_ptr.addr(),
            buffers.result_ptr.addr(),
        )?;

        let count = match self.read_primitive(buffers.len_ptr, PrimitiveKind::U32)? {
            Scalar::U32(n) => n,
            other => unreachable!("u32 read returned {:?}", other),
        };
        if count > buffers.capacity {
            return Err(SandboxError::ResultOverflow {
                count,
                capacity: buffers.capacity,
            });
        }
        self.read_array(buffers.result_ptr, count as usize)
    }

    /// Computes `count` waypoints along the path from `start` to `end`.
    ///
    /// Every block allocated for the call, including the kernel's result,
    /// is freed before returning.
    pub fn find_waypoints(
        &mut self,
        start: Coordinate,
        end: Coordinate,
        count: u32,
    ) -> Result<Vec<Coordinate>, SandboxError> {
        let coord_size = Coordinate::descriptor().size_of();
        let start_ptr = self.alloc_object(&start)?;
        let end_ptr = match self.alloc_object(&end) {
            Ok(ptr) => ptr,
            Err(e) => {
                self.release(start_ptr, coord_size);
                return Err(e);
            }
        };

        let result = self
            .kernel
            .find_waypoints(start_ptr.addr(), end_ptr.addr(), count)
            .and_then(|addr| {
                Pointer::new(addr).ok_or(SandboxError::NullPointer(super::abi::FIND_WAYPOINTS))
            })
            .and_then(|result_ptr| {
                let waypoints = self.read_array(result_ptr, count as usize);
                self.release(result_ptr, count as usize * coord_size);
                waypoints
            });

        self.release(start_ptr, coord_size);
        self.release(end_ptr, coord_size);
        result
    }

    /// Raw kernel access.
    pub fn kernel(&self) -> &dyn Kernel {
        self.kernel.as_ref()
    }

    /// Frees a block on a cleanup path, logging instead of failing.
    fn release(&mut self, ptr: Pointer, len: usize) {
        if let Err(e) = self.free_bytes(ptr, len) {
            error!(ptr = %ptr, len, error = %e, "Failed to free kernel memory");
        }
    }
}

fn marshal_bounds(offset: usize, len: usize, available: usize) -> Result<usize, SandboxError> {
    Ok(marshal::check_bounds(offset, len, available)?)
}
