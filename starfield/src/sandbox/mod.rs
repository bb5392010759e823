//! Sandboxed numeric kernel access.
//!
//! A kernel is a compiled module with its own linear memory and a fixed set
//! of exported entry points. The host never shares memory with it: values
//! are marshaled into the kernel's memory, pointers and lengths are passed
//! as plain integers, and results are read back out.
//!
//! ```text
//!   host                                   kernel linear memory
//!   ────                                   ────────────────────
//!   SandboxHandle::alloc_object(&coord) ─▶ _wasm_alloc(16) ─▶ [lat|lon]
//!   SandboxHandle::find_waypoints(..)   ─▶ findWaypointsWasm(p, q, n)
//!   SandboxHandle::read_array(ptr, n)   ◀─ [lat|lon][lat|lon]...
//! ```
//!
//! # Backends
//!
//! - [`NativeKernel`] runs the same ABI in-process over an emulated linear
//!   memory. It needs no binary and is what tests use.
//! - `WasmKernel` (feature `wasm`) instantiates a WebAssembly binary with
//!   wasmtime.

mod handle;
pub mod native;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use handle::{ResultBuffers, SandboxHandle};
pub use native::{NativeKernel, NativeLoader};
#[cfg(feature = "wasm")]
pub use wasm::{WasmKernel, WasmLoader};

use std::fmt;
use std::num::NonZeroU32;

use tracing::info;

use crate::marshal::MarshalError;

/// Export names of the kernel ABI.
pub mod abi {
    pub const ALLOC: &str = "_wasm_alloc";
    pub const FREE: &str = "_wasm_free";
    pub const INITIALIZE: &str = "initialize";
    pub const PROJECT_STARS: &str = "projectStarsWasm";
    pub const FIND_WAYPOINTS: &str = "findWaypointsWasm";
    pub const MEMORY: &str = "memory";
    /// Host import the kernel calls with `(ptr, len)` to log a message.
    pub const CONSOLE_LOG: (&str, &str) = ("env", "consoleLog");
}

/// A non-null address in a kernel's linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer(NonZeroU32);

impl Pointer {
    /// Wraps a raw address, returning `None` for null.
    pub fn new(addr: u32) -> Option<Self> {
        NonZeroU32::new(addr).map(Self)
    }

    /// Raw address as passed across the ABI.
    #[inline]
    pub fn addr(self) -> u32 {
        self.0.get()
    }

    /// Address as a byte offset into linear memory.
    #[inline]
    pub fn offset(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0.get())
    }
}

/// Errors raised while loading or calling into a kernel.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to load kernel: {0}")]
    Load(String),

    #[error("kernel does not export '{0}'")]
    MissingExport(String),

    #[error("kernel trapped in {entry}: {reason}")]
    Trap { entry: &'static str, reason: String },

    /// An entry point that must return an address returned 0.
    #[error("kernel returned a null pointer from {0}")]
    NullPointer(&'static str),

    #[error("allocation of {0} bytes exceeds the 32-bit address space")]
    TooLarge(usize),

    #[error("free of {len} bytes at {ptr:#x} does not match a live allocation")]
    InvalidFree { ptr: u32, len: u32 },

    #[error("kernel reported {count} points but the result buffer holds {capacity}")]
    ResultOverflow { count: u32, capacity: u32 },

    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

/// The raw kernel ABI.
///
/// Arguments and results are the integers and floats that cross the
/// boundary. Nothing here knows about record layouts; that is the job of
/// [`SandboxHandle`].
pub trait Kernel: Send {
    /// `_wasm_alloc(len) -> ptr`. A return of 0 means the allocation failed.
    fn alloc(&mut self, len: u32) -> Result<u32, SandboxError>;

    /// `_wasm_free(ptr, len)`.
    fn free(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError>;

    /// The whole linear memory.
    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];

    /// `initialize(ptr, len)`: loads the star catalog text at `ptr`.
    fn initialize(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError>;

    /// `projectStarsWasm(lat, lon, ts, len_ptr, result_ptr)`.
    ///
    /// Writes the point count as a `u32` at `len_ptr` and the points at
    /// `result_ptr`.
    fn project_stars(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp_ms: i64,
        len_ptr: u32,
        result_ptr: u32,
    ) -> Result<(), SandboxError>;

    /// `findWaypointsWasm(start_ptr, end_ptr, count) -> ptr`.
    ///
    /// The returned block holds `count` coordinates and belongs to the
    /// caller.
    fn find_waypoints(&mut self, start_ptr: u32, end_ptr: u32, count: u32)
        -> Result<u32, SandboxError>;

    /// Bytes currently allocated, for backends that track it.
    fn allocated_bytes(&self) -> Option<usize> {
        None
    }
}

/// Builds kernels from a binary. One loader is shared by every worker.
pub trait KernelLoader: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn load(&self, binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError>;
}

/// Emits a message from a kernel's diagnostic channel.
pub(crate) fn log_kernel_message(message: &str) {
    info!(target: "starfield::kernel", "[kernel] {}", message);
}
