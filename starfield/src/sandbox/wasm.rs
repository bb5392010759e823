//! WebAssembly kernels via wasmtime.
//!
//! The module must export `memory`, `_wasm_alloc`, `_wasm_free`,
//! `initialize`, `projectStarsWasm` and `findWaypointsWasm`, and may import
//! `env.consoleLog(ptr, len)` for diagnostics. Signatures are fixed here and
//! checked once at load time.

use tracing::{debug, warn};
use wasmtime::{
    Caller, Engine, Extern, Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams,
    WasmResults,
};

use super::{abi, log_kernel_message, Kernel, KernelLoader, SandboxError};

/// Compiles and instantiates kernels on a shared [`Engine`].
#[derive(Clone, Default)]
pub struct WasmLoader {
    engine: Engine,
}

impl WasmLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KernelLoader for WasmLoader {
    fn name(&self) -> &str {
        "wasm"
    }

    fn load(&self, binary: &[u8]) -> Result<Box<dyn Kernel>, SandboxError> {
        let module =
            Module::new(&self.engine, binary).map_err(|e| SandboxError::Load(format!("{e:#}")))?;

        let mut linker: Linker<()> = Linker::new(&self.engine);
        let (import_module, import_name) = abi::CONSOLE_LOG;
        linker
            .func_wrap(import_module, import_name, console_log)
            .map_err(|e| SandboxError::Load(format!("{e:#}")))?;

        let mut store = Store::new(&self.engine, ());
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| SandboxError::Load(format!("{e:#}")))?;

        let memory = instance
            .get_memory(&mut store, abi::MEMORY)
            .ok_or_else(|| SandboxError::MissingExport(abi::MEMORY.to_string()))?;

        let kernel = WasmKernel {
            alloc: typed(&instance, &mut store, abi::ALLOC)?,
            free: typed(&instance, &mut store, abi::FREE)?,
            initialize: typed(&instance, &mut store, abi::INITIALIZE)?,
            project_stars: typed(&instance, &mut store, abi::PROJECT_STARS)?,
            find_waypoints: typed(&instance, &mut store, abi::FIND_WAYPOINTS)?,
            memory,
            store,
        };
        debug!(pages = kernel.memory.size(&kernel.store), "Instantiated wasm kernel");
        Ok(Box::new(kernel))
    }
}

/// Host side of `env.consoleLog`.
fn console_log(mut caller: Caller<'_, ()>, ptr: i32, len: i32) {
    let Some(Extern::Memory(memory)) = caller.get_export(abi::MEMORY) else {
        warn!("Kernel logged a message but exports no memory");
        return;
    };
    let data = memory.data(&caller);
    let start = ptr as u32 as usize;
    let end = start.saturating_add(len as u32 as usize);
    match data.get(start..end) {
        Some(bytes) => log_kernel_message(&String::from_utf8_lossy(bytes)),
        None => warn!(ptr, len, "Kernel log message is out of bounds"),
    }
}

fn typed<P, R>(
    instance: &Instance,
    store: &mut Store<()>,
    name: &str,
) -> Result<TypedFunc<P, R>, SandboxError>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| SandboxError::MissingExport(format!("{name}: {e:#}")))
}

/// One instantiated WebAssembly kernel.
pub struct WasmKernel {
    store: Store<()>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    free: TypedFunc<(i32, i32), ()>,
    initialize: TypedFunc<(i32, i32), ()>,
    project_stars: TypedFunc<(f64, f64, i64, i32, i32), ()>,
    find_waypoints: TypedFunc<(i32, i32, i32), i32>,
}

fn trap(entry: &'static str) -> impl FnOnce(wasmtime::Error) -> SandboxError {
    move |e| SandboxError::Trap {
        entry,
        reason: format!("{e:#}"),
    }
}

impl Kernel for WasmKernel {
    fn alloc(&mut self, len: u32) -> Result<u32, SandboxError> {
        self.alloc
            .call(&mut self.store, len as i32)
            .map(|ptr| ptr as u32)
            .map_err(trap(abi::ALLOC))
    }

    fn free(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError> {
        self.free
            .call(&mut self.store, (ptr as i32, len as i32))
            .map_err(trap(abi::FREE))
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }

    fn initialize(&mut self, ptr: u32, len: u32) -> Result<(), SandboxError> {
        self.initialize
            .call(&mut self.store, (ptr as i32, len as i32))
            .map_err(trap(abi::INITIALIZE))
    }

    fn project_stars(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp_ms: i64,
        len_ptr: u32,
        result_ptr: u32,
    ) -> Result<(), SandboxError> {
        self.project_stars
            .call(
                &mut self.store,
                (
                    latitude,
                    longitude,
                    timestamp_ms,
                    len_ptr as i32,
                    result_ptr as i32,
                ),
            )
            .map_err(trap(abi::PROJECT_STARS))
    }

    fn find_waypoints(
        &mut self,
        start_ptr: u32,
        end_ptr: u32,
        count: u32,
    ) -> Result<u32, SandboxError> {
        self.find_waypoints
            .call(&mut self.store, (start_ptr as i32, end_ptr as i32, count as i32))
            .map(|ptr| ptr as u32)
            .map_err(trap(abi::FIND_WAYPOINTS))
    }
}
