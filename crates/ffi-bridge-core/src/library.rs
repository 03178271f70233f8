//! A live instance of a wrapped library.
//!
//! [`ForeignLibrary`] owns the Wasmtime store and instance and implements
//! [`Foreign`] over them: the exported linear memory, the allocator pair,
//! destructor invocation and write buffers.
//!
//! Every method takes `&mut self`, so at most one foreign call is in flight
//! per instance. Memory views are re-derived from the store on every access,
//! which keeps them valid across `memory.grow`.

use tracing::{debug, trace};
use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};

use crate::alloc::Allocator;
use crate::finalize::FinalizationQueue;
use crate::foreign::Foreign;
use crate::memory::{ForeignPtr, LinearMemory};
use crate::store::{CallMetrics, LibraryContext, LogEntry};
use ffi_bridge_common::{AbiConfig, RuntimeError};

/// An instantiated foreign library.
pub struct ForeignLibrary {
    store: Store<LibraryContext>,
    instance: Instance,
    memory: Memory,
    alloc: TypedFunc<(u32, u32), u32>,
    free: TypedFunc<(u32, u32, u32), ()>,
    abi: AbiConfig,
    finalizers: FinalizationQueue,
}

impl ForeignLibrary {
    /// Bind the runtime exports of an instantiated library.
    ///
    /// # Errors
    ///
    /// `ExportNotFound` if the memory or allocator exports are missing or
    /// have unexpected types.
    pub fn new(mut store: Store<LibraryContext>, instance: Instance, abi: AbiConfig) -> Result<Self, RuntimeError> {
        let memory = instance
            .get_memory(&mut store, &abi.memory_export)
            .ok_or_else(|| RuntimeError::export_not_found(&abi.memory_export))?;

        let alloc = instance
            .get_typed_func::<(u32, u32), u32>(&mut store, &abi.alloc_export)
            .map_err(|_| RuntimeError::export_not_found(&abi.alloc_export))?;

        let free = instance
            .get_typed_func::<(u32, u32, u32), ()>(&mut store, &abi.free_export)
            .map_err(|_| RuntimeError::export_not_found(&abi.free_export))?;

        debug!(
            library_id = %store.data().library_id,
            instance_id = %store.data().instance_id,
            memory_size = memory.data_size(&store),
            "Foreign library bound"
        );

        Ok(Self {
            store,
            instance,
            memory,
            alloc,
            free,
            abi,
            finalizers: FinalizationQueue::new(),
        })
    }

    /// Call the export `name`.
    ///
    /// # Errors
    ///
    /// `ExportNotFound` if no function with that name and signature is
    /// exported, `Trap` if the call traps.
    pub fn call<P: WasmParams, R: WasmResults>(&mut self, name: &str, params: P) -> Result<R, RuntimeError> {
        invoke(&mut self.store, self.instance, name, params)
    }

    /// Returns `true` if the library exports a function called `name`.
    pub fn has_export(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    /// Identifier of the wrapped library.
    pub fn library_id(&self) -> &str {
        &self.store.data().library_id
    }

    /// The runtime export names in use.
    pub fn abi(&self) -> &AbiConfig {
        &self.abi
    }

    /// Boundary traffic counters.
    pub fn metrics(&self) -> CallMetrics {
        self.store.data().metrics
    }

    /// Console output collected so far.
    pub fn logs(&self) -> &[LogEntry] {
        &self.store.data().logs
    }

    /// Take the console output collected so far.
    pub fn take_logs(&mut self) -> Vec<LogEntry> {
        self.store.data_mut().take_logs()
    }

    /// Store state, as seen by host functions.
    pub fn context(&self) -> &LibraryContext {
        self.store.data()
    }
}

fn invoke<P: WasmParams, R: WasmResults>(
    store: &mut Store<LibraryContext>,
    instance: Instance,
    name: &str,
    params: P,
) -> Result<R, RuntimeError> {
    let func = instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|_| RuntimeError::export_not_found(name))?;

    store.data_mut().metrics.calls += 1;
    trace!(export = name, "Foreign call");

    func.call(&mut *store, params)
        .map_err(|e| RuntimeError::trap(format!("{name}: {e:#}")))
}

impl LinearMemory for ForeignLibrary {
    fn bytes(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }

    fn size(&self) -> usize {
        self.memory.data_size(&self.store)
    }
}

impl Allocator for ForeignLibrary {
    fn raw_alloc(&mut self, size: u32, align: u32) -> Result<ForeignPtr, RuntimeError> {
        let ptr = self
            .alloc
            .call(&mut self.store, (size, align))
            .map_err(|e| RuntimeError::trap(format!("{}: {e:#}", self.abi.alloc_export)))?;

        if ptr != 0 {
            self.store.data_mut().metrics.allocations += 1;
        }
        Ok(ForeignPtr::new(ptr))
    }

    fn raw_free(&mut self, ptr: ForeignPtr, size: u32, align: u32) -> Result<(), RuntimeError> {
        self.free
            .call(&mut self.store, (ptr.addr(), size, align))
            .map_err(|e| RuntimeError::trap(format!("{}: {e:#}", self.abi.free_export)))?;

        self.store.data_mut().metrics.frees += 1;
        Ok(())
    }
}

impl Foreign for ForeignLibrary {
    fn destroy(&mut self, destructor: &str, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        invoke::<u32, ()>(&mut self.store, self.instance, destructor, ptr.addr())?;
        self.store.data_mut().metrics.destructors += 1;
        Ok(())
    }

    fn write_create(&mut self, capacity: u32) -> Result<ForeignPtr, RuntimeError> {
        invoke::<u32, u32>(&mut self.store, self.instance, &self.abi.write_create_export, capacity)
            .map(ForeignPtr::new)
    }

    fn write_get_bytes(&mut self, write: ForeignPtr) -> Result<ForeignPtr, RuntimeError> {
        invoke::<u32, u32>(&mut self.store, self.instance, &self.abi.write_bytes_export, write.addr())
            .map(ForeignPtr::new)
    }

    fn write_len(&mut self, write: ForeignPtr) -> Result<u32, RuntimeError> {
        invoke(&mut self.store, self.instance, &self.abi.write_len_export, write.addr())
    }

    fn write_destroy(&mut self, write: ForeignPtr) -> Result<(), RuntimeError> {
        invoke(&mut self.store, self.instance, &self.abi.write_destroy_export, write.addr())
    }

    fn finalizers(&self) -> &FinalizationQueue {
        &self.finalizers
    }
}

impl Drop for ForeignLibrary {
    fn drop(&mut self) {
        // Handles dropped after their last call still get their destructors.
        if let Err(e) = self.collect() {
            debug!(error = %e, "Finalizers failed during library teardown");
        }
    }
}

impl std::fmt::Debug for ForeignLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ctx = self.store.data();
        f.debug_struct("ForeignLibrary")
            .field("library_id", &ctx.library_id)
            .field("instance_id", &ctx.instance_id)
            .field("memory_size", &self.size())
            .field("pending_finalizers", &self.finalizers.len())
            .finish_non_exhaustive()
    }
}
