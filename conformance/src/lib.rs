//! Shared scaffolding for the conformance suite in `tests/`: building a
//! pinned-backend [`Simulator`] and sampling its observable trace (the
//! GLOSSARY's "sequence of (cycle, wire-value-vector, DFF-state-vector,
//! bus-transaction-list) tuples") for cross-engine comparison.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use netforge_core::prelude::*;

/// A [`FlatMemory`] behind a shared handle, so a test can attach one copy to
/// a [`Simulator`] (which takes ownership of its bus) while keeping another
/// handle to inspect memory contents after the run.
#[derive(Clone)]
pub struct SharedMemory(Rc<RefCell<FlatMemory>>);

impl SharedMemory {
    pub fn with_program(size: usize, program: &[u8], origin: u16) -> SharedMemory {
        SharedMemory(Rc::new(RefCell::new(FlatMemory::with_program(size, program, origin))))
    }

    pub fn byte(&self, addr: u16) -> u8 {
        self.0.borrow().as_slice()[addr as usize]
    }
}

impl MemoryBus for SharedMemory {
    fn read(&mut self, addr: u16) -> Result<u8, String> {
        self.0.borrow_mut().read(addr)
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), String> {
        self.0.borrow_mut().write(addr, data)
    }
}

/// Every backend a legal design must agree across.
pub const ALL_BACKENDS: [Backend; 3] = [Backend::Interp, Backend::Jit, Backend::Aot];

/// One cycle's worth of comparable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSample {
    pub cycle: u64,
    pub wires: Vec<u8>,
    pub dffs: Vec<u8>,
}

pub fn sample(sim: &Simulator) -> TraceSample {
    TraceSample { cycle: sim.cycle_count(), wires: sim.wires().to_vec(), dffs: sim.dff_state().to_vec() }
}

static AOT_CACHE_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A cache directory no other call in this process (or any other test
/// binary running concurrently) can collide with. The Aot backend keys its
/// `.cwasm`/`manifest.json` files by netlist content hash, so two test
/// threads building the same fixture against the real platform cache dir
/// race on identical paths; every Aot simulator gets its own directory
/// instead, the same way `scenario_e_cross_engine_divergence_guard` isolates
/// its own cache subdirectory.
fn isolated_aot_cache_dir() -> std::path::PathBuf {
    let id = AOT_CACHE_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("netforge-conformance-aot-cache-{}-{id}", std::process::id()))
}

/// Builds a [`Simulator`] pinned to `backend`, with fallback disabled.
///
/// Conformance tests exist specifically to exercise each backend in turn; a
/// silent fallback to the interpreter on a JIT/AOT hiccup would hide exactly
/// the bug these tests are checking for.
pub fn simulator_on(registry: &Registry, top: &str, backend: Backend) -> Result<Simulator> {
    let mut config = EngineConfig::new(backend).with_fallback(false);
    if backend == Backend::Aot {
        config = config.with_cache_dir(isolated_aot_cache_dir());
    }
    Simulator::new(registry, top, &config)
}

/// Registers a single top-level module under its own name and returns the
/// registry, for fixtures that don't need submodule instances.
pub fn solo_registry(module: Module) -> (Registry, String) {
    let name = module.name.clone();
    let mut registry = Registry::new();
    registry.register(module);
    (registry, name)
}
