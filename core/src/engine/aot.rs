//! The ahead-of-time backend.
//!
//! Reuses the exact codegen path the JIT backend uses, but persists
//! wasmtime's serialized compiled artifact to `aot_cache_dir` keyed by the
//! netlist's content hash, plus a `manifest.json` sidecar recording what's
//! in the cache. A cache hit skips codegen and Cranelift compilation
//! entirely — the only cost left is `wasmtime::Module::deserialize`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use wasmtime::{Engine, Instance, Memory, Module, Store, TypedFunc};

use crate::error::{Result, SimError};
use crate::netlist::Netlist;
use crate::schedule::Schedule;

use super::codegen::{build_module, Layout};
use super::TickEngine;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    entries: HashMap<String, ManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestEntry {
    wire_count: u32,
    gate_count: u32,
    dff_count: u32,
    built_at_unix_secs: u64,
}

pub(crate) struct AotEngine {
    store: Store<()>,
    memory: Memory,
    tick_fn: TypedFunc<(), ()>,
    layout: Layout,
}

impl AotEngine {
    /// Loads a cached artifact for `netlist`'s content hash. On a cache
    /// miss, builds and caches one when `allow_fallback` permits it;
    /// otherwise reports the miss as [`SimError::AotCacheMiss`] so a caller
    /// with fallback disabled sees a returned error rather than a silent
    /// rebuild (§4.6.3, §7).
    pub fn load_or_build(netlist: &Netlist, schedule: &Schedule, cache_dir: &Path, allow_fallback: bool) -> Result<AotEngine> {
        let hash = netlist.content_hash();
        let layout = Layout::new(netlist);
        let engine = Engine::default();
        let artifact_path = cache_dir.join(format!("{hash}.cwasm"));

        let module = if artifact_path.exists() {
            load_cached(&engine, &artifact_path, &hash)?
        } else if allow_fallback {
            build_and_cache(&engine, netlist, schedule, &layout, &hash, &artifact_path, cache_dir)?
        } else {
            return Err(SimError::AotCacheMiss { netlist_hash: hash, cache_dir: cache_dir.display().to_string() });
        };

        instantiate(engine, module, layout, &hash)
    }
}

fn load_cached(engine: &Engine, path: &Path, hash: &str) -> Result<Module> {
    let bytes = fs::read(path).map_err(|e| SimError::CacheIo { path: path.to_path_buf(), source: e })?;
    // Safety: `bytes` was produced by this process's own `Module::serialize`
    // call, written under a content-hash-keyed path only this crate writes to.
    unsafe { Module::deserialize(engine, &bytes) }
        .map_err(|e| SimError::AotBuildFailed { netlist_hash: hash.to_string(), detail: e.to_string() })
}

fn build_and_cache(
    engine: &Engine,
    netlist: &Netlist,
    schedule: &Schedule,
    layout: &Layout,
    hash: &str,
    artifact_path: &Path,
    cache_dir: &Path,
) -> Result<Module> {
    let wasm_bytes = build_module(netlist, schedule, layout);
    let module = Module::new(engine, &wasm_bytes)
        .map_err(|e| SimError::AotBuildFailed { netlist_hash: hash.to_string(), detail: e.to_string() })?;

    let serialized = module
        .serialize()
        .map_err(|e| SimError::AotBuildFailed { netlist_hash: hash.to_string(), detail: e.to_string() })?;

    if let Err(e) = fs::create_dir_all(cache_dir) {
        warn!("could not create AOT cache dir {}: {e}", cache_dir.display());
        return Ok(module);
    }
    if let Err(e) = fs::write(artifact_path, &serialized) {
        warn!("could not write AOT artifact {}: {e}", artifact_path.display());
        return Ok(module);
    }
    update_manifest(cache_dir, hash, netlist);
    info!("cached AOT artifact for netlist {hash}");

    Ok(module)
}

fn update_manifest(cache_dir: &Path, hash: &str, netlist: &Netlist) {
    let manifest_path = cache_dir.join("manifest.json");
    let mut manifest: Manifest = fs::read(&manifest_path)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default();

    let built_at_unix_secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

    manifest.entries.insert(
        hash.to_string(),
        ManifestEntry {
            wire_count: netlist.wire_count,
            gate_count: netlist.gates.len() as u32,
            dff_count: netlist.dffs.len() as u32,
            built_at_unix_secs,
        },
    );

    if let Ok(bytes) = serde_json::to_vec_pretty(&manifest) {
        if let Err(e) = fs::write(&manifest_path, bytes) {
            warn!("could not update AOT manifest {}: {e}", manifest_path.display());
        }
    }
}

fn instantiate(engine: Engine, module: Module, layout: Layout, hash: &str) -> Result<AotEngine> {
    let mut store = Store::new(&engine, ());
    let instance = Instance::new(&mut store, &module, &[])
        .map_err(|e| SimError::AotBuildFailed { netlist_hash: hash.to_string(), detail: e.to_string() })?;

    let memory = instance.get_memory(&mut store, "memory").ok_or_else(|| SimError::AotBuildFailed {
        netlist_hash: hash.to_string(),
        detail: "cached module did not export `memory`".to_string(),
    })?;
    let tick_fn = instance
        .get_typed_func::<(), ()>(&mut store, "tick")
        .map_err(|e| SimError::AotBuildFailed { netlist_hash: hash.to_string(), detail: e.to_string() })?;

    Ok(AotEngine { store, memory, tick_fn, layout })
}

impl TickEngine for AotEngine {
    fn tick(&mut self, wires: &mut [u8], dff_curr: &[u8], dff_next: &mut [u8], module_inputs: &[u8]) {
        {
            let mem = self.memory.data_mut(&mut self.store);
            mem[..wires.len()].copy_from_slice(wires);
            let base = self.layout.dff_curr_base as usize;
            mem[base..base + dff_curr.len()].copy_from_slice(dff_curr);
            let base = self.layout.inputs_base as usize;
            mem[base..base + module_inputs.len()].copy_from_slice(module_inputs);
        }

        self.tick_fn
            .call(&mut self.store, ())
            .expect("cached `tick` export trapped; this indicates a stale or corrupt artifact");

        let mem = self.memory.data(&self.store);
        wires.copy_from_slice(&mem[..wires.len()]);
        let base = self.layout.dff_next_base as usize;
        dff_next.copy_from_slice(&mem[base..base + dff_next.len()]);
    }
}
