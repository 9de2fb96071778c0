//! The just-in-time backend.
//!
//! Generates the straight-line Wasm module described in
//! [`super::codegen`], hands it to `wasmtime`, and lets wasmtime's own
//! backend JIT-compile it to native code on first instantiation. Every
//! later `tick` call is a host→guest memory copy, one exported-function
//! call, and a guest→host memory copy back — no interpretation loop runs
//! inside the guest.

use wasmtime::{Engine, Instance, Memory, Module, Store, TypedFunc};

use crate::error::{Result, SimError};
use crate::netlist::Netlist;
use crate::schedule::Schedule;

use super::codegen::{build_module, Layout};
use super::TickEngine;

pub(crate) struct JitEngine {
    store: Store<()>,
    memory: Memory,
    tick_fn: TypedFunc<(), ()>,
    layout: Layout,
}

impl JitEngine {
    pub fn new(netlist: &Netlist, schedule: &Schedule) -> Result<JitEngine> {
        let layout = Layout::new(netlist);
        let wasm_bytes = build_module(netlist, schedule, &layout);
        let hash = || netlist.content_hash();

        let engine = Engine::default();
        let module = Module::new(&engine, &wasm_bytes)
            .map_err(|e| SimError::JitCodegenFailed { netlist_hash: hash(), detail: e.to_string() })?;
        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| SimError::JitCodegenFailed { netlist_hash: hash(), detail: e.to_string() })?;

        let memory = instance.get_memory(&mut store, "memory").ok_or_else(|| SimError::JitCodegenFailed {
            netlist_hash: hash(),
            detail: "generated module did not export `memory`".to_string(),
        })?;
        let tick_fn = instance
            .get_typed_func::<(), ()>(&mut store, "tick")
            .map_err(|e| SimError::JitCodegenFailed { netlist_hash: hash(), detail: e.to_string() })?;

        Ok(JitEngine { store, memory, tick_fn, layout })
    }
}

impl TickEngine for JitEngine {
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
            .expect("generated `tick` export trapped; this indicates a codegen bug");

        let mem = self.memory.data(&self.store);
        wires.copy_from_slice(&mem[..wires.len()]);
        let base = self.layout.dff_next_base as usize;
        dff_next.copy_from_slice(&mem[base..base + dff_next.len()]);
    }
}
