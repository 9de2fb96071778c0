//! The simulation engines and the driver facade that wraps
//! whichever one is active behind a single stepping API.
//!
//! [`TickEngine`] is the contract every backend must honor: given the
//! current wire values, the current DFF state, and the asserted module
//! inputs, compute every gate's output and every DFF's next state. The
//! three implementations ([`interp::Interp`], [`jit::JitEngine`],
//! [`aot::AotEngine`]) must agree bit-for-bit on every call —
//! [`Simulator`] never assumes which one is behind the trait object.

pub mod bus;
pub(crate) mod aot;
pub(crate) mod codegen;
pub(crate) mod interp;
pub(crate) mod jit;

use std::collections::HashMap;

use log::warn;

use crate::config::EngineConfig;
use crate::error::{Result, SimError};
use crate::ir::registry::Registry;
use crate::netlist::{Netlist, PortBits, WireId};
use crate::schedule::{build_schedule, Schedule};

pub use bus::{FlatMemory, MemoryBus};

/// Which backend is computing a [`Simulator`]'s gate/DFF updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Tree-walking interpreter. Always available, the reference
    /// every other backend is checked against.
    Interp,
    /// Wasm-encoder/wasmtime JIT. First call pays codegen cost.
    Jit,
    /// Precompiled, on-disk-cached artifact.
    Aot,
}

/// The per-cycle update contract every simulation backend implements.
///
/// `wires` holds every flattened net bit (0/1 per byte); `dff_curr`/
/// `dff_next` hold one byte per DFF; `module_inputs` holds the top-level
/// input bits in port-declaration order. A call recomputes every gate
/// output into `wires` and every DFF's next-state byte into `dff_next`,
/// leaving `dff_curr` untouched — committing a cycle is the caller's job.
pub(crate) trait TickEngine {
    fn tick(&mut self, wires: &mut [u8], dff_curr: &[u8], dff_next: &mut [u8], module_inputs: &[u8]);
}

fn input_bit_ranges(ports: &[PortBits]) -> HashMap<String, (usize, usize)> {
    let mut ranges = HashMap::new();
    let mut offset = 0usize;
    for port in ports {
        let len = port.wires.len();
        ranges.insert(port.name.clone(), (offset, len));
        offset += len;
    }
    ranges
}

fn read_bits(wires: &[u8], port: &PortBits) -> u64 {
    let mut value = 0u64;
    for (i, &w) in port.wires.iter().enumerate() {
        if wires[w as usize] != 0 {
            value |= 1 << i;
        }
    }
    value
}

fn write_bits(buf: &mut [u8], start: usize, len: usize, value: u64) {
    for i in 0..len {
        buf[start + i] = ((value >> i) & 1) as u8;
    }
}

fn build_engine(
    netlist: &Netlist,
    schedule: &Schedule,
    backend: Backend,
    cfg: &EngineConfig,
) -> Result<(Box<dyn TickEngine>, Backend)> {
    match backend {
        Backend::Interp => Ok((Box::new(interp::Interp::new(netlist, schedule)), Backend::Interp)),
        Backend::Jit => match jit::JitEngine::new(netlist, schedule) {
            Ok(engine) => Ok((Box::new(engine), Backend::Jit)),
            Err(err) if cfg.allow_fallback => {
                warn!("JIT engine unavailable ({err}), falling back to interpreter");
                Ok((Box::new(interp::Interp::new(netlist, schedule)), Backend::Interp))
            }
            Err(err) => Err(err),
        },
        Backend::Aot => match aot::AotEngine::load_or_build(netlist, schedule, &cfg.aot_cache_dir, cfg.allow_fallback) {
            Ok(engine) => Ok((Box::new(engine), Backend::Aot)),
            Err(err) if cfg.allow_fallback => {
                warn!("AOT engine unavailable ({err}), falling back to JIT");
                match jit::JitEngine::new(netlist, schedule) {
                    Ok(engine) => Ok((Box::new(engine), Backend::Jit)),
                    Err(jit_err) => {
                        warn!("JIT fallback also unavailable ({jit_err}), falling back to interpreter");
                        Ok((Box::new(interp::Interp::new(netlist, schedule)), Backend::Interp))
                    }
                }
            }
            Err(err) => Err(err),
        },
    }
}

/// The clocked, memory-bus-aware driver facade. Owns one backend
/// engine and the wire/DFF state vectors it steps, and implements the
/// five-phase cycle of §4.4.1 so every backend sees the same sequencing.
pub struct Simulator {
    module_name: String,
    netlist: Netlist,
    engine: Box<dyn TickEngine>,
    active_backend: Backend,
    wires: Vec<u8>,
    dff_curr: Vec<u8>,
    dff_next: Vec<u8>,
    module_inputs: Vec<u8>,
    input_ranges: HashMap<String, (usize, usize)>,
    cycle_count: u64,
    bus: Option<Box<dyn MemoryBus>>,
}

impl Simulator {
    /// Flattens `top` out of `registry`, schedules it, and builds a driver
    /// on the backend named by `config`.
    pub fn new(registry: &Registry, top: &str, config: &EngineConfig) -> Result<Simulator> {
        let netlist = crate::flatten::flatten(registry, top)?;
        Simulator::new_from_netlist(top.to_string(), netlist, config)
    }

    /// Builds a driver directly from an already-flattened [`Netlist`],
    /// skipping elaboration. Used by fixtures that construct a netlist by
    /// hand and by the conformance suite's cross-engine checks.
    pub fn new_from_netlist(module_name: String, netlist: Netlist, config: &EngineConfig) -> Result<Simulator> {
        let schedule = build_schedule(&module_name, &netlist)?;
        let (engine, active_backend) = build_engine(&netlist, &schedule, config.backend, config)?;

        let wire_count = netlist.wire_count as usize;
        let dff_count = netlist.dffs.len();
        let input_ranges = input_bit_ranges(&netlist.inputs);
        let input_bit_count: usize = netlist.inputs.iter().map(|p| p.wires.len()).sum();

        let mut sim = Simulator {
            module_name,
            netlist,
            engine,
            active_backend,
            wires: vec![0; wire_count],
            dff_curr: vec![0; dff_count],
            dff_next: vec![0; dff_count],
            module_inputs: vec![0; input_bit_count],
            input_ranges,
            cycle_count: 0,
            bus: None,
        };
        sim.run_comb();
        Ok(sim)
    }

    pub fn attach_bus(&mut self, bus: Box<dyn MemoryBus>) {
        self.bus = Some(bus);
    }

    pub fn backend(&self) -> Backend {
        self.active_backend
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Zeroes every wire, DFF state byte, and module input, and resets the
    /// cycle counter. A cold power-on, distinct from asserting the design's
    /// own `rst` input (which still runs through normal DFF reset logic).
    pub fn reset(&mut self) {
        self.wires.iter_mut().for_each(|w| *w = 0);
        self.dff_curr.iter_mut().for_each(|w| *w = 0);
        self.dff_next.iter_mut().for_each(|w| *w = 0);
        self.module_inputs.iter_mut().for_each(|w| *w = 0);
        self.cycle_count = 0;
        self.run_comb();
    }

    /// Writes `value`'s low bits into the named input port and immediately
    /// resettles combinational logic, without advancing the clock. Lets
    /// purely combinational fixtures be exercised without ever calling
    /// [`Simulator::step`].
    pub fn write_port(&mut self, name: &str, value: u64) -> Result<()> {
        let (start, len) = *self
            .input_ranges
            .get(name)
            .ok_or_else(|| SimError::PortNotFound(name.to_string()))?;
        if len < 64 && value >= (1u64 << len) {
            return Err(SimError::InvalidValue { port: name.to_string(), width: len as u32, value });
        }
        write_bits(&mut self.module_inputs, start, len, value);
        self.run_comb();
        Ok(())
    }

    /// Reads the named output port's current settled value.
    pub fn read_port(&self, name: &str) -> Result<u64> {
        let port = self
            .netlist
            .outputs
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SimError::PortNotFound(name.to_string()))?;
        Ok(read_bits(&self.wires, port))
    }

    /// Reads a single flattened wire's current value (0 or 1). Useful for
    /// conformance tests that need to compare raw wire state across engines.
    pub fn peek_wire(&self, wire: WireId) -> u8 {
        self.wires[wire as usize]
    }

    pub fn wires(&self) -> &[u8] {
        &self.wires
    }

    pub fn dff_state(&self) -> &[u8] {
        &self.dff_curr
    }

    /// Runs one full clock cycle: the five-phase sequence of §4.4.1 —
    /// settle at `clk=0`, service a pending bus read (so `mem_data_in` is
    /// live before the clock rises), settle at `clk=1` (which also computes
    /// every DFF's next state off that fresh `mem_data_in`), service a
    /// pending bus write at the clock rise, commit the DFF state, then fall
    /// the clock and resettle at `clk=0`.
    pub fn step(&mut self) -> Result<()> {
        self.set_clk(0);
        self.run_comb();

        self.service_bus_read()?;

        self.set_clk(1);
        self.run_comb();

        self.service_bus_write()?;

        std::mem::swap(&mut self.dff_curr, &mut self.dff_next);
        self.cycle_count += 1;

        self.set_clk(0);
        self.run_comb();

        Ok(())
    }

    pub fn step_n(&mut self, cycles: u64) -> Result<()> {
        for _ in 0..cycles {
            self.step()?;
        }
        Ok(())
    }

    fn run_comb(&mut self) {
        self.engine.tick(&mut self.wires, &self.dff_curr, &mut self.dff_next, &self.module_inputs);
    }

    fn set_clk(&mut self, bit: u8) {
        if let Some(&(start, len)) = self.input_ranges.get("clk") {
            write_bits(&mut self.module_inputs, start, len, bit as u64);
        }
    }

    /// Services the read half of the memory-bus hook of §4.5: with the
    /// `clk=0` pass settled, issue `bus.read` if asked for and drive
    /// `mem_data_in` from the result *before* the clock-rise re-evaluation,
    /// so a same-cycle read feeds whatever DFF that re-evaluation latches.
    fn service_bus_read(&mut self) -> Result<()> {
        if !self.netlist.has_memory_bus() {
            return Ok(());
        }
        let Some(bus) = self.bus.as_mut() else {
            return Ok(());
        };

        let outputs = &self.netlist.outputs;
        let port = |name: &str| outputs.iter().find(|p| p.name == name);

        let read_en = port("mem_read_en").map(|p| read_bits(&self.wires, p)).unwrap_or(0) != 0;
        if read_en {
            let addr = port("mem_addr").map(|p| read_bits(&self.wires, p)).unwrap_or(0) as u16;
            let data = bus.read(addr).map_err(|detail| SimError::BusCallbackFailure { cycle: self.cycle_count, detail })?;
            if let Some(&(start, len)) = self.input_ranges.get("mem_data_in") {
                write_bits(&mut self.module_inputs, start, len, data as u64);
            }
        }

        Ok(())
    }

    /// Services the write half of the memory-bus hook: at the clock rise,
    /// with `mem_write_en`/`mem_addr`/`mem_data_out` already settled by the
    /// `clk=1` pass, issue `bus.write` if asked for. Read-before-write on a
    /// simultaneous assertion is guaranteed by `step` calling the read half
    /// first, against the pre-write pass.
    fn service_bus_write(&mut self) -> Result<()> {
        if !self.netlist.has_memory_bus() {
            return Ok(());
        }
        let Some(bus) = self.bus.as_mut() else {
            return Ok(());
        };

        let outputs = &self.netlist.outputs;
        let port = |name: &str| outputs.iter().find(|p| p.name == name);

        let write_en = port("mem_write_en").map(|p| read_bits(&self.wires, p)).unwrap_or(0) != 0;
        if write_en {
            let addr = port("mem_addr").map(|p| read_bits(&self.wires, p)).unwrap_or(0) as u16;
            let data_out = port("mem_data_out").map(|p| read_bits(&self.wires, p)).unwrap_or(0) as u8;
            bus.write(addr, data_out).map_err(|detail| SimError::BusCallbackFailure { cycle: self.cycle_count, detail })?;
        }

        Ok(())
    }
}
