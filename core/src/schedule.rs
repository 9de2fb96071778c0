//! Topological scheduling of a flattened [`Netlist`]'s gates.
//!
//! DFF outputs (`Q`) and module inputs are treated as sources; DFF inputs
//! (`D`) are treated as sinks. With that convention the combinational
//! subgraph is a DAG for any legal design, and a topological sort is
//! well-defined. Ties are broken by ascending wire id so the ordering is
//! deterministic and reproducible across every backend — the three engines
//! depend on this to agree cycle-by-cycle.

use std::collections::BinaryHeap;

use crate::error::{Result, SimError};
use crate::netlist::{GatePrim, Netlist, WireId};

/// A deterministic evaluation order over a netlist's gates.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Indices into `Netlist::gates`, in evaluation order.
    pub order: Vec<u32>,
}

/// Computes the schedule for `netlist`'s combinational subgraph, rejecting
/// a non-DAG with [`SimError::CyclicCombinational`].
pub fn build_schedule(module_name: &str, netlist: &Netlist) -> Result<Schedule> {
    let n = netlist.wire_count as usize;

    // in_degree[w] = number of not-yet-satisfied gate inputs driving wire w's
    // *consumers*; we instead track, per gate, how many of its inputs are
    // still unresolved, and kick it into the ready heap once that hits 0.
    let mut resolved = vec![false; n];

    for port in &netlist.inputs {
        for &w in &port.wires {
            resolved[w as usize] = true;
        }
    }
    for dff in &netlist.dffs {
        resolved[dff.q as usize] = true;
    }

    // consumers[wire] = gate indices that read `wire` as an input and are
    // not yet ready because of it.
    let mut consumers: Vec<Vec<u32>> = vec![Vec::new(); n];
    let mut remaining_inputs: Vec<u8> = Vec::with_capacity(netlist.gates.len());

    for (gi, gate) in netlist.gates.iter().enumerate() {
        let mut needed = 0u8;
        if gate.op != GatePrim::ConstBit {
            if !resolved[gate.in_a as usize] {
                needed += 1;
                consumers[gate.in_a as usize].push(gi as u32);
            }
            if !gate.op.is_unary() && !resolved[gate.in_b as usize] {
                needed += 1;
                consumers[gate.in_b as usize].push(gi as u32);
            }
        }
        remaining_inputs.push(needed);
    }

    // Ready set ordered by ascending gate-output wire id for determinism,
    // using output wire id (not gate index) so the tie-break is about
    // *signal* order, matching the schedule's documented determinism
    // contract rather than incidental construction order.
    #[derive(PartialEq, Eq)]
    struct Ready {
        wire: WireId,
        gate: u32,
    }
    impl Ord for Ready {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            other.wire.cmp(&self.wire).then(other.gate.cmp(&self.gate))
        }
    }
    impl PartialOrd for Ready {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut heap = BinaryHeap::new();
    for (gi, gate) in netlist.gates.iter().enumerate() {
        if remaining_inputs[gi] == 0 {
            heap.push(Ready { wire: gate.out, gate: gi as u32 });
        }
    }

    let mut order = Vec::with_capacity(netlist.gates.len());
    let mut scheduled = vec![false; netlist.gates.len()];

    while let Some(Ready { gate: gi, .. }) = heap.pop() {
        if scheduled[gi as usize] {
            continue;
        }
        scheduled[gi as usize] = true;
        order.push(gi);

        let out = netlist.gates[gi as usize].out;
        resolved[out as usize] = true;

        for &consumer in &consumers[out as usize] {
            if scheduled[consumer as usize] {
                continue;
            }
            remaining_inputs[consumer as usize] -= 1;
            if remaining_inputs[consumer as usize] == 0 {
                heap.push(Ready { wire: netlist.gates[consumer as usize].out, gate: consumer });
            }
        }
    }

    if order.len() != netlist.gates.len() {
        return Err(SimError::CyclicCombinational { module: module_name.to_string() });
    }

    Ok(Schedule { order })
}
