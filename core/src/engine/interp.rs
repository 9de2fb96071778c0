//! The tree-walking interpreter: walks the precomputed schedule
//! once per `tick`, reading and writing a plain `Vec<u8>` wire-value vector.

use crate::netlist::{eval_gate, DffBit, Gate, Netlist, WireId, NO_INPUT};
use crate::schedule::Schedule;

use super::TickEngine;

/// O(|gates| + |dffs|) per call, small constant per gate; the reference
/// backend every other engine is checked against.
#[derive(Debug, Clone)]
pub(crate) struct Interp {
    gates: Vec<Gate>,
    dffs: Vec<DffBit>,
    schedule: Vec<u32>,
    input_wires: Vec<WireId>,
}

impl Interp {
    pub fn new(netlist: &Netlist, schedule: &Schedule) -> Interp {
        let input_wires = netlist.inputs.iter().flat_map(|p| p.wires.iter().copied()).collect();
        Interp { gates: netlist.gates.clone(), dffs: netlist.dffs.clone(), schedule: schedule.order.clone(), input_wires }
    }
}

impl Interp {
    fn run_schedule(&self, wires: &mut [u8]) {
        for &gi in &self.schedule {
            let g = &self.gates[gi as usize];
            wires[g.out as usize] = eval_gate(g.op, g.in_a, g.in_b, wires);
        }
    }
}

impl TickEngine for Interp {
    fn tick(&mut self, wires: &mut [u8], dff_curr: &[u8], dff_next: &mut [u8], module_inputs: &[u8]) {
        for (i, &w) in self.input_wires.iter().enumerate() {
            wires[w as usize] = module_inputs[i];
        }
        for (i, dff) in self.dffs.iter().enumerate() {
            wires[dff.q as usize] = dff_curr[i];
        }

        self.run_schedule(wires);

        // Asynchronous reset takes effect continuously, not only at a clock
        // edge (§4.4.1, §8 invariant 5): fold every active reset straight
        // into its Q wire, then resettle so anything downstream of Q in this
        // same delta cycle observes the reset value too.
        for dff in &self.dffs {
            if dff.reset != NO_INPUT && wires[dff.reset as usize] == 1 {
                wires[dff.q as usize] = dff.reset_value;
            }
        }
        self.run_schedule(wires);

        for (i, dff) in self.dffs.iter().enumerate() {
            let d = wires[dff.d as usize];
            let reset_active = dff.reset != NO_INPUT && wires[dff.reset as usize] == 1;
            let enabled = dff.enable == NO_INPUT || wires[dff.enable as usize] == 1;
            dff_next[i] = if reset_active {
                dff.reset_value
            } else if enabled {
                d
            } else {
                dff_curr[i]
            };
        }
    }
}
