//! Shared code generator for the JIT and AOT backends.
//!
//! Both backends need the exact same artifact: a straight-line WebAssembly
//! module with one exported linear memory and one exported `tick` function.
//! The function takes no parameters — every wire, DFF-current, DFF-next,
//! and module-input byte lives at a fixed, compile-time-known offset into
//! linear memory, so the generated code is pure constant-offset loads and
//! stores. The JIT backend JIT-compiles this module on first `step`; the
//! AOT backend precompiles the identical module offline and caches the
//! compiled artifact by the netlist's content hash. Neither backend emits
//! machine code directly — the embedded Wasm runtime's own compiler does
//! that, which is what keeps code generation itself within safe Rust while
//! still satisfying §4.4.3's first-call-cost and steady-state-cost bounds.

use wasm_encoder::{
    CodeSection, ExportKind, ExportSection, Function, FunctionSection, Instruction, MemArg,
    MemorySection, MemoryType, Module, TypeSection, ValType,
};

use crate::netlist::{GatePrim, Netlist, WireId, NO_INPUT};
use crate::schedule::Schedule;

const WASM_PAGE: u32 = 65536;

/// Fixed byte offsets into the generated module's linear memory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub wire_count: u32,
    pub dff_count: u32,
    pub input_bit_count: u32,
    pub dff_curr_base: u32,
    pub dff_next_base: u32,
    pub inputs_base: u32,
    pub total_bytes: u32,
}

impl Layout {
    pub fn new(netlist: &Netlist) -> Layout {
        let wire_count = netlist.wire_count;
        let dff_count = netlist.dffs.len() as u32;
        let input_bit_count = netlist.inputs.iter().map(|p| p.wires.len() as u32).sum();

        let dff_curr_base = wire_count;
        let dff_next_base = dff_curr_base + dff_count;
        let inputs_base = dff_next_base + dff_count;
        let total_bytes = inputs_base + input_bit_count;

        Layout { wire_count, dff_count, input_bit_count, dff_curr_base, dff_next_base, inputs_base, total_bytes }
    }

    pub fn pages(&self) -> u64 {
        (self.total_bytes as u64).div_ceil(WASM_PAGE as u64).max(1)
    }
}

/// Flattened, port-order list of module-input wire ids; position `i` in
/// this list is byte `layout.inputs_base + i` in linear memory.
pub(crate) fn input_wire_order(netlist: &Netlist) -> Vec<WireId> {
    netlist.inputs.iter().flat_map(|p| p.wires.iter().copied()).collect()
}

/// Builds the `tick`-exporting Wasm module described above.
pub(crate) fn build_module(netlist: &Netlist, schedule: &Schedule, layout: &Layout) -> Vec<u8> {
    let mut module = Module::new();

    let mut types = TypeSection::new();
    types.function(std::iter::empty::<ValType>(), std::iter::empty::<ValType>());
    module.section(&types);

    let mut functions = FunctionSection::new();
    functions.function(0);
    module.section(&functions);

    let mut memories = MemorySection::new();
    memories.memory(MemoryType { minimum: layout.pages(), maximum: None, memory64: false, shared: false, page_size_log2: None });
    module.section(&memories);

    let mut exports = ExportSection::new();
    exports.export("memory", ExportKind::Memory, 0);
    exports.export("tick", ExportKind::Func, 0);
    module.section(&exports);

    let mut f = Function::new(std::iter::empty());
    emit_body(&mut f, netlist, schedule, layout);
    f.instruction(&Instruction::End);

    let mut code = CodeSection::new();
    code.function(&f);
    module.section(&code);

    module.finish()
}

fn mem(offset: u32) -> MemArg {
    MemArg { offset: offset as u64, align: 0, memory_index: 0 }
}

/// Pushes `i32.const 0` then a fixed-offset `i32.load8_u`, net stack effect `+1`.
fn push_load(f: &mut Function, addr: u32) {
    f.instruction(&Instruction::I32Const(0));
    f.instruction(&Instruction::I32Load8U(mem(addr)));
}

/// Stores the top-of-stack byte (net effect `-1`, after `begin_store` primed
/// the base address) at a fixed offset.
fn begin_store(f: &mut Function) {
    f.instruction(&Instruction::I32Const(0));
}

fn finish_store(f: &mut Function, addr: u32) {
    f.instruction(&Instruction::I32Store8(mem(addr)));
}

/// Evaluates every gate in schedule order into its output wire. Emitted
/// twice per `tick` — once before, once after folding async reset into Q
/// wires — so both passes must stay side-effect-free beyond wire stores.
fn emit_gate_pass(f: &mut Function, netlist: &Netlist, schedule: &Schedule) {
    for &gi in &schedule.order {
        let g = netlist.gates[gi as usize];
        begin_store(f);
        match g.op {
            GatePrim::And2 => {
                push_load(f, g.in_a);
                push_load(f, g.in_b);
                f.instruction(&Instruction::I32And);
            }
            GatePrim::Or2 => {
                push_load(f, g.in_a);
                push_load(f, g.in_b);
                f.instruction(&Instruction::I32Or);
            }
            GatePrim::Xor2 => {
                push_load(f, g.in_a);
                push_load(f, g.in_b);
                f.instruction(&Instruction::I32Xor);
            }
            GatePrim::Not1 => {
                push_load(f, g.in_a);
                f.instruction(&Instruction::I32Const(1));
                f.instruction(&Instruction::I32Xor);
            }
            GatePrim::Buf1 => {
                push_load(f, g.in_a);
            }
            GatePrim::ConstBit => {
                f.instruction(&Instruction::I32Const(g.in_a as i32));
            }
        }
        finish_store(f, g.out);
    }
}

fn emit_body(f: &mut Function, netlist: &Netlist, schedule: &Schedule, layout: &Layout) {
    // 1. Re-assert module inputs into their wire positions.
    for (i, &wire) in input_wire_order(netlist).iter().enumerate() {
        begin_store(f);
        push_load(f, layout.inputs_base + i as u32);
        finish_store(f, wire);
    }

    // 2. Seed each DFF's Q wire from its current state.
    for (i, dff) in netlist.dffs.iter().enumerate() {
        begin_store(f);
        push_load(f, layout.dff_curr_base + i as u32);
        finish_store(f, dff.q);
    }

    // 3. Evaluate every gate in schedule order.
    emit_gate_pass(f, netlist, schedule);

    // 4. Asynchronous reset takes effect continuously (§4.4.1, §8 invariant
    // 5): fold every active reset straight into its Q wire — `wires[q] =
    // reset_wire ? reset_value : wires[q]` — then resettle so anything
    // downstream of Q observes the reset value within this same delta cycle.
    for dff in &netlist.dffs {
        if dff.reset == NO_INPUT {
            continue;
        }
        begin_store(f);
        f.instruction(&Instruction::I32Const(dff.reset_value as i32));
        push_load(f, dff.q);
        push_load(f, dff.reset);
        f.instruction(&Instruction::Select);
        finish_store(f, dff.q);
    }
    emit_gate_pass(f, netlist, schedule);

    // 5. Compute each DFF's next state.
    for (i, dff) in netlist.dffs.iter().enumerate() {
        begin_store(f);

        // reset_value, pushed as the `select`'s "true" operand.
        f.instruction(&Instruction::I32Const(dff.reset_value as i32));

        // val_if_not_reset = enabled ? wires[d] : dff_curr[i]
        push_load(f, dff.d);
        push_load(f, layout.dff_curr_base + i as u32);
        if dff.enable == NO_INPUT {
            f.instruction(&Instruction::I32Const(1));
        } else {
            push_load(f, dff.enable);
        }
        f.instruction(&Instruction::Select);

        if dff.reset == NO_INPUT {
            f.instruction(&Instruction::I32Const(0));
        } else {
            push_load(f, dff.reset);
        }
        f.instruction(&Instruction::Select);

        finish_store(f, layout.dff_next_base + i);
    }
}
