//! Scenarios D and E: a toy accumulator CPU, gate-level, parameterized by
//! accumulator/program-counter width so the same builder produces both the
//! literal 8-bit machine the ADD-program scenario checks and a much wider
//! "stress" variant whose ripple adders and muxes push the flattened netlist
//! past the cross-engine divergence guard's gate-count floor.
//!
//! ## Instruction set
//!
//! One-byte instructions, high nibble = opcode, low nibble = a 4-bit direct
//! memory address (ignored where not applicable):
//!
//! - `0xA_` LDI — the *next* byte is loaded into the accumulator (2 bytes).
//! - `0x2_` STA — store the accumulator to `memory[low nibble]`.
//! - `0x3_` ADD — accumulator += `memory[low nibble]`.
//! - `0xF_` HLT — stop; `halt` stays asserted until reset.
//!
//! ## State machine
//!
//! Four states, held directly in a 2-bit register so every per-state mux
//! below is a plain [`GateOp::Mux`] keyed on that register — no separate
//! one-hot decode needed:
//!
//! - `0` FETCH — read the opcode byte at `pc` into `opcode_reg`.
//! - `1` DECODE — dispatch on `opcode_reg`'s top nibble; STA/ADD touch
//!   memory directly from here and return to FETCH; LDI moves to LDI_FETCH;
//!   HLT moves to HALT.
//! - `2` LDI_FETCH — read the immediate byte at `pc+1` into the accumulator.
//! - `3` HALT — sticky; no further bus activity.
//!
//! Because the memory-bus hook drives `mem_data_in` *before* the clock-rise
//! pass that computes DFF next-state, a read issued from the current
//! state feeds straight into that same cycle's register update — so ADD and
//! LDI_FETCH each complete their memory access and capture in a single cycle.

use netforge_core::prelude::*;

const STATE_FETCH: u128 = 0;
const STATE_DECODE: u128 = 1;
const STATE_LDI_FETCH: u128 = 2;
const STATE_HALT: u128 = 3;

const OPCODE_STA: u128 = 0x2;
const OPCODE_ADD: u128 = 0x3;
const OPCODE_LDI: u128 = 0xA;
const OPCODE_HLT: u128 = 0xF;

/// Accumulator/program-counter width used by the gate-count stress fixture
/// (Scenario E); the program counter stays 8 bits regardless, since it only
/// ever needs to address a handful of program bytes.
pub const CPU_WIDE_REG_WIDTH: u32 = 256;

fn eq2(net: NetId, value: u128) -> Expr {
    let w2 = Width::new(2).unwrap();
    Expr::Op(GateOp::Eq, vec![Expr::net(net), Expr::constant(w2, value)])
}

fn eq4(expr: Expr, value: u128) -> Expr {
    let w4 = Width::new(4).unwrap();
    Expr::Op(GateOp::Eq, vec![expr, Expr::constant(w4, value)])
}

fn mux2(sel: Expr, if_true: Expr, if_false: Expr) -> Expr {
    Expr::Op(GateOp::Mux(2), vec![sel, if_true, if_false])
}

fn mux4(sel: NetId, branches: [Expr; 4]) -> Expr {
    let [b0, b1, b2, b3] = branches;
    Expr::Op(GateOp::Mux(4), vec![Expr::net(sel), b0, b1, b2, b3])
}

/// Builds the accumulator CPU with an `reg_width`-bit accumulator. `reg_width`
/// must be at least 8 (the native byte width of the memory bus and opcode
/// immediates).
pub fn accumulator_cpu(reg_width: u32) -> Module {
    let mut b = Module::builder("accumulator_cpu");
    let w1 = Width::new(1).unwrap();
    let w2 = Width::new(2).unwrap();
    let w4 = Width::new(4).unwrap();
    let w8 = Width::new(8).unwrap();
    let w16 = Width::new(16).unwrap();
    let wr = Width::new(reg_width).unwrap();

    let clk = b.input("clk", w1);
    let rst = b.input("rst", w1);
    let mem_data_in = b.input("mem_data_in", w8);

    let state = b.net("state", w2);
    let pc = b.net("pc", w8);
    let acc = b.net("acc", wr);
    let opcode_reg = b.net("opcode_reg", w8);
    let halt = b.net("halt", w1);

    let opcode_nibble = Expr::Op(GateOp::Slice(7, 4), vec![Expr::net(opcode_reg)]);
    let addr_nibble = Expr::Op(GateOp::Slice(3, 0), vec![Expr::net(opcode_reg)]);

    let is_sta = eq4(opcode_nibble.clone(), OPCODE_STA);
    let is_add = eq4(opcode_nibble.clone(), OPCODE_ADD);
    let is_ldi = eq4(opcode_nibble.clone(), OPCODE_LDI);
    let is_hlt = eq4(opcode_nibble, OPCODE_HLT);
    let is_sta_or_add = Expr::Op(GateOp::Or, vec![is_sta.clone(), is_add.clone()]);

    let pc_plus_one = Expr::Op(GateOp::Add, vec![Expr::net(pc), Expr::constant(w8, 1)]);
    let pc_plus_two = Expr::Op(GateOp::Add, vec![Expr::net(pc), Expr::constant(w8, 2)]);

    // mem_addr: pc at FETCH, the low nibble at DECODE (STA/ADD both read it
    // the same way), pc+1 at LDI_FETCH, don't-care at HALT.
    let mem_addr = mux4(
        state,
        [
            Expr::Op(GateOp::Extend(false, 16), vec![Expr::net(pc)]),
            Expr::Op(GateOp::Extend(false, 16), vec![addr_nibble]),
            Expr::Op(GateOp::Extend(false, 16), vec![pc_plus_one.clone()]),
            Expr::constant(w16, 0),
        ],
    );
    let mem_addr_net = b.net("mem_addr", w16);
    b.assign(mem_addr_net, mem_addr);

    let mem_read_en = Expr::Op(
        GateOp::Or,
        vec![
            eq2(state, STATE_FETCH),
            Expr::Op(GateOp::Or, vec![Expr::Op(GateOp::And, vec![eq2(state, STATE_DECODE), is_add.clone()]), eq2(state, STATE_LDI_FETCH)]),
        ],
    );
    let mem_read_en_net = b.net("mem_read_en", w1);
    b.assign(mem_read_en_net, mem_read_en);

    let mem_write_en = Expr::Op(GateOp::And, vec![eq2(state, STATE_DECODE), is_sta.clone()]);
    let mem_write_en_net = b.net("mem_write_en", w1);
    b.assign(mem_write_en_net, mem_write_en);

    let acc_low_byte = Expr::Op(GateOp::Slice(7, 0), vec![Expr::net(acc)]);
    let mem_data_out = mux4(state, [Expr::constant(w8, 0), acc_low_byte, Expr::constant(w8, 0), Expr::constant(w8, 0)]);
    let mem_data_out_net = b.net("mem_data_out", w8);
    b.assign(mem_data_out_net, mem_data_out);

    // state_next: FETCH -> DECODE; DECODE -> LDI_FETCH/HALT/FETCH depending
    // on the decoded opcode; LDI_FETCH -> FETCH; HALT is sticky.
    let decode_next = mux2(is_ldi.clone(), Expr::constant(w2, STATE_LDI_FETCH), mux2(is_hlt.clone(), Expr::constant(w2, STATE_HALT), Expr::constant(w2, STATE_FETCH)));
    let state_next = mux4(state, [Expr::constant(w2, STATE_DECODE), decode_next, Expr::constant(w2, STATE_FETCH), Expr::constant(w2, STATE_HALT)]);

    // pc_next: holds at FETCH/HALT, +1 after STA/ADD at DECODE (0 otherwise),
    // +2 after the immediate fetch.
    let decode_pc_next = mux2(is_sta_or_add, pc_plus_one, Expr::net(pc));
    let pc_next = mux4(state, [Expr::net(pc), decode_pc_next, pc_plus_two, Expr::net(pc)]);

    // acc_next: only ADD (at DECODE) and the LDI immediate capture (at
    // LDI_FETCH) change it.
    let sum = Expr::Op(GateOp::Add, vec![Expr::net(acc), Expr::Op(GateOp::Extend(false, reg_width), vec![Expr::net(mem_data_in)])]);
    let decode_acc_next = mux2(is_add, sum, Expr::net(acc));
    let acc_next = mux4(
        state,
        [Expr::net(acc), decode_acc_next, Expr::Op(GateOp::Extend(false, reg_width), vec![Expr::net(mem_data_in)]), Expr::net(acc)],
    );

    // opcode_reg_next: captured only at FETCH.
    let opcode_reg_next = mux4(state, [Expr::net(mem_data_in), Expr::net(opcode_reg), Expr::net(opcode_reg), Expr::net(opcode_reg)]);

    let halt_next = Expr::Op(GateOp::Or, vec![Expr::net(halt), Expr::Op(GateOp::And, vec![eq2(state, STATE_DECODE), is_hlt])]);

    let state_next_net = b.net("state_next", w2);
    b.assign(state_next_net, state_next);
    let pc_next_net = b.net("pc_next", w8);
    b.assign(pc_next_net, pc_next);
    let acc_next_net = b.net("acc_next", wr);
    b.assign(acc_next_net, acc_next);
    let opcode_reg_next_net = b.net("opcode_reg_next", w8);
    b.assign(opcode_reg_next_net, opcode_reg_next);
    let halt_next_net = b.net("halt_next", w1);
    b.assign(halt_next_net, halt_next);

    b.dff(Dff { data: state_next_net, q: state, clock: clk, reset: Some(rst), reset_value: Some(Const::new(w2, STATE_FETCH)), enable: None });
    b.dff(Dff { data: pc_next_net, q: pc, clock: clk, reset: Some(rst), reset_value: Some(Const::new(w8, 0)), enable: None });
    b.dff(Dff { data: acc_next_net, q: acc, clock: clk, reset: Some(rst), reset_value: Some(Const::new(wr, 0)), enable: None });
    b.dff(Dff { data: opcode_reg_next_net, q: opcode_reg, clock: clk, reset: Some(rst), reset_value: Some(Const::new(w8, 0)), enable: None });
    b.dff(Dff { data: halt_next_net, q: halt, clock: clk, reset: Some(rst), reset_value: Some(Const::new(w1, 0)), enable: None });

    b.output("mem_addr", w16);
    b.output("mem_data_out", w8);
    b.output("mem_read_en", w1);
    b.output("mem_write_en", w1);
    b.output("acc", wr);
    b.output("pc", w8);
    b.output("halt", w1);

    b.finish()
}
