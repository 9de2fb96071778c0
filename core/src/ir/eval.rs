//! The pre-flatten behavioral evaluator.
//!
//! Per the design notes, "propagate until stable" fixed-point iteration
//! is wasteful in the hot simulation path, where a flattened netlist already
//! carries a topological schedule. It is the right tool here, though: this
//! evaluator exists solely so the lowering-preservation property test
//! (`behavioral(M)(v) == flatten_and_eval(M)(v)`) has an independent,
//! schedule-free reference to check the fast path against. Nothing in
//! [`crate::engine`] calls this module.

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::ir::{Const, Direction, Driver, Expr, GateOp, Module, Registry};

/// A fully-resolved set of net values for one module invocation, keyed by
/// net id. Missing entries are nets whose value could not be determined
/// (undriven, or part of an unbroken combinational cycle).
pub type NetValues = HashMap<u32, u128>;

/// Evaluates `module`'s combinational outputs for one snapshot: `inputs`
/// gives a value for every input port by name, `dff_q` gives the current Q
/// value for every flip-flop (by index into `module.dffs`) standing in for
/// sequential state that this evaluator does not itself advance.
///
/// Returns the value of every net that a fixed-point propagation could
/// resolve; an undriven or still-unknown net after convergence is reported
/// as [`SimError::UndrivenNet`].
pub fn eval_module(
    registry: &Registry,
    module: &Module,
    inputs: &HashMap<String, u128>,
    dff_q: &HashMap<usize, u128>,
) -> Result<NetValues> {
    let mut values: NetValues = HashMap::new();

    for port in module.ports.iter().filter(|p| p.direction != Direction::Out) {
        let net = module
            .net_named(&port.name)
            .ok_or_else(|| SimError::UndrivenNet { module: module.name.clone(), net: port.name.clone() })?;
        let v = *inputs.get(&port.name).unwrap_or(&0);
        values.insert(net.id, mask(v, net.width.bits()));
    }

    for (idx, dff) in module.dffs.iter().enumerate() {
        let v = *dff_q.get(&idx).unwrap_or(&0);
        values.insert(dff.q, v);
    }

    // Fixed-point sweep: repeatedly try to resolve assigns and instance
    // outputs until a full pass makes no progress.
    loop {
        let mut progressed = false;

        for assign in &module.assigns {
            if values.contains_key(&assign.dest) {
                continue;
            }
            if let Some(v) = try_eval_expr(module, &assign.expr, &values) {
                let dest_width = module.nets.iter().find(|n| n.id == assign.dest).map(|n| n.width.bits()).unwrap_or(128);
                values.insert(assign.dest, mask(v, dest_width));
                progressed = true;
            }
        }

        for instance in &module.instances {
            let sub = registry
                .get(&instance.module)
                .ok_or_else(|| SimError::UnknownOperator { module: module.name.clone(), op: instance.module.clone() })?;

            // Only attempt the (potentially expensive) recursive evaluation
            // once we have every input the submodule needs.
            let mut sub_inputs = HashMap::new();
            let mut ready = true;
            for port in sub.ports.iter().filter(|p| p.direction != Direction::Out) {
                let Some(bound) = instance.inputs.get(&port.name) else {
                    ready = false;
                    break;
                };
                match try_eval_expr(module, bound, &values) {
                    Some(v) => {
                        let port_width = port.width.bits();
                        sub_inputs.insert(port.name.clone(), mask(v, port_width));
                    }
                    None => {
                        ready = false;
                        break;
                    }
                }
            }
            if !ready {
                continue;
            }

            // Instance-local DFFs are treated as held at reset value here;
            // this evaluator compares single combinational snapshots, not
            // sequential traces, so sequential submodule state is out of
            // scope for invariant 1.
            let sub_dff_q: HashMap<usize, u128> = sub
                .dffs
                .iter()
                .enumerate()
                .map(|(i, d)| (i, d.reset_value.map(|c| c.value).unwrap_or(0)))
                .collect();

            let sub_values = eval_module(registry, sub, &sub_inputs, &sub_dff_q)?;

            for (port_name, parent_net) in &instance.outputs {
                if values.contains_key(parent_net) {
                    continue;
                }
                if let Some(sub_net) = sub.net_named(port_name) {
                    if let Some(v) = sub_values.get(&sub_net.id) {
                        values.insert(*parent_net, *v);
                        progressed = true;
                    }
                }
            }
        }

        if !progressed {
            break;
        }
    }

    Ok(values)
}

/// Reads a named output port's value out of a resolved [`NetValues`] map.
pub fn read_output(module: &Module, values: &NetValues, port: &str) -> Result<u128> {
    let net = module
        .net_named(port)
        .ok_or_else(|| SimError::PortNotFound(port.to_string()))?;
    values
        .get(&net.id)
        .copied()
        .ok_or_else(|| SimError::UndrivenNet { module: module.name.clone(), net: port.to_string() })
}

fn try_eval_expr(module: &Module, expr: &Expr, values: &NetValues) -> Option<u128> {
    match expr {
        Expr::Net(id) => values.get(id).copied(),
        Expr::Const(Const { value, .. }) => Some(*value),
        // `Concat` and `Extend` need each operand's own width (to know how
        // many bits to shift in, or where the sign bit sits) rather than the
        // single `operand_width` the generic path below threads through, so
        // they're resolved here directly instead of via `eval_op`.
        Expr::Op(GateOp::Concat, operands) => {
            let mut acc: u128 = 0;
            for operand in operands {
                let w = expr_width(module, operand);
                let v = mask(try_eval_expr(module, operand, values)?, w);
                acc = (acc << w) | v;
            }
            Some(mask(acc, expr_width(module, expr)))
        }
        Expr::Op(GateOp::Extend(signed, target_width), operands) => {
            let src_width = expr_width(module, &operands[0]);
            let v = mask(try_eval_expr(module, &operands[0], values)?, src_width);
            let sign_bit = 1u128 << (src_width - 1);
            let extended = if *signed && src_width < *target_width && v & sign_bit != 0 {
                v | (!0u128 << src_width)
            } else {
                v
            };
            Some(mask(extended, *target_width))
        }
        Expr::Op(op, operands) => {
            let mut resolved = Vec::with_capacity(operands.len());
            for operand in operands {
                resolved.push(try_eval_expr(module, operand, values)?);
            }
            let operand_width = expr_width(module, &operands[0]);
            let result = eval_op(*op, &resolved, operand_width);
            Some(mask(result, expr_width(module, expr)))
        }
    }
}

/// The effective bit-width of an expression, mirroring the lowering pass's
/// own width bookkeeping — needed so `Not`/`Lt`/`Shra` can mask and
/// sign-interpret their operands at the same width the gate-level lowering
/// would, rather than against the `u128` backing type's full range.
fn expr_width(module: &Module, expr: &Expr) -> u32 {
    match expr {
        Expr::Net(id) => module.nets.iter().find(|n| n.id == *id).map(|n| n.width.bits()).unwrap_or(128),
        Expr::Const(c) => c.width.bits(),
        Expr::Op(op, operands) => match op {
            GateOp::And | GateOp::Or | GateOp::Xor | GateOp::Not | GateOp::Buf | GateOp::Add | GateOp::Sub
            | GateOp::Shl | GateOp::Shr | GateOp::Shra => expr_width(module, &operands[0]),
            GateOp::Mux(_) => expr_width(module, &operands[1]),
            GateOp::Eq | GateOp::Lt | GateOp::Ltu => 1,
            GateOp::Concat => operands.iter().map(|o| expr_width(module, o)).sum(),
            GateOp::Slice(hi, lo) => hi - lo + 1,
            GateOp::Extend(_, target_width) => *target_width,
        },
    }
}

fn eval_op(op: GateOp, operands: &[u128], width: u32) -> u128 {
    match op {
        GateOp::And => operands[0] & operands[1],
        GateOp::Or => operands[0] | operands[1],
        GateOp::Xor => operands[0] ^ operands[1],
        GateOp::Not => !operands[0],
        GateOp::Buf => operands[0],
        GateOp::Mux(k) => {
            let sel = operands[0] as usize;
            let data = &operands[1..];
            debug_assert!((k as usize) <= data.len());
            data.get(sel).copied().unwrap_or(0)
        }
        GateOp::Add => operands[0].wrapping_add(operands[1]),
        GateOp::Sub => operands[0].wrapping_sub(operands[1]),
        GateOp::Eq => (operands[0] == operands[1]) as u128,
        GateOp::Ltu => (mask(operands[0], width) < mask(operands[1], width)) as u128,
        GateOp::Lt => {
            let sign_bit = 1u128 << (width - 1);
            let a_neg = mask(operands[0], width) & sign_bit != 0;
            let b_neg = mask(operands[1], width) & sign_bit != 0;
            match (a_neg, b_neg) {
                (false, false) | (true, true) => (mask(operands[0], width) < mask(operands[1], width)) as u128,
                (true, false) => 1,
                (false, true) => 0,
            }
        }
        GateOp::Shl => operands[0].wrapping_shl(operands[1] as u32),
        GateOp::Shr => operands[0].wrapping_shr(operands[1] as u32),
        GateOp::Shra => {
            let shamt = operands[1] as u32;
            let a = mask(operands[0], width);
            let sign_bit = 1u128 << (width - 1);
            let shifted = a.wrapping_shr(shamt);
            if a & sign_bit != 0 && shamt > 0 {
                let vacated = if shamt >= width { (1u128 << width) - 1 } else { !((1u128 << width) - 1 >> shamt) & ((1u128 << width) - 1) };
                shifted | vacated
            } else {
                shifted
            }
        }
        // Handled directly in `try_eval_expr`, which has access to each
        // operand's own width; kept here only so this match stays exhaustive
        // over `GateOp`.
        GateOp::Concat => operands.iter().fold(0u128, |acc, v| (acc << 1) | (v & 1)),
        GateOp::Slice(hi, lo) => (operands[0] >> lo) & ((1u128 << (hi - lo + 1)) - 1),
        GateOp::Extend(_, _) => operands[0],
    }
}

fn mask(value: u128, bits: u32) -> u128 {
    if bits >= 128 {
        value
    } else {
        value & ((1u128 << bits) - 1)
    }
}
