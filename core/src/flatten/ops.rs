//! Combinational gate patterns for each high-level [`GateOp`].
//!
//! Each function here lowers one operator's operands (already-`Expr`s,
//! lowered bottom-up through [`Flattener::lower_expr`]) into primitive
//! `And2`/`Or2`/`Xor2`/`Not1`/`Buf1`/`ConstBit` gates, returning the
//! result's bit vector, LSB first.

use crate::error::{Result, SimError};
use crate::ir::Expr;
use crate::netlist::{GatePrim, WireId};

use super::{Flattener, Scope};

pub(super) enum ShiftKind {
    Left,
    LogicalRight,
    ArithRight,
}

fn and_reduce(f: &mut Flattener<'_>, bits: &[WireId]) -> WireId {
    let mut acc = bits[0];
    for &b in &bits[1..] {
        acc = f.builder.gate2(GatePrim::And2, acc, b);
    }
    acc
}

fn or_reduce(f: &mut Flattener<'_>, bits: &[WireId]) -> WireId {
    let mut acc = bits[0];
    for &b in &bits[1..] {
        acc = f.builder.gate2(GatePrim::Or2, acc, b);
    }
    acc
}

/// `ceil(log2(k))`, the selector width a `k`-way mux needs.
fn clog2(k: u32) -> u32 {
    if k <= 1 {
        return 0;
    }
    32 - (k - 1).leading_zeros()
}

/// Ripple-carry adder: returns `(sum_bits, carry_out)`.
fn ripple_add(f: &mut Flattener<'_>, a: &[WireId], b: &[WireId], cin: WireId) -> (Vec<WireId>, WireId) {
    let mut sum = Vec::with_capacity(a.len());
    let mut carry = cin;
    for (&ai, &bi) in a.iter().zip(b) {
        let axb = f.builder.gate2(GatePrim::Xor2, ai, bi);
        let s = f.builder.gate2(GatePrim::Xor2, axb, carry);
        let a_and_b = f.builder.gate2(GatePrim::And2, ai, bi);
        let axb_and_c = f.builder.gate2(GatePrim::And2, axb, carry);
        let cout = f.builder.gate2(GatePrim::Or2, a_and_b, axb_and_c);
        sum.push(s);
        carry = cout;
    }
    (sum, carry)
}

fn require_equal_width(module: &str, a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(SimError::WidthMismatch { module: module.to_string(), detail: format!("operand widths disagree: {a} vs {b}") });
    }
    Ok(())
}

pub(super) fn lower_mux(f: &mut Flattener<'_>, scope: &mut Scope<'_>, k: u32, operands: &[Expr]) -> Result<Vec<WireId>> {
    let sel = f.lower_expr(scope, &operands[0])?;
    let sel_width = clog2(k) as usize;
    if sel.len() < sel_width {
        return Err(SimError::WidthMismatch {
            module: scope.module.name.clone(),
            detail: format!("mux selector has {} bits, needs {}", sel.len(), sel_width),
        });
    }

    let mut data = Vec::with_capacity(k as usize);
    for operand in &operands[1..=(k as usize)] {
        data.push(f.lower_expr(scope, operand)?);
    }
    let width = data[0].len();
    for d in &data {
        require_equal_width(&scope.module.name, d.len(), width)?;
    }

    // One-hot decode: select-line j is the AND of each selector bit (or its
    // complement) matching the bit pattern of j.
    let mut select_lines = Vec::with_capacity(k as usize);
    for j in 0..k as usize {
        let mut line: Option<WireId> = None;
        for i in 0..sel_width {
            let bit_set = (j >> i) & 1 == 1;
            let term = if bit_set { sel[i] } else { f.builder.gate1(GatePrim::Not1, sel[i]) };
            line = Some(match line {
                None => term,
                Some(acc) => f.builder.gate2(GatePrim::And2, acc, term),
            });
        }
        select_lines.push(line.unwrap_or_else(|| f.builder.const_bit(1)));
    }

    let mut result = Vec::with_capacity(width);
    for bit_pos in 0..width {
        let terms: Vec<WireId> =
            (0..k as usize).map(|j| f.builder.gate2(GatePrim::And2, select_lines[j], data[j][bit_pos])).collect();
        result.push(or_reduce(f, &terms));
    }
    Ok(result)
}

pub(super) fn lower_add(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr]) -> Result<Vec<WireId>> {
    let a = f.lower_expr(scope, &operands[0])?;
    let b = f.lower_expr(scope, &operands[1])?;
    require_equal_width(&scope.module.name, a.len(), b.len())?;
    let cin = f.builder.const_bit(0);
    Ok(ripple_add(f, &a, &b, cin).0)
}

pub(super) fn lower_sub(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr]) -> Result<Vec<WireId>> {
    let a = f.lower_expr(scope, &operands[0])?;
    let b = f.lower_expr(scope, &operands[1])?;
    require_equal_width(&scope.module.name, a.len(), b.len())?;
    let not_b: Vec<WireId> = b.iter().map(|&w| f.builder.gate1(GatePrim::Not1, w)).collect();
    let cin = f.builder.const_bit(1);
    Ok(ripple_add(f, &a, &not_b, cin).0)
}

pub(super) fn lower_eq(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr]) -> Result<Vec<WireId>> {
    let a = f.lower_expr(scope, &operands[0])?;
    let b = f.lower_expr(scope, &operands[1])?;
    require_equal_width(&scope.module.name, a.len(), b.len())?;
    let xnors: Vec<WireId> = a
        .iter()
        .zip(&b)
        .map(|(&x, &y)| {
            let xor = f.builder.gate2(GatePrim::Xor2, x, y);
            f.builder.gate1(GatePrim::Not1, xor)
        })
        .collect();
    Ok(vec![and_reduce(f, &xnors)])
}

pub(super) fn lower_lt(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr], signed: bool) -> Result<Vec<WireId>> {
    let a = f.lower_expr(scope, &operands[0])?;
    let b = f.lower_expr(scope, &operands[1])?;
    require_equal_width(&scope.module.name, a.len(), b.len())?;
    let width = a.len();

    let not_b: Vec<WireId> = b.iter().map(|&w| f.builder.gate1(GatePrim::Not1, w)).collect();
    let cin = f.builder.const_bit(1);
    let (sum, carry_out) = ripple_add(f, &a, &not_b, cin);

    if !signed {
        // carry_out = 1 means no borrow (a >= b); Ltu is its complement.
        return Ok(vec![f.builder.gate1(GatePrim::Not1, carry_out)]);
    }

    let sign_a = a[width - 1];
    let sign_b = b[width - 1];
    let result_sign = sum[width - 1];
    let not_sign_a = f.builder.gate1(GatePrim::Not1, sign_a);
    let not_sign_b = f.builder.gate1(GatePrim::Not1, sign_b);
    let not_result_sign = f.builder.gate1(GatePrim::Not1, result_sign);

    let term1a = f.builder.gate2(GatePrim::And2, sign_a, not_sign_b);
    let term1 = f.builder.gate2(GatePrim::And2, term1a, not_result_sign);
    let term2a = f.builder.gate2(GatePrim::And2, not_sign_a, sign_b);
    let term2 = f.builder.gate2(GatePrim::And2, term2a, result_sign);
    let overflow = f.builder.gate2(GatePrim::Or2, term1, term2);

    let lt = f.builder.gate2(GatePrim::Xor2, result_sign, overflow);
    Ok(vec![lt])
}

fn shift_once(f: &mut Flattener<'_>, bits: &[WireId], amount: usize, fill: WireId, kind: &ShiftKind) -> Vec<WireId> {
    let w = bits.len();
    (0..w)
        .map(|i| match kind {
            ShiftKind::Left => {
                if i < amount {
                    fill
                } else {
                    bits[i - amount]
                }
            }
            ShiftKind::LogicalRight | ShiftKind::ArithRight => {
                if i + amount < w {
                    bits[i + amount]
                } else {
                    fill
                }
            }
        })
        .collect()
}

pub(super) fn lower_shift(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr], kind: ShiftKind) -> Result<Vec<WireId>> {
    let data = f.lower_expr(scope, &operands[0])?;
    let shamt = f.lower_expr(scope, &operands[1])?;
    let width = data.len();

    let fill = match kind {
        ShiftKind::ArithRight => data[width - 1],
        _ => f.builder.const_bit(0),
    };

    let mut current = data;
    for (stage, &shamt_bit) in shamt.iter().enumerate() {
        let amount = 1usize << stage;
        let shifted = shift_once(f, &current, amount, fill, &kind);
        let not_sel = f.builder.gate1(GatePrim::Not1, shamt_bit);
        current = current
            .iter()
            .zip(&shifted)
            .map(|(&keep, &take)| {
                let keep_term = f.builder.gate2(GatePrim::And2, not_sel, keep);
                let take_term = f.builder.gate2(GatePrim::And2, shamt_bit, take);
                f.builder.gate2(GatePrim::Or2, keep_term, take_term)
            })
            .collect();
    }
    Ok(current)
}

pub(super) fn lower_concat(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr]) -> Result<Vec<WireId>> {
    let mut result = Vec::new();
    for operand in operands.iter().rev() {
        result.extend(f.lower_expr(scope, operand)?);
    }
    Ok(result)
}

pub(super) fn lower_slice(f: &mut Flattener<'_>, scope: &mut Scope<'_>, operands: &[Expr], hi: u32, lo: u32) -> Result<Vec<WireId>> {
    let bits = f.lower_expr(scope, &operands[0])?;
    if hi < lo || hi as usize >= bits.len() {
        return Err(SimError::WidthMismatch {
            module: scope.module.name.clone(),
            detail: format!("slice [{hi}:{lo}] out of range for {}-bit operand", bits.len()),
        });
    }
    Ok(bits[lo as usize..=hi as usize].to_vec())
}

pub(super) fn lower_extend(
    f: &mut Flattener<'_>,
    scope: &mut Scope<'_>,
    operands: &[Expr],
    signed: bool,
    target_width: u32,
) -> Result<Vec<WireId>> {
    let mut bits = f.lower_expr(scope, &operands[0])?;
    let target = target_width as usize;
    if target < bits.len() {
        return Err(SimError::WidthMismatch {
            module: scope.module.name.clone(),
            detail: format!("extend target width {target} smaller than operand width {}", bits.len()),
        });
    }
    let fill = if signed { *bits.last().unwrap() } else { f.builder.const_bit(0) };
    while bits.len() < target {
        bits.push(fill);
    }
    Ok(bits)
}
