//! Scenario A: a 4-bit ripple-carry adder with an explicit carry-in and
//! carry-out port.
//!
//! `GateOp::Add` has no carry-in/out operand of its own, so this
//! fixture builds the adder directly out of primitive `Xor`/`And`/`Or`
//! full-adder cells instead of going through `Add` — legitimate, since a
//! fixture is allowed to exercise the flattener's general expression
//! lowering rather than any one high-level operator.

use netforge_core::prelude::*;

/// `radd4(a[4], b[4], cin) -> (sum[4], cout)`.
pub fn ripple_adder4() -> Module {
    let mut b = Module::builder("ripple_adder4");
    let w1 = Width::new(1).unwrap();
    let w4 = Width::new(4).unwrap();

    let a = b.input("a", w4);
    let bb = b.input("b", w4);
    let cin = b.input("cin", w1);

    let sum = b.net("sum", w4);
    let cout = b.net("cout", w1);

    let mut carry = Expr::net(cin);
    let mut sum_bits = Vec::with_capacity(4);
    let mut carry_net = cin;

    for i in 0..4u32 {
        let ai = b.net(format!("a{i}"), w1);
        let bi = b.net(format!("b{i}"), w1);
        b.assign(ai, Expr::Op(GateOp::Slice(i, i), vec![Expr::net(a)]));
        b.assign(bi, Expr::Op(GateOp::Slice(i, i), vec![Expr::net(bb)]));

        let axb = b.net(format!("axb{i}"), w1);
        b.assign(axb, Expr::Op(GateOp::Xor, vec![Expr::net(ai), Expr::net(bi)]));

        let si = b.net(format!("s{i}"), w1);
        b.assign(si, Expr::Op(GateOp::Xor, vec![Expr::net(axb), carry.clone()]));
        sum_bits.push(si);

        let a_and_b = b.net(format!("aandb{i}"), w1);
        b.assign(a_and_b, Expr::Op(GateOp::And, vec![Expr::net(ai), Expr::net(bi)]));
        let axb_and_c = b.net(format!("axbandc{i}"), w1);
        b.assign(axb_and_c, Expr::Op(GateOp::And, vec![Expr::net(axb), carry]));
        let next_carry = b.net(format!("carry{i}"), w1);
        b.assign(next_carry, Expr::Op(GateOp::Or, vec![Expr::net(a_and_b), Expr::net(axb_and_c)]));

        carry_net = next_carry;
        carry = Expr::net(next_carry);
    }

    b.assign(sum, Expr::Op(GateOp::Concat, sum_bits.into_iter().rev().map(Expr::net).collect()));
    b.assign(cout, Expr::net(carry_net));

    b.output("sum", w4);
    b.output("cout", w1);

    b.finish()
}
