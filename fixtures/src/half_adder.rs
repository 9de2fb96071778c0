//! Scenario C: a single-bit half-adder, the smallest possible module with
//! a nontrivial truth table.

use netforge_core::prelude::*;

/// `ha(a, b) -> (sum, carry)` with `sum = a ^ b`, `carry = a & b`.
pub fn half_adder() -> Module {
    let mut b = Module::builder("half_adder");
    let w1 = Width::new(1).unwrap();

    let a = b.input("a", w1);
    let bb = b.input("b", w1);
    let sum = b.net("sum", w1);
    let carry = b.net("carry", w1);

    b.assign(sum, Expr::Op(GateOp::Xor, vec![Expr::net(a), Expr::net(bb)]));
    b.assign(carry, Expr::Op(GateOp::And, vec![Expr::net(a), Expr::net(bb)]));
    b.output("sum", w1);
    b.output("carry", w1);

    b.finish()
}
