//! Boundary-behavior fixtures: a single-gate module per primitive binary
//! and unary operator (exhaustive truth-table tests iterate these with all
//! four or two input combinations), plus a 4-way mux with distinct data to
//! check the selector covers `0..k-1`.

use netforge_core::prelude::*;

/// `op(a, b) -> out`, single-bit, for any binary [`GateOp`] (`And`/`Or`/`Xor`).
pub fn binary_gate(op: GateOp) -> Module {
    let mut b = Module::builder(format!("binary_{op:?}"));
    let w1 = Width::new(1).unwrap();

    let a = b.input("a", w1);
    let bb = b.input("b", w1);
    let out = b.net("out", w1);
    b.assign(out, Expr::Op(op, vec![Expr::net(a), Expr::net(bb)]));
    b.output("out", w1);
    b.finish()
}

/// `op(a) -> out`, single-bit, for any unary [`GateOp`] (`Not`/`Buf`).
pub fn unary_gate(op: GateOp) -> Module {
    let mut b = Module::builder(format!("unary_{op:?}"));
    let w1 = Width::new(1).unwrap();

    let a = b.input("a", w1);
    let out = b.net("out", w1);
    b.assign(out, Expr::Op(op, vec![Expr::net(a)]));
    b.output("out", w1);
    b.finish()
}

/// `mux4(sel[2]) -> out[4]`, selecting among four distinct 4-bit constants
/// `{1, 2, 4, 8}` so every selector value produces a different output.
pub fn mux4_demo() -> Module {
    let mut b = Module::builder("mux4_demo");
    let w2 = Width::new(2).unwrap();
    let w4 = Width::new(4).unwrap();

    let sel = b.input("sel", w2);
    let out = b.net("out", w4);

    b.assign(
        out,
        Expr::Op(
            GateOp::Mux(4),
            vec![
                Expr::net(sel),
                Expr::constant(w4, 1),
                Expr::constant(w4, 2),
                Expr::constant(w4, 4),
                Expr::constant(w4, 8),
            ],
        ),
    );
    b.output("out", w4);
    b.finish()
}
