//! Scenario B: an 8-bit up-counter with synchronous enable and asynchronous
//! reset, built straight out of a [`Dff`] and a `Add` operator — no state
//! machine needed since the counter's only state is its own count.

use netforge_core::prelude::*;

/// `counter8(clk, rst, enable) -> q[8]`, counting up by one each cycle
/// `enable` is asserted, wrapping from 255 back to 0.
pub fn up_counter8() -> Module {
    let mut b = Module::builder("counter8");
    let w1 = Width::new(1).unwrap();
    let w8 = Width::new(8).unwrap();

    let clk = b.input("clk", w1);
    let rst = b.input("rst", w1);
    let enable = b.input("enable", w1);

    let q = b.net("q", w8);
    let q_next = b.net("q_next", w8);
    b.assign(q_next, Expr::Op(GateOp::Add, vec![Expr::net(q), Expr::constant(w8, 1)]));

    b.dff(Dff {
        data: q_next,
        q,
        clock: clk,
        reset: Some(rst),
        reset_value: Some(Const::new(w8, 0)),
        enable: Some(enable),
    });

    b.output("q", w8);
    b.finish()
}
