//! Scenario F: a single bare DFF with asynchronous reset, isolated from any
//! surrounding logic so the reset-precedence behavior (§4.4.1, §8 invariant
//! 5) can be exercised directly without a clock edge.

use netforge_core::prelude::*;

/// `areset_dff(clk, rst, d) -> q`, with `rst_val = 1`.
pub fn async_reset_dff() -> Module {
    let mut b = Module::builder("areset_dff");
    let w1 = Width::new(1).unwrap();

    let clk = b.input("clk", w1);
    let rst = b.input("rst", w1);
    let d = b.input("d", w1);
    let q = b.net("q", w1);

    b.dff(Dff { data: d, q, clock: clk, reset: Some(rst), reset_value: Some(Const::new(w1, 1)), enable: None });

    b.output("q", w1);
    b.finish()
}
