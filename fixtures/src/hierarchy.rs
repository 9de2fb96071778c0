//! Exercises instance inlining by building a full adder out of two
//! `half_adder` instances plus a combining `Or`, instead of inlining the
//! full-adder pattern by hand the way [`crate::ripple_adder`] does.

use netforge_core::prelude::*;

use crate::half_adder::half_adder;

/// Registers `half_adder` and a `full_adder_hier` module that instantiates
/// it twice (`ha1(a,b)`, `ha2(ha1.sum, cin)`), returning the registry and
/// the top module's name for [`netforge_core::flatten::flatten`].
pub fn full_adder_hierarchical() -> (Registry, &'static str) {
    let mut registry = Registry::new();
    registry.register(half_adder());

    let mut b = Module::builder("full_adder_hier");
    let w1 = Width::new(1).unwrap();

    let a = b.input("a", w1);
    let bb = b.input("b", w1);
    let cin = b.input("cin", w1);

    let s1 = b.net("ha1_sum", w1);
    let c1 = b.net("ha1_carry", w1);
    b.instance(Instance {
        name: "ha1".to_string(),
        module: "half_adder".to_string(),
        inputs: [("a".to_string(), Expr::net(a)), ("b".to_string(), Expr::net(bb))].into_iter().collect(),
        outputs: [("sum".to_string(), s1), ("carry".to_string(), c1)].into_iter().collect(),
    });

    let sum = b.net("sum", w1);
    let c2 = b.net("ha2_carry", w1);
    b.instance(Instance {
        name: "ha2".to_string(),
        module: "half_adder".to_string(),
        inputs: [("a".to_string(), Expr::net(s1)), ("b".to_string(), Expr::net(cin))].into_iter().collect(),
        outputs: [("sum".to_string(), sum), ("carry".to_string(), c2)].into_iter().collect(),
    });

    let cout = b.net("cout", w1);
    b.assign(cout, Expr::Op(GateOp::Or, vec![Expr::net(c1), Expr::net(c2)]));

    b.output("sum", w1);
    b.output("cout", w1);

    registry.register(b.finish());
    (registry, "full_adder_hier")
}
