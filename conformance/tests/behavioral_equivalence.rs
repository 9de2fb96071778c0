//! Invariant 1: `behavioral(M)(v) == flatten_and_eval(M)(v)` for every
//! module and every input vector, checked against the combinational
//! fixtures (the behavioral evaluator only resolves a single snapshot, so
//! this never touches a fixture with flip-flops).

use std::collections::HashMap;

use netforge_conformance::{simulator_on, solo_registry, ALL_BACKENDS};
use netforge_core::ir::eval::{eval_module, read_output};
use netforge_fixtures::{binary_gate, half_adder, hierarchy::full_adder_hierarchical, mux4_demo, ripple_adder4};
use netforge_core::prelude::*;

#[test]
fn half_adder_behavioral_matches_flattened() {
    let module = half_adder();
    let registry = Registry::new();
    let (flat_registry, top) = solo_registry(module.clone());

    for a in 0..2u128 {
        for bb in 0..2u128 {
            let inputs = HashMap::from([("a".to_string(), a), ("b".to_string(), bb)]);
            let behavioral = eval_module(&registry, &module, &inputs, &HashMap::new()).unwrap();
            let want_sum = read_output(&module, &behavioral, "sum").unwrap();
            let want_carry = read_output(&module, &behavioral, "carry").unwrap();

            for backend in ALL_BACKENDS {
                let mut sim = simulator_on(&flat_registry, &top, backend).unwrap();
                sim.write_port("a", a as u64).unwrap();
                sim.write_port("b", bb as u64).unwrap();
                assert_eq!(sim.read_port("sum").unwrap() as u128, want_sum, "backend {backend:?} a={a} b={bb}");
                assert_eq!(sim.read_port("carry").unwrap() as u128, want_carry, "backend {backend:?} a={a} b={bb}");
            }
        }
    }
}

#[test]
fn ripple_adder_behavioral_matches_flattened() {
    let module = ripple_adder4();
    let registry = Registry::new();
    let (flat_registry, top) = solo_registry(module.clone());

    for a in 0..16u128 {
        for bb in 0..16u128 {
            let inputs = HashMap::from([("a".to_string(), a), ("b".to_string(), bb), ("cin".to_string(), 0)]);
            let behavioral = eval_module(&registry, &module, &inputs, &HashMap::new()).unwrap();
            let want_sum = read_output(&module, &behavioral, "sum").unwrap();
            let want_cout = read_output(&module, &behavioral, "cout").unwrap();

            let mut sim = simulator_on(&flat_registry, &top, Backend::Interp).unwrap();
            sim.write_port("a", a as u64).unwrap();
            sim.write_port("b", bb as u64).unwrap();
            sim.write_port("cin", 0).unwrap();
            assert_eq!(sim.read_port("sum").unwrap() as u128, want_sum, "a={a} b={bb}");
            assert_eq!(sim.read_port("cout").unwrap() as u128, want_cout, "a={a} b={bb}");
        }
    }
}

#[test]
fn hierarchical_instance_behavioral_matches_flattened() {
    let (flat_registry, top) = full_adder_hierarchical();
    let module = flat_registry.get(top).unwrap().clone();

    for a in 0..2u128 {
        for bb in 0..2u128 {
            for cin in 0..2u128 {
                let inputs = HashMap::from([("a".to_string(), a), ("b".to_string(), bb), ("cin".to_string(), cin)]);
                let behavioral = eval_module(&flat_registry, &module, &inputs, &HashMap::new()).unwrap();
                let want_sum = read_output(&module, &behavioral, "sum").unwrap();
                let want_cout = read_output(&module, &behavioral, "cout").unwrap();

                let mut sim = simulator_on(&flat_registry, top, Backend::Interp).unwrap();
                sim.write_port("a", a as u64).unwrap();
                sim.write_port("b", bb as u64).unwrap();
                sim.write_port("cin", cin as u64).unwrap();
                assert_eq!(sim.read_port("sum").unwrap() as u128, want_sum, "a={a} b={bb} cin={cin}");
                assert_eq!(sim.read_port("cout").unwrap() as u128, want_cout, "a={a} b={bb} cin={cin}");
            }
        }
    }
}

#[test]
fn single_gate_behavioral_matches_flattened() {
    for op in [GateOp::And, GateOp::Or, GateOp::Xor] {
        let module = binary_gate(op);
        let registry = Registry::new();
        let (flat_registry, top) = solo_registry(module.clone());

        for a in 0..2u128 {
            for bb in 0..2u128 {
                let inputs = HashMap::from([("a".to_string(), a), ("b".to_string(), bb)]);
                let behavioral = eval_module(&registry, &module, &inputs, &HashMap::new()).unwrap();
                let want = read_output(&module, &behavioral, "out").unwrap();

                let mut sim = simulator_on(&flat_registry, &top, Backend::Interp).unwrap();
                sim.write_port("a", a as u64).unwrap();
                sim.write_port("b", bb as u64).unwrap();
                assert_eq!(sim.read_port("out").unwrap() as u128, want, "{op:?} a={a} b={bb}");
            }
        }
    }
}

#[test]
fn mux_behavioral_matches_flattened() {
    let module = mux4_demo();
    let registry = Registry::new();
    let (flat_registry, top) = solo_registry(module.clone());

    for sel in 0..4u128 {
        let inputs = HashMap::from([("sel".to_string(), sel)]);
        let behavioral = eval_module(&registry, &module, &inputs, &HashMap::new()).unwrap();
        let want = read_output(&module, &behavioral, "out").unwrap();

        let mut sim = simulator_on(&flat_registry, &top, Backend::Interp).unwrap();
        sim.write_port("sel", sel as u64).unwrap();
        assert_eq!(sim.read_port("out").unwrap() as u128, want, "sel={sel}");
    }
}
