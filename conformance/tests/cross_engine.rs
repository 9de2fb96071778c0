//! Invariant 2: Interpreter, JIT, and AOT agree on the observable trace for
//! every fixture, across a clocked input stream, not just the literal
//! scenario vectors.

use netforge_conformance::{sample, simulator_on, solo_registry, ALL_BACKENDS};
use netforge_fixtures::{async_reset_dff, half_adder, mux4_demo, ripple_adder4, up_counter8};

fn traces_agree_over_cycles(module: netforge_core::prelude::Module, cycles: u64) {
    let (registry, top) = solo_registry(module);
    let mut traces = Vec::new();
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        let mut trace = vec![sample(&sim)];
        for i in 0..cycles {
            // Exercise a handful of distinct input bytes across the run so
            // the comparison isn't just "everything stays at reset".
            let _ = sim.write_port("rst", (i == 0) as u64);
            let _ = sim.write_port("enable", 1);
            sim.step().unwrap();
            trace.push(sample(&sim));
        }
        traces.push((backend, trace));
    }

    let (reference_backend, reference) = &traces[0];
    for (backend, trace) in &traces[1..] {
        assert_eq!(trace, reference, "{backend:?} trace diverged from {reference_backend:?}");
    }
}

#[test]
fn counter_traces_agree_across_engines() {
    traces_agree_over_cycles(up_counter8(), 50);
}

#[test]
fn async_reset_dff_traces_agree_across_engines() {
    traces_agree_over_cycles(async_reset_dff(), 20);
}

#[test]
fn half_adder_combinational_agrees_across_engines() {
    let (registry, top) = solo_registry(half_adder());
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        for a in 0..2u64 {
            for bb in 0..2u64 {
                sim.write_port("a", a).unwrap();
                sim.write_port("b", bb).unwrap();
                assert_eq!(sim.read_port("sum").unwrap(), a ^ bb, "backend {backend:?}");
                assert_eq!(sim.read_port("carry").unwrap(), a & bb, "backend {backend:?}");
            }
        }
    }
}

#[test]
fn ripple_adder_agrees_across_engines_for_every_input() {
    let (registry, top) = solo_registry(ripple_adder4());
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        for a in 0..16u64 {
            for bb in 0..16u64 {
                for cin in 0..2u64 {
                    sim.write_port("a", a).unwrap();
                    sim.write_port("b", bb).unwrap();
                    sim.write_port("cin", cin).unwrap();
                    let total = a + bb + cin;
                    assert_eq!(sim.read_port("sum").unwrap(), total & 0xF, "backend {backend:?} a={a} b={bb} cin={cin}");
                    assert_eq!(sim.read_port("cout").unwrap(), total >> 4, "backend {backend:?} a={a} b={bb} cin={cin}");
                }
            }
        }
    }
}

#[test]
fn mux_selector_agrees_across_engines() {
    let (registry, top) = solo_registry(mux4_demo());
    let expected = [1u64, 2, 4, 8];
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        for (sel, want) in expected.into_iter().enumerate() {
            sim.write_port("sel", sel as u64).unwrap();
            assert_eq!(sim.read_port("out").unwrap(), want, "backend {backend:?} sel={sel}");
        }
    }
}
