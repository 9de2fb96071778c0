//! Boundary behaviors from §8: the empty module, exhaustive truth tables
//! for every primitive gate, Add/Sub extremes, mux selector coverage, and
//! DFF reset/enable semantics.

use netforge_conformance::{simulator_on, solo_registry, ALL_BACKENDS};
use netforge_core::prelude::*;
use netforge_fixtures::{accumulator_cpu, binary_gate, dff_reset, mux4_demo, unary_gate};

/// A bus that always refuses reads, to exercise the `BusCallbackFailure`
/// path: `step` must fail the call rather than silently feeding a stale or
/// default value into the netlist.
struct RefusingBus;

impl MemoryBus for RefusingBus {
    fn read(&mut self, _addr: u16) -> Result<u8, String> {
        Err("refusing bus always denies reads".to_string())
    }

    fn write(&mut self, _addr: u16, _data: u8) -> Result<(), String> {
        Ok(())
    }
}

#[test]
fn bus_read_failure_is_reported_not_swallowed() {
    let (registry, top) = solo_registry(accumulator_cpu(8));
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        sim.attach_bus(Box::new(RefusingBus));
        sim.write_port("rst", 1).unwrap();
        sim.step().unwrap();
        sim.write_port("rst", 0).unwrap();

        // The accumulator CPU's fetch state asserts mem_read_en on its very
        // first post-reset cycle, so the refusing bus trips immediately.
        let err = sim.step().unwrap_err();
        assert!(
            matches!(err, SimError::BusCallbackFailure { .. }),
            "backend {backend:?}: expected BusCallbackFailure, got {err:?}"
        );
    }
}

fn empty_module() -> Module {
    Module::builder("empty").finish()
}

#[test]
fn empty_module_step_is_a_no_op() {
    let (registry, top) = solo_registry(empty_module());
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        assert_eq!(sim.wires(), &[] as &[u8]);
        sim.step().unwrap();
        sim.step_n(10).unwrap();
        assert_eq!(sim.cycle_count(), 11);
    }
}

#[test]
fn binary_gate_truth_tables_are_exhaustive() {
    for op in [GateOp::And, GateOp::Or, GateOp::Xor] {
        let (registry, top) = solo_registry(binary_gate(op));
        for backend in ALL_BACKENDS {
            let mut sim = simulator_on(&registry, &top, backend).unwrap();
            for a in 0..2u64 {
                for bb in 0..2u64 {
                    sim.write_port("a", a).unwrap();
                    sim.write_port("b", bb).unwrap();
                    let expected = match op {
                        GateOp::And => a & bb,
                        GateOp::Or => a | bb,
                        GateOp::Xor => a ^ bb,
                        _ => unreachable!(),
                    };
                    assert_eq!(sim.read_port("out").unwrap(), expected, "{op:?} backend {backend:?} a={a} b={bb}");
                }
            }
        }
    }
}

#[test]
fn unary_gate_truth_tables_are_exhaustive() {
    for op in [GateOp::Not, GateOp::Buf] {
        let (registry, top) = solo_registry(unary_gate(op));
        for backend in ALL_BACKENDS {
            let mut sim = simulator_on(&registry, &top, backend).unwrap();
            for a in 0..2u64 {
                sim.write_port("a", a).unwrap();
                let expected = match op {
                    GateOp::Not => 1 - a,
                    GateOp::Buf => a,
                    _ => unreachable!(),
                };
                assert_eq!(sim.read_port("out").unwrap(), expected, "{op:?} backend {backend:?} a={a}");
            }
        }
    }
}

fn add_sub_module(op: GateOp, width: u32) -> Module {
    let mut b = Module::builder(format!("{op:?}_{width}"));
    let w = Width::new(width).unwrap();
    let a = b.input("a", w);
    let bb = b.input("b", w);
    let out = b.net("out", w);
    b.assign(out, Expr::Op(op, vec![Expr::net(a), Expr::net(bb)]));
    b.output("out", w);
    b.finish()
}

#[test]
fn add_exhaustive_width_4() {
    let (registry, top) = solo_registry(add_sub_module(GateOp::Add, 4));
    let mask = 0xFu64;
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        for a in 0..16u64 {
            for bb in 0..16u64 {
                sim.write_port("a", a).unwrap();
                sim.write_port("b", bb).unwrap();
                assert_eq!(sim.read_port("out").unwrap(), (a + bb) & mask, "backend {backend:?} a={a} b={bb}");
            }
        }
    }
}

#[test]
fn sub_exhaustive_width_4() {
    let (registry, top) = solo_registry(add_sub_module(GateOp::Sub, 4));
    let mask = 0xFu64;
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        for a in 0..16u64 {
            for bb in 0..16u64 {
                sim.write_port("a", a).unwrap();
                sim.write_port("b", bb).unwrap();
                assert_eq!(sim.read_port("out").unwrap(), a.wrapping_sub(bb) & mask, "backend {backend:?} a={a} b={bb}");
            }
        }
    }
}

#[test]
fn add_sub_extremes_width_8_and_16() {
    for width in [8u32, 16] {
        let mask = (1u64 << width) - 1;
        let extremes = [0u64, 1, mask - 1, mask];
        for (op, f): (GateOp, fn(u64, u64) -> u64) in [(GateOp::Add, |a: u64, b: u64| a.wrapping_add(b)), (GateOp::Sub, |a: u64, b: u64| a.wrapping_sub(b))] {
            let (registry, top) = solo_registry(add_sub_module(op, width));
            for backend in ALL_BACKENDS {
                let mut sim = simulator_on(&registry, &top, backend).unwrap();
                for &a in &extremes {
                    for &bb in &extremes {
                        sim.write_port("a", a).unwrap();
                        sim.write_port("b", bb).unwrap();
                        assert_eq!(sim.read_port("out").unwrap(), f(a, bb) & mask, "{op:?} width {width} backend {backend:?} a={a} b={bb}");
                    }
                }
            }
        }
    }
}

#[test]
fn mux_selector_covers_every_value_with_distinct_data() {
    let (registry, top) = solo_registry(mux4_demo());
    let expected = [1u64, 2, 4, 8];
    assert_eq!(expected.iter().collect::<std::collections::HashSet<_>>().len(), expected.len(), "fixture data must be distinct per selector value");
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();
        for (sel, want) in expected.into_iter().enumerate() {
            sim.write_port("sel", sel as u64).unwrap();
            assert_eq!(sim.read_port("out").unwrap(), want, "backend {backend:?} sel={sel}");
        }
    }
}

#[test]
fn dff_reset_drives_q_and_enable_zero_suppresses_capture() {
    let (registry, top) = solo_registry(dff_reset::async_reset_dff());
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();

        sim.write_port("rst", 1).unwrap();
        sim.write_port("d", 1).unwrap();
        assert_eq!(sim.read_port("q").unwrap(), 1, "backend {backend:?}: reset drives q to reset_value");

        sim.write_port("rst", 0).unwrap();
        sim.write_port("d", 1).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.read_port("q").unwrap(), 1, "backend {backend:?}: deasserting reset and clocking captures d");

        sim.write_port("d", 0).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.read_port("q").unwrap(), 0, "backend {backend:?}: subsequent clock captures the new d");
    }
}

fn enable_gated_dff() -> Module {
    let mut b = Module::builder("enable_gated_dff");
    let w1 = Width::new(1).unwrap();
    let clk = b.input("clk", w1);
    let d = b.input("d", w1);
    let enable = b.input("enable", w1);
    let q = b.net("q", w1);
    b.dff(Dff { data: d, q, clock: clk, reset: None, reset_value: None, enable: Some(enable) });
    b.output("q", w1);
    b.finish()
}

#[test]
fn dff_enable_zero_suppresses_capture() {
    let (registry, top) = solo_registry(enable_gated_dff());
    for backend in ALL_BACKENDS {
        let mut sim = simulator_on(&registry, &top, backend).unwrap();

        sim.write_port("enable", 1).unwrap();
        sim.write_port("d", 1).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.read_port("q").unwrap(), 1, "backend {backend:?}: enabled capture");

        sim.write_port("enable", 0).unwrap();
        sim.write_port("d", 0).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.read_port("q").unwrap(), 1, "backend {backend:?}: enable=0 must suppress capture");

        sim.write_port("enable", 1).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.read_port("q").unwrap(), 0, "backend {backend:?}: re-enabling captures the now-stale d");
    }
}
