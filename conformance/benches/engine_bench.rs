//! Steady-state per-cycle cost of the interpreter versus the JIT on the
//! gate-count stress fixture (§4.4.3's "sub-interpreter steady-state cost"
//! property), plus first-call codegen cost in isolation.

#![allow(missing_docs)]

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netforge_conformance::solo_registry;
use netforge_core::prelude::*;
use netforge_fixtures::{accumulator_cpu, CPU_WIDE_REG_WIDTH};

fn stress_netlist() -> Netlist {
    let (registry, top) = solo_registry(accumulator_cpu(CPU_WIDE_REG_WIDTH));
    flatten(&registry, &top).unwrap()
}

fn simulator_on(netlist: Netlist, backend: Backend) -> Simulator {
    let config = EngineConfig::new(backend).with_fallback(false);
    Simulator::new_from_netlist("accumulator_cpu".to_string(), netlist, &config).unwrap()
}

fn bench_steady_state_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_state_step");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    for backend in [Backend::Interp, Backend::Jit] {
        let mut sim = simulator_on(stress_netlist(), backend);
        sim.write_port("rst", 1).unwrap();
        sim.step().unwrap();
        sim.write_port("rst", 0).unwrap();

        group.bench_with_input(BenchmarkId::new("step", format!("{backend:?}")), &backend, |b, _| {
            b.iter(|| {
                sim.step().unwrap();
                black_box(sim.read_port("acc").unwrap());
            });
        });
    }

    group.finish();
}

fn bench_first_call_codegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_call_codegen");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("jit_build", |b| {
        b.iter(|| {
            let sim = simulator_on(stress_netlist(), Backend::Jit);
            black_box(sim.backend());
        });
    });

    group.finish();
}

fn bench_1000_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("1000_cycles");
    group.throughput(Throughput::Elements(1000));
    group.measurement_time(Duration::from_secs(5));

    for backend in [Backend::Interp, Backend::Jit] {
        group.bench_with_input(BenchmarkId::new("run", format!("{backend:?}")), &backend, |b, &backend| {
            b.iter(|| {
                let mut sim = simulator_on(stress_netlist(), backend);
                sim.write_port("rst", 1).unwrap();
                sim.step().unwrap();
                sim.write_port("rst", 0).unwrap();
                sim.step_n(999).unwrap();
                black_box(sim.read_port("pc").unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_steady_state_step, bench_first_call_codegen, bench_1000_cycles);
criterion_main!(benches);
