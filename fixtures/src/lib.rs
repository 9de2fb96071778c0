//! Hand-built [`netforge_core::ir::Module`]s used as test inputs for the
//! conformance suite.
//!
//! Per the design notes, component libraries (gates, registers, CPUs) are
//! test inputs to the core, not part of it — this crate is exactly that: a
//! small, explicit set of fixture modules, never a front-end DSL.

pub mod accumulator_cpu;
pub mod counter;
pub mod dff_reset;
pub mod half_adder;
pub mod hierarchy;
pub mod mux;
pub mod ripple_adder;

pub use accumulator_cpu::{accumulator_cpu, CPU_WIDE_REG_WIDTH};
pub use counter::up_counter8;
pub use dff_reset::async_reset_dff;
pub use half_adder::half_adder;
pub use hierarchy::full_adder_hierarchical;
pub use mux::{binary_gate, mux4_demo, unary_gate};
pub use ripple_adder::ripple_adder4;
