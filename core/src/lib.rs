//! `netforge-core`: the behavioral IR, the flattening/lowering pass, the
//! flat single-bit netlist, and the interpreter/JIT/AOT simulation engines
//! described across this repository's design notes.

pub mod config;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod ir;
pub mod netlist;
pub mod schedule;

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Backend, FlatMemory, MemoryBus, Simulator};
    pub use crate::error::{Result, SimError};
    pub use crate::flatten::flatten;
    pub use crate::ir::{
        Const, Dff, Direction, Expr, GateOp, Instance, Module, ModuleBuilder, NetId, Registry, Signal, Width,
    };
    pub use crate::netlist::{GatePrim, Netlist};
    pub use crate::schedule::{build_schedule, Schedule};
}
