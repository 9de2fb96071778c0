//! The crate-wide error type.
//!
//! Every fallible operation in the lowering pass and the driver facade
//! returns a [`SimError`]. None of them panic on a malformed but
//! syntactically well-typed `Module`/`Netlist`/driver call; panics are
//! reserved for invariant violations that indicate a bug in this crate
//! itself (e.g. a schedule that references a wire id that doesn't exist).

use std::path::PathBuf;

use thiserror::Error;

/// All fallible outcomes exposed by this crate.
#[derive(Debug, Error)]
pub enum SimError {
    /// A `GateOp` was applied to operands whose widths don't agree with its tag.
    #[error("width mismatch in `{module}`: {detail}")]
    WidthMismatch {
        /// Name of the module in which the mismatch was found.
        module: String,
        /// Human-readable description of the expected vs. actual widths.
        detail: String,
    },

    /// A net has no driver (no assign, no DFF output, not a port input).
    #[error("net `{net}` in `{module}` is undriven")]
    UndrivenNet {
        /// Name of the module.
        module: String,
        /// Name of the undriven net.
        net: String,
    },

    /// A net has more than one driver.
    #[error("net `{net}` in `{module}` is driven more than once")]
    MultiplyDriven {
        /// Name of the module.
        module: String,
        /// Name of the net.
        net: String,
    },

    /// The combinational subgraph (gates only, DFF outputs as sources) is not a DAG.
    #[error("combinational cycle detected while scheduling `{module}`")]
    CyclicCombinational {
        /// Name of the module that failed to schedule.
        module: String,
    },

    /// Submodule instantiation forms a cycle in the module hierarchy.
    #[error("cyclic module hierarchy detected while inlining `{module}`")]
    CyclicHierarchy {
        /// Name of the module whose instantiation chain cycles back to itself.
        module: String,
    },

    /// The IR referenced an operator the lowering pass has no pattern for.
    #[error("unknown operator `{op}` in `{module}`")]
    UnknownOperator {
        /// Name of the module.
        module: String,
        /// Debug text of the offending operator tag.
        op: String,
    },

    /// The driver API named a port that isn't in the module.
    #[error("port `{0}` not found")]
    PortNotFound(String),

    /// `write_port` was given a value that doesn't fit in the port's width.
    #[error("value {value:#x} does not fit in {width}-bit port `{port}`")]
    InvalidValue {
        /// Name of the port.
        port: String,
        /// Width of the port, in bits.
        width: u32,
        /// The value that was rejected.
        value: u64,
    },

    /// The JIT backend failed to emit or compile the generated module.
    #[error("JIT codegen failed for netlist {netlist_hash}: {detail}")]
    JitCodegenFailed {
        /// Short hex prefix of the netlist's content hash, for log correlation.
        netlist_hash: String,
        /// What went wrong.
        detail: String,
    },

    /// No precompiled AOT artifact exists for this netlist's hash.
    #[error("no AOT artifact cached for netlist {netlist_hash} in {cache_dir}")]
    AotCacheMiss {
        /// Short hex prefix of the netlist's content hash.
        netlist_hash: String,
        /// Cache directory that was searched.
        cache_dir: String,
    },

    /// The AOT artifact exists but failed to build or load.
    #[error("AOT build failed for netlist {netlist_hash}: {detail}")]
    AotBuildFailed {
        /// Short hex prefix of the netlist's content hash.
        netlist_hash: String,
        /// What went wrong.
        detail: String,
    },

    /// The host's memory-bus callback signalled failure mid-step.
    #[error("bus callback failed at cycle {cycle}: {detail}")]
    BusCallbackFailure {
        /// Cycle count at the time of the failure.
        cycle: u64,
        /// What the host reported.
        detail: String,
    },

    /// Netlist serialization or parsing failed (corrupt or non-canonical bytes).
    #[error("netlist serialization error: {0}")]
    Serialization(String),

    /// An I/O error surfaced while touching the AOT artifact cache.
    #[error("cache I/O error at {path}: {source}")]
    CacheIo {
        /// Path that the I/O operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Shorthand result type used throughout this crate.
pub type Result<T> = std::result::Result<T, SimError>;
