//! The small configuration surface the driver facade accepts at
//! construction: which backend to start on, where the AOT
//! artifact cache lives, and whether backend fallback is permitted.

use std::path::PathBuf;

use crate::engine::Backend;

/// Construction-time configuration for a [`crate::engine::Simulator`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which backend `new_from_netlist` should start on.
    pub backend: Backend,
    /// Directory the AOT engine uses for its artifact cache and
    /// `manifest.json` sidecar. Defaults to a platform cache directory.
    pub aot_cache_dir: PathBuf,
    /// When `false`, a recoverable degradation (`JitCodegenFailed`,
    /// `AotCacheMiss`/`AotBuildFailed`) is returned as an error instead of
    /// silently falling back to a slower backend.
    pub allow_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            backend: Backend::Interp,
            aot_cache_dir: default_cache_dir(),
            allow_fallback: true,
        }
    }
}

impl EngineConfig {
    pub fn new(backend: Backend) -> EngineConfig {
        EngineConfig { backend, ..EngineConfig::default() }
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> EngineConfig {
        self.aot_cache_dir = dir;
        self
    }

    pub fn with_fallback(mut self, allow: bool) -> EngineConfig {
        self.allow_fallback = allow;
        self
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("netforge").join("aot-cache")
}
