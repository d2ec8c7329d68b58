//! Script configuration.

use serde::{Deserialize, Serialize};

use crate::blocks::LoopGuard;

/// Default iteration ceiling for loops built from this configuration.
pub const DEFAULT_MAX_LOOP_ITERATIONS: u64 = 10_000;

/// Default number of traces kept per script when tracing is enabled.
pub const DEFAULT_TRACE_CAPACITY: usize = 256;

/// Configuration shared by the scripts of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Iteration ceiling handed to loop guards.
    pub max_loop_iterations: u64,
    /// Whether script instances buffer execution traces.
    pub trace_enabled: bool,
    /// Traces kept per script instance.
    pub trace_capacity: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            trace_enabled: false,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

impl ScriptConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `json` is malformed or has wrongly typed fields.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Override the loop iteration ceiling.
    #[must_use]
    pub fn with_max_loop_iterations(mut self, limit: u64) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    /// Enable trace buffering with the given capacity.
    #[must_use]
    pub fn with_tracing(mut self, capacity: usize) -> Self {
        self.trace_enabled = true;
        self.trace_capacity = capacity;
        self
    }

    /// A loop guard named `name` using the configured ceiling.
    #[must_use]
    pub fn loop_guard(&self, name: impl Into<String>) -> LoopGuard {
        LoopGuard::new(name, self.max_loop_iterations)
    }
}
