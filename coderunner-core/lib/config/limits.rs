//! Resource ceilings applied to every execution container.

use coderunner_utils::{
    parse_byte_size, DEFAULT_CPU_LIMIT, DEFAULT_MEMORY_LIMIT, DEFAULT_PIDS_LIMIT,
    DEFAULT_TIMEOUT_MS, FALLBACK_MEMORY_BYTES,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The effective limits of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    /// Wall-clock ceiling in milliseconds.
    pub timeout_ms: u64,

    /// Memory ceiling in bytes. Swap is capped to the same value.
    pub memory_bytes: u64,

    /// Number of CPUs the container may use.
    pub cpus: f64,

    /// Maximum number of processes inside the container.
    pub pids: u32,
}

/// Limits a caller may ask for. Every field is optional and may only tighten the configured
/// limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsRequest {
    /// Wall-clock ceiling in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Memory ceiling such as `128m`.
    pub memory: Option<String>,

    /// Number of CPUs.
    pub cpus: Option<f64>,

    /// Maximum number of processes.
    pub pids: Option<u32>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ResourceLimits {
    /// The wall-clock ceiling as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parses a memory string, falling back to 256 MiB when it is malformed.
    pub fn memory_or_fallback(memory: &str) -> u64 {
        parse_byte_size(memory).unwrap_or_else(|e| {
            tracing::warn!("{}, using {} bytes", e, FALLBACK_MEMORY_BYTES);
            FALLBACK_MEMORY_BYTES
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            memory_bytes: Self::memory_or_fallback(DEFAULT_MEMORY_LIMIT),
            cpus: DEFAULT_CPU_LIMIT,
            pids: DEFAULT_PIDS_LIMIT,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
