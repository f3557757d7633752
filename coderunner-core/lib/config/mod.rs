//! Configuration of the execution core.
//!
//! [`RunnerConfig`] gathers everything the runner and dispatcher need: the container engine to
//! drive, the default resource limits, the sandbox security switches and the admission bounds.
//! It is normally loaded from the environment with [`RunnerConfig::from_env`] and adjusted by
//! command line flags afterwards.

mod limits;

use std::collections::HashMap;

use coderunner_utils::{
    env_flag, get_env, parse_byte_size, parse_env, CPU_LIMIT_ENV_VAR, DEFAULT_DOCKER_BIN,
    DEFAULT_MAX_CODE_SIZE, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_OUTPUT_SIZE, DEFAULT_MAX_QUEUED,
    DEFAULT_MAX_STDIN_SIZE, DEFAULT_MAX_TEST_CASES, DOCKER_BIN_ENV_VAR, ENABLE_NETWORK_ENV_VAR,
    EXECUTION_TIMEOUT_ENV_VAR, IMAGE_ENV_VAR_PREFIX, MAX_CODE_SIZE_ENV_VAR, MAX_CONCURRENT_ENV_VAR,
    MAX_OUTPUT_SIZE_ENV_VAR, MAX_QUEUED_ENV_VAR, MAX_STDIN_SIZE_ENV_VAR, MAX_TEST_CASES_ENV_VAR,
    MEMORY_LIMIT_ENV_VAR, PIDS_LIMIT_ENV_VAR, READONLY_ROOTFS_ENV_VAR,
};
use getset::{Getters, Setters};
use typed_builder::TypedBuilder;

use crate::{registry::Language, CoderunnerError, CoderunnerResult};

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use limits::*;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The smallest per-stream output buffer that still shows a useful compiler error.
const MIN_OUTPUT_SIZE: usize = 1024;

/// The smallest memory ceiling the container engine accepts.
pub const MIN_MEMORY_BYTES: u64 = 6 * 1024 * 1024;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Settings shared by the runner, the validator and the dispatcher.
#[derive(Debug, Clone, Getters, Setters, TypedBuilder)]
#[getset(get = "pub with_prefix", set = "pub")]
pub struct RunnerConfig {
    /// The container engine binary.
    #[builder(default = DEFAULT_DOCKER_BIN.to_string(), setter(into))]
    docker_bin: String,

    /// Default limits of every run. Requests may only tighten them.
    #[builder(default)]
    limits: ResourceLimits,

    /// Whether containers get a network interface.
    #[builder(default = false)]
    network_enabled: bool,

    /// Whether the container root filesystem is mounted read-only.
    #[builder(default = true)]
    readonly_rootfs: bool,

    /// The largest accepted source in bytes.
    #[builder(default = DEFAULT_MAX_CODE_SIZE)]
    max_code_size: usize,

    /// The largest accepted stdin in bytes.
    #[builder(default = DEFAULT_MAX_STDIN_SIZE)]
    max_stdin_size: usize,

    /// The most output kept per stream in bytes.
    #[builder(default = DEFAULT_MAX_OUTPUT_SIZE)]
    max_output_size: usize,

    /// The most test cases per evaluation.
    #[builder(default = DEFAULT_MAX_TEST_CASES)]
    max_test_cases: usize,

    /// Containers allowed to run at once.
    #[builder(default = DEFAULT_MAX_CONCURRENT)]
    max_concurrent: usize,

    /// Runs allowed to wait for a free slot.
    #[builder(default = DEFAULT_MAX_QUEUED)]
    max_queued: usize,

    /// Image references replacing the registry defaults.
    #[builder(default)]
    image_overrides: HashMap<Language, String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RunnerConfig {
    /// Loads the configuration from environment variables, using defaults for unset ones.
    ///
    /// Environment variables:
    /// - `DOCKER_BIN`: container engine binary (default: `docker`)
    /// - `MEMORY_LIMIT`: memory per container (default: `256m`)
    /// - `CPU_LIMIT`: CPUs per container (default: `1.0`)
    /// - `EXECUTION_TIMEOUT`: wall-clock ceiling in milliseconds (default: `30000`)
    /// - `PIDS_LIMIT`: processes per container (default: `50`)
    /// - `ENABLE_NETWORK`: `true` to give containers a network (default: disabled)
    /// - `READONLY_ROOTFS`: `false` to keep the root filesystem writable (default: read-only)
    /// - `MAX_CODE_SIZE`, `MAX_STDIN_SIZE`, `MAX_OUTPUT_SIZE`: byte bounds
    /// - `MAX_TEST_CASES`: test cases per evaluation (default: `50`)
    /// - `MAX_CONCURRENT_EXECUTIONS`, `MAX_QUEUED_EXECUTIONS`: admission bounds
    /// - `CODERUNNER_IMAGE_<LANGUAGE>`: image override, e.g. `CODERUNNER_IMAGE_CPP`
    pub fn from_env() -> CoderunnerResult<Self> {
        let mut config = Self::builder().build();
        let mut limits = ResourceLimits::default();

        if let Some(bin) = get_env(DOCKER_BIN_ENV_VAR) {
            config.docker_bin = bin;
        }
        if let Some(memory) = get_env(MEMORY_LIMIT_ENV_VAR) {
            limits.memory_bytes = parse_byte_size(&memory)?;
        }
        if let Some(cpus) = parse_env::<f64>(CPU_LIMIT_ENV_VAR)? {
            limits.cpus = cpus;
        }
        if let Some(timeout_ms) = parse_env::<u64>(EXECUTION_TIMEOUT_ENV_VAR)? {
            limits.timeout_ms = timeout_ms;
        }
        if let Some(pids) = parse_env::<u32>(PIDS_LIMIT_ENV_VAR)? {
            limits.pids = pids;
        }
        config.limits = limits;

        config.network_enabled = env_flag(ENABLE_NETWORK_ENV_VAR);
        if let Some(readonly) = parse_env::<bool>(READONLY_ROOTFS_ENV_VAR)? {
            config.readonly_rootfs = readonly;
        }

        if let Some(n) = parse_env(MAX_CODE_SIZE_ENV_VAR)? {
            config.max_code_size = n;
        }
        if let Some(n) = parse_env(MAX_STDIN_SIZE_ENV_VAR)? {
            config.max_stdin_size = n;
        }
        if let Some(n) = parse_env(MAX_OUTPUT_SIZE_ENV_VAR)? {
            config.max_output_size = n;
        }
        if let Some(n) = parse_env(MAX_TEST_CASES_ENV_VAR)? {
            config.max_test_cases = n;
        }
        if let Some(n) = parse_env(MAX_CONCURRENT_ENV_VAR)? {
            config.max_concurrent = n;
        }
        if let Some(n) = parse_env(MAX_QUEUED_ENV_VAR)? {
            config.max_queued = n;
        }

        for language in Language::ALL {
            let var = format!("{}{}", IMAGE_ENV_VAR_PREFIX, language.as_str().to_uppercase());
            if let Some(image) = get_env(&var) {
                tracing::debug!("using image override {} for {}", image, language);
                config.image_overrides.insert(language, image);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can actually run containers.
    pub fn validate(&self) -> CoderunnerResult<()> {
        if self.docker_bin.trim().is_empty() {
            return Err(CoderunnerError::Config(
                "container engine binary must not be empty".to_string(),
            ));
        }

        if self.limits.timeout_ms == 0 {
            return Err(CoderunnerError::Config(
                "execution timeout must be greater than zero".to_string(),
            ));
        }

        if self.limits.memory_bytes < MIN_MEMORY_BYTES {
            return Err(CoderunnerError::Config(format!(
                "memory limit must be at least {} bytes, got {}",
                MIN_MEMORY_BYTES,
                self.limits.memory_bytes
            )));
        }

        if !(self.limits.cpus > 0.0 && self.limits.cpus.is_finite()) {
            return Err(CoderunnerError::Config(format!(
                "cpu limit must be a positive number, got {}",
                self.limits.cpus
            )));
        }

        if self.limits.pids == 0 {
            return Err(CoderunnerError::Config(
                "pids limit must be greater than zero".to_string(),
            ));
        }

        if self.max_code_size == 0 {
            return Err(CoderunnerError::Config(
                "maximum code size must be greater than zero".to_string(),
            ));
        }

        if self.max_output_size < MIN_OUTPUT_SIZE {
            return Err(CoderunnerError::Config(format!(
                "maximum output size must be at least {} bytes, got {}",
                MIN_OUTPUT_SIZE, self.max_output_size
            )));
        }

        if self.max_concurrent == 0 {
            return Err(CoderunnerError::Config(
                "at least one concurrent execution must be allowed".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.get_docker_bin(), "docker");
        assert!(!*config.get_network_enabled());
        assert!(*config.get_readonly_rootfs());
        assert_eq!(*config.get_max_code_size(), 50_000);
        assert_eq!(*config.get_max_concurrent(), 4);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let zero_slots = RunnerConfig::builder().max_concurrent(0).build();
        assert!(matches!(
            zero_slots.validate(),
            Err(CoderunnerError::Config(_))
        ));

        let tiny_output = RunnerConfig::builder().max_output_size(10).build();
        assert!(tiny_output.validate().is_err());

        let mut config = RunnerConfig::default();
        config.set_limits(ResourceLimits {
            cpus: 0.0,
            ..ResourceLimits::default()
        });
        assert!(config.validate().is_err());
    }
}
