//! Utility functions for working with environment variables.

use std::{fmt::Display, str::FromStr};

use crate::{UtilsError, UtilsResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Environment variable for the port the server listens on
pub const PORT_ENV_VAR: &str = "PORT";

/// Environment variable for the host the server binds to
pub const HOST_ENV_VAR: &str = "HOST";

/// Environment variable for the container memory ceiling (e.g. `256m`)
pub const MEMORY_LIMIT_ENV_VAR: &str = "MEMORY_LIMIT";

/// Environment variable for the container CPU ceiling (e.g. `1.0`)
pub const CPU_LIMIT_ENV_VAR: &str = "CPU_LIMIT";

/// Environment variable for the wall-clock ceiling in milliseconds
pub const EXECUTION_TIMEOUT_ENV_VAR: &str = "EXECUTION_TIMEOUT";

/// Environment variable for the container process ceiling
pub const PIDS_LIMIT_ENV_VAR: &str = "PIDS_LIMIT";

/// Environment variable that enables container networking when set to `true`
pub const ENABLE_NETWORK_ENV_VAR: &str = "ENABLE_NETWORK";

/// Environment variable that mounts the container root filesystem read-only when `true`
pub const READONLY_ROOTFS_ENV_VAR: &str = "READONLY_ROOTFS";

/// Environment variable for the largest accepted source in bytes
pub const MAX_CODE_SIZE_ENV_VAR: &str = "MAX_CODE_SIZE";

/// Environment variable for the largest accepted stdin in bytes
pub const MAX_STDIN_SIZE_ENV_VAR: &str = "MAX_STDIN_SIZE";

/// Environment variable for the most output kept per stream in bytes
pub const MAX_OUTPUT_SIZE_ENV_VAR: &str = "MAX_OUTPUT_SIZE";

/// Environment variable for the most test cases per evaluation
pub const MAX_TEST_CASES_ENV_VAR: &str = "MAX_TEST_CASES";

/// Environment variable for the number of containers allowed to run at once
pub const MAX_CONCURRENT_ENV_VAR: &str = "MAX_CONCURRENT_EXECUTIONS";

/// Environment variable for the number of runs allowed to wait for a slot
pub const MAX_QUEUED_ENV_VAR: &str = "MAX_QUEUED_EXECUTIONS";

/// Environment variable for the container engine binary
pub const DOCKER_BIN_ENV_VAR: &str = "DOCKER_BIN";

/// Prefix of the per-language image override variables, e.g. `CODERUNNER_IMAGE_CPP`
pub const IMAGE_ENV_VAR_PREFIX: &str = "CODERUNNER_IMAGE_";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Reads and parses an environment variable.
///
/// Returns `Ok(None)` when the variable is unset or empty and an error when it is set to a value
/// that does not parse.
pub fn parse_env<T>(name: &str) -> UtilsResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = get_env(name) else {
        return Ok(None);
    };

    match value.parse::<T>() {
        Ok(parsed) => {
            tracing::debug!("{} set to {}", name, value);
            Ok(Some(parsed))
        }
        Err(e) => Err(UtilsError::InvalidEnvVar {
            name: name.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}

/// Returns a string environment variable, if set and non-empty.
pub fn get_env(name: &str) -> Option<String> {
    let value = std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())?;
    tracing::trace!("read {} from the environment", name);
    Some(value)
}

/// Returns `true` only when the variable is set to `true` (case-insensitive) or `1`.
pub fn env_flag(name: &str) -> bool {
    get_env(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_parse_env_handles_unset_empty_and_invalid() {
        std::env::remove_var("CODERUNNER_TEST_UNSET");
        assert_eq!(parse_env::<u64>("CODERUNNER_TEST_UNSET").unwrap(), None);

        std::env::set_var("CODERUNNER_TEST_EMPTY", "  ");
        assert_eq!(parse_env::<u64>("CODERUNNER_TEST_EMPTY").unwrap(), None);

        std::env::set_var("CODERUNNER_TEST_NUMBER", " 42 ");
        assert_eq!(parse_env::<u64>("CODERUNNER_TEST_NUMBER").unwrap(), Some(42));

        std::env::set_var("CODERUNNER_TEST_BAD", "forty-two");
        let err = parse_env::<u64>("CODERUNNER_TEST_BAD").unwrap_err();
        assert!(err.to_string().contains("CODERUNNER_TEST_BAD"));
    }

    #[test_log::test]
    fn test_env_flag() {
        std::env::set_var("CODERUNNER_TEST_FLAG_ON", "TRUE");
        std::env::set_var("CODERUNNER_TEST_FLAG_OFF", "yes");
        assert!(env_flag("CODERUNNER_TEST_FLAG_ON"));
        assert!(!env_flag("CODERUNNER_TEST_FLAG_OFF"));
        assert!(!env_flag("CODERUNNER_TEST_FLAG_MISSING"));
    }
}
