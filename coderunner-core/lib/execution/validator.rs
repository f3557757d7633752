//! Admission checks run before anything reaches a container.

use coderunner_utils::parse_byte_size;

use crate::{
    config::{LimitsRequest, ResourceLimits, RunnerConfig, MIN_MEMORY_BYTES},
    evaluation::{ComparisonMode, TestCase},
    ValidationError,
};

use super::ExecutionRequest;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Validates a run and returns the limits it will execute under.
pub fn validate_request(
    request: &ExecutionRequest,
    config: &RunnerConfig,
) -> Result<ResourceLimits, ValidationError> {
    validate_source(&request.source, config)?;
    validate_stdin(&request.stdin, config)?;
    resolve_limits(request.limits.as_ref(), config)
}

/// Checks that a source is present and within the size bound.
pub fn validate_source(source: &str, config: &RunnerConfig) -> Result<(), ValidationError> {
    if source.trim().is_empty() {
        return Err(ValidationError::MissingSource);
    }

    let max = *config.get_max_code_size();
    if source.len() > max {
        return Err(ValidationError::SourceTooLarge {
            size: source.len(),
            max,
        });
    }

    Ok(())
}

/// Checks that stdin is within the size bound.
pub fn validate_stdin(stdin: &str, config: &RunnerConfig) -> Result<(), ValidationError> {
    let max = *config.get_max_stdin_size();
    if stdin.len() > max {
        return Err(ValidationError::StdinTooLarge {
            size: stdin.len(),
            max,
        });
    }
    Ok(())
}

/// Merges requested limits into the configured ones. Requests may only tighten them.
pub fn resolve_limits(
    requested: Option<&LimitsRequest>,
    config: &RunnerConfig,
) -> Result<ResourceLimits, ValidationError> {
    let ceiling = *config.get_limits();
    let Some(requested) = requested else {
        return Ok(ceiling);
    };

    let mut limits = ceiling;

    if let Some(timeout_ms) = requested.timeout_ms {
        if timeout_ms == 0 || timeout_ms > ceiling.timeout_ms {
            return Err(out_of_range("timeoutMs", timeout_ms, 1, ceiling.timeout_ms));
        }
        limits.timeout_ms = timeout_ms;
    }

    if let Some(memory) = &requested.memory {
        let bytes =
            parse_byte_size(memory).map_err(|_| ValidationError::InvalidMemory(memory.clone()))?;
        if bytes < MIN_MEMORY_BYTES || bytes > ceiling.memory_bytes {
            return Err(out_of_range(
                "memory",
                bytes,
                MIN_MEMORY_BYTES,
                ceiling.memory_bytes,
            ));
        }
        limits.memory_bytes = bytes;
    }

    if let Some(cpus) = requested.cpus {
        if !(cpus > 0.0 && cpus <= ceiling.cpus) {
            return Err(out_of_range("cpus", cpus, "0 (exclusive)", ceiling.cpus));
        }
        limits.cpus = cpus;
    }

    if let Some(pids) = requested.pids {
        if pids == 0 || pids > ceiling.pids {
            return Err(out_of_range("pids", pids, 1, ceiling.pids));
        }
        limits.pids = pids;
    }

    Ok(limits)
}

/// Checks the test cases of an evaluation: count, input sizes and regex patterns.
pub fn validate_test_cases(
    test_cases: &[TestCase],
    config: &RunnerConfig,
) -> Result<(), ValidationError> {
    let max = *config.get_max_test_cases();
    if test_cases.len() > max {
        return Err(ValidationError::TooManyTestCases {
            count: test_cases.len(),
            max,
        });
    }

    for (index, test_case) in test_cases.iter().enumerate() {
        validate_stdin(&test_case.input, config)?;

        if test_case.comparison_mode == ComparisonMode::Regex {
            regex::Regex::new(&test_case.expected_output).map_err(|e| {
                ValidationError::InvalidPattern {
                    index,
                    reason: e.to_string(),
                }
            })?;
        }
    }

    Ok(())
}

fn out_of_range(
    name: &'static str,
    value: impl ToString,
    min: impl ToString,
    max: impl ToString,
) -> ValidationError {
    ValidationError::LimitOutOfRange {
        name,
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
