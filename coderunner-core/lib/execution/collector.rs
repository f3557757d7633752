//! Turning raw container output into results, and cleaning up after runs.

use coderunner_utils::{CONTAINER_NAME_PREFIX, SIGKILL_EXIT_CODE};

use crate::{
    config::ResourceLimits,
    runtime::{ContainerRuntime, RawOutcome},
    CoderunnerResult,
};

use super::{ExecutionResult, ExecutionStatus, Workspace};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Builds the result of a run from what the container produced.
pub fn collect(raw: RawOutcome, limits: &ResourceLimits) -> ExecutionResult {
    let stdout = String::from_utf8_lossy(&raw.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&raw.stderr).trim().to_string();

    let (status, exit_code, error) = if raw.timed_out {
        (
            ExecutionStatus::TimedOut,
            -1,
            Some(format!("Execution timed out after {}ms", limits.timeout_ms)),
        )
    } else {
        match raw.exit_code {
            Some(0) => (ExecutionStatus::Success, 0, None),
            Some(SIGKILL_EXIT_CODE) => (
                ExecutionStatus::MemoryLimitExceeded,
                SIGKILL_EXIT_CODE,
                Some(format!(
                    "Process was killed after exceeding the memory limit of {} bytes",
                    limits.memory_bytes
                )),
            ),
            Some(code) => (ExecutionStatus::RuntimeError, code, None),
            None => (
                ExecutionStatus::RuntimeError,
                -1,
                Some("Process was terminated by a signal".to_string()),
            ),
        }
    };

    ExecutionResult {
        stdout,
        stderr,
        exit_code,
        execution_time_ms: raw.elapsed.as_millis() as u64,
        timed_out: raw.timed_out,
        truncated: raw.truncated,
        status,
        error,
    }
}

/// Removes a run's container and workspace. Failures are logged, never returned.
pub async fn teardown(runtime: &dyn ContainerRuntime, container: &str, workspace: Workspace) {
    if let Err(e) = runtime.remove(container).await {
        tracing::warn!("failed to remove container {}: {}", container, e);
    }

    let path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        tracing::warn!("failed to remove workspace {}: {}", path.display(), e);
    }
}

/// Removes execution containers left behind by an earlier process. Returns how many were removed.
pub async fn sweep_stale_containers(runtime: &dyn ContainerRuntime) -> CoderunnerResult<usize> {
    let stale = runtime.list(CONTAINER_NAME_PREFIX).await?;
    let mut removed = 0;

    for name in &stale {
        match runtime.remove(name).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("failed to remove stale container {}: {}", name, e),
        }
    }

    if removed > 0 {
        tracing::info!("removed {} stale execution containers", removed);
    }

    Ok(removed)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_collect_success_trims_output() {
        let raw = RawOutcome {
            elapsed: Duration::from_millis(42),
            ..RawOutcome::exited(0, "12\n", "  ")
        };
        let result = collect(raw, &ResourceLimits::default());

        assert_eq!(result.stdout, "12");
        assert_eq!(result.stderr, "");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.execution_time_ms, 42);
        assert_eq!(result.status, ExecutionStatus::Success);
        assert!(result.is_success());
    }

    #[test]
    fn test_collect_timeout() {
        let raw = RawOutcome {
            stdout: b"partial".to_vec(),
            exit_code: Some(137),
            timed_out: true,
            ..Default::default()
        };
        let limits = ResourceLimits {
            timeout_ms: 1500,
            ..ResourceLimits::default()
        };
        let result = collect(raw, &limits);

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.stdout, "partial");
        assert_eq!(
            result.error.as_deref(),
            Some("Execution timed out after 1500ms")
        );
        assert!(!result.is_success());
    }

    #[test]
    fn test_collect_failures() {
        let limits = ResourceLimits::default();

        let compile_error = collect(RawOutcome::exited(1, "", "main.cpp:1: error"), &limits);
        assert_eq!(compile_error.status, ExecutionStatus::RuntimeError);
        assert_eq!(compile_error.exit_code, 1);
        assert_eq!(compile_error.error, None);
        assert_eq!(compile_error.visible_output(), "main.cpp:1: error");

        let oom = collect(RawOutcome::exited(137, "", ""), &limits);
        assert_eq!(oom.status, ExecutionStatus::MemoryLimitExceeded);
        assert!(oom.error.unwrap().contains("memory limit"));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_execution_containers() -> CoderunnerResult<()> {
        let runtime = MockRuntime::echo().with_containers([
            "codezy-exec-1",
            "postgres",
            "codezy-exec-2",
        ]);

        let removed = sweep_stale_containers(&runtime).await?;
        assert_eq!(removed, 2);
        assert_eq!(runtime.removed(), vec!["codezy-exec-1", "codezy-exec-2"]);
        assert_eq!(runtime.list("").await?, vec!["postgres"]);
        Ok(())
    }
}
