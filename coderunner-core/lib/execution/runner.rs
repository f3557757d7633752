use std::sync::Arc;

use coderunner_utils::{CONTAINER_NAME_PREFIX, GUEST_TMPFS, GUEST_WORKDIR, SANDBOX_UID};
use uuid::Uuid;

use crate::{
    config::{ResourceLimits, RunnerConfig},
    registry::{ImageRegistry, LaunchPlan, SandboxImage},
    runtime::{ContainerRuntime, ContainerSpec},
    CoderunnerResult,
};

use super::{collector, ExecutionRequest, ExecutionResult, Workspace};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Runs one submission in one disposable, non-root, resource-capped container.
#[derive(Clone)]
pub struct IsolatedRunner {
    runtime: Arc<dyn ContainerRuntime>,
    registry: Arc<ImageRegistry>,
    config: Arc<RunnerConfig>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl IsolatedRunner {
    /// Creates a runner.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        registry: Arc<ImageRegistry>,
        config: Arc<RunnerConfig>,
    ) -> Self {
        Self {
            runtime,
            registry,
            config,
        }
    }

    /// The container engine in use.
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// The image registry in use.
    pub fn registry(&self) -> &Arc<ImageRegistry> {
        &self.registry
    }

    /// The configuration in use.
    pub fn config(&self) -> &Arc<RunnerConfig> {
        &self.config
    }

    /// Runs a validated request under `limits`.
    ///
    /// Never fails: a run the service could not carry out comes back as an
    /// [`InternalError`](super::ExecutionStatus::InternalError) result.
    pub async fn run(&self, request: &ExecutionRequest, limits: ResourceLimits) -> ExecutionResult {
        match self.try_run(request, limits).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("failed to run {} submission: {}", request.language, e);
                ExecutionResult::failed(e.to_string())
            }
        }
    }

    async fn try_run(
        &self,
        request: &ExecutionRequest,
        limits: ResourceLimits,
    ) -> CoderunnerResult<ExecutionResult> {
        let image = self.registry.get(request.language)?;
        let plan = request.language.launch_plan(&request.source);
        let workspace = Workspace::create(&plan, &request.source).await?;

        let name = format!("{}{}", CONTAINER_NAME_PREFIX, Uuid::new_v4());
        let spec = self.container_spec(&name, image, &plan, &workspace, &limits);

        let outcome = self
            .runtime
            .run(
                &spec,
                request.stdin.as_bytes(),
                limits.timeout(),
                *self.config.get_max_output_size(),
            )
            .await;

        collector::teardown(self.runtime.as_ref(), &name, workspace).await;

        let result = collector::collect(outcome?, &limits);
        tracing::info!(
            "{} {} in {}ms with exit code {} ({:?})",
            request.language,
            name,
            result.execution_time_ms,
            result.exit_code,
            result.status
        );
        Ok(result)
    }

    fn container_spec(
        &self,
        name: &str,
        image: &SandboxImage,
        plan: &LaunchPlan,
        workspace: &Workspace,
        limits: &ResourceLimits,
    ) -> ContainerSpec {
        ContainerSpec::builder()
            .name(name)
            .image(image.image_ref.clone())
            .command(plan.command.clone())
            .binds(vec![workspace.bind()])
            .workdir(GUEST_WORKDIR)
            .user(format!("{}:{}", SANDBOX_UID, SANDBOX_UID))
            .memory_bytes(limits.memory_bytes)
            .cpus(limits.cpus)
            .pids_limit(limits.pids)
            .network_enabled(*self.config.get_network_enabled())
            .readonly_rootfs(*self.config.get_readonly_rootfs())
            .tmpfs(GUEST_TMPFS)
            .build()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        execution::ExecutionStatus,
        registry::Language,
        runtime::{MockRuntime, RawOutcome},
        CoderunnerError,
    };

    fn runner(runtime: Arc<MockRuntime>, config: RunnerConfig) -> IsolatedRunner {
        IsolatedRunner::new(
            runtime,
            Arc::new(ImageRegistry::default()),
            Arc::new(config),
        )
    }

    #[test_log::test(tokio::test)]
    async fn test_run_launches_locked_down_container_and_cleans_up() {
        let runtime = Arc::new(MockRuntime::new(|invocation| {
            Ok(RawOutcome::exited(
                0,
                format!("{}\n", invocation.source.as_deref().unwrap_or_default()),
                "",
            ))
        }));
        let runner = runner(runtime.clone(), RunnerConfig::default());

        let request = ExecutionRequest::builder()
            .language(Language::Cpp)
            .source("int main() { return 0; }")
            .stdin("1 2 3")
            .build();
        let result = runner.run(&request, ResourceLimits::default()).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.stdout, "int main() { return 0; }");

        let invocations = runtime.invocations();
        assert_eq!(invocations.len(), 1);
        let spec = &invocations[0].spec;
        assert!(spec.get_name().starts_with("codezy-exec-"));
        assert_eq!(spec.get_image(), "codezy-cpp-runner:latest");
        assert_eq!(spec.get_user(), "1000:1000");
        assert_eq!(spec.get_workdir(), "/app");
        assert!(!*spec.get_network_enabled());
        assert_eq!(spec.get_binds()[0].guest, "/app/main.cpp");
        assert_eq!(invocations[0].stdin, b"1 2 3");

        assert_eq!(runtime.removed(), vec![spec.get_name().clone()]);
        assert!(!spec.get_binds()[0].host.exists());
    }

    #[tokio::test]
    async fn test_run_enforces_timeout() {
        let runtime = Arc::new(MockRuntime::echo().with_delay(Duration::from_millis(200)));
        let runner = runner(runtime.clone(), RunnerConfig::default());

        let request = ExecutionRequest::builder()
            .language(Language::Python)
            .source("while True: pass")
            .build();
        let limits = ResourceLimits {
            timeout_ms: 20,
            ..ResourceLimits::default()
        };
        let result = runner.run(&request, limits).await;

        assert!(result.timed_out);
        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.error.as_deref(), Some("Execution timed out after 20ms"));
        assert_eq!(runtime.removed().len(), 1);
    }

    #[tokio::test]
    async fn test_runtime_failure_becomes_internal_error() {
        let runtime = Arc::new(MockRuntime::new(|_| {
            Err(CoderunnerError::ContainerRuntime("daemon unavailable".to_string()))
        }));
        let runner = runner(runtime.clone(), RunnerConfig::default());

        let request = ExecutionRequest::builder()
            .language(Language::Java)
            .source("public class Main {}")
            .build();
        let result = runner.run(&request, ResourceLimits::default()).await;

        assert_eq!(result.status, ExecutionStatus::InternalError);
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("daemon unavailable"));
        assert_eq!(runtime.removed().len(), 1);
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let runtime = Arc::new(MockRuntime::new(|_| {
            Ok(RawOutcome::exited(0, vec![b'a'; 5000], ""))
        }));
        let config = RunnerConfig::builder().max_output_size(1024).build();
        let runner = runner(runtime, config);

        let request = ExecutionRequest::builder()
            .language(Language::Python)
            .source("print('a' * 5000)")
            .build();
        let result = runner.run(&request, ResourceLimits::default()).await;

        assert!(result.truncated);
        assert_eq!(result.stdout.len(), 1024);
    }
}
