use std::{
    process::{Output, Stdio},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use coderunner_utils::format_byte_size;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    task::JoinHandle,
};

use crate::{CoderunnerError, CoderunnerResult};

use super::{ContainerRuntime, ContainerSpec, RawOutcome};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// How many trailing lines of engine output are kept in error messages.
const ERROR_TAIL_LINES: usize = 10;

/// How long the output pipes may stay open after the client process is gone.
const READER_GRACE: Duration = Duration::from_millis(500);

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`ContainerRuntime`] that drives the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DockerCli {
    /// Creates a runtime invoking the given client binary.
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// The `docker run` arguments for a container spec.
    pub fn run_args(spec: &ContainerSpec) -> Vec<String> {
        let memory = format_byte_size(*spec.get_memory_bytes());
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--interactive".to_string(),
            "--name".to_string(),
            spec.get_name().clone(),
            "--user".to_string(),
            spec.get_user().clone(),
            "--workdir".to_string(),
            spec.get_workdir().clone(),
            "--memory".to_string(),
            memory.clone(),
            "--memory-swap".to_string(),
            memory,
            "--cpus".to_string(),
            spec.get_cpus().to_string(),
            "--pids-limit".to_string(),
            spec.get_pids_limit().to_string(),
            "--cap-drop".to_string(),
            "ALL".to_string(),
            "--security-opt".to_string(),
            "no-new-privileges".to_string(),
        ];

        if !spec.get_network_enabled() {
            args.push("--network".to_string());
            args.push("none".to_string());
        }

        if *spec.get_readonly_rootfs() {
            args.push("--read-only".to_string());
        }

        if let Some(tmpfs) = spec.get_tmpfs() {
            args.push("--tmpfs".to_string());
            args.push(tmpfs.clone());
        }

        for bind in spec.get_binds() {
            args.push("--volume".to_string());
            args.push(format!(
                "{}:{}{}",
                bind.host.display(),
                bind.guest,
                if bind.read_only { ":ro" } else { "" }
            ));
        }

        args.push(spec.get_image().clone());
        args.extend(spec.get_command().iter().cloned());
        args
    }

    /// Runs a short-lived client command and collects its output.
    async fn exec(&self, args: &[&str], stdin: Option<&[u8]>) -> CoderunnerResult<Output> {
        tracing::trace!("{} {}", self.bin, args.join(" "));

        let mut command = Command::new(&self.bin);
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            CoderunnerError::ContainerRuntime(format!("failed to launch {}: {}", self.bin, e))
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            pipe.shutdown().await?;
        }

        Ok(child.wait_with_output().await?)
    }

    /// Asks the engine to kill a container; failures are only logged.
    async fn kill(&self, name: &str) {
        match self.exec(&["kill", name], None).await {
            Ok(output) if output.status.success() => {
                tracing::debug!("killed container {}", name);
            }
            Ok(output) => tracing::warn!(
                "failed to kill container {}: {}",
                name,
                error_tail(&output.stderr)
            ),
            Err(e) => tracing::warn!("failed to kill container {}: {}", name, e),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run(
        &self,
        spec: &ContainerSpec,
        stdin: &[u8],
        timeout: Duration,
        max_output: usize,
    ) -> CoderunnerResult<RawOutcome> {
        let args = Self::run_args(spec);
        tracing::debug!("launching container {} from {}", spec.get_name(), spec.get_image());

        let started = Instant::now();
        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CoderunnerError::ContainerRuntime(format!("failed to launch {}: {}", self.bin, e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CoderunnerError::ContainerRuntime("container stdout was not captured".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            CoderunnerError::ContainerRuntime("container stderr was not captured".to_string())
        })?;
        let stdout_task = tokio::spawn(read_bounded(stdout, max_output));
        let stderr_task = tokio::spawn(read_bounded(stderr, max_output));

        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.to_vec();
            tokio::spawn(async move {
                // The program may exit without reading its input.
                if let Err(e) = pipe.write_all(&input).await {
                    tracing::trace!("stdin not fully consumed: {}", e);
                }
                let _ = pipe.shutdown().await;
            })
        });

        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (status?.code(), false),
            Err(_) => {
                tracing::warn!(
                    "container {} exceeded {}ms, killing it",
                    spec.get_name(),
                    timeout.as_millis()
                );
                self.kill(spec.get_name()).await;
                child.start_kill().ok();
                let status = child.wait().await.ok();
                (status.and_then(|s| s.code()), true)
            }
        };
        let elapsed = started.elapsed();

        if let Some(writer) = writer {
            writer.abort();
        }

        let (stdout, stdout_truncated) = join_reader(stdout_task, "stdout").await?;
        let (stderr, stderr_truncated) = join_reader(stderr_task, "stderr").await?;

        Ok(RawOutcome {
            stdout,
            stderr,
            exit_code,
            timed_out,
            truncated: stdout_truncated || stderr_truncated,
            elapsed,
        })
    }

    async fn remove(&self, name: &str) -> CoderunnerResult<()> {
        let output = self.exec(&["rm", "--force", name], None).await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Ok(());
        }

        Err(CoderunnerError::ContainerRuntime(format!(
            "failed to remove container {}: {}",
            name,
            error_tail(&output.stderr)
        )))
    }

    async fn list(&self, prefix: &str) -> CoderunnerResult<Vec<String>> {
        let filter = format!("name={}", prefix);
        let output = self
            .exec(
                &["ps", "--all", "--filter", &filter, "--format", "{{.Names}}"],
                None,
            )
            .await?;

        if !output.status.success() {
            return Err(CoderunnerError::ContainerRuntime(format!(
                "failed to list containers: {}",
                error_tail(&output.stderr)
            )));
        }

        // The engine's name filter matches substrings.
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string)
            .collect())
    }

    async fn image_exists(&self, image: &str) -> CoderunnerResult<bool> {
        let output = self
            .exec(&["image", "inspect", "--format", "{{.Id}}", image], None)
            .await?;
        Ok(output.status.success())
    }

    async fn build_image(&self, image: &str, dockerfile: &str) -> CoderunnerResult<()> {
        tracing::info!("building image {}", image);
        let output = self
            .exec(&["build", "--tag", image, "-"], Some(dockerfile.as_bytes()))
            .await?;

        if output.status.success() {
            tracing::info!("built image {}", image);
            return Ok(());
        }

        Err(CoderunnerError::ImageBuild {
            image: image.to_string(),
            reason: error_tail(&output.stderr),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Reads a stream to its end, keeping at most `max` bytes.
///
/// Reading continues past the bound so the writer never blocks on a full pipe.
async fn read_bounded<R>(mut reader: R, max: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }

        let room = max.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }

    Ok((kept, truncated))
}

/// Collects a stream reader, giving up once [`READER_GRACE`] has passed.
///
/// A process that outlives the client can keep the pipe open indefinitely. Its output is then
/// dropped and reported as truncated.
async fn join_reader(
    mut reader: JoinHandle<std::io::Result<(Vec<u8>, bool)>>,
    stream: &str,
) -> CoderunnerResult<(Vec<u8>, bool)> {
    match tokio::time::timeout(READER_GRACE, &mut reader).await {
        Ok(joined) => {
            let read = joined.map_err(|e| {
                CoderunnerError::ContainerRuntime(format!("{} reader failed: {}", stream, e))
            })?;
            Ok(read?)
        }
        Err(_) => {
            reader.abort();
            tracing::warn!(
                "{} still open {}ms after the container exited, dropping it",
                stream,
                READER_GRACE.as_millis()
            );
            Ok((Vec::new(), true))
        }
    }
}

fn error_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::BindMount;

    fn spec() -> ContainerSpec {
        ContainerSpec::builder()
            .name("codezy-exec-test")
            .image("codezy-cpp-runner:latest")
            .command(vec!["/bin/sh".into(), "-c".into(), "/tmp/main".into()])
            .binds(vec![BindMount::read_only("/tmp/ws/main.cpp", "/app/main.cpp")])
            .workdir("/app")
            .user("1000:1000")
            .memory_bytes(256 * 1024 * 1024)
            .cpus(1.5)
            .pids_limit(50)
            .tmpfs("/tmp:rw,exec")
            .build()
    }

    #[test]
    fn test_run_args_lock_down_the_container() {
        let args = DockerCli::run_args(&spec());
        let joined = args.join(" ");

        assert_eq!(args[0], "run");
        assert!(joined.contains("--rm --interactive --name codezy-exec-test"));
        assert!(joined.contains("--user 1000:1000"));
        assert!(joined.contains("--workdir /app"));
        assert!(joined.contains("--memory 268435456b --memory-swap 268435456b"));
        assert!(joined.contains("--cpus 1.5"));
        assert!(joined.contains("--pids-limit 50"));
        assert!(joined.contains("--cap-drop ALL"));
        assert!(joined.contains("--security-opt no-new-privileges"));
        assert!(joined.contains("--network none"));
        assert!(joined.contains("--read-only"));
        assert!(joined.contains("--tmpfs /tmp:rw,exec"));
        assert!(joined.contains("--volume /tmp/ws/main.cpp:/app/main.cpp:ro"));
        assert!(joined.ends_with("codezy-cpp-runner:latest /bin/sh -c /tmp/main"));
    }

    #[test]
    fn test_network_flag_omitted_when_enabled() {
        let spec = ContainerSpec::builder()
            .name("n")
            .image("i")
            .command(vec![])
            .workdir("/app")
            .user("1000:1000")
            .memory_bytes(1)
            .cpus(1.0)
            .pids_limit(1)
            .network_enabled(true)
            .readonly_rootfs(false)
            .build();

        let args = DockerCli::run_args(&spec);
        assert!(!args.contains(&"--network".to_string()));
        assert!(!args.contains(&"--read-only".to_string()));
        assert!(!args.contains(&"--tmpfs".to_string()));
    }

    #[tokio::test]
    async fn test_read_bounded_keeps_prefix_and_flags_truncation() {
        let data = vec![b'x'; 20_000];
        let (kept, truncated) = read_bounded(&data[..], 1000).await.unwrap();
        assert_eq!(kept.len(), 1000);
        assert!(truncated);

        let (kept, truncated) = read_bounded(&b"hello"[..], 1000).await.unwrap();
        assert_eq!(kept, b"hello");
        assert!(!truncated);
    }

    #[test]
    fn test_error_tail_keeps_last_lines() {
        let stderr: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        let tail = error_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 19"));
    }

    /// Writes an executable shell script standing in for the engine client.
    #[cfg(unix)]
    fn fake_engine(dir: &tempfile::TempDir, run: &str) -> DockerCli {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("docker");
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n  run) {} ;;\n  *) exit 0 ;;\nesac\n",
            run
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        DockerCli::new(path.to_string_lossy())
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_run_kills_container_at_timeout() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let docker = fake_engine(&dir, "exec sleep 5");

        let started = Instant::now();
        let outcome = docker
            .run(&spec(), b"", Duration::from_millis(300), 1024)
            .await?;
        let wall = started.elapsed();

        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.elapsed >= Duration::from_millis(300));
        assert!(wall < Duration::from_secs(2), "run took {:?}", wall);
        Ok(())
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_run_gives_up_on_pipes_held_after_timeout() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        // The shell is killed but its sleeping child keeps stdout and stderr open.
        let docker = fake_engine(&dir, "sleep 5; exit 0");

        let started = Instant::now();
        let outcome = docker
            .run(&spec(), b"", Duration::from_millis(300), 1024)
            .await?;
        let wall = started.elapsed();

        assert!(outcome.timed_out);
        assert!(
            wall < READER_GRACE + Duration::from_secs(2),
            "run took {:?}",
            wall
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_run_pipes_stdin_and_caps_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let docker = fake_engine(&dir, "exec cat");

        let outcome = docker
            .run(&spec(), b"hello\n", Duration::from_secs(5), 1024)
            .await?;
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout, b"hello\n");
        assert!(!outcome.truncated);
        assert!(!outcome.timed_out);

        let input = vec![b'x'; 300 * 1024];
        let outcome = docker
            .run(&spec(), &input, Duration::from_secs(5), 1024)
            .await?;
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout.len(), 1024);
        assert!(outcome.truncated);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    #[ignore = "requires a running docker daemon"]
    async fn test_docker_lists_without_error() -> CoderunnerResult<()> {
        let docker = DockerCli::new("docker");
        let names = docker.list("codezy-exec-").await?;
        assert!(names.iter().all(|n| n.starts_with("codezy-exec-")));
        Ok(())
    }
}
