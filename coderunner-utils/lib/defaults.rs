//! Default values shared by the coderunner crates.

//--------------------------------------------------------------------------------------------------
// Constants: Service
//--------------------------------------------------------------------------------------------------

/// The name the execution service reports about itself.
pub const SERVICE_NAME: &str = "codezy-execution-service";

/// The default host the server binds to.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// The default port the server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 5001;

/// The largest request body the server accepts.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

//--------------------------------------------------------------------------------------------------
// Constants: Resource limits
//--------------------------------------------------------------------------------------------------

/// The default memory ceiling of an execution container.
pub const DEFAULT_MEMORY_LIMIT: &str = "256m";

/// The memory ceiling used when a configured value cannot be parsed.
pub const FALLBACK_MEMORY_BYTES: u64 = 256 * 1024 * 1024;

/// The default number of CPUs an execution container may use.
pub const DEFAULT_CPU_LIMIT: f64 = 1.0;

/// The default wall-clock ceiling of a run in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// The default maximum number of processes inside a container.
pub const DEFAULT_PIDS_LIMIT: u32 = 50;

/// The largest source accepted, in bytes.
pub const DEFAULT_MAX_CODE_SIZE: usize = 50_000;

/// The largest stdin accepted, in bytes.
pub const DEFAULT_MAX_STDIN_SIZE: usize = 1024 * 1024;

/// The most output kept per stream, in bytes.
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// The most test cases a single evaluation may carry.
pub const DEFAULT_MAX_TEST_CASES: usize = 50;

//--------------------------------------------------------------------------------------------------
// Constants: Dispatch
//--------------------------------------------------------------------------------------------------

/// The default number of containers allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// The default number of runs allowed to wait for a free slot.
pub const DEFAULT_MAX_QUEUED: usize = 32;

//--------------------------------------------------------------------------------------------------
// Constants: Sandbox
//--------------------------------------------------------------------------------------------------

/// Prefix of every execution container name.
pub const CONTAINER_NAME_PREFIX: &str = "codezy-exec-";

/// Prefix of every ephemeral workspace directory.
pub const WORKSPACE_DIR_PREFIX: &str = "codezy-";

/// The container engine binary invoked when none is configured.
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// The uid and gid of the `coderunner` user baked into every image.
pub const SANDBOX_UID: u32 = 1000;

/// The working directory inside every execution image.
pub const GUEST_WORKDIR: &str = "/app";

/// Options of the scratch tmpfs mounted at `/tmp` inside every container.
pub const GUEST_TMPFS: &str = "/tmp:rw,exec,nosuid,size=64m";

/// Exit status a container reports when its init process is SIGKILLed.
pub const SIGKILL_EXIT_CODE: i32 = 137;
