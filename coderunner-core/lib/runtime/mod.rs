//! Container engine abstraction.
//!
//! The runner never talks to a container engine directly. It describes the container it wants
//! with a [`ContainerSpec`] and hands it to a [`ContainerRuntime`]:
//! - [`DockerCli`] drives the `docker` command line client
//! - `MockRuntime` (with the `test-utils` feature) answers from a script and records what it was
//!   asked to do

mod docker;
#[cfg(any(test, feature = "test-utils"))]
mod mock;

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use getset::Getters;
use typed_builder::TypedBuilder;

use crate::CoderunnerResult;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use docker::*;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Everything needed to start one disposable execution container.
#[derive(Debug, Clone, Getters, TypedBuilder)]
#[getset(get = "pub with_prefix")]
pub struct ContainerSpec {
    /// Unique container name.
    #[builder(setter(into))]
    name: String,

    /// Image reference.
    #[builder(setter(into))]
    image: String,

    /// Command run inside the container.
    command: Vec<String>,

    /// Host paths mounted into the container.
    #[builder(default)]
    binds: Vec<BindMount>,

    /// Working directory inside the container.
    #[builder(setter(into))]
    workdir: String,

    /// `uid:gid` the command runs as.
    #[builder(setter(into))]
    user: String,

    /// Memory ceiling in bytes.
    memory_bytes: u64,

    /// CPU ceiling.
    cpus: f64,

    /// Process ceiling.
    pids_limit: u32,

    /// Whether the container gets a network.
    #[builder(default = false)]
    network_enabled: bool,

    /// Whether the root filesystem is read-only.
    #[builder(default = true)]
    readonly_rootfs: bool,

    /// Scratch tmpfs specification, e.g. `/tmp:rw,size=64m`.
    #[builder(default, setter(strip_option, into))]
    tmpfs: Option<String>,
}

/// A host path mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Path on the host.
    pub host: PathBuf,

    /// Path inside the container.
    pub guest: String,

    /// Whether the mount is read-only.
    pub read_only: bool,
}

/// What came back from a finished (or killed) container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutcome {
    /// Captured stdout, at most the requested number of bytes.
    pub stdout: Vec<u8>,

    /// Captured stderr, at most the requested number of bytes.
    pub stderr: Vec<u8>,

    /// Exit status, absent when the client was killed by a signal.
    pub exit_code: Option<i32>,

    /// Whether the wall-clock ceiling was hit.
    pub timed_out: bool,

    /// Whether output beyond the capture bound was discarded.
    pub truncated: bool,

    /// Time from launch to exit.
    pub elapsed: Duration,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A container engine able to run disposable execution containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Runs a container to completion, feeding it `stdin`.
    ///
    /// The container must be killed once `timeout` elapses, and at most `max_output` bytes of
    /// each stream are kept.
    async fn run(
        &self,
        spec: &ContainerSpec,
        stdin: &[u8],
        timeout: Duration,
        max_output: usize,
    ) -> CoderunnerResult<RawOutcome>;

    /// Force-removes a container. Removing a container that does not exist succeeds.
    async fn remove(&self, name: &str) -> CoderunnerResult<()>;

    /// Lists the names of all containers, running or not, whose name starts with `prefix`.
    async fn list(&self, prefix: &str) -> CoderunnerResult<Vec<String>>;

    /// Whether an image is present locally.
    async fn image_exists(&self, image: &str) -> CoderunnerResult<bool>;

    /// Builds an image from a Dockerfile that needs no build context.
    async fn build_image(&self, image: &str, dockerfile: &str) -> CoderunnerResult<()>;
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl BindMount {
    /// A read-only mount.
    pub fn read_only(host: impl Into<PathBuf>, guest: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            guest: guest.into(),
            read_only: true,
        }
    }
}
