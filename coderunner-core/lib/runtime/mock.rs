use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{CoderunnerError, CoderunnerResult};

use super::{ContainerRuntime, ContainerSpec, RawOutcome};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Computes the outcome of a scripted run.
pub type MockHandler = Arc<dyn Fn(&MockInvocation) -> CoderunnerResult<RawOutcome> + Send + Sync>;

/// A run the [`MockRuntime`] was asked to perform.
#[derive(Debug, Clone)]
pub struct MockInvocation {
    /// The container that would have been started.
    pub spec: ContainerSpec,

    /// The stdin that would have been fed to it.
    pub stdin: Vec<u8>,

    /// The contents of the first bind-mounted file, read at launch time.
    pub source: Option<String>,
}

/// A [`ContainerRuntime`] that never starts containers.
///
/// Outcomes come from a handler; every request is recorded so tests can inspect it.
pub struct MockRuntime {
    handler: MockHandler,
    delay: Duration,
    invocations: Mutex<Vec<MockInvocation>>,
    removed: Mutex<Vec<String>>,
    containers: Mutex<Vec<String>>,
    images: Mutex<HashSet<String>>,
    built: Mutex<Vec<String>>,
    failing_builds: HashSet<String>,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MockRuntime {
    /// Creates a runtime answering every run with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&MockInvocation) -> CoderunnerResult<RawOutcome> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            delay: Duration::ZERO,
            invocations: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            containers: Mutex::new(Vec::new()),
            images: Mutex::new(HashSet::new()),
            built: Mutex::new(Vec::new()),
            failing_builds: HashSet::new(),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
        }
    }

    /// A runtime whose programs print their stdin and exit with 0.
    pub fn echo() -> Self {
        Self::new(|invocation| Ok(RawOutcome::exited(0, invocation.stdin.clone(), Vec::new())))
    }

    /// Makes every run take `delay`. Runs longer than their timeout come back timed out.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Pretends these containers already exist.
    pub fn with_containers<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containers
            .lock()
            .expect("mock lock poisoned")
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Pretends these images are already present.
    pub fn with_images<I, S>(self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images
            .lock()
            .expect("mock lock poisoned")
            .extend(images.into_iter().map(Into::into));
        self
    }

    /// Makes building this image fail.
    pub fn with_failing_build(mut self, image: impl Into<String>) -> Self {
        self.failing_builds.insert(image.into());
        self
    }

    /// The runs performed so far.
    pub fn invocations(&self) -> Vec<MockInvocation> {
        self.invocations.lock().expect("mock lock poisoned").clone()
    }

    /// The containers removed so far.
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().expect("mock lock poisoned").clone()
    }

    /// The images built so far.
    pub fn built(&self) -> Vec<String> {
        self.built.lock().expect("mock lock poisoned").clone()
    }

    /// The largest number of runs that were in flight at once.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

impl RawOutcome {
    /// An outcome of a program that exited on its own.
    pub fn exited(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(code),
            ..Default::default()
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn run(
        &self,
        spec: &ContainerSpec,
        stdin: &[u8],
        timeout: Duration,
        max_output: usize,
    ) -> CoderunnerResult<RawOutcome> {
        let source = match spec.get_binds().first() {
            Some(bind) => Some(tokio::fs::read_to_string(&bind.host).await?),
            None => None,
        };

        let invocation = MockInvocation {
            spec: spec.clone(),
            stdin: stdin.to_vec(),
            source,
        };
        self.invocations
            .lock()
            .expect("mock lock poisoned")
            .push(invocation.clone());

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);

        let timed_out = self.delay > timeout;
        tokio::time::sleep(self.delay.min(timeout)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if timed_out {
            return Ok(RawOutcome {
                exit_code: Some(137),
                timed_out: true,
                elapsed: timeout,
                ..Default::default()
            });
        }

        let mut outcome = (self.handler)(&invocation)?;
        for stream in [&mut outcome.stdout, &mut outcome.stderr] {
            if stream.len() > max_output {
                stream.truncate(max_output);
                outcome.truncated = true;
            }
        }
        outcome.elapsed = self.delay;
        Ok(outcome)
    }

    async fn remove(&self, name: &str) -> CoderunnerResult<()> {
        self.containers
            .lock()
            .expect("mock lock poisoned")
            .retain(|c| c != name);
        self.removed
            .lock()
            .expect("mock lock poisoned")
            .push(name.to_string());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> CoderunnerResult<Vec<String>> {
        Ok(self
            .containers
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn image_exists(&self, image: &str) -> CoderunnerResult<bool> {
        Ok(self
            .images
            .lock()
            .expect("mock lock poisoned")
            .contains(image))
    }

    async fn build_image(&self, image: &str, _dockerfile: &str) -> CoderunnerResult<()> {
        if self.failing_builds.contains(image) {
            return Err(CoderunnerError::ImageBuild {
                image: image.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        self.images
            .lock()
            .expect("mock lock poisoned")
            .insert(image.to_string());
        self.built
            .lock()
            .expect("mock lock poisoned")
            .push(image.to_string());
        Ok(())
    }
}

impl fmt::Debug for MockRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRuntime")
            .field("delay", &self.delay)
            .field("invocations", &self.invocations.lock().map(|i| i.len()).ok())
            .finish_non_exhaustive()
    }
}
