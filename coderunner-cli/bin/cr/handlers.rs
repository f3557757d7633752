use std::{path::PathBuf, sync::Arc};

use coderunner_cli::{AnsiStyles, CoderunnerArgs, CoderunnerCliError, CoderunnerCliResult};
use coderunner_core::{
    config::{LimitsRequest, RunnerConfig},
    execution::{Dispatcher, ExecutionRequest, ExecutionStatus, IsolatedRunner},
    registry::{ensure_images, ImageAction, ImageRegistry, Language},
    runtime::{ContainerRuntime, DockerCli},
};
use coderunner_utils::{highlight, CHECKMARK, CROSSMARK};

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

pub fn log_level(args: &CoderunnerArgs) {
    let level = if args.trace {
        Some("trace")
    } else if args.debug {
        Some("debug")
    } else if args.info {
        Some("info")
    } else if args.warn {
        Some("warn")
    } else if args.error {
        Some("error")
    } else {
        None
    };

    // Set RUST_LOG environment variable only if a level is specified
    if let Some(level) = level {
        std::env::set_var("RUST_LOG", format!("coderunner={},cr={}", level, level));
    }
}

pub async fn run_subcommand(
    file: PathBuf,
    language: Option<Language>,
    stdin: Option<PathBuf>,
    timeout_ms: Option<u64>,
    memory: Option<String>,
) -> CoderunnerCliResult<()> {
    let language = match language {
        Some(language) => language,
        None => file
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
            .ok_or_else(|| CoderunnerCliError::UnknownLanguage(file.clone()))?,
    };

    let source = tokio::fs::read_to_string(&file).await?;
    let stdin = match stdin {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => String::new(),
    };

    let limits = (timeout_ms.is_some() || memory.is_some()).then(|| LimitsRequest {
        timeout_ms,
        memory,
        ..Default::default()
    });

    let request = ExecutionRequest {
        language,
        source,
        stdin,
        limits,
    };

    let dispatcher = local_dispatcher()?;

    tracing::info!("running {} as {}", file.display(), language);
    let result = dispatcher.submit(request).await?;

    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr);
    }

    let (mark, status) = match result.status {
        ExecutionStatus::Success => (&*CHECKMARK, "success"),
        ExecutionStatus::RuntimeError => (&*CROSSMARK, "runtime error"),
        ExecutionStatus::TimedOut => (&*CROSSMARK, "timed out"),
        ExecutionStatus::MemoryLimitExceeded => (&*CROSSMARK, "memory limit exceeded"),
        ExecutionStatus::InternalError => (&*CROSSMARK, "internal error"),
    };
    eprintln!(
        "{} {} (exit code {}, {}ms{})",
        mark,
        status,
        highlight(result.exit_code),
        result.execution_time_ms,
        if result.truncated { ", output truncated" } else { "" }
    );

    if let Some(error) = result.error.as_ref().filter(|e| **e != result.stderr) {
        eprintln!("{}", error.error());
    }

    if !result.is_success() {
        std::process::exit(if result.exit_code > 0 {
            result.exit_code
        } else {
            1
        });
    }

    Ok(())
}

pub async fn images_build_subcommand(force: bool) -> CoderunnerCliResult<()> {
    let config = RunnerConfig::from_env()?;
    let docker = DockerCli::new(config.get_docker_bin());
    let registry = ImageRegistry::from_config(&config);

    for status in ensure_images(&docker, &registry, force).await? {
        let verb = match status.action {
            ImageAction::Present => "already present",
            ImageAction::Built => "built",
        };
        println!(
            "{} {} image {} {}",
            &*CHECKMARK,
            status.language,
            highlight(&status.image_ref),
            verb
        );
    }

    Ok(())
}

pub async fn images_list_subcommand() -> CoderunnerCliResult<()> {
    let config = RunnerConfig::from_env()?;
    let docker = DockerCli::new(config.get_docker_bin());
    let registry = ImageRegistry::from_config(&config);

    println!("{}", "IMAGES".header());
    for image in registry.iter() {
        let mark = if docker.image_exists(&image.image_ref).await? {
            &*CHECKMARK
        } else {
            &*CROSSMARK
        };
        println!(
            "{} {:<8} {}",
            mark,
            image.language.as_str().literal(),
            highlight(&image.image_ref)
        );
    }

    Ok(())
}

pub fn languages_subcommand() {
    println!("{}", "LANGUAGES".header());
    for info in ImageRegistry::default().languages() {
        println!(
            "  {:<8} {} {}",
            info.id.literal(),
            info.name,
            info.version.placeholder()
        );
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// A dispatcher over the local container engine, configured from the environment.
fn local_dispatcher() -> CoderunnerCliResult<Dispatcher> {
    let config = Arc::new(RunnerConfig::from_env()?);
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new(config.get_docker_bin()));
    let registry = Arc::new(ImageRegistry::from_config(&config));

    Ok(Dispatcher::new(IsolatedRunner::new(runtime, registry, config)))
}
