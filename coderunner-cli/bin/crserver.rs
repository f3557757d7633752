use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use clap::Parser;
use coderunner_cli::{CoderunnerCliResult, CrserverArgs};
use coderunner_core::{
    config::RunnerConfig,
    execution::collector,
    registry::{ensure_images, ImageAction, ImageRegistry},
    runtime::{ContainerRuntime, DockerCli},
};
use coderunner_server::{route, state::AppState, Config};
use coderunner_utils::{
    get_env, highlight, parse_env, CHECKMARK, HOST_ENV_VAR, PORT_ENV_VAR,
};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions: Main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
pub async fn main() -> CoderunnerCliResult<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args = CrserverArgs::parse();

    // Flags override the environment
    let mut runner = RunnerConfig::from_env()?;
    if let Some(max_concurrent) = args.max_concurrent {
        runner.set_max_concurrent(max_concurrent);
    }
    if let Some(max_queued) = args.max_queued {
        runner.set_max_queued(max_queued);
    }
    runner.validate()?;

    let host = args.host.or_else(|| get_env(HOST_ENV_VAR));
    let port = match args.port {
        Some(port) => Some(port),
        None => parse_env::<u16>(PORT_ENV_VAR)?,
    };

    let config = Arc::new(Config::new(host.as_deref(), port, runner)?);
    let docker: Arc<dyn ContainerRuntime> =
        Arc::new(DockerCli::new(config.get_runner().get_docker_bin()));

    let swept = collector::sweep_stale_containers(docker.as_ref()).await?;
    if swept > 0 {
        tracing::info!("removed {} stale execution containers", swept);
    }

    if args.skip_build {
        tracing::info!("skipping sandbox image build");
    } else {
        let registry = ImageRegistry::from_config(config.get_runner());
        for status in ensure_images(docker.as_ref(), &registry, false).await? {
            let verb = match status.action {
                ImageAction::Present => "present",
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
    }

    // Create application state
    let state = AppState::new(config.clone(), docker);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    // Build application
    let app = route::create_router(state).layer(cors);

    // Start server
    tracing::info!("Starting server on {}", config.get_addr());
    println!(
        "{} Server listening on {}",
        &*CHECKMARK,
        highlight(config.get_addr())
    );

    let listener = tokio::net::TcpListener::bind(config.get_addr()).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
