mod handlers;

use clap::{CommandFactory, Parser};
use coderunner_cli::{
    AnsiStyles, CoderunnerArgs, CoderunnerCliResult, CoderunnerSubcommand, ImagesAction,
};

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> CoderunnerCliResult<()> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = CoderunnerArgs::parse();

    handlers::log_level(&args);
    tracing_subscriber::fmt::init();

    // Print version if requested
    if args.version {
        println!("{}", format!("v{}", env!("CARGO_PKG_VERSION")).literal());
        return Ok(());
    }

    match args.subcommand {
        Some(CoderunnerSubcommand::Run {
            file,
            language,
            stdin,
            timeout_ms,
            memory,
        }) => {
            handlers::run_subcommand(file, language, stdin, timeout_ms, memory).await?;
        }
        Some(CoderunnerSubcommand::Images { action }) => match action {
            ImagesAction::Build { force } => handlers::images_build_subcommand(force).await?,
            ImagesAction::List => handlers::images_list_subcommand().await?,
        },
        Some(CoderunnerSubcommand::Languages) => handlers::languages_subcommand(),
        None => CoderunnerArgs::command().print_help()?,
    }

    Ok(())
}
