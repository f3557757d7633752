use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coderunner_core::registry::Language;

use crate::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// cr runs programs in disposable, locked-down containers
#[derive(Debug, Parser)]
#[command(name = "cr", author, styles = styles::styles())]
pub struct CoderunnerArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<CoderunnerSubcommand>,

    /// Show version
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Show logs with error level
    #[arg(long)]
    pub error: bool,

    /// Show logs with warn level
    #[arg(long)]
    pub warn: bool,

    /// Show logs with info level
    #[arg(long)]
    pub info: bool,

    /// Show logs with debug level
    #[arg(long)]
    pub debug: bool,

    /// Show logs with trace level
    #[arg(long)]
    pub trace: bool,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum CoderunnerSubcommand {
    /// Run a source file in a sandbox
    #[command(name = "run")]
    Run {
        /// The source file
        file: PathBuf,

        /// The language, inferred from the file extension when absent
        #[arg(short, long)]
        language: Option<Language>,

        /// A file whose contents are fed to the program's stdin
        #[arg(short, long)]
        stdin: Option<PathBuf>,

        /// Wall-clock ceiling in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Memory ceiling, e.g. 128m
        #[arg(long)]
        memory: Option<String>,
    },

    /// Manage the sandbox images
    #[command(name = "images")]
    Images {
        /// The images action
        #[command(subcommand)]
        action: ImagesAction,
    },

    /// List the supported languages
    #[command(name = "languages")]
    Languages,
}

/// Actions on the sandbox images
#[derive(Debug, Subcommand)]
pub enum ImagesAction {
    /// Build the images that are missing
    #[command(name = "build")]
    Build {
        /// Rebuild images that are already present
        #[arg(short, long)]
        force: bool,
    },

    /// Show each language's image and whether it is present
    #[command(name = "list")]
    List,
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
