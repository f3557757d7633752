use clap::Parser;

use crate::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Arguments for the crserver command
///
/// Unset flags fall back to the environment (`PORT`, `HOST`, `MAX_CONCURRENT_EXECUTIONS`,
/// `MAX_QUEUED_EXECUTIONS`) and then to the built-in defaults.
#[derive(Debug, Parser)]
#[command(name = "crserver", author, version, styles = styles::styles())]
pub struct CrserverArgs {
    /// Port number to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Do not build missing sandbox images at startup
    #[arg(long, default_value_t = false)]
    pub skip_build: bool,

    /// Containers allowed to run at once
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Runs allowed to wait for a free slot
    #[arg(long)]
    pub max_queued: Option<usize>,
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_optional() {
        let args = CrserverArgs::try_parse_from(["crserver"]).unwrap();
        assert_eq!(args.port, None);
        assert!(!args.skip_build);

        let args = CrserverArgs::try_parse_from([
            "crserver",
            "--port",
            "8080",
            "--skip-build",
            "--max-concurrent",
            "8",
        ])
        .unwrap();
        assert_eq!(args.port, Some(8080));
        assert!(args.skip_build);
        assert_eq!(args.max_concurrent, Some(8));
        assert_eq!(args.max_queued, None);
    }
}
