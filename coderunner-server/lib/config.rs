//! Configuration module for the coderunner server.
//!
//! The server adds only its listening address to the execution core's
//! [`RunnerConfig`], which carries the limits, sandbox switches and admission bounds.

use std::net::{IpAddr, SocketAddr};

use coderunner_core::config::RunnerConfig;
use coderunner_utils::{DEFAULT_MAX_BODY_SIZE, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT};
use getset::Getters;

use crate::{ServerError, ServerResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Configuration structure that holds all the server settings
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Config {
    /// Address to listen on
    addr: SocketAddr,

    /// Largest accepted request body in bytes
    max_body_size: usize,

    /// Settings of the execution core
    runner: RunnerConfig,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl Config {
    /// Create a new configuration
    pub fn new(host: Option<&str>, port: Option<u16>, runner: RunnerConfig) -> ServerResult<Self> {
        let host = host.unwrap_or(DEFAULT_SERVER_HOST);
        let ip: IpAddr = host
            .parse()
            .map_err(|e| ServerError::ConfigError(format!("invalid host {host:?}: {e}")))?;
        let addr = SocketAddr::new(ip, port.unwrap_or(DEFAULT_SERVER_PORT));

        Ok(Self {
            addr,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            runner,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
