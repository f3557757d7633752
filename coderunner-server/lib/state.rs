//! Application state management for the coderunner server.

use std::sync::Arc;

use coderunner_core::{
    config::RunnerConfig,
    evaluation::Evaluator,
    execution::{Dispatcher, IsolatedRunner},
    registry::ImageRegistry,
    runtime::ContainerRuntime,
};
use getset::Getters;

use crate::config::Config;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Application state structure
#[derive(Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct AppState {
    /// The application configuration
    config: Arc<Config>,

    /// Admission into execution slots
    dispatcher: Dispatcher,

    /// Grading on top of the dispatcher
    evaluator: Evaluator,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AppState {
    /// Create a new application state instance running programs on `runtime`
    pub fn new(config: Arc<Config>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let runner_config: Arc<RunnerConfig> = Arc::new(config.get_runner().clone());
        let registry = Arc::new(ImageRegistry::from_config(&runner_config));

        let dispatcher = Dispatcher::new(IsolatedRunner::new(runtime, registry, runner_config));
        let evaluator = Evaluator::new(dispatcher.clone());

        Self {
            config,
            dispatcher,
            evaluator,
        }
    }
}
