use anyhow::Result;
use std::sync::Arc;

use crate::{Config, Tool};

/// A domain specialist: a named group of tools the orchestrator routes to
pub trait Specialist: Send + Sync {
    /// Unique identifier the orchestrator routes by (e.g. `weather_expert`)
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// What kind of questions this specialist answers
    fn description(&self) -> &str;

    /// Prepare local state (directories, data files) before the first call
    fn initialize(&mut self, ctx: &SpecialistContext) -> Result<()>;

    fn shutdown(&mut self) -> Result<()>;

    /// Tools exposed by this specialist
    fn tools(&self) -> Vec<Arc<dyn Tool>>;
}

/// Context provided to specialists during initialization
pub struct SpecialistContext {
    pub config: Arc<Config>,
}

impl SpecialistContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}
