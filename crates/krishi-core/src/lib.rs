pub mod app;
pub mod config;
pub mod error;
pub mod retry;
pub mod specialist;
pub mod tool;

pub use app::App;
pub use config::{Config, CropsConfig, PricesConfig, UserConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
pub use retry::{with_retry, RetryConfig};
pub use specialist::{Specialist, SpecialistContext};
pub use tool::{parse_args, Tool, ToolCall, ToolDescriptor, ToolOutput};

use anyhow::Result;

/// Initialize tracing/logging. Honours `RUST_LOG`, defaulting to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Krishi core initialized");
    Ok(())
}
