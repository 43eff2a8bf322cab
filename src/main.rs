use anyhow::Result;
use clap::{Parser, Subcommand};
use krishi_core::{Config, ToolCall};
use krishi_services::UserLocationStore;
use krishi_weather::WeatherCache;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line arguments for the Krishi Sewa tool runner
#[derive(Parser)]
#[command(
    name = "krishi",
    version,
    about = "Krishi Sewa - weather, crop and mandi price tools for farmers"
)]
struct Args {
    /// Configuration file (defaults to <config dir>/krishi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List specialists and the tools they expose
    Tools,

    /// Invoke one tool and print its JSON result
    Call {
        /// Tool name, e.g. get_weather
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Conversation thread identifier (a fresh one is generated when absent)
        #[arg(long)]
        thread: Option<String>,
    },

    /// Save the farmer's location from device coordinates
    Init {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Delete cached forecasts older than the given age
    SweepCache {
        /// Maximum age in seconds (defaults to weather.max_age_seconds)
        #[arg(long)]
        older_than: Option<u64>,
    },

    /// Print the effective configuration and its validation result
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(Some(path.as_path())),
        None => Config::load(),
    }
}

/// Load and validate; invalid settings stop the command before any work
fn load_valid_config(path: Option<&PathBuf>) -> Result<Config> {
    let (config, _) = match path {
        Some(path) => Config::load_validated_from(Some(path.as_path()))?,
        None => Config::load_validated()?,
    };
    Ok(config)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    krishi_core::init()?;
    let args = Args::parse();

    match args.command {
        Command::Tools => {
            let config = load_valid_config(args.config.as_ref())?;
            let mut app = krishi_tools::build_app(config)?;
            let specialists: Vec<Value> = app
                .specialists()
                .iter()
                .map(|s| json!({ "id": s.id(), "name": s.name(), "description": s.description() }))
                .collect();
            print_json(&json!({
                "specialists": specialists,
                "tools": app.tool_catalog(),
            }))?;
            app.shutdown()?;
        }

        Command::Call { tool, args: tool_args, thread } => {
            let arguments: Value = serde_json::from_str(&tool_args)
                .map_err(|e| anyhow::anyhow!("--args is not valid JSON: {}", e))?;
            let mut call = ToolCall::new(tool, arguments);
            if let Some(thread) = thread {
                call = call.with_thread(thread);
            }

            let config = load_valid_config(args.config.as_ref())?;
            let mut app = krishi_tools::build_app(config)?;
            let outcome = app.call(call).await;
            app.shutdown()?;

            match outcome {
                Ok(output) => print_json(&output)?,
                Err(e) => {
                    print_json(&json!({
                        "error": e.to_string(),
                        "kind": e.kind(),
                        "message": e.user_message(),
                    }))?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Command::Init { lat, lon } => {
            let config = load_valid_config(args.config.as_ref())?;
            let store = UserLocationStore::from_config(&config)?;
            let user = store.initialize(lat, lon).await?;
            print_json(&json!({
                "status": "ok",
                "saved_at": store.path(),
                "location": user.location,
            }))?;
        }

        Command::SweepCache { older_than } => {
            let config = load_valid_config(args.config.as_ref())?;
            let max_age = older_than.unwrap_or(config.weather.max_age_seconds);
            let cache = WeatherCache::from_config(&config.weather)?;
            let removed = cache.sweep_expired(max_age)?;
            tracing::info!("Removed {} expired forecasts", removed);
            print_json(&json!({ "removed": removed, "cache_dir": cache.cache_dir() }))?;
        }

        Command::Config => {
            // Unvalidated so that a broken file can still be inspected
            let config = load_config(args.config.as_ref())?;
            let validation = config.validate();
            let messages = |items: &[krishi_core::config::ConfigValidationError]| -> Vec<String> {
                items.iter().map(ToString::to_string).collect()
            };
            print_json(&json!({
                "config": config.redacted(),
                "errors": messages(&validation.errors),
                "warnings": messages(&validation.warnings),
            }))?;
            if !validation.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
