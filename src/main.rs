use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use carbon_forecast::carbon_aware::CarbonStatus;
use carbon_forecast::config::{BackendOverrides, OrchestratorConfig};
use carbon_forecast::{Error, Orchestrator};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// Path to a TOML configuration file
    #[arg(long, env = "FORECAST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Base URL of the high-accuracy backend
    #[arg(long, env = "XGB_SERVICE_URL", global = true)]
    xgb_url: Option<String>,

    /// Timeout for the high-accuracy backend in milliseconds
    #[arg(long, env = "XGB_TIMEOUT_MS", global = true)]
    xgb_timeout_ms: Option<u64>,

    /// Base URL of the low-footprint backend
    #[arg(long, env = "HW_SERVICE_URL", global = true)]
    hw_url: Option<String>,

    /// Timeout for the low-footprint backend in milliseconds
    #[arg(long, env = "HW_TIMEOUT_MS", global = true)]
    hw_timeout_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the forecast gateway REST API
    Serve(ServeArgs),
    /// Run one orchestrated forecast and print it as JSON
    Forecast(ForecastArgs),
    /// Print the current simulated grid carbon status
    GridStatus(GridStatusArgs),
    /// Show version and build information
    Version,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
}

#[derive(Parser, Debug)]
struct ForecastArgs {
    /// ISO country code, e.g. DE
    country: String,

    /// Force the carbon status (LOW or HIGH)
    #[arg(long)]
    carbon_mode: Option<CarbonStatus>,
}

#[derive(Parser, Debug)]
struct GridStatusArgs {
    /// Force the carbon status (LOW or HIGH)
    #[arg(long)]
    carbon_mode: Option<CarbonStatus>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    if let Commands::Version = args.command {
        println!("Carbon Forecast Gateway v{}", env!("CARGO_PKG_VERSION"));
        println!("Build Date: {}", env!("BUILD_DATE"));
        println!("Rust Version: {}", env!("RUST_VERSION"));
        return Ok(());
    }

    init_tracing(args.global.log_json);

    let config = load_config(&args.global)?;
    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    match args.command {
        Commands::Serve(serve_args) => run_gateway(orchestrator, serve_args).await,
        Commands::Forecast(forecast_args) => run_forecast(&orchestrator, forecast_args).await,
        Commands::GridStatus(status_args) => {
            let reading = orchestrator.get_live_grid_status(status_args.carbon_mode);
            println!("{}", serde_json::to_string_pretty(&reading)?);
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn load_config(global: &GlobalArgs) -> Result<OrchestratorConfig, Error> {
    let mut config = OrchestratorConfig::load(global.config.as_deref())?;
    config.apply(&BackendOverrides {
        high_accuracy_url: global.xgb_url.clone(),
        high_accuracy_timeout_ms: global.xgb_timeout_ms,
        low_footprint_url: global.hw_url.clone(),
        low_footprint_timeout_ms: global.hw_timeout_ms,
    });
    config.validate()?;

    info!(
        "Backends: {} at {} ({} ms), {} at {} ({} ms)",
        config.high_accuracy.name,
        config.high_accuracy.base_url,
        config.high_accuracy.timeout_ms,
        config.low_footprint.name,
        config.low_footprint.base_url,
        config.low_footprint.timeout_ms
    );
    Ok(config)
}

#[cfg(feature = "rest-api")]
async fn run_gateway(orchestrator: Arc<Orchestrator>, args: ServeArgs) -> Result<(), Error> {
    info!(
        "Starting Carbon Forecast Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );
    carbon_forecast::rest_api::run_server(orchestrator, args.bind).await
}

#[cfg(not(feature = "rest-api"))]
async fn run_gateway(_orchestrator: Arc<Orchestrator>, _args: ServeArgs) -> Result<(), Error> {
    Err(Error::ConfigError(
        "this binary was built without the rest-api feature".to_string(),
    ))
}

async fn run_forecast(orchestrator: &Orchestrator, args: ForecastArgs) -> Result<(), Error> {
    let (forecast, metadata) = orchestrator
        .get_optimized_forecast(&args.country, args.carbon_mode)
        .await?;

    let envelope = serde_json::json!({
        "metadata": metadata,
        "forecast": forecast.rows(),
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
