mod config;
mod context;
mod hpa;
mod monitor;
mod server;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use utils::metrics_builder::{MetricsBuilderConfig, ResourceAttributesConfig};

const APP_NAME: &str = "hpa-pulse";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:8091";
const DEFAULT_MANIFEST_DIR: &str = "/etc/hpa-pulse/hpas";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_METRICS_INTERVAL_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = APP_NAME,
    version = VERSION,
    about = "HorizontalPodAutoscaler telemetry exporter",
    long_about = "HPA Pulse: maps HorizontalPodAutoscaler status and metric targets to gauge series. Loads HPA manifests from a directory and serves them in Prometheus format"
)]
struct Args {
    /// The address to listen on for HTTP requests
    #[arg(
        long,
        env = "HPA_PULSE_LISTEN",
        default_value = DEFAULT_LISTEN_ADDRESS,
        help = "The address to listen on for HTTP requests"
    )]
    listen_address: String,

    /// Directory holding HPA manifests (`*.json`)
    #[arg(
        long,
        env = "HPA_PULSE_MANIFEST_DIR",
        default_value = DEFAULT_MANIFEST_DIR,
        help = "Directory holding HorizontalPodAutoscaler JSON manifests"
    )]
    manifest_dir: PathBuf,

    /// Log level
    #[arg(
        long,
        env = "RUST_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level (trace/debug/info/warn/error)"
    )]
    log_level: String,

    /// Metrics collection interval in seconds
    #[arg(
        long,
        env = "HPA_PULSE_METRICS_INTERVAL",
        default_value_t = DEFAULT_METRICS_INTERVAL_SECS,
        help = "Metrics collection interval in seconds"
    )]
    metrics_interval_secs: u64,

    /// Emit scale target reference resource attributes
    #[arg(
        long,
        env = "HPA_PULSE_SCALE_TARGET_REF_ATTRIBUTES",
        help = "Add k8s.hpa.scaletargetref.{kind,name,apiversion} resource attributes"
    )]
    scale_target_ref_attributes: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    info!(
        app = APP_NAME,
        version = VERSION,
        listen_address = %args.listen_address,
        manifest_dir = ?args.manifest_dir,
        log_level = %args.log_level,
        metrics_interval_secs = args.metrics_interval_secs,
        scale_target_ref_attributes = args.scale_target_ref_attributes,
        "announcement"
    );

    let builder_config = MetricsBuilderConfig {
        resource_attributes: ResourceAttributesConfig::default()
            .with_scale_target_ref(args.scale_target_ref_attributes),
        ..MetricsBuilderConfig::default()
    };

    let app_context = match context::AppContext::new(
        args.manifest_dir,
        args.metrics_interval_secs,
        builder_config,
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Failed to initialize application context: {}", e);
            return;
        }
    };

    if let Err(e) = app_context.start() {
        eprintln!("Failed to start application: {}", e);
        return;
    }

    tracing::debug!(listen_address = %args.listen_address, "Starting HTTP server");
    if let Err(e) = server::start_server(&args.listen_address, app_context).await {
        tracing::error!(error = %e, "Server error");
    }
}

/// Initialize the logging system
fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = match log_level {
        "trace" | "debug" | "info" | "warn" | "error" => EnvFilter::new(log_level),
        _ => EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
