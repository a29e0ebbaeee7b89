//! valmond - Validator metrics exporter daemon.
//!
//! Polls a blockchain validator node (over JSON-RPC or by shell-exec
//! into its container) and exposes the readings as prometheus gauges
//! on an HTTP /metrics endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::{Parser, ValueEnum};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use valmon_core::api::ChainApi;
use valmon_core::collect::Exporter;
use valmon_core::collect::system::{RealFs, SystemCollector};
use valmon_core::metrics::ValidatorMetrics;
use valmon_core::source::{RpcSource, ShellSource, ValidatorSource};

/// How readings are fetched from the node.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// JSON-RPC endpoint exposed by the node.
    Rpc,
    /// `docker exec` miner CLI calls into the container.
    Shell,
}

/// Validator metrics exporter daemon.
#[derive(Parser)]
#[command(name = "valmond", about = "Validator metrics exporter daemon", version)]
struct Args {
    /// Data source mode.
    #[arg(long, value_enum, default_value_t = Mode::Rpc, env = "VALMON_MODE")]
    mode: Mode,

    /// JSON-RPC endpoint of the node (rpc mode).
    #[arg(
        long,
        default_value = "http://localhost:4467/jsonrpc",
        env = "VALMON_RPC_URL"
    )]
    rpc_url: String,

    /// Docker container name (shell mode).
    #[arg(long, default_value = "validator", env = "VALMON_CONTAINER")]
    container: String,

    /// Base URL of the public chain API. Chain stats and the balance
    /// lookup prefer this when set.
    #[arg(long, env = "VALMON_API_URL")]
    api_url: Option<String>,

    /// Poll interval in seconds.
    #[arg(short, long, default_value = "30", env = "VALMON_INTERVAL")]
    interval: u64,

    /// Listen address for the /metrics endpoint.
    #[arg(long, default_value = "0.0.0.0:9825", env = "VALMON_LISTEN")]
    listen: String,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Directory whose filesystem usage ratios are reported.
    #[arg(long, env = "VALMON_DATA_DIR")]
    data_dir: Option<String>,

    /// Publish ledger penalties for every penalized validator on chain,
    /// not just this one.
    #[arg(long, env = "VALMON_ALL_PENALTIES")]
    all_penalties: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("valmond={}", level).parse().unwrap())
        .add_directive(format!("valmon_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("valmond {} starting", env!("CARGO_PKG_VERSION"));
    match args.mode {
        Mode::Rpc => info!(
            "Config: mode=rpc, endpoint={}, interval={}s",
            args.rpc_url, args.interval
        ),
        Mode::Shell => info!(
            "Config: mode=shell, container={}, interval={}s",
            args.container, args.interval
        ),
    }

    let registry = Registry::new();
    let metrics = match ValidatorMetrics::new(&registry) {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Failed to register metrics: {}", e);
            std::process::exit(1);
        }
    };

    spawn_metrics_server(args.listen.clone(), registry);

    // Graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    match args.mode {
        Mode::Rpc => match RpcSource::new(args.rpc_url.clone()) {
            Ok(source) => run(source, &args, metrics, running),
            Err(e) => {
                error!("Failed to create RPC client: {}", e);
                std::process::exit(1);
            }
        },
        Mode::Shell => run(ShellSource::new(args.container.clone()), &args, metrics, running),
    }

    info!("Shutdown complete");
}

/// Runs the poll loop until the shutdown flag clears.
fn run<S: ValidatorSource>(
    source: S,
    args: &Args,
    metrics: ValidatorMetrics,
    running: Arc<AtomicBool>,
) {
    let api = args.api_url.as_ref().and_then(|url| match ChainApi::new(url.clone()) {
        Ok(api) => {
            info!("Chain API: {}", url);
            Some(api)
        }
        Err(e) => {
            warn!("Chain API disabled: {}", e);
            None
        }
    });

    let system = SystemCollector::new(RealFs::new(), &args.proc_path, args.data_dir.clone());
    let mut exporter = Exporter::new(source, api, metrics, system, args.all_penalties);

    let interval = Duration::from_secs(args.interval);
    let mut cycle_count: u64 = 0;

    info!("Starting poll loop");

    while running.load(Ordering::SeqCst) {
        match exporter.run_cycle() {
            Ok(report) => {
                cycle_count += 1;
                if report.collectors_failed > 0 {
                    warn!(
                        "Cycle #{}: {} collectors ok, {} failed",
                        cycle_count, report.collectors_ok, report.collectors_failed
                    );
                } else {
                    info!("Cycle #{}: {} collectors ok", cycle_count, report.collectors_ok);
                }
            }
            Err(e) => {
                // Nothing can be published without the validator name.
                error!("Cycle skipped: {}", e);
            }
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down...");
}

/// Serves GET /metrics on a dedicated thread with its own runtime, so
/// the sync poll loop stays untouched by async plumbing.
fn spawn_metrics_server(listen: String, registry: Registry) {
    let spawned = std::thread::Builder::new()
        .name("metrics-http".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to build metrics server runtime: {}", e);
                    return;
                }
            };

            runtime.block_on(async move {
                let app = Router::new()
                    .route("/metrics", get(render_metrics))
                    .with_state(registry);

                let listener = match tokio::net::TcpListener::bind(&listen).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!("Failed to bind {}: {}", listen, e);
                        return;
                    }
                };
                info!("Metrics endpoint listening on http://{}/metrics", listen);

                if let Err(e) = axum::serve(listener, app).await {
                    error!("Metrics server error: {}", e);
                }
            });
        });

    if let Err(e) = spawned {
        error!("Failed to spawn metrics server thread: {}", e);
    }
}

async fn render_metrics(State(registry): State<Registry>) -> Response {
    let encoder = TextEncoder::new();
    let mut body = String::new();
    match encoder.encode_utf8(&registry.gather(), &mut body) {
        Ok(()) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("encode failed: {}", e),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["valmond"]).unwrap();
        assert!(matches!(args.mode, Mode::Rpc));
        assert_eq!(args.interval, 30);
        assert_eq!(args.listen, "0.0.0.0:9825");
        assert!(args.api_url.is_none());
        assert!(!args.all_penalties);
    }

    #[test]
    fn args_parse_shell_mode() {
        let args =
            Args::try_parse_from(["valmond", "--mode", "shell", "--container", "miner"]).unwrap();
        assert!(matches!(args.mode, Mode::Shell));
        assert_eq!(args.container, "miner");
    }
}
