//! todo-widget-mcp: MCP server exposing a todo list to a host chat client
//!
//! Serves the todo tools on `/mcp` and proxies the widget bundle on
//! `/widget.js` and `/widget.css`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use todo_widget_mcp::config::{self, Config, ENV_BACKEND_ORIGIN, ENV_WIDGET_ORIGIN};
use todo_widget_mcp::mcp::{McpServer, WidgetTemplate};
use todo_widget_mcp::todo::TodoStore;
use todo_widget_mcp::web::{self, AppState};
use todo_widget_mcp::widget::WidgetAssetResolver;

/// MCP server exposing a todo list to a host chat client.
///
/// Settings come from an optional JSON config file, then the
/// `WIDGET_ORIGIN`, `BACKEND_ORIGIN` and `PORT` environment variables,
/// then command-line flags.
#[derive(Parser, Debug)]
#[command(name = "todo-widget-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Logs missing origins; the server still starts without them.
fn warn_missing_origins(cfg: &Config) {
    if cfg.widget.origin.is_none() {
        warn!(
            "{ENV_WIDGET_ORIGIN} is not set; /widget.js and /widget.css will answer 404"
        );
    }
    if cfg.widget.backend_origin.is_none() {
        warn!("{ENV_BACKEND_ORIGIN} is not set; the widget will load assets from relative paths");
    }
}

/// Waits for SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        error!("Failed to install signal handlers; shutdown only by process kill");
        std::future::pending::<()>().await;
        return;
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Waits for Ctrl+C.
#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        std::future::pending::<()>().await;
    }
}

/// Binds the listener and serves until a shutdown signal arrives.
async fn run(cfg: Config, state: AppState) -> std::io::Result<()> {
    let listener =
        tokio::net::TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    info!(address = %listener.local_addr()?, "Listening");

    web::serve(listener, state, shutdown_signal()).await
}

/// Entry point for the todo-widget-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path().filter(|p| p.exists()) {
                    eprintln!("\nConfig was read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting todo-widget-mcp server"
    );
    warn_missing_origins(&cfg);

    let resolver = match WidgetAssetResolver::new(
        cfg.widget.origin.as_deref(),
        cfg.widget.cache_ttl(),
        cfg.widget.fetch_timeout(),
    ) {
        Ok(resolver) => resolver,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let server = McpServer::new(
        Arc::new(TodoStore::new()),
        WidgetTemplate::new(cfg.widget.backend_origin.as_deref()),
    );
    let state = AppState::new(server, resolver);

    // Run the server
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cfg, state));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_flags() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
    }
}
