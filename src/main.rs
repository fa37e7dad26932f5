//! Webpilot service binary
//!
//! Natural-language browser automation over HTTP.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use webpilot::llm::{InstructionRewriter, RewriterConfig};
use webpilot::server::{self, AppState};
use webpilot::session::{BrowserConfig, Session};
use webpilot::tools::ToolRegistry;

/// Webpilot service
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(version)]
#[command(about = "Natural-language browser automation service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Run in headless mode (pass `--headless false` for a visible window)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Directory screenshots are written to
    #[arg(long, default_value = "screenshots")]
    screenshot_dir: PathBuf,

    /// Model used for instruction rewriting
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "webpilot=debug,info" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = BrowserConfig::builder()
        .headless(args.headless)
        .screenshot_dir(args.screenshot_dir);
    if let Some(path) = args.chrome_path {
        config = config.chrome_path(path);
    }
    let session = Session::new(config.build());

    let mut rewriter_config = RewriterConfig::from_env();
    if let Some(model) = args.model {
        rewriter_config.model = model;
    }

    let state = Arc::new(AppState::new(
        session.clone(),
        ToolRegistry::new(),
        InstructionRewriter::new(rewriter_config),
    ));
    let app = server::router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("webpilot {} listening on {}", webpilot::VERSION, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Termination must release the browser before exit.
    let report = session.release().await;
    tracing::info!(summary = %report.summary(), "Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_defaults_on() {
        let args = Args::try_parse_from(["webpilot"]).unwrap();
        assert!(args.headless);
    }

    #[test]
    fn test_headless_flag_takes_a_value() {
        let args = Args::try_parse_from(["webpilot", "--headless", "false"]).unwrap();
        assert!(!args.headless);

        let args = Args::try_parse_from(["webpilot", "--headless", "true"]).unwrap();
        assert!(args.headless);
    }
}
