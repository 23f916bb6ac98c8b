//! ReportForge entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `reportforge.toml` (or `--config`) and
//!    validate it; apply the `PORT` environment override.
//! 2. **Wire observability**: configure `tracing-subscriber` with a fmt or
//!    JSON layer and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: build the template set, asset stager,
//!    workspace root, and the configured `ProcessCompiler`, and inject them
//!    into a `BuildPipeline`.
//! 4. **Serve**: run the HTTP server until Ctrl-C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pipeline::BuildPipeline;
use tracing::{info, warn};

mod config;
mod telemetry;

use config::Config;

const DEFAULT_CONFIG: &str = "reportforge.toml";

/// Compile structured report data into PDF documents over HTTP.
#[derive(Debug, Parser)]
#[command(name = "reportforge", version, about)]
struct Args {
    /// Configuration file. Defaults to ./reportforge.toml, which may be absent.
    #[arg(short, long, env = "REPORTFORGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (path, required) = match args.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let mut config = Config::load(&path, required)?;
    config.apply_env(std::env::var("PORT").ok().as_deref())?;

    let _telemetry = telemetry::init(&config.logging)?;

    let pipeline = build_pipeline(&config)?;
    info!(
        profile = %config.compiler.profile,
        templates = %config.paths.templates.display(),
        assets = %config.paths.assets.display(),
        workspaces = %config.paths.workspaces.display(),
        retain_workspaces = config.workspace.retain,
        "build pipeline ready"
    );

    server::serve(config.listen_addr(), pipeline, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("shut down");
    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<BuildPipeline> {
    let templates = config.template_set()?;
    for dir in [templates.directory(), config.paths.assets.as_path()] {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "directory does not exist; builds will fail until it is created");
        }
    }

    let compiler = config
        .compiler
        .profile
        .compiler(config.compiler.program.as_deref(), config.compiler_timeout());
    info!(command = %compiler.command(), timeout_secs = config.compiler.timeout_secs, "compiler configured");

    Ok(BuildPipeline::new(
        templates,
        config.asset_stager(),
        config.workspace_root(),
        Arc::new(compiler),
    )
    .with_retained_workspaces(config.workspace.retain))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
