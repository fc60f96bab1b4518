//! aiac-web - App Inventor archive compile studio
//!
//! Serves the upload/inspect/compile web UI, and offers the same flow on the
//! command line:
//! - `aiac-web serve` (default): run the web server
//! - `aiac-web inspect <file.aia>`: print project metadata as JSON
//! - `aiac-web build <file.aia>`: inspect, play the compile stages and write
//!   `{projectName}.apk`

use std::path::{Path, PathBuf};

use aiac_common::config::{ConfigOverrides, ProgressPacing, ServiceConfig};
use aiac_common::project::DEFAULT_TARGET;
use aiac_web::api::buildinfo::BuildInfo;
use aiac_web::controller::{self, CompileStatus, LocalBackend, UiState};
use aiac_web::inspector;
use aiac_web::simulator::PacedClock;
use aiac_web::{build_router, AppState};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for aiac-web
#[derive(Parser, Debug)]
#[command(name = "aiac-web")]
#[command(about = "Inspect App Inventor projects and produce placeholder packages")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server
    Serve(ServeArgs),

    /// Print the metadata of a project archive as JSON
    Inspect {
        /// Path to the .aia archive
        file: PathBuf,
    },

    /// Inspect and compile a project archive without the browser
    Build {
        /// Path to the .aia archive
        file: PathBuf,

        /// Android release to target
        #[arg(long, default_value = DEFAULT_TARGET)]
        target: String,

        /// Compress package entries
        #[arg(long)]
        optimize: bool,

        /// Directory to write the package into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Stage pacing: instant, realtime or a scale factor
        #[arg(long, default_value = "realtime")]
        pacing: ProgressPacing,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Address to bind (overrides AIAC_HOST and the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides AIAC_PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server-side stage pacing: instant, realtime or a scale factor
    #[arg(long)]
    pacing: Option<ProgressPacing>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(serve) => run_server(serve).await,
        Command::Inspect { file } => {
            init_cli_tracing();
            run_inspect(&file).await
        }
        Command::Build {
            file,
            target,
            optimize,
            out,
            pacing,
        } => {
            init_cli_tracing();
            run_build(&file, &target, optimize, &out, pacing).await
        }
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let config = ServiceConfig::resolve(ConfigOverrides {
        host: args.host,
        port: args.port,
        config_path: args.config,
        progress_pacing: args.pacing,
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("aiac_web={0},tower_http={0}", config.log_level).into()
            }),
        )
        .init();

    let build = BuildInfo::current();
    info!(
        "Starting aiac-web v{} [{}] built {} ({})",
        build.version, build.git_hash, build.build_timestamp, build.build_profile
    );
    info!(
        pacing = ?config.progress_pacing,
        max_upload_bytes = config.max_upload_bytes,
        "Configuration resolved"
    );

    let address = config.bind_address();
    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("aiac-web listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Command-line runs keep stdout for results
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aiac_web=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_inspect(file: &Path) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = inspector::sanitize_filename(&file.to_string_lossy());

    let metadata = inspector::inspect_archive_blocking(bytes, filename).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

async fn run_build(
    file: &Path,
    target: &str,
    optimize: bool,
    out: &Path,
    pacing: ProgressPacing,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let backend = LocalBackend;
    let mut state = UiState::new();

    controller::upload(&mut state, &backend, &filename, bytes).await?;
    if let Some(notice) = state.notice() {
        bail!("{}", notice);
    }

    {
        let project = state
            .project()
            .context("Inspection finished without a project")?;
        println!("Project:    {}", project.project_name);
        println!("Version:    {}", project.version);
        println!("Screens:    {}", project.screens.join(", "));
        let components: Vec<&str> = project.components.iter().map(String::as_str).collect();
        println!("Components: {}", components.join(", "));
    }
    if let Some(panel) = state.missing_components_panel() {
        eprintln!("{}", panel.render());
    }

    state.set_form(target, optimize)?;
    let clock = PacedClock::new(pacing);
    controller::drive_compile(&mut state, &backend, &clock, |update| {
        println!("[{:>3}%] {}", update.percent, update.message);
    })
    .await?;

    match state.compile_status() {
        Some(CompileStatus::Succeeded(package)) => {
            let safe_name = package.file_name.replace(['/', '\\'], "_");
            let path = out.join(safe_name);
            tokio::fs::write(&path, &package.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} ({} bytes)", path.display(), package.bytes.len());
            Ok(())
        }
        Some(CompileStatus::Failed(message)) => bail!("{}", message),
        _ => bail!("Compile did not finish"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
