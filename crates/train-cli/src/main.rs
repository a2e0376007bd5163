//! Train CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use train_config::{apply_env_overrides, load_config, validate_options, AppOptions};
use train_core::{Error, HandlerResult, LifecyclePhase};
use train_runtime::Application;

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train web framework", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo application
    Serve {
        /// Path to configuration file; defaults plus TRAIN_* variables when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "train.yaml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

/// Shared by every request of the demo app
#[derive(Debug, Default)]
struct Stats {
    served: AtomicU64,
}

/// Per-request data of the demo app
#[derive(Debug, Default)]
struct Timing {
    started: Option<Instant>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_level } => {
            init_tracing(&log_level)?;

            let options = match config {
                Some(path) => {
                    tracing::info!("Config file: {}", path.display());
                    load_config(path, true)?
                }
                None => {
                    let mut options = AppOptions::default();
                    apply_env_overrides(&mut options)?;
                    validate_options(&options)?;
                    options
                }
            };

            tracing::info!(
                hostname = %options.hostname,
                port = options.port,
                "Configuration loaded"
            );

            let app = demo_app(options)?;
            app.run().await?;
            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config, true) {
                Ok(options) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Listen: {}:{}", options.hostname, options.port);
                    tracing::info!("  Cookie: {}", options.cookie_key);
                    tracing::info!("  Max body size: {} bytes", options.max_body_size);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Train web framework");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn demo_app(options: AppOptions) -> Result<Application<Stats, Timing>> {
    let mut app: Application<Stats, Timing> = Application::new(options, Stats::default());

    app.router_mut()
        .on(LifecyclePhase::OnRequest, |ctx| {
            Box::pin(async move {
                ctx.data_mut().started = Some(Instant::now());
                Ok(HandlerResult::Absent)
            })
        })
        .get("/", |_ctx| {
            Box::pin(async move { Ok(HandlerResult::value("All aboard!")) })
        })?
        .get("/health", |ctx| {
            Box::pin(async move {
                let served = ctx.app_data().served.load(Ordering::Relaxed);
                HandlerResult::json(&serde_json::json!({ "status": "ok", "served": served }))
            })
        })?
        .get("/visits", |ctx| {
            Box::pin(async move {
                let session = ctx.session_mut();
                let visits = session.get::<u64>("visits").unwrap_or(0) + 1;
                session.insert("visits", visits)?;
                Ok(HandlerResult::value(format!("Visit number {visits}")))
            })
        })?
        .get("/hello/:name", |ctx| {
            Box::pin(async move {
                let name = ctx
                    .req
                    .param("name")
                    .ok_or_else(|| Error::bad_request("name is required"))?
                    .to_string();
                Ok(HandlerResult::value(format!("Hello, {name}!")))
            })
        })?
        .on(LifecyclePhase::PostSending, |ctx| {
            Box::pin(async move {
                ctx.app_data().served.fetch_add(1, Ordering::Relaxed);
                let elapsed = ctx.data().started.map(|t| t.elapsed());
                tracing::info!(
                    method = %ctx.req.method(),
                    path = ctx.req.path(),
                    elapsed = ?elapsed,
                    "Request served"
                );
                Ok(HandlerResult::Absent)
            })
        });

    Ok(app)
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(filter.into())
                .add_directive("hyper=warn".parse()?),
        )
        .init();

    Ok(())
}
