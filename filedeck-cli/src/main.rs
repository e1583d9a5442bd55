use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filedeck_core::file::access::FileReadResult;
use filedeck_core::file::tree::TreeOptions;
use filedeck_core::{SettingsManager, WorkspaceService};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "filedeck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "filedeck - workspace file service from the command line")]
struct Args {
    /// Use a specific settings file instead of ~/.filedeck/settings.toml
    #[arg(long, value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the directory tree of PATH as JSON
    Tree {
        path: PathBuf,
        /// Expand directories only this many levels below PATH
        #[arg(long)]
        max_depth: Option<usize>,
        /// Include names starting with '.'
        #[arg(long)]
        hidden: bool,
    },
    /// Print size, kind and modification time
    Stat { path: PathBuf },
    /// Read a file with the configured size caps
    Read {
        path: PathBuf,
        /// Print only the text content (or data URL for images)
        #[arg(long)]
        raw: bool,
    },
    /// Write CONTENT to PATH, creating parent directories
    Write { path: PathBuf, content: String },
    /// Create a folder and any missing parents
    Mkdir { path: PathBuf },
    /// Rename PATH to NEW_NAME within the same directory
    Rename { path: PathBuf, new_name: String },
    /// Move PATH to the trash, deleting permanently if the trash is unavailable
    Rm { path: PathBuf },
    /// Print change events under PATH until interrupted
    Watch { path: PathBuf },
    /// Track files and print the bundle that fits the budget
    Bundle {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Byte budget; defaults to context.max_bundle_bytes
        #[arg(long)]
        budget: Option<usize>,
        /// Print the assistant-facing text instead of JSON
        #[arg(long)]
        render: bool,
    },
}

fn main() -> Result<()> {
    setup_tracing()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();
    info!("CLI startup: {:?}", args.command);

    let settings = match args.settings {
        Some(path) => SettingsManager::from_path(path)?,
        None => SettingsManager::new()?,
    };
    let service = WorkspaceService::new(settings.settings())?;

    match args.command {
        Command::Tree {
            path,
            max_depth,
            hidden,
        } => {
            let options = TreeOptions {
                max_depth: max_depth.or(service.settings().tree.max_depth),
                ignore_hidden: !hidden,
            };
            print_json(&service.list_directory(path, Some(options)).await?)?;
        }
        Command::Stat { path } => print_json(&service.stat(path).await?)?,
        Command::Read { path, raw } => {
            let result = service.read_file(path).await;
            match (&result, raw) {
                (FileReadResult::Text { content, .. }, true) => println!("{content}"),
                (FileReadResult::Image { .. }, true) => {
                    println!("{}", result.data_url().unwrap_or_default())
                }
                _ => print_json(&result)?,
            }
            if let FileReadResult::Error { message, .. } = &result {
                anyhow::bail!("{message}");
            }
        }
        Command::Write { path, content } => service.write_file(path, &content).await?,
        Command::Mkdir { path } => service.create_folder(path).await?,
        Command::Rename { path, new_name } => {
            let new_path = service.rename(path, &new_name).await?;
            println!("{}", new_path.display());
        }
        Command::Rm { path } => {
            let outcome = service.delete(&path).await?;
            if let Some(warning) = &outcome.warning {
                eprintln!("warning: {}: {warning}", path.display());
            }
            print_json(&outcome)?;
        }
        Command::Watch { path } => watch(&service, path).await?,
        Command::Bundle {
            paths,
            budget,
            render,
        } => {
            for path in paths {
                service
                    .track_path(&path)
                    .await
                    .with_context(|| format!("Failed to track {}", path.display()))?;
            }
            let bundle = service.get_bundle(budget).await;
            if render {
                println!("{}", bundle.render().unwrap_or_default());
            } else {
                print_json(&bundle)?;
            }
        }
    }

    Ok(())
}

async fn watch(service: &WorkspaceService, path: PathBuf) -> Result<()> {
    let mut events = service.subscribe().await;
    let root = service.watch(&path).await?;
    eprintln!("Watching {} (Ctrl-C to stop)", root.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} change events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    service.shutdown().await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    let trace_dir = home.join(".filedeck").join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("filedeck.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
