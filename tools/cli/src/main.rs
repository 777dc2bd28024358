//! goss CLI - Command line interface for object storage.
//!
//! Runs one storage operation against the backend selected in the
//! configuration file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use goss::{user_home_config_path, Config, Goss};

#[derive(Parser)]
#[command(name = "goss")]
#[command(about = "goss - One client for every object storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ~/.goss.toml).
    #[arg(short, long, env = "GOSS_CONFIG")]
    config: Option<PathBuf>,

    /// Use this driver instead of the configured one.
    #[arg(short, long)]
    driver: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file.
    Put {
        /// Object key.
        key: String,

        /// Local file to upload.
        path: PathBuf,
    },

    /// Print an object's content.
    Get {
        /// Object key.
        key: String,
    },

    /// Download an object into a local file.
    Save {
        /// Object key.
        key: String,

        /// Destination file path.
        path: PathBuf,
    },

    /// Print an object's size in bytes.
    Size {
        /// Object key.
        key: String,
    },

    /// Remove an object.
    Delete {
        /// Object key.
        key: String,
    },

    /// Print whether an object exists.
    Exists {
        /// Object key.
        key: String,
    },

    /// List objects under a prefix.
    Files {
        /// Key prefix (default: every object).
        #[arg(default_value = "")]
        prefix: String,

        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) if is_not_found(&err) => {
            eprintln!("{:#}", err);
            Ok(ExitCode::from(1))
        }
        Err(err) => Err(err),
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<goss::Error>()
        .is_some_and(goss::Error::is_not_found)
}

/// Load settings, applying the `--driver` override.
fn load_config(path: Option<PathBuf>, driver: Option<String>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => user_home_config_path().context("Failed to locate configuration file")?,
    };
    debug!(path = %path.display(), "Loading configuration");

    let config = Config::from_path(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    Ok(match driver {
        Some(driver) => config.with_driver(driver),
        None => config,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config, cli.driver)?;
    let mut goss = Goss::with_config(config).context("Failed to initialize storage")?;

    if goss.config().show_progress_bar() {
        goss.set_progress(Arc::new(print_progress));
    }

    match cli.command {
        Commands::Put { key, path } => cmd_put(&goss, &key, &path).await,
        Commands::Get { key } => cmd_get(&goss, &key).await,
        Commands::Save { key, path } => cmd_save(&goss, &key, &path).await,
        Commands::Size { key } => cmd_size(&goss, &key).await,
        Commands::Delete { key } => cmd_delete(&goss, &key).await,
        Commands::Exists { key } => cmd_exists(&goss, &key).await,
        Commands::Files { prefix, json } => cmd_files(&goss, &prefix, json).await,
    }
}

fn print_progress(done: u64, total: u64) {
    let percent = if total == 0 { 100 } else { done * 100 / total };
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r{:>3}% ({}/{} bytes)", percent, done, total);
    if done >= total {
        let _ = writeln!(stderr);
    }
}

/// Upload a local file.
async fn cmd_put(goss: &Goss, key: &str, path: &PathBuf) -> Result<()> {
    goss.put(key, path)
        .await
        .with_context(|| format!("Failed to upload {}", path.display()))?;

    println!("Uploaded {} to {}", path.display(), key);
    Ok(())
}

/// Print an object's content.
async fn cmd_get(goss: &Goss, key: &str) -> Result<()> {
    let content = goss.get(key).await.context("Failed to read object")?;
    print!("{}", content);
    Ok(())
}

/// Download an object.
async fn cmd_save(goss: &Goss, key: &str, path: &PathBuf) -> Result<()> {
    goss.save(key, path)
        .await
        .with_context(|| format!("Failed to save object to {}", path.display()))?;

    println!("Saved {} to {}", key, path.display());
    Ok(())
}

/// Print an object's size.
async fn cmd_size(goss: &Goss, key: &str) -> Result<()> {
    let size = goss.size(key).await.context("Failed to get object size")?;
    println!("{}", size);
    Ok(())
}

/// Remove an object.
async fn cmd_delete(goss: &Goss, key: &str) -> Result<()> {
    goss.delete(key).await.context("Failed to delete object")?;
    println!("Deleted {}", key);
    Ok(())
}

/// Print whether an object exists.
async fn cmd_exists(goss: &Goss, key: &str) -> Result<()> {
    let exists = goss.exists(key).await.context("Failed to check object")?;
    println!("{}", exists);
    Ok(())
}

/// List objects under a prefix.
async fn cmd_files(goss: &Goss, prefix: &str, json: bool) -> Result<()> {
    let files = goss.files(prefix).await.context("Failed to list objects")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("No objects found.");
    } else {
        for file in &files {
            let modified = file
                .last_modified()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            println!("{:>12}  {:<25}  {}", file.size(), modified, file.key());
        }
    }

    Ok(())
}
