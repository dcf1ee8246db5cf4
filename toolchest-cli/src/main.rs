//! Toolchest CLI - command-line interface
//!
//! Thin binary over the `toolchest` library: loads a requirements
//! catalog, resolves it for the host platform, and drives the install
//! registry, rendering the event stream to the terminal.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{run_install, run_resolve, InstallOptions};

#[derive(Parser)]
#[command(name = "toolchest", version, about = "Dependency-ordered installer for developer tool bundles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, verify, and install every component in a catalog
    Install {
        /// Path to the requirements catalog (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Directory to install components under
        #[arg(long)]
        install_root: Option<PathBuf>,

        /// Directory for downloads and extraction staging
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Maximum simultaneous downloads
        #[arg(long)]
        max_downloads: Option<usize>,

        /// Component ids to skip (repeatable)
        #[arg(long)]
        skip: Vec<String>,

        /// Override the platform key (win32, darwin, linux)
        #[arg(long)]
        platform: Option<String>,

        /// Override the architecture key (x64, arm64)
        #[arg(long)]
        arch: Option<String>,
    },

    /// Resolve a catalog for a platform and print the result (dry run)
    Resolve {
        /// Path to the requirements catalog (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Override the platform key (win32, darwin, linux)
        #[arg(long)]
        platform: Option<String>,

        /// Override the architecture key (x64, arm64)
        #[arg(long)]
        arch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Install {
            catalog,
            install_root,
            temp_dir,
            max_downloads,
            skip,
            platform,
            arch,
        } => {
            run_install(InstallOptions {
                catalog,
                install_root,
                temp_dir,
                max_downloads,
                skip,
                platform,
                arch,
            })
            .await
        }
        Commands::Resolve {
            catalog,
            platform,
            arch,
        } => run_resolve(catalog, platform, arch),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
