//! unifi-stack — provisions the UniFi Network Application onto a cluster.
//!
//! # Usage
//!
//! ```text
//! unifi-stack plan  --stack unifi.toml --set namespace=unifi-test
//! unifi-stack apply --stack unifi.toml --context homelab
//! unifi-stack apply --dry-run --json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "unifi-stack",
    about = "UniFi Network Application — dependency-ordered cluster provisioning",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve configuration and print the resource graph without touching
    /// the cluster.
    Plan {
        #[command(flatten)]
        stack: StackArgs,
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
        /// Print the rendered manifests instead of the plan.
        #[arg(long, conflicts_with = "json")]
        manifests: bool,
    },
    /// Provision the stack, waiting for each resource before its dependents.
    Apply {
        #[command(flatten)]
        stack: StackArgs,
        /// Run against an in-memory control plane.
        #[arg(long)]
        dry_run: bool,
        /// kubectl binary to invoke.
        #[arg(long, default_value = "kubectl")]
        kubectl: String,
        /// kubeconfig context (default: current context).
        #[arg(long)]
        context: Option<String>,
        /// Print the provisioning report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct StackArgs {
    /// TOML stack file with [config] and [provision] tables.
    #[arg(short, long)]
    pub stack: Option<PathBuf>,
    /// Override a parameter, e.g. `--set namespace=unifi-test`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
    /// Database initialization script shipped to the init job.
    #[arg(long, default_value = "scripts/init-unifi-db.sh")]
    pub init_script: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,unifi=debug"))?,
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            stack,
            json,
            manifests,
        } => commands::plan::plan(&stack, json, manifests),
        Commands::Apply {
            stack,
            dry_run,
            kubectl,
            context,
            json,
        } => commands::apply::apply(&stack, dry_run, kubectl, context, json).await,
    }
}
