mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};
use landform_cloud::{Context, PollPolicy};
use landform_cloud_api::{ApiConfig, Provider};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "landform")]
#[command(about = "Drive platform resources to the state described in a parameter file", long_about = None)]
struct Cli {
    /// Platform API base URL
    #[arg(
        long,
        global = true,
        env = "LANDFORM_API_URL",
        default_value = landform_cloud_api::config::DEFAULT_API_URL
    )]
    api_url: String,

    /// Platform API token
    #[arg(long, global = true, env = "LANDFORM_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Give up on the whole operation after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// First delay between status checks, in seconds
    #[arg(long, global = true, default_value = "2")]
    poll_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage Kubernetes clusters
    #[command(subcommand)]
    Cluster(ClusterCommands),
    /// Drive an environment to a desired state
    #[command(subcommand)]
    Deployment(DeploymentCommands),
    /// Manage jobs
    #[command(subcommand)]
    Job(JobCommands),
    /// Manage deployment stages
    #[command(subcommand)]
    Stage(StageCommands),
    /// Read or update an organization
    #[command(subcommand)]
    Organization(OrganizationCommands),
    /// Show version information
    Version,
}

#[derive(Args)]
struct ParamsArg {
    /// JSON parameter file
    #[arg(short, long)]
    params: PathBuf,
}

#[derive(Args)]
struct PriorArg {
    /// JSON file holding the last known state of the resource
    #[arg(long)]
    prior: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ClusterCommands {
    Create {
        #[command(flatten)]
        params: ParamsArg,
    },
    Get {
        #[arg(long)]
        organization: String,
        #[arg(long)]
        id: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        params: ParamsArg,
        #[command(flatten)]
        prior: PriorArg,
    },
    Delete {
        #[arg(long)]
        organization: String,
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum DeploymentCommands {
    Create {
        #[command(flatten)]
        params: ParamsArg,
    },
    Get {
        #[command(flatten)]
        params: ParamsArg,
    },
    Update {
        #[command(flatten)]
        params: ParamsArg,
    },
    Delete {
        #[command(flatten)]
        params: ParamsArg,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    Create {
        /// Environment the job belongs to
        #[arg(long)]
        environment: String,
        #[command(flatten)]
        params: ParamsArg,
    },
    Get {
        #[arg(long)]
        id: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        params: ParamsArg,
        #[command(flatten)]
        prior: PriorArg,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum StageCommands {
    Create {
        /// Environment the stage belongs to
        #[arg(long)]
        environment: String,
        #[command(flatten)]
        params: ParamsArg,
    },
    Get {
        #[arg(long)]
        id: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        params: ParamsArg,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum OrganizationCommands {
    Create {
        #[command(flatten)]
        params: ParamsArg,
    },
    Get {
        #[arg(long)]
        id: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        params: ParamsArg,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON result, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("landform=info")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("landform {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let token = cli.token.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "API token is required: pass --token or set {}",
            landform_cloud_api::config::API_TOKEN_ENV
        )
    })?;
    let mut policy = PollPolicy {
        initial_delay: Duration::from_secs(cli.poll_interval.max(1)),
        ..PollPolicy::default()
    };
    if let Some(timeout) = cli.timeout {
        policy = policy.with_timeout(Duration::from_secs(timeout));
    }
    let provider = Provider::new(ApiConfig::new(&cli.api_url, token)?, policy)?;

    let (mut ctx, cancel) = Context::with_cancel();
    if let Some(timeout) = cli.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(timeout));
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Cluster(cmd) => commands::cluster::handle(&provider, &ctx, cmd).await,
        Commands::Deployment(cmd) => commands::deployment::handle(&provider, &ctx, cmd).await,
        Commands::Job(cmd) => commands::job::handle(&provider, &ctx, cmd).await,
        Commands::Stage(cmd) => commands::stage::handle(&provider, &ctx, cmd).await,
        Commands::Organization(cmd) => {
            commands::organization::handle(&provider, &ctx, cmd).await
        }
        Commands::Version => Ok(()),
    }
}
