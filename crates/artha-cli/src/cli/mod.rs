//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use artha_core::client::ApiClient;
use artha_core::config::ApiConfig;
use artha_core::credentials::CredentialStore;
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "artha")]
#[command(version)]
#[command(about = "Command-line client for the Shreyartha education platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in as a role and store the session token
    Login {
        /// Role to authenticate as: student, school or parent
        #[arg(long)]
        role: String,

        /// Email address (school staff may use a mobile number)
        #[arg(long)]
        identifier: String,

        /// Password
        #[arg(long)]
        password: String,
    },

    /// Log out and clear every stored credential
    Logout,

    /// Show the active role and which credential slots hold tokens
    Status,

    /// Issue a GET request against the backend
    Get {
        /// Endpoint path, e.g. /api/students/profile
        path: String,
    },

    /// Issue a POST request with a JSON body
    Post {
        /// Endpoint path
        path: String,
        /// JSON body
        json: String,
    },

    /// Issue a PUT request with a JSON body
    Put {
        /// Endpoint path
        path: String,
        /// JSON body
        json: String,
    },

    /// Issue a DELETE request
    Delete {
        /// Endpoint path
        path: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file location
    Path,
    /// Create a config file with defaults
    Init,
}

fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Builds the client and store from on-disk config. Shared by every
/// command that talks to the backend or the credential file.
fn open_session() -> Result<(ApiClient, Arc<CredentialStore>)> {
    let config = ApiConfig::load().context("load config")?;
    let store = Arc::new(CredentialStore::load_default());
    let client = ApiClient::new(&config, Arc::clone(&store)).context("build API client")?;
    Ok((client, store))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login {
            role,
            identifier,
            password,
        } => commands::auth::login(&role, identifier, password).await,
        Commands::Logout => commands::auth::logout(),
        Commands::Status => commands::auth::status(),
        Commands::Get { path } => commands::request::get(&path).await,
        Commands::Post { path, json } => commands::request::post(&path, &json).await,
        Commands::Put { path, json } => commands::request::put(&path, &json).await,
        Commands::Delete { path } => commands::request::delete(&path).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
