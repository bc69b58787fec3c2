use std::path::PathBuf;
use std::sync::Arc;

use authsession::config::{AuthConfig, ConfigError};
use authsession::store::{FileStore, KeyValueStore, StoreError};
use authsession::{AuthError, backend_from_config};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authsession", about = "Drive the auth session manager against a hosted or local backend")]
struct Cli {
    /// JSON file standing in for browser local storage.
    #[arg(long, env = "AUTH_STORE_PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved session state.
    Status,
    SignIn(Credentials),
    SignUp(Credentials),
    SignOut,
    /// Sign out and wipe provider-owned stored keys.
    Reset,
}

#[derive(Args, Debug)]
struct Credentials {
    /// Mobile number used as the login identifier.
    mobile: String,

    #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AuthConfig::from_env()?;
    let store_path = cli.store.unwrap_or_else(|| config.store_path.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&store_path)?);
    let backend = backend_from_config(&config, store).await?;

    match cli.command {
        Command::Status => {}
        Command::SignIn(creds) => {
            backend.sign_in(&creds.mobile, &creds.password).await?;
        }
        Command::SignUp(creds) => {
            let data = backend.sign_up(&creds.mobile, &creds.password).await?;
            if data.session.is_none() {
                tracing::info!("account created; confirm via the emailed link before signing in");
            }
        }
        Command::SignOut => backend.sign_out().await?,
        Command::Reset => backend.reset_auth().await,
    }

    println!("{}", serde_json::to_string_pretty(&backend.snapshot())?);
    Ok(())
}
