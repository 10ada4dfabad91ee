use anyhow::Result;
use clap::Parser;
use talent_sync::cli::{Cli, Command, CredentialsAction};
use talent_sync::database::{CredentialsRepository, DatabaseConfig};
use talent_sync::environment::EnvironmentConfig;
use talent_sync::web::start_web_server;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("talent_sync=info,talentsync=info,rocket::server=off")
        }))
        .init();

    let cli = Cli::parse();
    let environment = EnvironmentConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let port = std::env::var("ROCKET_PORT")
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT environment variable not set"))?
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;

            start_web_server(environment, port).await
        }
        Command::Credentials { action } => run_credentials(environment, action).await,
    }
}

async fn run_credentials(environment: EnvironmentConfig, action: CredentialsAction) -> Result<()> {
    let mut db_config = DatabaseConfig::new(environment.database_path);
    db_config.init_pool().await?;
    db_config.migrate().await?;
    let repo = CredentialsRepository::new(db_config.pool()?);

    match action {
        CredentialsAction::Set {
            owner,
            access_token,
            refresh_token,
        } => {
            repo.upsert(&owner, &access_token, &refresh_token).await?;
            println!("✓ Stored credentials for {}", owner);
        }
        CredentialsAction::List => {
            let rows = repo.list().await?;
            if rows.is_empty() {
                println!("No stored credentials");
            }
            for row in rows {
                println!(
                    "{}  (updated {})",
                    row.owner_key,
                    row.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    Ok(())
}
