use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use dashboard_db::config::{self, Config, ProcessEnv};
use dashboard_db::utils::logging::init_logging;
use dashboard_db::{users, DashboardDb};

#[derive(Parser)]
#[command(name = "dashboard-db", version, about = "Schema and migration tooling for the dashboard database")]
struct Cli {
    /// Config file (defaults to ./dashboard.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a migration for schema changes since the last snapshot
    Generate {
        /// Migration name, e.g. add_user_age
        #[arg(long)]
        name: Option<String>,
    },
    /// Apply pending migrations to DATABASE_URL
    Migrate,
    /// Exit with an error if the schema changed since the last generated migration
    Check,
    /// Print the resolved configuration
    Config {
        /// Print the connection string without masking the password
        #[arg(long)]
        show_secrets: bool,
    },
    /// Print the users table descriptor
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_from_file(path, &ProcessEnv)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load(&ProcessEnv)?,
    };
    init_logging(&config.logging)?;

    let app = DashboardDb::new(config);

    match cli.command {
        Command::Generate { name } => match app.generate_migration(name.as_deref())? {
            Some(migration) => println!("{}", migration.path.display()),
            None => println!("No schema changes, nothing to generate"),
        },
        Command::Migrate => {
            let count = app.apply_migrations().await?;
            app.client().close().await;
            println!("Applied migrations from {} ({} files)", app.config().migrations.out.display(), count);
        }
        Command::Check => {
            let diff = app.schema_diff()?;
            if !diff.is_empty() {
                eprintln!("Schema has changed since the last generated migration: {:#?}", diff);
                return Ok(ExitCode::FAILURE);
            }
            println!("Schema is in sync");
        }
        Command::Config { show_secrets } => {
            let mut config = app.config().clone();
            if !show_secrets {
                config.migrations.db_credentials.url = config.migrations.db_credentials.redacted();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(users())?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
