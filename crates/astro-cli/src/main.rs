use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use astro_core::Validate;
use astro_core::security::hash_password;
use astro_core::user::{NewUser, UserRecord};
use astro_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "astro", version, about = "Astro catalog administration")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Create an account, optionally with superuser rights
    CreateUser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Plain password; read from ASTRO_USER_PASSWORD if not provided
        #[arg(long, env = "ASTRO_USER_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,

        /// Allow the account to delete catalog records when writes are protected
        #[arg(long, default_value_t = false)]
        superuser: bool,
    },

    /// Enable or disable an account
    SetActive {
        username: String,

        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("astro=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = connect_db(cli.database_url).await?;

    match cli.command {
        Commands::Migrate => {
            db.migrate().await.context("Failed to apply migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateUser {
            username,
            email,
            password,
            full_name,
            superuser,
        } => {
            db.migrate().await.context("Failed to apply migrations")?;
            cmd_create_user(&db, username, email, password, full_name, superuser).await?;
        }
        Commands::SetActive { username, active } => {
            if !db.user_repo().set_active(&username, active).await? {
                anyhow::bail!("No user named '{username}'");
            }
            println!(
                "User {username} {}",
                if active { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(())
}

async fn connect_db(url: Option<String>) -> Result<Database> {
    let config = match url {
        Some(url) => DatabaseConfig {
            url,
            max_connections: 2,
        },
        None => DatabaseConfig::from_env()
            .context("DATABASE_URL not set. Pass --database-url or set the variable.")?,
    };
    Database::connect(&config)
        .await
        .context("Failed to connect to database")
}

async fn cmd_create_user(
    db: &Database,
    username: String,
    email: String,
    password: String,
    full_name: Option<String>,
    superuser: bool,
) -> Result<()> {
    let registration = NewUser {
        username,
        email,
        password,
        full_name,
    };
    registration
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid user: {e}"))?;

    let hashed = hash_password(&registration.password)?;
    let mut record = UserRecord::from_registration(registration, hashed);
    record.is_superuser = superuser;

    let user = db.user_repo().create(&record).await?;
    tracing::info!("Created user {} ({})", user.username, user.id);
    println!(
        "Created {} {} <{}> with id {}",
        if user.is_superuser { "superuser" } else { "user" },
        user.username,
        user.email,
        user.id
    );
    Ok(())
}
