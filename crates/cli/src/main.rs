use anyhow::Context;
use bookshelf::App;
use bookshelf_authz::TokenIssuer;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf-cli", version, about = "Operate the bookshelf service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the HTTP API
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Print a bearer token for a user id
    Token {
        /// User id placed in the token subject
        #[arg(long, env = "BOOKSHELF_TOKEN_USER")]
        user: String,
        /// Lifetime in seconds; defaults to `auth.token_ttl_secs`
        #[arg(long)]
        ttl: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => {
            tracing::info!(env = ?settings.environment, "serving from CLI");
            App::bootstrap(settings).await?.serve().await
        }
        Command::Migrate => {
            let applied = bookshelf::migrate(&settings).await?;
            tracing::info!(applied, "migrate finished");
            Ok(())
        }
        Command::Token { user, ttl } => {
            let mut issuer = TokenIssuer::from_settings(&settings.auth);
            if let Some(ttl) = ttl {
                issuer = issuer.with_ttl(ttl);
            }
            let token = issuer
                .issue(&user)
                .with_context(|| format!("failed to issue token for '{}'", user))?;
            println!("{token}");
            Ok(())
        }
    }
}
