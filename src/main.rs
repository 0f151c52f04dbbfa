use anyhow::Result;
use clap::Parser;
use gambit::cli::{App, Cli, Commands};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gambit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new()?;

    match cli.command {
        Commands::Login { session_id, token } => app.handle_login(session_id, &token),
        Commands::Logout => app.handle_logout(),
        Commands::Whoami => app.handle_whoami(),
        Commands::Games { command } => app.handle_games(command).await,
        Commands::Accounts { page } => app.handle_accounts(page).await,
        Commands::Account { username } => app.handle_account(&username).await,
        Commands::Notifications { page } => app.handle_notifications(page).await,
        Commands::Game { id } => app.handle_game(id).await,
        Commands::Play { game_id, command } => app.handle_play(game_id, command).await,
    }
}
