use crate::chess::Move;
use crate::cli::commands::{GamesCommand, PageArgs, PlayCommand};
use crate::cli::display;
use crate::messages::FromWire;
use crate::models::DisconnectReason;
use crate::network::{GameConnection, RestClient};
use crate::pagination::{queries, Paginator};
use crate::session::{Session, SessionIdentity};
use crate::storage::{default_credentials_path, FileCredentialStore};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const API_URL_ENV: &str = "GAMBIT_API_URL";
pub const SOCKET_URL_ENV: &str = "GAMBIT_SOCKET_URL";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API
    pub api_url: String,
    /// WebSocket endpoint for live games
    pub socket_url: String,
    pub request_timeout_secs: u64,
    /// Where the session is persisted; the data directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            socket_url: "ws://localhost:8000/games/socket".to_string(),
            request_timeout_secs: 20,
            credentials_file: None,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "gambit", "gambit")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow!("Could not determine config directory"))
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default() -> Result<Self> {
        Self::load_or_create(&Self::default_config_file()?)
    }

    pub fn load_or_create(config_file: &Path) -> Result<Self> {
        if config_file.exists() {
            let content = std::fs::read_to_string(config_file)
                .context("Failed to read configuration file")?;
            let config: Config =
                toml::from_str(&content).context("Failed to parse configuration file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_file)?;
            info!("Wrote default configuration to {}", config_file.display());
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save_to(&self, config_file: &Path) -> Result<()> {
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(config_file, content).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Apply `GAMBIT_API_URL` and `GAMBIT_SOCKET_URL` from `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.is_empty()) {
            debug!("{} overrides api_url", API_URL_ENV);
            self.api_url = url;
        }
        if let Some(url) = lookup(SOCKET_URL_ENV).filter(|u| !u.is_empty()) {
            debug!("{} overrides socket_url", SOCKET_URL_ENV);
            self.socket_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.credentials_file {
            Some(path) => Ok(path.clone()),
            None => default_credentials_path().context("Could not determine credentials path"),
        }
    }
}

/// Main application state
pub struct App {
    pub config: Config,
    pub session: Session,
    pub rest: RestClient,
}

impl App {
    /// Load configuration, open the credential store and build the REST client
    pub fn new() -> Result<Self> {
        let config = Config::load_or_create_default()
            .context("Failed to initialize configuration")?
            .with_overrides(|name| std::env::var(name).ok());
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let store = FileCredentialStore::new(config.credentials_path()?);
        let session = Session::new(Arc::new(store));
        let rest = RestClient::connect(&config.api_url, config.request_timeout(), session.clone())
            .context("Failed to create API client")?;
        Ok(Self {
            config,
            session,
            rest,
        })
    }

    pub fn handle_login(&self, session_id: i64, token: &str) -> Result<()> {
        let token = general_purpose::STANDARD
            .decode(token.trim())
            .context("Session token must be base64")?;
        if token.is_empty() {
            return Err(anyhow!("Session token is empty"));
        }
        let identity = self
            .session
            .store(session_id, token)
            .context("Failed to store session")?;
        println!("Logged in as session {}", identity.session_id());
        Ok(())
    }

    pub fn handle_logout(&self) -> Result<()> {
        self.session.clear().context("Failed to clear session")?;
        println!("Logged out.");
        Ok(())
    }

    pub fn handle_whoami(&self) -> Result<()> {
        match self.session.current_identity() {
            Ok(identity) => print_identity(&identity),
            Err(_) => println!("Not logged in. Use 'gambit login <session-id> <token>'."),
        }
        Ok(())
    }

    pub async fn handle_games(&self, command: GamesCommand) -> Result<()> {
        let (paginator, page) = match command {
            GamesCommand::Invites { page } => (queries::game_invites(&self.rest), page),
            GamesCommand::Ongoing { page } => (queries::ongoing_games(&self.rest), page),
            GamesCommand::Searches { page } => (queries::game_searches(&self.rest), page),
            GamesCommand::Completed {
                username,
                common,
                page,
            } => {
                let paginator = if common {
                    queries::common_completed_games(&self.rest, &username)
                } else {
                    queries::completed_games(&self.rest, &username)
                };
                (paginator, page)
            }
        };
        let games = fetch_listing(&paginator, page).await?;
        display::display_games_list(&games);
        Ok(())
    }

    pub async fn handle_accounts(&self, page: PageArgs) -> Result<()> {
        let users = fetch_listing(&queries::accounts(&self.rest), page).await?;
        display::display_users(&users);
        Ok(())
    }

    pub async fn handle_account(&self, username: &str) -> Result<()> {
        let user = queries::get_account(&self.rest, username)
            .await
            .with_context(|| format!("Failed to fetch account {}", username))?;
        display::display_user(&user);
        Ok(())
    }

    pub async fn handle_notifications(&self, page: PageArgs) -> Result<()> {
        let notifications = fetch_listing(&queries::notifications(&self.rest), page).await?;
        display::display_notifications(&notifications);
        Ok(())
    }

    pub async fn handle_game(&self, id: i64) -> Result<()> {
        let game = queries::get_game(&self.rest, id)
            .await
            .with_context(|| format!("Failed to fetch game {}", id))?;
        display::display_game(&game);
        Ok(())
    }

    pub async fn handle_play(&self, game_id: i64, command: PlayCommand) -> Result<()> {
        let game = queries::get_game(&self.rest, game_id)
            .await
            .with_context(|| format!("Failed to fetch game {}", game_id))?;
        let connection = GameConnection::connect(&self.config.socket_url, &self.session, Arc::new(game))
            .await
            .context("Failed to connect to the game server")?;
        let unicode = display::supports_unicode();

        let result = self.run_play(&connection, command, unicode).await;
        connection.disconnect();
        result
    }

    async fn run_play(&self, connection: &GameConnection, command: PlayCommand, unicode: bool) -> Result<()> {
        match command {
            PlayCommand::State => {
                let state = connection.get_game_state().await.context("Failed to get game state")?;
                display::display_game_state(&state, unicode);
            }
            PlayCommand::Moves => {
                let moves = connection
                    .get_allowed_moves()
                    .await
                    .context("Failed to get legal moves")?;
                display::display_allowed_moves(&moves);
            }
            PlayCommand::Move { uci } => {
                let mv: Move = uci
                    .parse()
                    .with_context(|| format!("'{}' is not a move like e2e4 or e7e8q", uci))?;
                let update = connection.make_move(mv).await.context("Move rejected")?;
                println!("Played {}", update.mv);
                display::display_game_state(&update.state, unicode);
            }
            PlayCommand::OfferDraw => {
                connection.offer_draw().await.context("Failed to offer a draw")?;
                println!("Draw offered.");
            }
            PlayCommand::ClaimDraw { reason } => {
                let end = connection.claim_draw(reason).await.context("Draw claim rejected")?;
                display::display_game_end(&end);
            }
            PlayCommand::Resign => {
                let end = connection.resign().await.context("Failed to resign")?;
                display::display_game_end(&end);
            }
            PlayCommand::Timeout => {
                let end = connection.timeout().await.context("Timeout claim rejected")?;
                display::display_game_end(&end);
            }
            PlayCommand::Watch => watch(connection, unicode).await?,
        }
        Ok(())
    }
}

/// Print pushes until the game ends, the server disconnects, or Ctrl-C
async fn watch(connection: &GameConnection, unicode: bool) -> Result<()> {
    connection.on_move(move |update| {
        println!("Move: {}", update.mv);
        display::display_game_state(&update.state, unicode);
    });
    connection.on_draw_offer(|| println!("Your opponent offers a draw."));
    connection.on_game_end(display::display_game_end);
    connection.on_disconnect(|reason| match reason {
        DisconnectReason::GameOver => println!("The game is over."),
        DisconnectReason::NewConnection => println!("Disconnected: the game was opened elsewhere."),
        DisconnectReason::InviteDeclined => println!("The invitation was declined."),
    });

    let state = connection.get_game_state().await.context("Failed to get game state")?;
    display::display_game_state(&state, unicode);
    println!("Watching game {}. Press Ctrl-C to stop.", connection.game().id);

    tokio::select! {
        _ = connection.closed() => info!("Game connection closed"),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            connection.disconnect();
        }
    }
    Ok(())
}

async fn fetch_listing<T: FromWire>(paginator: &Paginator<T>, page: PageArgs) -> Result<Vec<T>> {
    let items = match page.page {
        Some(page) => paginator.get_page(Some(page)).await,
        None => paginator.collect_remaining().await,
    };
    items.with_context(|| format!("Failed to list {}", paginator.endpoint()))
}

fn print_identity(identity: &SessionIdentity) {
    println!("Session {}", identity.session_id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"https://chess.example\"\n").unwrap();

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config.api_url, "https://chess.example");
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_overrides(|name| match name {
            API_URL_ENV => Some("https://api.example".to_string()),
            SOCKET_URL_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_url, "https://api.example");
        assert_eq!(config.socket_url, Config::default().socket_url);
    }

    #[test]
    fn test_credentials_path_override() {
        let config = Config {
            credentials_file: Some(PathBuf::from("/tmp/creds.toml")),
            ..Config::default()
        };
        assert_eq!(config.credentials_path().unwrap(), PathBuf::from("/tmp/creds.toml"));
    }
}
