use crate::models::Conclusion;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gambit")]
#[command(about = "A command-line client for playing and browsing online chess games")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Page selection shared by every listing
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PageArgs {
    /// Fetch only this page (0-based). Without it every page is fetched.
    #[arg(short, long)]
    pub page: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a session issued by the server
    ///
    /// Examples:
    ///   gambit login 42 AAEC/w==
    Login {
        /// Session id
        session_id: i64,
        /// Session token, base64 encoded
        token: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// Browse game listings
    Games {
        #[command(subcommand)]
        command: GamesCommand,
    },
    /// List all accounts
    Accounts {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one account
    Account {
        /// Account username
        username: String,
    },
    /// List your notifications
    Notifications {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one game
    Game {
        /// Game id
        id: i64,
    },
    /// Act in a live game
    ///
    /// Examples:
    ///   gambit play 17 state
    ///   gambit play 17 move e2e4
    ///   gambit play 17 claim-draw threefold-repetition
    ///   gambit play 17 watch
    Play {
        /// Game id
        game_id: i64,
        #[command(subcommand)]
        command: PlayCommand,
    },
}

#[derive(Subcommand)]
pub enum GamesCommand {
    /// Games you have been invited to
    Invites {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Your games in progress
    Ongoing {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Your open game searches
    Searches {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Finished games of an account
    Completed {
        /// Account username
        username: String,
        /// Only games played against you
        #[arg(long)]
        common: bool,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
pub enum PlayCommand {
    /// Show the board and clocks
    State,
    /// List your legal moves
    Moves,
    /// Make a move in coordinate notation (e2e4, e7e8q)
    Move {
        #[arg(value_name = "UCI")]
        uci: String,
    },
    /// Offer a draw
    OfferDraw,
    /// Claim a draw: threefold-repetition or fifty-move-rule
    ClaimDraw { reason: Conclusion },
    /// Resign the game
    Resign,
    /// End the game on your opponent's clock
    Timeout,
    /// Follow the game until it ends or Ctrl-C
    Watch,
}
