pub mod enums;
pub mod game;
pub mod notification;
pub mod state;
pub mod user;

// Re-export key types for easy access
pub use enums::{Conclusion, DisconnectReason, GameMode, PieceType, Side, Winner};
pub use game::{Game, TimeControl};
pub use notification::Notification;
pub use state::{Clocks, GameState};
pub use user::{PrivateDetails, User};
