pub use self::board::Board;
pub use self::moves::{AllowedMoves, Move};
pub use self::piece::Piece;
pub use self::position::Square;

mod board;
mod moves;
mod piece;
mod position;
