use super::piece::Piece;
use super::position::Square;
use crate::messages::wire::{DecodeError, FromWire, ToWire};
use crate::models::Side;
use serde_json::Value;

/// Snapshot of the 64 squares as the server last reported them
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Board {
    /// squares[rank][file] where rank 0 = rank 1, file 0 = file a
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get_piece(&self, square: Square) -> Option<Piece> {
        self.squares
            .get(square.rank as usize)
            .and_then(|rank| rank.get(square.file as usize))
            .copied()
            .flatten()
    }

    /// Place or clear a square. Off-board squares are ignored.
    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) {
        if let Some(cell) = self
            .squares
            .get_mut(square.rank as usize)
            .and_then(|rank| rank.get_mut(square.file as usize))
        {
            *cell = piece;
        }
    }

    /// Every occupied square, rank by rank from rank 1
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.squares.iter().enumerate().flat_map(|(rank, row)| {
            row.iter().enumerate().filter_map(move |(file, cell)| {
                cell.map(|piece| {
                    (
                        Square {
                            rank: rank as u8,
                            file: file as u8,
                        },
                        piece,
                    )
                })
            })
        })
    }

    pub fn count(&self, side: Side) -> usize {
        self.pieces().filter(|(_, p)| p.side == side).count()
    }

    /// Piece placement in FEN style, rank 8 first
    pub fn placement(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.squares[rank][file] {
                    Some(piece) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(piece.symbol());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }
}

// Wire form: 8 rank arrays (rank 1 first) of 8 cells, each null or [piece_type, side]
impl FromWire for Board {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let ranks = value
            .as_array()
            .ok_or_else(|| DecodeError::invalid_type("board", "array of ranks"))?;
        if ranks.len() != 8 {
            return Err(DecodeError::invalid_value(
                "board",
                format!("expected 8 ranks, got {}", ranks.len()),
            ));
        }

        let mut board = Board::empty();
        for (rank_idx, rank) in ranks.iter().enumerate() {
            let cells = rank
                .as_array()
                .ok_or_else(|| DecodeError::invalid_type("board", "array of cells"))?;
            if cells.len() != 8 {
                return Err(DecodeError::invalid_value(
                    "board",
                    format!("rank {} has {} cells, expected 8", rank_idx + 1, cells.len()),
                ));
            }
            for (file_idx, cell) in cells.iter().enumerate() {
                if !cell.is_null() {
                    board.squares[rank_idx][file_idx] = Some(Piece::from_wire(cell)?);
                }
            }
        }
        Ok(board)
    }
}

impl ToWire for Board {
    fn to_wire(&self) -> Value {
        Value::Array(
            self.squares
                .iter()
                .map(|rank| {
                    Value::Array(
                        rank.iter()
                            .map(|cell| cell.map_or(Value::Null, |p| p.to_wire()))
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}
