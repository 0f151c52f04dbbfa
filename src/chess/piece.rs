use crate::messages::wire::{DecodeError, FromWire, ToWire};
use crate::models::{PieceType, Side};
use serde_json::Value;
use std::fmt;

/// A piece on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub piece_type: PieceType,
    pub side: Side,
}

impl Piece {
    pub fn new(piece_type: PieceType, side: Side) -> Self {
        Self { piece_type, side }
    }

    /// Upper case for home, lower case for away
    pub fn symbol(&self) -> char {
        let symbol = self.piece_type.symbol();
        match self.side {
            Side::Home => symbol,
            Side::Away => symbol.to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// Wire form: [piece_type, side]
impl FromWire for Piece {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let pair = value
            .as_array()
            .ok_or_else(|| DecodeError::invalid_type("piece", "[piece_type, side] array"))?;
        if pair.len() != 2 {
            return Err(DecodeError::invalid_value(
                "piece",
                format!("expected 2 elements, got {}", pair.len()),
            ));
        }
        Ok(Self {
            piece_type: PieceType::from_wire(&pair[0])?,
            side: Side::from_wire(&pair[1])?,
        })
    }
}

impl ToWire for Piece {
    fn to_wire(&self) -> Value {
        Value::Array(vec![self.piece_type.to_wire(), self.side.to_wire()])
    }
}
