use super::position::Square;
use crate::messages::wire::{
    field, get_i64, object, opt_field, DecodeError, FromWire, ToWire,
};
use crate::models::{Conclusion, PieceType};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// A move from one square to another, with an optional promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub start: Square,
    pub end: Square,
    pub promotion: Option<PieceType>,
}

impl Move {
    pub const fn new(start: Square, end: Square, promotion: Option<PieceType>) -> Self {
        Self {
            start,
            end,
            promotion,
        }
    }

    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }
}

impl FromWire for Move {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, "move")?;
        let start = Square::from_wire_parts(get_i64(obj, "start_rank")?, get_i64(obj, "start_file")?)?;
        let end = Square::from_wire_parts(get_i64(obj, "end_rank")?, get_i64(obj, "end_file")?)?;
        let promotion = opt_field(obj, "promotion")
            .map(PieceType::from_wire)
            .transpose()?;
        Ok(Self {
            start,
            end,
            promotion,
        })
    }
}

impl ToWire for Move {
    fn to_wire(&self) -> Value {
        json!({
            "start_rank": self.start.rank,
            "start_file": self.start.file,
            "end_rank": self.end.rank,
            "end_file": self.end.file,
            "promotion": self.promotion.map(|p| p.to_wire_int()),
        })
    }
}

// Coordinate notation, e.g. e2e4 or e7e8q
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start, self.end)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.symbol().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_ascii() || !(s.len() == 4 || s.len() == 5) {
            return Err(DecodeError::invalid_value(
                "move",
                format!("invalid move format '{}', expected 'e2e4' or 'e7e8q'", s),
            ));
        }

        let start = s[0..2].parse::<Square>()?;
        let end = s[2..4].parse::<Square>()?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => match PieceType::from_symbol(c) {
                Some(PieceType::King | PieceType::Pawn) | None => {
                    return Err(DecodeError::invalid_value(
                        "move",
                        format!("'{}' is not a promotion piece", c),
                    ))
                }
                promotion => promotion,
            },
        };

        Ok(Self::new(start, end, promotion))
    }
}

/// Legal moves for the side to move, plus any draw it can currently claim
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowedMoves {
    pub moves: Vec<Move>,
    pub draw_claim: Option<Conclusion>,
}

impl AllowedMoves {
    pub fn contains(&self, mv: &Move) -> bool {
        self.moves.contains(mv)
    }

    /// Moves starting on `square`, in server order
    pub fn from_square(&self, square: Square) -> impl Iterator<Item = &Move> {
        self.moves.iter().filter(move |m| m.start == square)
    }
}

impl FromWire for AllowedMoves {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, "allowed moves")?;
        let moves = field(obj, "moves")?
            .as_array()
            .ok_or_else(|| DecodeError::invalid_type("moves", "array"))?
            .iter()
            .map(Move::from_wire)
            .collect::<Result<Vec<_>, _>>()?;
        let draw_claim = opt_field(obj, "draw_claim")
            .map(Conclusion::from_wire)
            .transpose()?;
        Ok(Self { moves, draw_claim })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_wire_round_trip() {
        let moves = [
            "e2e4".parse::<Move>().unwrap(),
            "a7a8q".parse::<Move>().unwrap(),
            "h2h1n".parse::<Move>().unwrap(),
        ];
        for mv in moves {
            assert_eq!(Move::from_wire(&mv.to_wire()).unwrap(), mv);
        }
    }

    #[test]
    fn test_move_decodes_null_promotion() {
        let mv = Move::from_wire(&json!({
            "start_rank": 1, "start_file": 4, "end_rank": 3, "end_file": 4, "promotion": null
        }))
        .unwrap();
        assert_eq!(mv.to_string(), "e2e4");
        assert!(!mv.is_promotion());
    }

    #[test]
    fn test_move_rejects_bad_promotion() {
        assert!("e7e8k".parse::<Move>().is_err());
        assert!("e7e8x".parse::<Move>().is_err());
        assert!(Move::from_wire(&json!({
            "start_rank": 6, "start_file": 4, "end_rank": 7, "end_file": 4, "promotion": 9
        }))
        .is_err());
    }

    #[test]
    fn test_allowed_moves_with_draw_claim() {
        let allowed = AllowedMoves::from_wire(&json!({
            "moves": [
                {"start_rank": 1, "start_file": 4, "end_rank": 3, "end_file": 4, "promotion": null},
                {"start_rank": 1, "start_file": 4, "end_rank": 2, "end_file": 4}
            ],
            "draw_claim": 6
        }))
        .unwrap();
        assert_eq!(allowed.moves.len(), 2);
        assert_eq!(allowed.draw_claim, Some(Conclusion::ThreefoldRepetition));
        let e2: Square = "e2".parse().unwrap();
        assert_eq!(allowed.from_square(e2).count(), 2);
    }
}
