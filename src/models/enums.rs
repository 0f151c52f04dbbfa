//! Closed enumerations shared with the server.
//!
//! Every enum is a fixed two-way table between a symbol and a small wire
//! integer. Decoding an integer outside the table is an error, never a guess.

use crate::messages::wire::{DecodeError, FromWire, ToWire};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($kind:literal) {
            $($variant:ident = $value:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn to_wire_int(self) -> i64 {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn from_wire_int(value: i64) -> Result<Self, DecodeError> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(DecodeError::UnknownVariant { kind: $kind, value }),
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromWire for $name {
            fn from_wire(value: &Value) -> Result<Self, DecodeError> {
                let raw = value
                    .as_i64()
                    .ok_or_else(|| DecodeError::invalid_type($kind, "integer"))?;
                Self::from_wire_int(raw)
            }
        }

        impl ToWire for $name {
            fn to_wire(&self) -> Value {
                Value::from(self.to_wire_int())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| DecodeError::invalid_value($kind, format!("unknown name '{}'", s)))
            }
        }
    };
}

wire_enum! {
    /// Game rules variant
    pub enum GameMode ("game mode") {
        Chess = 1 => "chess",
    }
}

wire_enum! {
    /// Winner of a game; `GameNotComplete` until it ends
    pub enum Winner ("winner") {
        GameNotComplete = 1 => "game_not_complete",
        Home = 2 => "home",
        Away = 3 => "away",
        Draw = 4 => "draw",
    }
}

wire_enum! {
    /// How a game ended; `GameNotComplete` until it ends
    pub enum Conclusion ("conclusion") {
        GameNotComplete = 1 => "game_not_complete",
        Checkmate = 2 => "checkmate",
        Resign = 3 => "resign",
        Time = 4 => "time",
        Stalemate = 5 => "stalemate",
        ThreefoldRepetition = 6 => "threefold_repetition",
        FiftyMoveRule = 7 => "fifty_move_rule",
        AgreedDraw = 8 => "agreed_draw",
    }
}

wire_enum! {
    pub enum PieceType ("piece type") {
        King = 1 => "king",
        Queen = 2 => "queen",
        Rook = 3 => "rook",
        Bishop = 4 => "bishop",
        Knight = 5 => "knight",
        Pawn = 6 => "pawn",
    }
}

wire_enum! {
    /// Which participant a piece or turn belongs to; home moves first
    pub enum Side ("side") {
        Home = 1 => "home",
        Away = 2 => "away",
    }
}

wire_enum! {
    /// Reason the server gives when it closes a game connection
    pub enum DisconnectReason ("disconnect reason") {
        InviteDeclined = 1 => "invite_declined",
        NewConnection = 2 => "new_connection",
        GameOver = 3 => "game_over",
    }
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    /// Side to move on a given turn number
    pub fn for_turn(turn_number: u32) -> Side {
        if turn_number % 2 == 0 {
            Side::Home
        } else {
            Side::Away
        }
    }
}

impl PieceType {
    /// Single-letter symbol, upper case
    pub fn symbol(&self) -> char {
        match self {
            PieceType::King => 'K',
            PieceType::Queen => 'Q',
            PieceType::Rook => 'R',
            PieceType::Bishop => 'B',
            PieceType::Knight => 'N',
            PieceType::Pawn => 'P',
        }
    }

    pub fn from_symbol(c: char) -> Option<PieceType> {
        match c.to_ascii_uppercase() {
            'K' => Some(PieceType::King),
            'Q' => Some(PieceType::Queen),
            'R' => Some(PieceType::Rook),
            'B' => Some(PieceType::Bishop),
            'N' => Some(PieceType::Knight),
            'P' => Some(PieceType::Pawn),
            _ => None,
        }
    }
}

impl Conclusion {
    /// Conclusions a player can claim rather than have imposed
    pub fn is_claimable_draw(&self) -> bool {
        matches!(
            self,
            Conclusion::ThreefoldRepetition | Conclusion::FiftyMoveRule
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_variant_maps_both_ways() {
        for conclusion in Conclusion::ALL {
            let wire = conclusion.to_wire();
            assert_eq!(Conclusion::from_wire(&wire).unwrap(), *conclusion);
        }
        for piece in PieceType::ALL {
            assert_eq!(PieceType::from_wire_int(piece.to_wire_int()).unwrap(), *piece);
        }
    }

    #[test]
    fn test_unknown_integers_are_rejected() {
        for value in [0, 5, -1, 99] {
            assert!(matches!(
                Winner::from_wire_int(value),
                Err(DecodeError::UnknownVariant { kind: "winner", .. })
            ));
        }
        assert!(Side::from_wire(&json!(3)).is_err());
        assert!(DisconnectReason::from_wire(&json!(0)).is_err());
        assert!(GameMode::from_wire(&json!(2)).is_err());
    }

    #[test]
    fn test_non_integer_wire_value_rejected() {
        assert!(matches!(
            PieceType::from_wire(&json!("queen")),
            Err(DecodeError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("fifty-move-rule".parse::<Conclusion>().unwrap(), Conclusion::FiftyMoveRule);
        assert_eq!("Home".parse::<Side>().unwrap(), Side::Home);
        assert!("castle".parse::<Conclusion>().is_err());
    }

    #[test]
    fn test_turn_parity() {
        assert_eq!(Side::for_turn(0), Side::Home);
        assert_eq!(Side::for_turn(7), Side::Away);
        assert_eq!(Side::Home.opposite(), Side::Away);
    }
}
