use crate::messages::wire::DecodeError;
use std::fmt;
use std::str::FromStr;

/// A board square as (rank, file), both zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    pub rank: u8, // 0-7 corresponding to 1-8
    pub file: u8, // 0-7 corresponding to a-h
}

impl Square {
    pub fn new(rank: u8, file: u8) -> Result<Self, DecodeError> {
        if rank > 7 {
            return Err(DecodeError::invalid_value(
                "rank",
                format!("rank must be 0-7, got {}", rank),
            ));
        }
        if file > 7 {
            return Err(DecodeError::invalid_value(
                "file",
                format!("file must be 0-7, got {}", file),
            ));
        }
        Ok(Self { rank, file })
    }

    /// Build a square from wire integers, which may be any JSON number
    pub fn from_wire_parts(rank: i64, file: i64) -> Result<Self, DecodeError> {
        let rank = u8::try_from(rank)
            .map_err(|_| DecodeError::invalid_value("rank", format!("rank must be 0-7, got {}", rank)))?;
        let file = u8::try_from(file)
            .map_err(|_| DecodeError::invalid_value("file", format!("file must be 0-7, got {}", file)))?;
        Self::new(rank, file)
    }

    pub fn from_chars(file: char, rank: char) -> Result<Self, DecodeError> {
        let file_lower = file.to_ascii_lowercase();
        if !('a'..='h').contains(&file_lower) {
            return Err(DecodeError::invalid_value(
                "square",
                format!("invalid file '{}', must be a-h", file),
            ));
        }
        if !('1'..='8').contains(&rank) {
            return Err(DecodeError::invalid_value(
                "square",
                format!("invalid rank '{}', must be 1-8", rank),
            ));
        }
        Ok(Self {
            rank: rank as u8 - b'1',
            file: file_lower as u8 - b'a',
        })
    }

    pub fn file_char(&self) -> char {
        (self.file + b'a') as char
    }

    pub fn rank_char(&self) -> char {
        (self.rank + b'1') as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => Self::from_chars(file, rank),
            _ => Err(DecodeError::invalid_value(
                "square",
                format!("expected two characters like 'e4', got '{}'", s),
            )),
        }
    }
}
