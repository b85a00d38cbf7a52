//! Review grades.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// User-supplied recall quality for one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// Not recalled; the card resurfaces immediately.
    Again,
    /// Recalled with serious difficulty.
    Hard,
    /// Recalled correctly.
    Good,
    /// Recalled effortlessly.
    Easy,
}

impl Grade {
    /// All grades, weakest first.
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// Map the 1-4 keypad convention used by the study prompt.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            other => Err(CardError::validation(format!(
                "unknown grade '{}': expected again, hard, good or easy",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("again".parse::<Grade>().unwrap(), Grade::Again);
        assert_eq!("HARD".parse::<Grade>().unwrap(), Grade::Hard);
        assert_eq!(" Good ".parse::<Grade>().unwrap(), Grade::Good);
        assert_eq!("easy".parse::<Grade>().unwrap(), Grade::Easy);
    }

    #[test]
    fn test_parse_unknown_is_validation_error() {
        let err = "perfect".parse::<Grade>().unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("perfect"));
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for grade in Grade::ALL {
            assert_eq!(grade.to_string().parse::<Grade>().unwrap(), grade);
        }
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Grade::from_key(1), Some(Grade::Again));
        assert_eq!(Grade::from_key(4), Some(Grade::Easy));
        assert_eq!(Grade::from_key(0), None);
        assert_eq!(Grade::from_key(5), None);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Grade::Hard).unwrap(), "\"hard\"");
        let grade: Grade = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(grade, Grade::Easy);
    }
}
