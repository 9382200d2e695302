use std::fmt;

use serde::Serialize;

/// Result of comparing two final HP values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    WinnerA,
    WinnerB,
    Draw,
}

/// Tie-break table shared by every end-of-battle path.
///
/// One side still standing wins outright; otherwise the higher value wins
/// (for two non-positive values that is the one closer to zero) and equal
/// values draw.
pub fn resolve(hp_a: i32, hp_b: i32) -> Outcome {
    match (hp_a > 0, hp_b > 0) {
        (true, false) => Outcome::WinnerA,
        (false, true) => Outcome::WinnerB,
        (true, true) | (false, false) => {
            if hp_a > hp_b {
                Outcome::WinnerA
            } else if hp_b > hp_a {
                Outcome::WinnerB
            } else {
                Outcome::Draw
            }
        }
    }
}

impl Outcome {
    pub fn into_verdict(self, name_a: &str, name_b: &str) -> Verdict {
        match self {
            Outcome::WinnerA => Verdict::Winner(name_a.to_string()),
            Outcome::WinnerB => Verdict::Winner(name_b.to_string()),
            Outcome::Draw => Verdict::Draw,
        }
    }
}

/// Named form of [`Outcome`] announced to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Winner(String),
    Draw,
}

impl Verdict {
    pub fn winner(&self) -> Option<&str> {
        match self {
            Verdict::Winner(name) => Some(name),
            Verdict::Draw => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Winner(name) => write!(f, "{} wins", name),
            Verdict::Draw => f.write_str("draw"),
        }
    }
}
