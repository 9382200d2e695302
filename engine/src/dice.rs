use std::{collections::VecDeque, fmt, str::FromStr};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
enum Source {
    Rng(ChaCha8Rng),
    Scripted { script: Vec<u32>, queue: VecDeque<u32> },
}

/// Dice source owned by a single battle session.
#[derive(Clone, Debug)]
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: Source::Rng(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random::<u64>())
    }

    /// Replays `script` in order, starting over once it runs out.
    pub fn from_scripted(script: Vec<u32>) -> Self {
        let queue = script.iter().copied().collect();
        Self {
            source: Source::Scripted { script, queue },
        }
    }

    fn die(&mut self, sides: u32) -> u32 {
        match &mut self.source {
            Source::Rng(rng) => rng.gen_range(1..=sides),
            Source::Scripted { script, queue } => {
                if queue.is_empty() {
                    queue.extend(script.iter().copied());
                }
                queue.pop_front().unwrap_or(1).clamp(1, sides)
            }
        }
    }

    /// Roll `count` independent dice with faces `1..=sides`.
    pub fn roll(&mut self, sides: u32, count: u32) -> DiceRoll {
        let sides = sides.max(1);
        let rolls: Vec<u32> = (0..count).map(|_| self.die(sides)).collect();
        let total = rolls.iter().fold(0u32, |acc, r| acc.saturating_add(*r));
        DiceRoll { sides, rolls, total }
    }

    pub fn roll_spec(&mut self, spec: DiceSpec) -> DiceRoll {
        self.roll(spec.sides, spec.count)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiceRoll {
    pub sides: u32,
    pub rolls: Vec<u32>,
    pub total: u32,
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{}d{} [{}] = {}",
            self.rolls.len(),
            self.sides,
            joined,
            self.total
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceSpecError {
    #[error("invalid dice spec (expected XdY), got: {0}")]
    Malformed(String),
    #[error("dice must be between 1d2 and 100d1000, got: {0}")]
    OutOfRange(String),
}

pub const MAX_DICE_COUNT: u32 = 100;
pub const MAX_DICE_SIDES: u32 = 1000;

/// A dice expression such as `4d6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
}

impl DiceSpec {
    pub const fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    pub fn is_within_limits(&self) -> bool {
        (1..=MAX_DICE_COUNT).contains(&self.count) && (2..=MAX_DICE_SIDES).contains(&self.sides)
    }
}

impl FromStr for DiceSpec {
    type Err = DiceSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (count, sides) = lowered
            .split_once('d')
            .ok_or_else(|| DiceSpecError::Malformed(s.to_string()))?;
        let count: u32 = count
            .parse()
            .map_err(|_| DiceSpecError::Malformed(s.to_string()))?;
        let sides: u32 = sides
            .parse()
            .map_err(|_| DiceSpecError::Malformed(s.to_string()))?;
        let spec = Self { count, sides };
        if !spec.is_within_limits() {
            return Err(DiceSpecError::OutOfRange(s.to_string()));
        }
        Ok(spec)
    }
}

impl TryFrom<String> for DiceSpec {
    type Error = DiceSpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceSpec> for String {
    fn from(spec: DiceSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// How each new session gets its dice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceMode {
    #[default]
    Entropy,
    /// Session `n` is seeded with `base + n`.
    Seeded(u64),
    /// Every session replays the same script from its start.
    Scripted(Vec<u32>),
}

impl DiceMode {
    pub fn dice_for_session(&self, n: u64) -> Dice {
        match self {
            DiceMode::Entropy => Dice::from_entropy(),
            DiceMode::Seeded(base) => Dice::from_seed(base.wrapping_add(n)),
            DiceMode::Scripted(script) => Dice::from_scripted(script.clone()),
        }
    }
}
