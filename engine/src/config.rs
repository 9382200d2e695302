use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::dice::{DiceMode, DiceSpec};
use crate::gauge::{DEFAULT_BAR_WIDTH, DEFAULT_MAX_HP};
use crate::ledger::LedgerLayout;
use crate::session::BattleRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    pub starting_hp: i32,
    pub attack_dice: DiceSpec,
    pub defense_dice: DiceSpec,
    pub bar_width: usize,
    pub dice: DiceMode,
    pub ledger: LedgerLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let rules = BattleRules::default();
        Self {
            starting_hp: DEFAULT_MAX_HP,
            attack_dice: rules.attack_dice,
            defense_dice: rules.defense_dice,
            bar_width: DEFAULT_BAR_WIDTH,
            dice: DiceMode::default(),
            ledger: LedgerLayout::default(),
        }
    }
}

impl EngineConfig {
    /// Load from YAML (`.yaml`/`.yml`) or JSON, chosen by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.starting_hp <= 0 {
            bail!("starting_hp must be positive, got {}", self.starting_hp);
        }
        if self.bar_width == 0 {
            bail!("bar_width must be at least 1");
        }
        for (field, spec) in [("attack_dice", self.attack_dice), ("defense_dice", self.defense_dice)] {
            if !spec.is_within_limits() {
                bail!("{} must be between 1d2 and 100d1000, got {}", field, spec);
            }
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.dice = DiceMode::Seeded(seed);
        self
    }

    pub fn rules(&self) -> BattleRules {
        BattleRules {
            starting_hp: self.starting_hp,
            attack_dice: self.attack_dice,
            defense_dice: self.defense_dice,
        }
    }
}
