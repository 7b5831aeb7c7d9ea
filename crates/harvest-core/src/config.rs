//! Tunable engine and display settings.
//!
//! Both structs are `#[serde(default)]`, so a settings file only needs the
//! fields it changes. `harvest-data` loads them from RON, TOML or JSON.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Millis, f64_to_fixed64};
use crate::format::Notation;
use crate::schedule::FramePolicy;

/// When the luck roll happens for a tier that completed cycles this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckPolicy {
    /// One roll per tick; a success multiplies the whole tick's output.
    #[default]
    PerTick,
    /// One roll per completed cycle.
    PerCycle,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("luck_chance must be within [0, 1], got {0}")]
    LuckChanceOutOfRange(f64),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Probability of a luck proc, in [0, 1].
    pub luck_chance: f64,
    pub luck_policy: LuckPolicy,
    pub rng_seed: u64,
    /// Workers granted per elapsed worker interval.
    pub worker_rate: u64,
    pub worker_interval_ms: Millis,
    pub snapshot_interval_ms: Millis,
    pub autosave_interval_ms: Millis,
    pub frame_policy: FramePolicy,
    /// Budget for one narrative request.
    pub narrative_timeout_ms: Millis,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            luck_chance: 0.10,
            luck_policy: LuckPolicy::PerTick,
            rng_seed: 0x5EED_0F_C0FFEE,
            worker_rate: 1,
            worker_interval_ms: 1000,
            snapshot_interval_ms: 100,
            autosave_interval_ms: 5000,
            frame_policy: FramePolicy::default(),
            narrative_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.luck_chance) {
            return Err(ConfigError::LuckChanceOutOfRange(self.luck_chance));
        }
        let intervals = [
            ("worker_interval_ms", self.worker_interval_ms),
            ("snapshot_interval_ms", self.snapshot_interval_ms),
            ("autosave_interval_ms", self.autosave_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        if let FramePolicy::VSync { interval_ms: 0 } = self.frame_policy {
            return Err(ConfigError::ZeroInterval("frame_policy.interval_ms"));
        }
        Ok(())
    }

    /// Luck chance as fixed-point, clamped to [0, 1].
    pub fn luck_probability(&self) -> Fixed64 {
        f64_to_fixed64(self.luck_chance.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub notation: Notation,
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            notation: Notation::Named,
            thousands_separator: '.',
            decimal_separator: '.',
        }
    }
}

/// Everything a settings file may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub format: FormatConfig,
}
