//! Shared fixtures for unit tests, the integration-test crate and
//! `harvest-data` tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{GeneratorCatalog, Tier};
use crate::config::EngineConfig;
use crate::engine::ProductionEngine;
use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::narrative::{NarrativeError, NarrativeSnapshot, Narrator};
use crate::number::BigNumber;
use crate::save::{MemoryStore, SaveStore, StoreError};
use crate::session::Session;
use crate::skill::SkillCatalog;
use crate::state::GameState;

// ===========================================================================
// Numbers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

/// Parse a decimal literal such as `"1.5e42"`.
pub fn big(text: &str) -> BigNumber {
    match text.parse() {
        Ok(v) => v,
        Err(e) => panic!("bad test number {text:?}: {e}"),
    }
}

pub fn int(v: u64) -> BigNumber {
    BigNumber::from(v)
}

// ===========================================================================
// State and engines
// ===========================================================================

/// Fluent builder over [`GameState::new`].
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    state: GameState,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wheat(mut self, v: u64) -> Self {
        self.state.wheat = int(v);
        self
    }

    pub fn workers(mut self, v: u64) -> Self {
        self.state.workers = int(v);
        self
    }

    pub fn count(mut self, tier: Tier, v: u64) -> Self {
        *self.state.count_mut(tier) = int(v);
        self
    }

    pub fn rank(mut self, id: &str, rank: u32) -> Self {
        self.state.upgrades.insert(id.to_string(), rank);
        self
    }

    pub fn build(self) -> GameState {
        self.state
    }
}

pub fn standard_engine(config: &EngineConfig) -> ProductionEngine {
    ProductionEngine::new(GeneratorCatalog::standard(), SkillCatalog::standard(), config)
}

/// Config whose luck proc always fires when active.
pub fn always_lucky() -> EngineConfig {
    EngineConfig {
        luck_chance: 1.0,
        ..EngineConfig::default()
    }
}

pub fn memory_session() -> Session<MemoryStore> {
    match Session::new(MemoryStore::new(), EngineConfig::default()) {
        Ok(s) => s,
        Err(e) => panic!("default config rejected: {e}"),
    }
}

// ===========================================================================
// Collaborator doubles
// ===========================================================================

/// A [`MemoryStore`] that counts writes and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub writes: u32,
    pub fail_writes: bool,
}

impl SaveStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("quota exceeded".into()));
        }
        self.writes += 1;
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

/// Answers every request with the same result.
#[derive(Debug, Clone)]
pub struct FixedNarrator(pub Result<String, NarrativeError>);

impl FixedNarrator {
    pub fn says(text: &str) -> Self {
        Self(Ok(text.to_string()))
    }

    pub fn fails(error: NarrativeError) -> Self {
        Self(Err(error))
    }
}

impl Narrator for FixedNarrator {
    fn narrate(&self, _: &NarrativeSnapshot) -> Result<String, NarrativeError> {
        self.0.clone()
    }
}
