//! Persisted game state: the JSON document, its loader, and storage.
//!
//! Loading never fails. Unparsable documents fall back to a fresh game and
//! every malformed field falls back to its initial value, each with a
//! warning. Legacy shapes are upgraded through
//! [`MigrationRegistry::standard`] before fields are read.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::catalog::Tier;
use crate::migration::{CURRENT_VERSION, MigrationRegistry, VERSION_KEY, detect_version};
use crate::number::BigNumber;
use crate::skill::SkillCatalog;
use crate::state::{GameState, Ranks};

/// Storage key for the single save slot.
pub const SAVE_KEY: &str = "reino_trigo_save_v2";

const WHEAT_KEY: &str = "wheat";
const WORKERS_KEY: &str = "workers";
const TOTAL_WORKERS_KEY: &str = "totalWorkersGenerated";
const UPGRADES_KEY: &str = "upgrades";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// String key-value persistence.
pub trait SaveStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document <-> state
// ---------------------------------------------------------------------------

/// Serialize to the current document shape.
pub fn save(state: &GameState) -> String {
    let mut doc = Map::new();
    let mut put = |key: &str, v: &BigNumber| {
        doc.insert(key.to_string(), Value::String(v.to_string()));
    };
    put(WHEAT_KEY, &state.wheat);
    put(WORKERS_KEY, &state.workers);
    put(TOTAL_WORKERS_KEY, &state.total_workers_generated);
    for tier in Tier::ALL {
        put(tier.count_key(), state.count(tier));
        put(tier.lifetime_key(), state.lifetime(tier));
    }
    let ranks: Map<String, Value> = state
        .upgrades
        .iter()
        .map(|(id, rank)| (id.clone(), Value::from(*rank)))
        .collect();
    doc.insert(UPGRADES_KEY.to_string(), Value::Object(ranks));
    doc.insert(VERSION_KEY.to_string(), Value::from(CURRENT_VERSION));
    Value::Object(doc).to_string()
}

/// Parse a document of any known shape.
pub fn load(raw: &str, skills: &SkillCatalog) -> GameState {
    match serde_json::from_str::<Value>(raw) {
        Ok(doc) => hydrate(doc, skills),
        Err(e) => {
            log::warn!("save document is not valid JSON ({e}); starting fresh");
            GameState::new()
        }
    }
}

/// Migrate a parsed document and read it into a [`GameState`].
pub fn hydrate(doc: Value, skills: &SkillCatalog) -> GameState {
    if !doc.is_object() {
        log::warn!("save document is not an object; starting fresh");
        return GameState::new();
    }
    let version = detect_version(&doc);
    let doc = if version > CURRENT_VERSION {
        log::warn!("save version {version} is newer than {CURRENT_VERSION}; loading best-effort");
        doc
    } else {
        match MigrationRegistry::standard().migrate(doc, version, CURRENT_VERSION) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("save migration failed ({e}); starting fresh");
                return GameState::new();
            }
        }
    };

    let initial = GameState::new();
    let mut state = GameState::new();
    state.wheat = read_number(&doc, WHEAT_KEY, initial.wheat);
    state.workers = read_number(&doc, WORKERS_KEY, initial.workers);
    state.total_workers_generated =
        read_number(&doc, TOTAL_WORKERS_KEY, initial.total_workers_generated);
    for tier in Tier::ALL {
        *state.count_mut(tier) = read_number(&doc, tier.count_key(), *initial.count(tier));
        *state.lifetime_mut(tier) = read_number(&doc, tier.lifetime_key(), *initial.lifetime(tier));
    }
    state.upgrades = read_ranks(&doc, skills);
    log::info!("loaded save (schema v{version}, {} upgrades)", state.upgrades.len());
    state
}

fn read_number(doc: &Value, key: &str, default: BigNumber) -> BigNumber {
    let parsed = match doc.get(key) {
        None | Some(Value::Null) => return default,
        Some(Value::String(s)) => s.parse::<BigNumber>().ok(),
        Some(Value::Number(n)) => n.as_f64().and_then(|f| BigNumber::from_f64(f).ok()),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_negative() => {
            log::warn!("save field {key} is negative; clamping to 0");
            BigNumber::ZERO
        }
        Some(v) => v,
        None => {
            log::warn!("save field {key} is malformed; using default");
            default
        }
    }
}

fn read_ranks(doc: &Value, skills: &SkillCatalog) -> Ranks {
    let Some(entries) = doc.get(UPGRADES_KEY).and_then(Value::as_object) else {
        return Ranks::new();
    };
    let mut ranks = Ranks::new();
    for (id, value) in entries {
        let raw = match value {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(raw) = raw.filter(|r| r.is_finite()) else {
            log::warn!("upgrade {id} has malformed rank; dropping");
            continue;
        };
        let floored = raw.floor().clamp(0.0, u32::MAX as f64) as u32;
        let rank = skills.clamp_rank(id, floored);
        if rank != floored {
            log::warn!("upgrade {id} rank {floored} exceeds max; clamped to {rank}");
        }
        ranks.insert(id.clone(), rank);
    }
    ranks
}

/// Read the save slot. Missing or unreadable storage yields a fresh game.
pub fn load_from_store(store: &dyn SaveStore, skills: &SkillCatalog) -> GameState {
    match store.get(SAVE_KEY) {
        Ok(Some(raw)) => load(&raw, skills),
        Ok(None) => GameState::new(),
        Err(e) => {
            log::warn!("could not read save slot: {e}");
            GameState::new()
        }
    }
}

pub fn save_to_store(store: &mut dyn SaveStore, state: &GameState) -> Result<(), StoreError> {
    store.set(SAVE_KEY, &save(state))?;
    log::debug!("saved game");
    Ok(())
}
