//! Save-document schema migration.
//!
//! Older documents are upgraded one schema version at a time by a chain of
//! `Value → Value` steps:
//!
//! | version | upgrade ownership shape                        |
//! |---------|------------------------------------------------|
//! | 1       | `upgrades: { id: true/false }`                 |
//! | 2       | `unlockedSkills: [id, …]` (map may be absent)  |
//! | 3       | `upgrades: { id: rank }`                       |
//!
//! Legacy documents carry no version marker, so the source version is
//! inferred from the document's shape.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub const CURRENT_VERSION: u32 = 3;

pub const VERSION_KEY: &str = "saveVersion";
const UPGRADES_KEY: &str = "upgrades";
const UNLOCKED_KEY: &str = "unlockedSkills";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration from version {from} failed: {reason}")]
    MigrationFailed { from: u32, reason: String },
}

/// Upgrades a document from version `N` to `N + 1`.
pub type MigrationFn = fn(Value) -> Result<Value, MigrationError>;

pub struct MigrationRegistry {
    migrations: BTreeMap<u32, MigrationFn>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// The chain for every known legacy shape up to [`CURRENT_VERSION`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(1, flags_to_ranks);
        registry.register(2, unlocked_list_to_ranks);
        registry
    }

    pub fn register(&mut self, from_version: u32, migrate: MigrationFn) {
        self.migrations.insert(from_version, migrate);
    }

    pub fn can_migrate(&self, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from..to).all(|v| self.migrations.contains_key(&v))
    }

    pub fn migrate(&self, doc: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        if from > to {
            return Err(MigrationError::NoMigrationPath { from, to });
        }
        let mut current = doc;
        for version in from..to {
            let step = self
                .migrations
                .get(&version)
                .ok_or(MigrationError::NoMigrationPath { from, to })?;
            current = step(current)?;
        }
        Ok(current)
    }

    pub fn step_count(&self) -> usize {
        self.migrations.len()
    }
}

/// Schema version a document is written in, judged by its shape.
///
/// A declared `saveVersion` is only trusted when it is newer than anything
/// this build knows; callers load such documents best-effort.
pub fn detect_version(doc: &Value) -> u32 {
    let declared = doc.get(VERSION_KEY).and_then(Value::as_u64);
    if let Some(v) = declared.filter(|v| *v > CURRENT_VERSION as u64) {
        return u32::try_from(v).unwrap_or(u32::MAX);
    }
    let has_flags = doc
        .get(UPGRADES_KEY)
        .and_then(Value::as_object)
        .is_some_and(|m| m.values().any(Value::is_boolean));
    if has_flags {
        return 1;
    }
    let has_upgrades = doc.get(UPGRADES_KEY).is_some_and(Value::is_object);
    if !has_upgrades && doc.get(UNLOCKED_KEY).is_some_and(Value::is_array) {
        return 2;
    }
    CURRENT_VERSION
}

fn as_object(doc: Value, from: u32) -> Result<Map<String, Value>, MigrationError> {
    match doc {
        Value::Object(map) => Ok(map),
        other => Err(MigrationError::MigrationFailed {
            from,
            reason: format!("expected an object, found {}", kind(&other)),
        }),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// 1 → 2: boolean flags become ranks 1 / 0. Numeric entries are kept.
fn flags_to_ranks(doc: Value) -> Result<Value, MigrationError> {
    let mut map = as_object(doc, 1)?;
    if let Some(Value::Object(upgrades)) = map.get_mut(UPGRADES_KEY) {
        for value in upgrades.values_mut() {
            if let Value::Bool(owned) = *value {
                *value = Value::from(u32::from(owned));
            }
        }
    }
    Ok(Value::Object(map))
}

/// 2 → 3: without a rank map, every id in `unlockedSkills` becomes rank 1.
/// A document that already has a rank map keeps it as is. The list is
/// dropped either way.
fn unlocked_list_to_ranks(doc: Value) -> Result<Value, MigrationError> {
    let mut map = as_object(doc, 2)?;
    let unlocked = match map.remove(UNLOCKED_KEY) {
        Some(Value::Array(ids)) => ids,
        _ => Vec::new(),
    };
    if map.get(UPGRADES_KEY).is_some_and(Value::is_object) {
        return Ok(Value::Object(map));
    }
    let ranks: Map<String, Value> = unlocked
        .iter()
        .filter_map(Value::as_str)
        .map(|id| (id.to_string(), Value::from(1u32)))
        .collect();
    map.insert(UPGRADES_KEY.to_string(), Value::Object(ranks));
    Ok(Value::Object(map))
}
