//! Harvest Core -- the simulation engine for a sixteen-tier idle game.
//!
//! Peasants harvest wheat, mills train peasants, stables staff mills, and so
//! on up to multiverses. Every tier consumes the tier below it when bought
//! and produces it while running. Workers trickle in on wall-clock time, and
//! a skill tree multiplies per-tier speed, output and luck.
//!
//! # Frame pipeline
//!
//! A [`session::Session`] is pumped by the host with the current time. Each
//! frame:
//!
//! 1. **Produce** -- [`engine::ProductionEngine::tick`] advances every tier's
//!    fixed-point progress in chain order and pays out completed cycles.
//! 2. **Workers** -- [`engine::WorkerClock`] grants one worker per whole
//!    elapsed second.
//! 3. **Snapshot** -- [`engine::SnapshotThrottle`] hands the renderer a
//!    read-only copy at most every 100 ms.
//!
//! An interval timer writes the save slot every five seconds.
//!
//! # Key Types
//!
//! - [`number::BigNumber`] -- mantissa/exponent value reaching far past f64.
//! - [`format::NumberFormatter`] -- named, letter and scientific notation.
//! - [`catalog::GeneratorCatalog`] / [`skill::SkillCatalog`] -- static data.
//! - [`purchase::calculate_purchase`] -- three-constraint affordability.
//! - [`save`] / [`migration`] -- the JSON save document and legacy upgrades.
//! - [`schedule::Scheduler`] -- frame and timer callbacks with typed handles.
//! - [`narrative::Narrator`] -- seam for the flavor-text collaborator.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod fixed;
pub mod format;
pub mod migration;
pub mod multiplier;
pub mod narrative;
pub mod number;
pub mod purchase;
pub mod rng;
pub mod save;
pub mod schedule;
pub mod session;
pub mod skill;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
