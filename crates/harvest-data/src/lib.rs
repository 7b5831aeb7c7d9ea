//! File-backed configuration and persistence for Harvest.
//!
//! [`loader`] reads settings and skill-tree files in RON, TOML or JSON;
//! [`store`] persists the save slot as files in a directory.

pub mod loader;
pub mod store;

pub use loader::{DataLoadError, GameContent, load_content, load_settings};
pub use store::FileStore;
