//! Reads data files: format detection, file discovery, and typed loading of
//! settings and skill trees.

use std::path::{Path, PathBuf};

use harvest_core::config::{ConfigError, Settings};
use harvest_core::skill::{ROOT_NODE, SkillCatalog, SkillNode, SkillTreeError, standard_nodes};
use serde::de::DeserializeOwned;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("invalid settings in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("invalid skill tree in {file}: {source}")]
    InvalidSkillTree {
        file: PathBuf,
        #[source]
        source: SkillTreeError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists and `ConflictingFormats` if more than
/// one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML has no top-level arrays, so there the list is
/// read from the array under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
        Format::Ron | Format::Json => deserialize_file(path),
    }
}

// ===========================================================================
// Typed loading
// ===========================================================================

/// Load and validate a settings file. Omitted fields take their defaults.
pub fn load_settings(path: &Path) -> Result<Settings, DataLoadError> {
    let settings: Settings = deserialize_file(path)?;
    settings
        .engine
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig {
            file: path.to_path_buf(),
            source,
        })?;
    log::info!("loaded settings from {}", path.display());
    Ok(settings)
}

/// Load a skill tree rooted at [`ROOT_NODE`].
pub fn load_skill_tree(path: &Path) -> Result<SkillCatalog, DataLoadError> {
    let nodes: Vec<SkillNode> = deserialize_list(path, "skills")?;
    let count = nodes.len();
    let catalog =
        SkillCatalog::new(nodes, ROOT_NODE).map_err(|source| DataLoadError::InvalidSkillTree {
            file: path.to_path_buf(),
            source,
        })?;
    log::info!("loaded {count} skill nodes from {}", path.display());
    Ok(catalog)
}

/// Everything a data directory can override.
#[derive(Debug, Clone)]
pub struct GameContent {
    pub settings: Settings,
    pub skills: SkillCatalog,
}

/// Read `settings.*` and `skills.*` from `dir`. Either file may be absent,
/// in which case the built-in defaults are used.
pub fn load_content(dir: &Path) -> Result<GameContent, DataLoadError> {
    let settings = match find_data_file(dir, "settings")? {
        Some(path) => load_settings(&path)?,
        None => Settings::default(),
    };
    let skills = match find_data_file(dir, "skills")? {
        Some(path) => load_skill_tree(&path)?,
        None => SkillCatalog::new(standard_nodes(), ROOT_NODE).map_err(|source| {
            DataLoadError::InvalidSkillTree {
                file: dir.to_path_buf(),
                source,
            }
        })?,
    };
    Ok(GameContent { settings, skills })
}

// ===========================================================================
// Tests
// ===========================================================================
