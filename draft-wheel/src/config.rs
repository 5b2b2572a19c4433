// Configuration loading and parsing (draft.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::draft::team::CAPTAIN_MARKER;

/// Characters with meaning in the `role(priority)|...` list format.
const ROLE_GRAMMAR_CHARS: [char; 3] = ['|', '(', ')'];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub data_paths: DataPaths,
}

/// Tuning for the draft lottery. Loaded once and immutable for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Rating every finished team should average.
    pub global_average_rating: f64,
    /// Number of roster entries in a finished team.
    pub team_size: usize,
    /// Draftable roles, in display order.
    pub roles: Vec<String>,
    /// Teams registered automatically on startup and after every load.
    pub default_teams: Vec<String>,
    /// Priority (1 = most preferred) -> preference weight in [0, 1].
    pub role_preference_weights: BTreeMap<u32, f64>,
    pub logistic_midpoint: f64,
    pub logistic_slope: f64,
    /// 1.0 multiplies rating weight and preference; anything lower blends them linearly.
    pub blend_alpha: f64,
    /// Current roster size -> base randomness in [0, 1).
    pub randomness_by_team_fill: BTreeMap<usize, f64>,
    /// Base randomness used when the roster size has no table entry.
    pub default_randomness: f64,
}

impl EngineConfig {
    /// Preference weight for a role priority. Priorities missing from the
    /// table weigh 0, which excludes the candidate.
    pub fn preference_weight(&self, priority: u32) -> f64 {
        self.role_preference_weights
            .get(&priority)
            .copied()
            .unwrap_or(0.0)
    }

    /// Randomness floor applied to a team that currently holds `team_len` players.
    pub fn base_randomness(&self, team_len: usize) -> f64 {
        self.randomness_by_team_fill
            .get(&team_len)
            .copied()
            .unwrap_or(self.default_randomness)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check every field eagerly so bad tuning fails at construction, never
    /// in the middle of a draft.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.global_average_rating.is_finite() || self.global_average_rating <= 0.0 {
            return Err(ConfigError::invalid(
                "draft.global_average_rating",
                format!("must be a finite number > 0, got {}", self.global_average_rating),
            ));
        }

        if self.team_size == 0 {
            return Err(ConfigError::invalid("draft.team_size", "must be greater than 0"));
        }

        if self.roles.is_empty() {
            return Err(ConfigError::invalid("draft.roles", "at least one role is required"));
        }
        let mut seen = HashSet::new();
        for role in &self.roles {
            if role.trim().is_empty() {
                return Err(ConfigError::invalid("draft.roles", "role names must not be empty"));
            }
            if role.eq_ignore_ascii_case(CAPTAIN_MARKER) {
                return Err(ConfigError::invalid(
                    "draft.roles",
                    format!("`{CAPTAIN_MARKER}` is reserved for captains"),
                ));
            }
            if role.trim() != role || role.contains(ROLE_GRAMMAR_CHARS) {
                return Err(ConfigError::invalid(
                    "draft.roles",
                    format!("role `{role}` must not contain `|`, `(`, `)` or surrounding spaces"),
                ));
            }
            if !seen.insert(role.as_str()) {
                return Err(ConfigError::invalid(
                    "draft.roles",
                    format!("duplicate role `{role}`"),
                ));
            }
        }

        if self.role_preference_weights.is_empty() {
            return Err(ConfigError::invalid(
                "role_preference_weights",
                "at least one priority weight is required",
            ));
        }
        for (&priority, &weight) in &self.role_preference_weights {
            if priority == 0 {
                return Err(ConfigError::invalid(
                    "role_preference_weights",
                    "priorities start at 1",
                ));
            }
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::invalid(
                    format!("role_preference_weights.{priority}"),
                    format!("must be between 0.0 and 1.0 inclusive, got {weight}"),
                ));
            }
        }

        if !self.logistic_midpoint.is_finite() {
            return Err(ConfigError::invalid("logistic.midpoint", "must be finite"));
        }
        if !self.logistic_slope.is_finite() {
            return Err(ConfigError::invalid("logistic.slope", "must be finite"));
        }
        if !(0.0..=1.0).contains(&self.blend_alpha) {
            return Err(ConfigError::invalid(
                "logistic.blend_alpha",
                format!("must be between 0.0 and 1.0 inclusive, got {}", self.blend_alpha),
            ));
        }

        if !(0.0..1.0).contains(&self.default_randomness) {
            return Err(ConfigError::invalid(
                "randomness.default",
                format!("must be in [0.0, 1.0), got {}", self.default_randomness),
            ));
        }
        for (&fill, &value) in &self.randomness_by_team_fill {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    format!("randomness.by_team_fill.{fill}"),
                    format!("must be in [0.0, 1.0), got {value}"),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    /// Initial player pool.
    pub players: String,
    /// Saved remaining-pool file.
    pub remaining: String,
    /// Saved team-assignment file.
    pub teams: String,
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    draft: DraftSection,
    /// TOML keys are strings; they are parsed into priorities after loading.
    role_preference_weights: BTreeMap<String, f64>,
    logistic: LogisticSection,
    randomness: RandomnessSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftSection {
    global_average_rating: f64,
    team_size: usize,
    roles: Vec<String>,
    #[serde(default)]
    default_teams: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LogisticSection {
    midpoint: f64,
    slope: f64,
    blend_alpha: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct RandomnessSection {
    default: f64,
    #[serde(default)]
    by_team_fill: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` relative to the
/// given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draft.toml");
    let text = read_file(&path)?;
    parse_config(&text).map_err(|e| match e {
        ConfigError::ParseError { source, .. } => ConfigError::ParseError { path, source },
        other => other,
    })
}

/// Parse and validate the contents of a draft.toml file.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let file: DraftFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: PathBuf::from("draft.toml"),
        source: e,
    })?;

    let role_preference_weights = parse_keys(file.role_preference_weights, "role_preference_weights")?;
    let randomness_by_team_fill = parse_keys(file.randomness.by_team_fill, "randomness.by_team_fill")?;

    let engine = EngineConfig {
        global_average_rating: file.draft.global_average_rating,
        team_size: file.draft.team_size,
        roles: file.draft.roles,
        default_teams: file.draft.default_teams,
        role_preference_weights,
        logistic_midpoint: file.logistic.midpoint,
        logistic_slope: file.logistic.slope,
        blend_alpha: file.logistic.blend_alpha,
        randomness_by_team_fill,
        default_randomness: file.randomness.default,
    };
    engine.validate()?;

    Ok(Config {
        engine,
        data_paths: file.data_paths,
    })
}

/// Copy every file in `defaults/` that is missing from `config/`.
///
/// Existing config files are never overwritten and `.example` templates are
/// skipped. Returns the paths that were created. A base dir with `config/`
/// but no `defaults/` is fine; one with neither is an error.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(copy_error(format!(
                "neither defaults/ nor config/ directory found in {}; \
                 run from the project root or ensure defaults/ is present",
                base_dir.display()
            )))
        };
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("failed to create {}: {e}", config_dir.display())))?;

    let mut copied = Vec::new();
    for source in default_files(&defaults_dir)? {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if copy_if_missing(&source, &target)? {
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Regular files in `defaults_dir`, minus `.example` templates, in name order.
fn default_files(defaults_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(defaults_dir)
        .map_err(|e| copy_error(format!("failed to read {}: {e}", defaults_dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| copy_error(format!("failed to read defaults entry: {e}")))?
            .path();
        let is_template = path.extension().is_some_and(|ext| ext == "example");
        if path.is_file() && !is_template {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy `source` to `target` unless `target` already exists. Creation uses
/// `create_new`, so a file that appears concurrently is left alone.
fn copy_if_missing(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("failed to create {}: {e}", target.display()))),
    };
    let mut src = std::fs::File::open(source)
        .map_err(|e| copy_error(format!("failed to read {}: {e}", source.display())))?;
    std::io::copy(&mut src, &mut dest)
        .map_err(|e| copy_error(format!("failed to write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir()
        .map_err(|e| copy_error(format!("cannot determine working directory: {e}")))?;
    let copied = ensure_config_files(&cwd)?;
    for path in &copied {
        info!("Created {} from defaults", path.display());
    }
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_keys<K: std::str::FromStr + Ord>(
    raw: BTreeMap<String, f64>,
    section: &str,
) -> Result<BTreeMap<K, f64>, ConfigError> {
    raw.into_iter()
        .map(|(key, value)| {
            key.trim()
                .parse::<K>()
                .map(|k| (k, value))
                .map_err(|_| {
                    ConfigError::invalid(
                        format!("{section}.{key}"),
                        "key must be a non-negative integer",
                    )
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
