// Configuration loading and parsing (courtside.toml, seasons.toml).

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calendar::SeasonDefinition;
use crate::efficiency::{Position, PositionScorer};
use crate::window::AveragePeriod;
use crate::writer::RetryPolicy;

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

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub engine: EngineConfig,
    pub retry: RetryPolicy,
    pub weights: PositionScorer,
    /// Seasons from `seasons.toml`, on top of the seeded ones.
    pub seasons: Vec<SeasonDefinition>,
}

// ---------------------------------------------------------------------------
// courtside.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire courtside.toml file.
#[derive(Debug, Clone, Deserialize)]
struct CourtsideFile {
    database: DatabaseSection,
    engine: EngineConfig,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default)]
    weights: PositionScorer,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub workers: usize,
    pub periods: Vec<AveragePeriod>,
    pub default_position: Position,
}

// ---------------------------------------------------------------------------
// seasons.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
struct SeasonsFile {
    #[serde(default)]
    season: Vec<SeasonDefinition>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/courtside.toml` and
/// (optionally) `config/seasons.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- courtside.toml (required) ---
    let main_path = config_dir.join("courtside.toml");
    let main_text = read_file(&main_path)?;
    let file: CourtsideFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- seasons.toml (optional) ---
    let seasons_path = config_dir.join("seasons.toml");
    let seasons = if seasons_path.exists() {
        let text = read_file(&seasons_path)?;
        let parsed: SeasonsFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: seasons_path.clone(),
            source: e,
        })?;
        parsed.season
    } else {
        Vec::new()
    };

    let config = Config {
        db_path: file.database.path,
        engine: file.engine,
        retry: file.retry,
        weights: file.weights,
        seasons,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
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

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.db_path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }

    // Engine
    if config.engine.workers == 0 {
        return Err(invalid("engine.workers", "must be greater than 0"));
    }
    if config.engine.periods.is_empty() {
        return Err(invalid("engine.periods", "must list at least one period"));
    }
    let mut seen = HashSet::new();
    for period in &config.engine.periods {
        if !seen.insert(*period) {
            return Err(invalid(
                "engine.periods",
                format!("duplicate period `{period}`"),
            ));
        }
    }

    // Retry
    let retry = &config.retry;
    if retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts", "must be greater than 0"));
    }
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(invalid(
            "retry.backoff_multiplier",
            format!("must be >= 1.0, got {}", retry.backoff_multiplier),
        ));
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(invalid(
            "retry.max_delay_ms",
            "must be >= retry.initial_delay_ms",
        ));
    }

    // Positional weights: non-negative, games_played positive per position
    for position in Position::ALL {
        let weights = config.weights.weights(position);
        for (name, val) in weights.fields() {
            if !val.is_finite() || val < 0.0 {
                return Err(invalid(
                    format!("weights.{position}.{name}"),
                    format!("must be >= 0, got {val}"),
                ));
            }
        }
        if weights.fields().iter().all(|(_, val)| *val == 0.0) {
            return Err(invalid(
                format!("weights.{position}"),
                "at least one weight must be > 0",
            ));
        }
        if weights.games_played <= 0.0 {
            return Err(invalid(
                format!("weights.{position}.games_played"),
                format!("must be > 0, got {}", weights.games_played),
            ));
        }
    }

    // Seasons
    for season in &config.seasons {
        season
            .validate()
            .map_err(|e| invalid(format!("season.{}", season.season), e.to_string()))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// Fresh temp dir with `config/courtside.toml` holding `body`.
    fn config_dir_with(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/courtside.toml"), body).unwrap();
        tmp
    }

    fn default_toml() -> String {
        fs::read_to_string(project_root().join("defaults/courtside.toml")).unwrap()
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = config_dir_with("courtside_config_defaults", &default_toml());

        let config = load_config_from(&tmp).expect("defaults should be valid");
        assert_eq!(config.db_path, "courtside.db");
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.periods, AveragePeriod::ALL.to_vec());
        assert_eq!(config.engine.default_position, Position::Forward);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.weights, PositionScorer::default());
        assert!(config.seasons.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn minimal_config_uses_default_retry_and_weights() {
        let tmp = config_dir_with(
            "courtside_config_minimal",
            r#"
[database]
path = ":memory:"

[engine]
workers = 1
periods = ["three_week"]
default_position = "guard"
"#,
        );

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.engine.periods, vec![AveragePeriod::ThreeWeek]);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.weights, PositionScorer::default());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_workers() {
        let body = default_toml().replace("workers = 4", "workers = 0");
        let tmp = config_dir_with("courtside_config_zero_workers", &body);
        expect_field(load_config_from(&tmp).unwrap_err(), "engine.workers");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_duplicate_periods() {
        let body = default_toml().replace(
            r#"periods = ["one_week", "three_week", "nine_week"]"#,
            r#"periods = ["one_week", "one_week"]"#,
        );
        let tmp = config_dir_with("courtside_config_dup_periods", &body);
        expect_field(load_config_from(&tmp).unwrap_err(), "engine.periods");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_period_as_parse_error() {
        let body = default_toml().replace(r#""nine_week""#, r#""two_week""#);
        let tmp = config_dir_with("courtside_config_bad_period", &body);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("courtside.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_negative_weight() {
        let body = default_toml().replace("blocks = 45.0", "blocks = -1.0");
        let tmp = config_dir_with("courtside_config_negative_weight", &body);
        expect_field(load_config_from(&tmp).unwrap_err(), "weights.center.blocks");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_all_zero_position() {
        let body = default_toml()
            .replace("points = 10.0", "points = 0.0")
            .replace("assists = 85.0", "assists = 0.0")
            .replace("steals = 85.0", "steals = 0.0")
            .replace("three_points = 40.0", "three_points = 0.0")
            .replace("games_played = 25.0", "games_played = 0.0");
        let tmp = config_dir_with("courtside_config_zero_guard", &body);
        expect_field(load_config_from(&tmp).unwrap_err(), "weights.guard");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_games_played_weight() {
        let body = default_toml().replace("games_played = 45.0", "games_played = 0.0");
        let tmp = config_dir_with("courtside_config_zero_gp", &body);
        expect_field(
            load_config_from(&tmp).unwrap_err(),
            "weights.center.games_played",
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_shrinking_backoff() {
        let body = default_toml().replace("backoff_multiplier = 2.0", "backoff_multiplier = 0.5");
        let tmp = config_dir_with("courtside_config_backoff", &body);
        expect_field(
            load_config_from(&tmp).unwrap_err(),
            "retry.backoff_multiplier",
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn loads_optional_seasons_file() {
        let tmp = config_dir_with("courtside_config_seasons", &default_toml());
        fs::copy(
            project_root().join("defaults/seasons.toml.example"),
            tmp.join("config/seasons.toml"),
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.seasons.len(), 1);
        assert_eq!(config.seasons[0].season, "2023-24");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_inverted_season() {
        let tmp = config_dir_with("courtside_config_bad_season", &default_toml());
        fs::write(
            tmp.join("config/seasons.toml"),
            r#"
[[season]]
season = "2030-31"
season_start = "2031-04-01"
season_end = "2030-10-20"
playoff_start = "2031-04-20"
playoff_end = "2031-06-20"
"#,
        )
        .unwrap();
        expect_field(load_config_from(&tmp).unwrap_err(), "season.2030-31");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_courtside_toml() {
        let tmp = std::env::temp_dir().join("courtside_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("courtside.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = config_dir_with("courtside_config_invalid", "this is not valid [[[ toml");
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_and_skips_examples() {
        let tmp = std::env::temp_dir().join("courtside_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("courtside.toml"), default_toml()).unwrap();
        fs::write(defaults_dir.join("seasons.toml.example"), "# example\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/courtside.toml").exists());
        assert!(!tmp.join("config/seasons.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("courtside_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/courtside.toml"), default_toml()).unwrap();
        fs::write(tmp.join("config/courtside.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());
        let content = fs::read_to_string(tmp.join("config/courtside.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("courtside_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }
}
