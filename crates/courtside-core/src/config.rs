// Configuration loading and parsing (courtside.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metrics::possessions::PossessionStrategy;

/// Name of the single configuration file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "courtside.toml";

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
// courtside.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub possession_strategy: PossessionStrategy,
    /// Players with fewer games are left out of the CLI output. The engine
    /// itself computes every player.
    #[serde(default)]
    pub min_games: u32,
}

/// CSV input paths. Relative paths resolve against the base directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub games: String,
    pub box_scores: String,
    #[serde(default)]
    pub rosters: Option<String>,
    /// Without stints, plus-minus falls back to team margins.
    #[serde(default)]
    pub stints: Option<String>,
}

impl DataConfig {
    /// Resolve a configured path against `base_dir` unless it is absolute.
    pub fn resolve(base_dir: &Path, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub pretty: bool,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/courtside.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` handles that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/courtside.toml` to `config/courtside.toml` unless the
/// config file already exists. Returns the path written, if any.
pub fn ensure_config_files(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {CONFIG_FILE} in {}/config or {}/defaults",
                base_dir.display(),
                base_dir.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(copy_err)?;
    std::fs::copy(&source, &target).map_err(copy_err)?;

    Ok(Some(target))
}

/// Copy missing defaults, then load from the working directory.
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

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let required: &[(&str, &str)] = &[
        ("data.games", config.data.games.as_str()),
        ("data.box_scores", config.data.box_scores.as_str()),
        ("database.path", config.database.path.as_str()),
    ];
    for (name, val) in required {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    let optional: &[(&str, &Option<String>)] = &[
        ("data.rosters", &config.data.rosters),
        ("data.stints", &config.data.stints),
    ];
    for (name, val) in optional {
        if val.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be omitted or non-empty".into(),
            });
        }
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
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// Fresh scratch dir under the OS temp dir.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    fn write_config(base: &Path, body: &str) {
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(CONFIG_FILE), body).unwrap();
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = scratch("courtside_config_defaults");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults").join(CONFIG_FILE),
            tmp.join("defaults").join(CONFIG_FILE),
        )
        .unwrap();

        ensure_config_files(&tmp).expect("should copy default config");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.engine.possession_strategy, PossessionStrategy::Simple);
        assert_eq!(config.engine.min_games, 0);
        assert_eq!(config.data.games, "data/games.csv");
        assert_eq!(config.data.box_scores, "data/box_scores.csv");
        assert_eq!(config.data.rosters.as_deref(), Some("data/rosters.csv"));
        assert_eq!(config.data.stints, None);
        assert_eq!(config.database.path, ":memory:");
        assert!(!config.output.pretty);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_default() {
        let tmp = scratch("courtside_config_minimal");
        write_config(
            &tmp,
            "[data]\ngames = \"g.csv\"\nbox_scores = \"b.csv\"\n",
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.engine.possession_strategy, PossessionStrategy::Simple);
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.data.rosters, None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parses_bbr_strategy() {
        let tmp = scratch("courtside_config_bbr");
        write_config(
            &tmp,
            "[engine]\npossession_strategy = \"bbr_standard\"\nmin_games = 5\n\n\
             [data]\ngames = \"g.csv\"\nbox_scores = \"b.csv\"\nstints = \"s.csv\"\n",
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.engine.possession_strategy, PossessionStrategy::BbrStandard);
        assert_eq!(config.engine.min_games, 5);
        assert_eq!(config.data.stints.as_deref(), Some("s.csv"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_games_path() {
        let tmp = scratch("courtside_config_empty_games");
        write_config(&tmp, "[data]\ngames = \"\"\nbox_scores = \"b.csv\"\n");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "data.games"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_stints_path() {
        let tmp = scratch("courtside_config_blank_stints");
        write_config(
            &tmp,
            "[data]\ngames = \"g.csv\"\nbox_scores = \"b.csv\"\nstints = \"  \"\n",
        );
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "data.stints"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_strategy_is_parse_error() {
        let tmp = scratch("courtside_config_bad_strategy");
        write_config(
            &tmp,
            "[engine]\npossession_strategy = \"guess\"\n\n[data]\ngames = \"g.csv\"\nbox_scores = \"b.csv\"\n",
        );
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_without_config() {
        let tmp = scratch("courtside_config_missing");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch("courtside_config_invalid_toml");
        write_config(&tmp, "this is not valid [[[ toml");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_once() {
        let tmp = scratch("courtside_config_ensure");
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join(CONFIG_FILE), "# default\n").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, Some(tmp.join("config").join(CONFIG_FILE)));

        // Second run leaves the user's edits alone.
        fs::write(tmp.join("config").join(CONFIG_FILE), "# custom\n").unwrap();
        assert_eq!(ensure_config_files(&tmp).unwrap(), None);
        let content = fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_defaults_keeps_existing_config() {
        let tmp = scratch("courtside_config_no_defaults");
        write_config(&tmp, "[data]\ngames = \"g.csv\"\nbox_scores = \"b.csv\"\n");
        assert_eq!(ensure_config_files(&tmp).unwrap(), None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_missing() {
        let tmp = scratch("courtside_config_both_missing");
        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains(CONFIG_FILE));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let base = Path::new("/srv/courtside");
        assert_eq!(
            DataConfig::resolve(base, "data/games.csv"),
            PathBuf::from("/srv/courtside/data/games.csv")
        );
        assert_eq!(
            DataConfig::resolve(base, "/tmp/games.csv"),
            PathBuf::from("/tmp/games.csv")
        );
    }
}
