//! Configuration models for taskmux.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The user resolves these unknowns at runtime via config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for taskmux.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tokenizer (vocabulary) settings
    pub tokenizer: TokenizerConfig,

    /// Pipeline settings shared by all tasks
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Task corpora, in task-index order
    pub tasks: Vec<TaskConfig>,
}

/// WordPiece tokenizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Path to a BERT `vocab.txt` (one token per line)
    pub vocab_file: PathBuf,

    /// Lowercase and strip accents before WordPiece
    #[serde(default = "default_true")]
    pub do_lower_case: bool,
}

/// Settings applied to every task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Length of every emitted id/mask/segment vector
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,

    /// Seed for the sampling random source (entropy when omitted)
    #[serde(default)]
    pub seed: Option<u64>,

    /// What to do with lines that do not have 5 fields or an integer label
    #[serde(default)]
    pub malformed_lines: MalformedLinePolicy,

    /// Number of label classes the downstream classifier expects
    #[serde(default = "default_num_categories")]
    pub num_categories: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_seq_len: default_max_seq_len(),
            seed: None,
            malformed_lines: MalformedLinePolicy::default(),
            num_categories: default_num_categories(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_seq_len() -> usize {
    128
}

fn default_num_categories() -> usize {
    2
}

fn default_train_rate() -> f64 {
    1.0
}

/// Handling of structurally malformed data lines.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    /// Yield a parse error and stop the iteration (default)
    #[default]
    Fail,
    /// Log the line and keep going
    Skip,
}

/// One task corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Human-readable label used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Directory holding `train.tsv`, `dev.tsv` and `test.tsv`
    pub dir: PathBuf,

    /// Sampling rate for the training split. Values >= 1 oversample,
    /// values in (0, 1) subsample, 0 disables the task for training.
    #[serde(default = "default_train_rate")]
    pub train_rate: f64,
}

impl TaskConfig {
    /// Name for logs, falling back to the directory.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.dir.display().to_string())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.expand_paths();
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tasks.is_empty() {
            return Err(ConfigError::Invalid("at least one [[tasks]] entry is required".into()));
        }
        if self.pipeline.max_seq_len == 0 {
            return Err(ConfigError::Invalid("max_seq_len must be positive".into()));
        }
        if self.pipeline.num_categories == 0 {
            return Err(ConfigError::Invalid("num_categories must be positive".into()));
        }
        for (index, task) in self.tasks.iter().enumerate() {
            validate_rate(task.train_rate).map_err(|reason| {
                ConfigError::Invalid(format!("task {index} ({}): {reason}", task.display_name()))
            })?;
        }
        Ok(())
    }

    /// Task directories in task-index order.
    pub fn task_dirs(&self) -> Vec<PathBuf> {
        self.tasks.iter().map(|t| t.dir.clone()).collect()
    }

    /// Training rates in task-index order.
    pub fn train_rates(&self) -> Vec<f64> {
        self.tasks.iter().map(|t| t.train_rate).collect()
    }

    fn expand_paths(&mut self) {
        self.tokenizer.vocab_file = expand_path(&self.tokenizer.vocab_file);
        for task in &mut self.tasks {
            task.dir = expand_path(&task.dir);
        }
    }
}

/// A sampling rate must be a finite, non-negative number.
pub fn validate_rate(rate: f64) -> Result<(), String> {
    if !rate.is_finite() {
        return Err(format!("rate {rate} is not finite"));
    }
    if rate < 0.0 {
        return Err(format!("rate {rate} is negative"));
    }
    Ok(())
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid");

    for cap in re.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(expand_env_vars(s)),
        None => path.to_path_buf(),
    }
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - K_i violated: Values outside their valid range
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[tokenizer]
vocab_file = "vocab.txt"

[pipeline]
max_seq_len = 64
seed = 7
malformed_lines = "skip"

[[tasks]]
name = "lcqmc"
dir = "data/lcqmc"
train_rate = 2.5

[[tasks]]
dir = "data/bq"
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert!(config.tokenizer.do_lower_case);
        assert_eq!(config.pipeline.max_seq_len, 64);
        assert_eq!(config.pipeline.seed, Some(7));
        assert_eq!(config.pipeline.malformed_lines, MalformedLinePolicy::Skip);
        assert_eq!(config.pipeline.num_categories, 2);
        assert_eq!(config.train_rates(), vec![2.5, 1.0]);
        assert_eq!(config.tasks[1].display_name(), "data/bq");
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.tasks[0].train_rate = -0.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.tasks[1].train_rate = f64::NAN;
        assert!(config.validate().is_err());

        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.pipeline.max_seq_len = 0;
        assert!(config.validate().is_err());

        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.tasks.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_expands_env_vars() {
        std::env::set_var("TASKMUX_TEST_DATA_ROOT", "/srv/corpora");
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[tokenizer]
vocab_file = "${TASKMUX_TEST_DATA_ROOT}/vocab.txt"

[[tasks]]
dir = "${TASKMUX_TEST_DATA_ROOT}/afqmc"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tokenizer.vocab_file, PathBuf::from("/srv/corpora/vocab.txt"));
        assert_eq!(config.tasks[0].dir, PathBuf::from("/srv/corpora/afqmc"));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file(Path::new("/nonexistent/taskmux.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_unset_env_var_left_unchanged() {
        assert_eq!(
            expand_env_vars("${TASKMUX_SURELY_UNSET_VAR}/x"),
            "${TASKMUX_SURELY_UNSET_VAR}/x"
        );
    }
}
