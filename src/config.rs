//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXGRAMS_CONFIG` (environment variable)
//! 2. `~/.config/mboxgrams/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxgrams\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where and how the frequency tables are written.
    pub output: OutputConfig,
    /// Body charset decoding.
    pub decoding: DecodingConfig,
    /// Sentence segmentation tweaks.
    pub tokenizer: TokenizerConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the TSV files (default: current directory).
    pub dir: PathBuf,
    /// File name of the unigram table.
    pub unigrams_file: String,
    /// File name of the bigram table.
    pub bigrams_file: String,
}

/// Body decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Charsets tried, in order, after every declared charset failed.
    pub fallback_charsets: Vec<String>,
}

/// Tokenizer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Extra abbreviations (without the trailing period) after which a
    /// period does not end a sentence.
    pub extra_abbreviations: Vec<String>,
}

/// Performance tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Read buffer size in bytes (default: 1048576 = 1 MB).
    pub read_buffer_size: usize,
    /// Maximum message size in bytes (default: 268435456 = 256 MB).
    pub max_message_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            unigrams_file: "unigrams.tsv".to_string(),
            bigrams_file: "bigrams.tsv".to_string(),
        }
    }
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            fallback_charsets: vec![
                "utf-8".to_string(),
                "us-ascii".to_string(),
                "iso-8859-1".to_string(),
            ],
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024 * 1024,       // 1 MB
            max_message_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXGRAMS_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mboxgrams").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxgrams")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxgrams.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.output.unigrams_file, "unigrams.tsv");
        assert_eq!(cfg.output.bigrams_file, "bigrams.tsv");
        assert_eq!(
            cfg.decoding.fallback_charsets,
            vec!["utf-8", "us-ascii", "iso-8859-1"]
        );
        assert!(cfg.tokenizer.extra_abbreviations.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[output]
dir = "/tmp/grams"

[tokenizer]
extra_abbreviations = ["approx", "dept"]
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.output.dir, PathBuf::from("/tmp/grams"));
        assert_eq!(cfg.tokenizer.extra_abbreviations, vec!["approx", "dept"]);
        // Other fields use defaults
        assert_eq!(cfg.output.bigrams_file, "bigrams.tsv");
        assert_eq!(cfg.performance.max_message_size, 256 * 1024 * 1024);
        assert_eq!(cfg.decoding.fallback_charsets.len(), 3);
    }

    #[test]
    fn test_log_file_under_cache_dir() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/var/cache/grams"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/var/cache/grams/mboxgrams.log")
        );
    }
}
