//! Configuration loading for ir2vec.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/ir2vec/config.toml`.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;
use crate::flavor::Flavor;
use crate::options::{AggregationScheme, EmbeddingMode, UnknownSymbolPolicy, WeightTable};
use crate::program::Granularity;

/// Environment variable prefix (`IR2VEC_VOCAB_PATH`, `IR2VEC_WEIGHTS__TYPE`, ...)
pub const ENV_PREFIX: &str = "IR2VEC";

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the vocabulary JSON file
    #[serde(default)]
    pub vocab_path: Option<String>,

    /// Program representation flavor (ir, mir)
    #[serde(default)]
    pub flavor: Flavor,

    /// Embedding mode (symbolic, flow-aware)
    #[serde(default)]
    pub mode: EmbeddingMode,

    /// Default granularity for the embeddings command
    #[serde(default = "default_level")]
    pub level: Granularity,

    /// Reduction scheme (sum, average, weighted)
    #[serde(default)]
    pub scheme: AggregationScheme,

    /// Unknown-symbol policy (substitute-default, fail-fast)
    #[serde(default)]
    pub unknown_symbol: UnknownSymbolPolicy,

    /// Per-class weights for the weighted scheme
    #[serde(default)]
    pub weights: WeightTable,

    /// Vector used for unknown symbols under substitute-default.
    /// Zero vector of the vocabulary dimension when unset.
    #[serde(default)]
    pub default_vector: Option<Vec<f64>>,

    /// Reject vocabularies whose dimension differs from this value
    #[serde(default)]
    pub expected_dimension: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_level() -> Granularity {
    Granularity::Function
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vocab_path: None,
            flavor: Flavor::default(),
            mode: EmbeddingMode::default(),
            level: default_level(),
            scheme: AggregationScheme::default(),
            unknown_symbol: UnknownSymbolPolicy::default(),
            weights: WeightTable::default(),
            default_vector: None,
            expected_dimension: None,
            log_level: default_log_level(),
        }
    }
}

/// Default config file location, without extension.
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "ir2vec")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config")
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/ir2vec/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (IR2VEC_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let default_config_path = default_config_path();

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("flavor", Flavor::default().as_str())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("level", "function")
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("scheme", AggregationScheme::default().as_str())
            .map_err(|e| TypesError::Config(e.to_string()))?;

        // Per-class keys so a partial [weights] table overrides only what it names
        for (class, weight) in WeightTable::default().iter() {
            builder = builder
                .set_default(format!("weights.{}", class.as_str()), weight)
                .map_err(|e| TypesError::Config(e.to_string()))?;
        }

        builder = builder
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // IR2VEC_VOCAB_PATH, IR2VEC_SCHEME, IR2VEC_WEIGHTS__OPCODE, ...
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.expected_dimension == Some(0) {
            return Err(TypesError::Config(
                "expected_dimension must be > 0".to_string(),
            ));
        }
        if let (Some(dim), Some(vector)) = (self.expected_dimension, &self.default_vector) {
            if vector.len() != dim {
                return Err(TypesError::Config(format!(
                    "default_vector has {} values, expected_dimension is {}",
                    vector.len(),
                    dim
                )));
            }
        }
        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        ) {
            return Err(TypesError::Config(format!(
                "log_level must be one of trace, debug, info, warn, error, off; got {}",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Vocabulary path with a leading `~/` expanded to the home directory.
    pub fn expanded_vocab_path(&self) -> Option<PathBuf> {
        let path = self.vocab_path.as_deref()?;
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(dirs) = BaseDirs::new() {
                return Some(dirs.home_dir().join(rest));
            }
        }
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolClass;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.flavor, Flavor::Ir);
        assert_eq!(settings.mode, EmbeddingMode::Symbolic);
        assert_eq!(settings.level, Granularity::Function);
        assert_eq!(settings.scheme, AggregationScheme::Weighted);
        assert_eq!(settings.unknown_symbol, UnknownSymbolPolicy::SubstituteDefault);
        assert!(settings.vocab_path.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
vocab_path = "/tmp/vocab.json"
flavor = "mir"
mode = "sym"
level = "bb"
scheme = "sum"
unknown_symbol = "fail-fast"
expected_dimension = 3

[weights]
opcode = 2.0
operand = 0.1
physical_register = 0.1
virtual_register = 0.1
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.vocab_path.as_deref(), Some("/tmp/vocab.json"));
        assert_eq!(settings.flavor, Flavor::Mir);
        assert_eq!(settings.level, Granularity::Block);
        assert_eq!(settings.scheme, AggregationScheme::Sum);
        assert_eq!(settings.unknown_symbol, UnknownSymbolPolicy::FailFast);
        assert_eq!(settings.expected_dimension, Some(3));
        assert_eq!(settings.weights.get(SymbolClass::Opcode), Some(2.0));
        // Not in the file, kept from the defaults
        assert_eq!(settings.weights.get(SymbolClass::Type), Some(0.5));
    }

    #[test]
    fn test_partial_weights_keep_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[weights]\ntype = 0.3").unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.weights.get(SymbolClass::Type), Some(0.3));
        assert_eq!(settings.weights.get(SymbolClass::Opcode), Some(1.0));
        assert_eq!(settings.weights.get(SymbolClass::Operand), Some(0.2));
        assert_eq!(settings.weights.get(SymbolClass::PhysicalRegister), Some(0.2));
        assert_eq!(settings.weights.get(SymbolClass::VirtualRegister), Some(0.2));
        assert!(settings.weights.missing_classes(Flavor::Ir).is_empty());
        assert!(settings.weights.missing_classes(Flavor::Mir).is_empty());
    }

    #[test]
    fn test_missing_cli_config_is_error() {
        let result = Settings::load(Some("/definitely/not/here/ir2vec.toml"));
        assert!(matches!(result, Err(TypesError::Config(_))));
    }

    #[test]
    fn test_validate_dimension() {
        let settings = Settings {
            expected_dimension: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            expected_dimension: Some(3),
            default_vector: Some(vec![0.0, 1.0]),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let settings = Settings {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expanded_vocab_path() {
        let settings = Settings {
            vocab_path: Some("/abs/vocab.json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.expanded_vocab_path(),
            Some(PathBuf::from("/abs/vocab.json"))
        );

        let settings = Settings {
            vocab_path: Some("~/vocab.json".to_string()),
            ..Default::default()
        };
        let expanded = settings.expanded_vocab_path().unwrap();
        assert!(expanded.ends_with("vocab.json"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("config"));
    }
}
