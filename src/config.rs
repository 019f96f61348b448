//! Runtime configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` is a valid config.
//!
//! ```json
//! {
//!   "debounce_ms": 750,
//!   "panel_title": "sketch",
//!   "classifier": { "window": 32, "log_misses": false },
//!   "signatures": [
//!     { "name": "wobble", "params": [ { "name": "depth", "default": 0.2 } ] }
//!   ]
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analyzer::Analyzer;
use crate::classifier::{Classifier, DEFAULT_WINDOW};
use crate::error::TweakError;
use crate::registry::{FunctionSignature, SignatureRegistry};
use crate::sync::debounce::DEFAULT_DELAY;
use crate::sync::DEFAULT_TITLE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TweakConfig {
    /// Quiet period after the last control change before writing back.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_title")]
    pub panel_title: String,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Extra function signatures; an entry named like a built-in replaces it.
    #[serde(default)]
    pub signatures: Vec<FunctionSignature>,

    /// Start from an empty table instead of the built-in Hydra one.
    #[serde(default)]
    pub replace_builtin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Bytes looked at before a literal when searching for its call.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Log literals that could not be classified (debug level).
    #[serde(default = "default_true")]
    pub log_misses: bool,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DELAY.as_millis() as u64
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_true() -> bool {
    true
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            log_misses: true,
        }
    }
}

impl Default for TweakConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            panel_title: default_title(),
            classifier: ClassifierConfig::default(),
            signatures: Vec::new(),
            replace_builtin: false,
        }
    }
}

impl TweakConfig {
    pub fn from_json_str(json: &str) -> Result<Self, TweakError> {
        let config: TweakConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, TweakError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), TweakError> {
        if self.classifier.window == 0 {
            return Err(TweakError::Config("classifier.window must be positive".into()));
        }
        for signature in &self.signatures {
            if signature.name.is_empty() {
                return Err(TweakError::Config("signature with empty name".into()));
            }
            if let Some(param) = signature.params.iter().find(|p| p.name.is_empty()) {
                return Err(TweakError::Config(format!(
                    "signature `{}` has a parameter with no name (default {:?})",
                    signature.name, param.default
                )));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn registry(&self) -> SignatureRegistry {
        let mut registry = if self.replace_builtin {
            SignatureRegistry::empty()
        } else {
            SignatureRegistry::hydra()
        };
        registry.extend(self.signatures.iter().cloned());
        registry
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.registry())
            .with_window(self.classifier.window)
            .with_miss_logging(self.classifier.log_misses)
    }

    pub fn analyzer(&self) -> Analyzer {
        Analyzer::new(self.classifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = TweakConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TweakConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(1000));
        assert_eq!(config.classifier.window, 20);
        assert!(config.classifier.log_misses);
        assert_eq!(config.panel_title, "hydra");
    }

    #[test]
    fn signatures_extend_builtin_table() {
        let config = TweakConfig::from_json_str(
            r#"{ "debounce_ms": 250,
                 "signatures": [ { "name": "wobble", "params": [ { "name": "depth", "default": 0.2 } ] } ] }"#,
        )
        .unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        let registry = config.registry();
        assert!(registry.contains("wobble"));
        assert!(registry.contains("osc"));
    }

    #[test]
    fn replace_builtin_drops_hydra_table() {
        let config = TweakConfig::from_json_str(
            r#"{ "replace_builtin": true, "signatures": [ { "name": "f", "params": [] } ] }"#,
        )
        .unwrap();
        let registry = config.registry();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("osc"));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            TweakConfig::from_json_str(r#"{ "classifier": { "window": 0 } }"#),
            Err(TweakError::Config(_))
        ));
        assert!(matches!(
            TweakConfig::from_json_str(r#"{ "debounce": 5 }"#),
            Err(TweakError::Json(_))
        ));
        assert!(matches!(
            TweakConfig::from_json_str(r#"{ "signatures": [ { "name": "", "params": [] } ] }"#),
            Err(TweakError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TweakConfig::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, TweakError::Io(_)));
    }
}
