use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Identity of the engine hosting the module system.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_engine_name")]
    pub name: String,
    /// Version the engine reports to modules when checking their declared
    /// compatibility ranges.
    #[serde(default = "default_engine_version")]
    pub version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            version: default_engine_version(),
        }
    }
}

fn default_engine_name() -> String {
    "wikikit".to_string()
}

fn default_engine_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Module registry behaviour.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Accept modules whose declared version range does not cover the
    /// running engine version. Off by default: checking is enforced.
    #[serde(default)]
    pub load_incompatible: bool,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/wikikit.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many rotated files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/wikikit.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

/// Main application configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Engine identity reported to modules.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Module registry behaviour.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: Some(default_logging_config()),
            registry: RegistryConfig::default(),
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // For layered loading, start from a minimal base where optional sections are None,
        // so they remain None unless explicitly provided by YAML/ENV.
        let base = AppConfig {
            engine: EngineConfig::default(),
            logging: None,
            registry: RegistryConfig::default(),
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // Example: WIKIKIT__REGISTRY__LOAD_INCOMPATIBLE=true maps to registry.load_incompatible
            .merge(Env::prefixed("WIKIKIT__").split("__"));

        let config: AppConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        Ok(config)
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Typed view of a module's entry in the configuration bag.
    ///
    /// Returns `Ok(None)` when the module has no entry; a present entry that
    /// does not match `T` is an error, not a silent fallback.
    pub fn module_config<T: DeserializeOwned>(&self, module_name: &str) -> Result<Option<T>> {
        match self.modules.get(module_name) {
            Some(raw) => {
                let cfg: T = serde_json::from_value(raw.clone())
                    .with_context(|| format!("Invalid config for module '{module_name}'"))?;
                Ok(Some(cfg))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};
    use tempfile::tempdir;

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.engine.name, "wikikit");
        assert_eq!(config.engine.version, env!("CARGO_PKG_VERSION"));

        // Checking is enforced by default
        assert!(!config.registry.load_incompatible);

        // Logging defaults
        let logging = config.logging.as_ref().unwrap();
        assert!(logging.contains_key("default"));
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/wikikit.log");

        // Modules bag is empty by default
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_full_yaml() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");

        let yaml = r#"
engine:
  name: "inkpot"
  version: "2.11.0"

registry:
  load_incompatible: true

logging:
  default:
    console_level: debug
    file: "logs/default.log"
    file_level: info

modules:
  search:
    index_dir: "search-index"
    max_results: 50
"#;
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert_eq!(config.engine.name, "inkpot");
        assert_eq!(config.engine.version, "2.11.0");
        assert!(config.registry.load_incompatible);

        let logging = config.logging.as_ref().unwrap();
        let def = &logging["default"];
        assert_eq!(def.console_level, "debug");
        assert_eq!(def.file, "logs/default.log");
        assert_eq!(def.file_level, "info");

        assert!(config.modules.contains_key("search"));
    }

    #[test]
    fn test_minimal_yaml_config() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");

        let yaml = r#"
engine:
  name: "minimal"
"#;
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert_eq!(config.engine.name, "minimal");
        // Unspecified engine version falls back to the crate version
        assert_eq!(config.engine.version, env!("CARGO_PKG_VERSION"));

        // Optional sections default to None / defaults
        assert!(config.logging.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_env_override_registry_flag() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(&cfg_path, "engine:\n  name: \"env_test\"\n").unwrap();

        env::set_var("WIKIKIT__REGISTRY__LOAD_INCOMPATIBLE", "true");
        let config = AppConfig::load_layered(&cfg_path).unwrap();
        env::remove_var("WIKIKIT__REGISTRY__LOAD_INCOMPATIBLE");

        assert!(config.registry.load_incompatible);
    }

    #[test]
    fn test_module_config_typed_extraction() {
        #[derive(Debug, Deserialize)]
        struct SearchConfig {
            index_dir: String,
            #[serde(default)]
            max_results: usize,
        }

        let mut config = AppConfig::default();
        config.modules.insert(
            "search".to_string(),
            serde_json::json!({ "index_dir": "idx", "max_results": 25 }),
        );

        let search: Option<SearchConfig> = config.module_config("search").unwrap();
        let search = search.unwrap();
        assert_eq!(search.index_dir, "idx");
        assert_eq!(search.max_results, 25);

        let missing: Option<SearchConfig> = config.module_config("absent").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_module_config_shape_mismatch_is_error() {
        #[derive(Debug, Deserialize)]
        struct Typed {
            #[allow(dead_code)]
            required: String,
        }

        let mut config = AppConfig::default();
        config
            .modules
            .insert("broken".to_string(), serde_json::json!({ "other": 1 }));

        let result: Result<Option<Typed>> = config.module_config("broken");
        assert!(result.is_err());
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("engine:"));
        assert!(yaml.contains("registry:"));
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.engine.name, config.engine.name);
        assert_eq!(
            roundtrip.registry.load_incompatible,
            config.registry.load_incompatible
        );
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let invalid_yaml = r#"
engine:
  name: "strict"
not_a_section:
  key: value
"#;
        let result: std::result::Result<AppConfig, _> = serde_yaml::from_str(invalid_yaml);
        assert!(result.is_err());
    }
}
