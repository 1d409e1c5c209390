//! TOML-based configuration for MergeResolver.
//!
//! Every section is optional; an empty file yields the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::DividerGrammar;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Conflict-marker grammar.
    #[serde(default)]
    pub conflict: ConflictConfig,

    /// Build-file and header/source lookup.
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Repository-wide marker search.
    #[serde(default)]
    pub search: SearchConfig,
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// Conflict-marker settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Whether a divider line may carry trailing text (`permissive`) or must
    /// be exactly `=======` (`strict`).
    #[serde(default)]
    pub divider: DividerGrammar,
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// File-navigation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Build manifest names, tried in order in each directory.
    #[serde(default = "default_build_file_names")]
    pub build_file_names: Vec<String>,

    /// Header extensions, including the leading dot.
    #[serde(default = "default_header_extensions")]
    pub header_extensions: Vec<String>,

    /// Source extensions, including the leading dot.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

fn default_build_file_names() -> Vec<String> {
    vec!["BUILD".into()]
}

fn default_header_extensions() -> Vec<String> {
    vec![".h".into(), ".hpp".into()]
}

fn default_source_extensions() -> Vec<String> {
    vec![".c".into(), ".cc".into()]
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            build_file_names: default_build_file_names(),
            header_extensions: default_header_extensions(),
            source_extensions: default_source_extensions(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Repository search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Git executable used for `git grep`.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

fn default_git_binary() -> String {
    "git".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse an [`AppConfig`] from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!(divider = %config.conflict.divider, "configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.general.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        let nav = &self.navigation;
        if nav.build_file_names.iter().all(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "navigation.build_file_names".into(),
                detail: "at least one build file name is required".into(),
            });
        }
        validate_extensions("navigation.header_extensions", &nav.header_extensions)?;
        validate_extensions("navigation.source_extensions", &nav.source_extensions)?;

        if let Some(shared) = nav
            .header_extensions
            .iter()
            .find(|e| nav.source_extensions.contains(e))
        {
            return Err(ConfigError::InvalidValue {
                field: "navigation.source_extensions".into(),
                detail: format!("'{}' is listed as both header and source", shared),
            });
        }

        if self.search.git_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "search.git_binary".into(),
                detail: "git binary must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# MergeResolver Configuration

[general]
log_level = "warn"

[conflict]
# "permissive" accepts "======= label"; "strict" requires a bare "=======".
divider = "permissive"

[navigation]
build_file_names = ["BUILD"]
header_extensions = [".h", ".hpp"]
source_extensions = [".c", ".cc"]

[search]
git_binary = "git"
"#
    }
}

fn validate_extensions(field: &str, extensions: &[String]) -> Result<(), ConfigError> {
    if extensions.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "at least one extension is required".into(),
        });
    }
    if let Some(bad) = extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!("extension '{}' must start with '.'", bad),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[general]
log_level = "debug"

[conflict]
divider = "strict"

[navigation]
build_file_names = ["BUILD.bazel", "BUILD"]
header_extensions = [".h", ".hh"]
source_extensions = [".cpp"]

[search]
git_binary = "/usr/local/bin/git"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.conflict.divider, DividerGrammar::Strict);
        assert_eq!(config.navigation.build_file_names.len(), 2);
        assert_eq!(config.navigation.source_extensions, vec![".cpp".to_string()]);
        assert_eq!(config.search.git_binary, "/usr/local/bin/git");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.conflict.divider, DividerGrammar::Permissive);
        assert_eq!(config.navigation.build_file_names, vec!["BUILD".to_string()]);
        assert_eq!(config.navigation.header_extensions.len(), 2);
        assert_eq!(config.search.git_binary, "git");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, sample_toml()).unwrap();

        let config = AppConfig::load_and_validate(&path).expect("load failed");
        assert_eq!(config.conflict.divider, DividerGrammar::Strict);
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/mergeresolver.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unknown_divider_is_parse_error() {
        let result = AppConfig::from_toml("[conflict]\ndivider = \"loose\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.general.log_level = "verbose".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "general.log_level"
        ));
    }

    #[test]
    fn test_validate_rejects_extension_without_dot() {
        let mut config = AppConfig::default();
        config.navigation.header_extensions = vec!["h".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "navigation.header_extensions"
        ));
    }

    #[test]
    fn test_validate_rejects_shared_extension() {
        let mut config = AppConfig::default();
        config.navigation.source_extensions.push(".h".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_build_names() {
        let mut config = AppConfig::default();
        config.navigation.build_file_names = vec![String::new()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_template_is_valid() {
        let config =
            AppConfig::from_toml(AppConfig::default_template()).expect("default template should be valid TOML");
        assert!(config.validate().is_ok());
    }
}
