use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::eval::ConstEnv;
use crate::lexer;

pub const CONFIG_FILE: &str = "nem.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: could not read file: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("{}: invalid syntax: {source}", path.display())]
    Syntax { path: PathBuf, source: toml::de::Error },

    #[error("{}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Io { path, .. } | ConfigError::Syntax { path, .. } | ConfigError::Invalid { path, .. } => {
                path
            }
        }
    }
}

/// Settings read from `nem.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Seed environment for constant evaluation.
    #[serde(default)]
    pub constants: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_color")]
    pub color: bool,
    #[serde(default)]
    pub deny_warnings: bool,
}

fn default_color() -> bool {
    true
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { color: default_color(), deny_warnings: false }
    }
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content, path)
    }

    /// Parse config text; `path` is only used in errors.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|source| ConfigError::Syntax { path: path.to_path_buf(), source })?;
        for name in config.constants.keys() {
            validate_constant_name(name, path)?;
        }
        debug!(path = %path.display(), constants = config.constants.len(), "loaded config");
        Ok(config)
    }

    /// `explicit` wins; otherwise `nem.toml` next to `source`, if any.
    /// No file at all yields the defaults.
    pub fn discover(explicit: Option<&Path>, source: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = source
            .map(|s| s.parent().unwrap_or(Path::new(".")))
            .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir })
            .map(|dir| dir.join(CONFIG_FILE));
        match candidate {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn const_env(&self) -> ConstEnv {
        self.constants.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

fn validate_constant_name(name: &str, path: &Path) -> Result<(), ConfigError> {
    // Must match [A-Za-z_][A-Za-z0-9_]*
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            message: format!("constant name '{name}' is not a valid identifier"),
        });
    }
    if lexer::is_keyword(name) {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            message: format!("constant name '{name}' is a reserved keyword"),
        });
    }
    Ok(())
}
