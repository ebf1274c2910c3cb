//! `relay.toml` configuration.
//!
//! Lookup order: an explicit `--config` path, `./relay.toml`, then
//! `<config dir>/relay/config.toml`. Without any file the defaults apply.
//! Relative component paths in a file are taken relative to that file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use relay_runtime::{ComponentResolver, DEFAULT_EXTENSION};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 45003;

/// Name of the project-local configuration file
pub const LOCAL_CONFIG: &str = "relay.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentsConfig {
    /// Search paths, tried in order
    pub paths: Vec<PathBuf>,
    /// Component file extension, without the dot
    pub extension: String,
    /// Component to load when the server starts
    pub preload: Option<String>,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            extension: DEFAULT_EXTENSION.to_string(),
            preload: None,
        }
    }
}

impl ComponentsConfig {
    pub fn resolver(&self) -> ComponentResolver {
        ComponentResolver::new(self.paths.clone()).with_extension(self.extension.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Log file written in addition to the console
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub components: ComponentsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Global configuration file location.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("relay").join("config.toml"))
    }

    /// The configuration file to use, if any.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Some(local);
        }
        Self::user_config_path().filter(|path| path.is_file())
    }

    /// Load configuration following the lookup order. Returns the file that
    /// was used alongside the configuration.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Config, Option<PathBuf>)> {
        match Self::locate(explicit) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Config::default(), None)),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(content)?)
    }

    /// Make relative paths relative to `base`.
    fn rebase(&mut self, base: &Path) {
        for path in &mut self.components.paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let Some(file) = &mut self.logging.file {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.to_string(), "127.0.0.1:45003");
        assert_eq!(config.components.paths, vec![PathBuf::from(".")]);
        assert_eq!(config.components.extension, "rly");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [server]
            port = 5000

            [components]
            paths = ["components", "/opt/shared"]
            preload = "counter"

            [logging]
            file = "logs/server.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.components.preload.as_deref(), Some("counter"));
        assert_eq!(config.components.extension, "rly");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_paths_are_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(
            &path,
            "[components]\npaths = [\"components\", \"/abs\"]\n[logging]\nfile = \"server.log\"\n",
        )
        .unwrap();

        let (config, used) = Config::load(Some(&path)).unwrap();
        assert_eq!(used, Some(path.clone()));
        assert_eq!(
            config.components.paths,
            vec![dir.path().join("components"), PathBuf::from("/abs")]
        );
        assert_eq!(config.logging.file, Some(dir.path().join("server.log")));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(&path, "[server]\nport = \"high\"\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid config file"));

        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = Config::default();
        config.components.preload = Some("calc".into());
        let text = config.to_toml().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
