//! Configuration management for the file upload server

use std::env;
use std::path::PathBuf;

use crate::error::StartupError;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory every upload lands under
    pub root: PathBuf,
    /// Create missing intermediate directories for nested targets
    pub create_parent_dirs: bool,
    /// fsync staged data and the destination directory around publish
    pub sync_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                root: PathBuf::from("./uploaded"),
                create_parent_dirs: true,
                sync_data: true,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, StartupError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            storage: StorageConfig {
                root: env::var("UPLOAD_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.root),
                create_parent_dirs: parse_bool(
                    "UPLOAD_CREATE_DIRS",
                    defaults.storage.create_parent_dirs,
                )?,
                sync_data: parse_bool("UPLOAD_SYNC_DATA", defaults.storage.sync_data)?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, StartupError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| StartupError::InvalidConfig { key, value }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, StartupError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(StartupError::InvalidConfig { key, value }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_layout() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.root, PathBuf::from("./uploaded"));
        assert!(config.storage.create_parent_dirs);
        assert!(config.storage.sync_data);
    }

    #[test]
    fn test_unset_variables_fall_back_to_defaults() {
        let port = parse_var("FILE_UPLOAD_SERVER_TEST_UNSET_PORT", 1234u16).unwrap();
        assert_eq!(port, 1234);
        assert!(parse_bool("FILE_UPLOAD_SERVER_TEST_UNSET_FLAG", true).unwrap());
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        env::set_var("FILE_UPLOAD_SERVER_TEST_BAD_PORT", "eighty");
        env::set_var("FILE_UPLOAD_SERVER_TEST_BAD_FLAG", "maybe");

        let port = parse_var("FILE_UPLOAD_SERVER_TEST_BAD_PORT", 8080u16);
        assert!(matches!(port, Err(StartupError::InvalidConfig { .. })));

        let flag = parse_bool("FILE_UPLOAD_SERVER_TEST_BAD_FLAG", true);
        assert!(matches!(flag, Err(StartupError::InvalidConfig { .. })));
    }
}
