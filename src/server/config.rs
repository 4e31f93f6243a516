//! Configuration management for the file server
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `FTSERVE_*` environment variables. Command-line arguments are applied
//! on top by the binary.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::Framing;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "ftserve.toml";

/// Prefix for environment overrides, e.g. `FTSERVE_CHUNK_SIZE=4096`
pub const ENV_PREFIX: &str = "FTSERVE";

/// Upper bound on `chunk_size`; keeps length prefixes within a `u32`
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the control listener binds; `0.0.0.0` means any IPv4 address
    pub bind_address: String,

    /// Control port; 0 lets the OS pick one
    pub control_port: u16,

    /// Directory whose regular files are served
    pub server_root: String,

    /// Pending-connection queue length of the control listener
    pub listen_backlog: u32,

    /// Bytes read from a file per relayed chunk
    pub chunk_size: usize,

    /// Data-connection framing
    pub framing: Framing,

    /// Lowest data port a client may advertise
    pub min_client_port: u16,

    /// Only open data connections to the control peer's own IP
    pub restrict_data_host_to_peer: bool,

    /// 0 disables the timeout
    pub data_connect_timeout_secs: u64,

    /// 0 disables the timeout
    pub control_read_timeout_secs: u64,
}

/// The subset of configuration a control session needs
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub chunk_size: usize,
    pub framing: Framing,
    pub min_client_port: u16,
    pub restrict_data_host_to_peer: bool,
    pub data_connect_timeout: Option<Duration>,
    pub control_read_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            control_port: 0,
            server_root: ".".to_string(),
            listen_backlog: 3,
            chunk_size: 100,
            framing: Framing::Fixed,
            min_client_port: 1024,
            restrict_data_host_to_peer: false,
            data_connect_timeout_secs: 0,
            control_read_timeout_secs: 0,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        ServerConfig::default().session_settings()
    }
}

impl ServerConfig {
    /// Load configuration. An explicit `path` must exist; otherwise
    /// `ftserve.toml` is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let builder = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", defaults.control_port as i64)?
            .set_default("server_root", defaults.server_root)?
            .set_default("listen_backlog", defaults.listen_backlog as i64)?
            .set_default("chunk_size", defaults.chunk_size as i64)?
            .set_default("framing", defaults.framing.to_string())?
            .set_default("min_client_port", defaults.min_client_port as i64)?
            .set_default("restrict_data_host_to_peer", defaults.restrict_data_host_to_peer)?
            .set_default("data_connect_timeout_secs", defaults.data_connect_timeout_secs as i64)?
            .set_default("control_read_timeout_secs", defaults.control_read_timeout_secs as i64)?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml).required(true)),
            None => builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_root.is_empty() {
            return Err(ConfigError::Message("server_root cannot be empty".into()));
        }

        if self.listen_backlog == 0 {
            return Err(ConfigError::Message(
                "listen_backlog must be greater than 0".into(),
            ));
        }

        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Message(format!(
                "chunk_size must be between 1 and {}",
                MAX_CHUNK_SIZE
            )));
        }

        Ok(())
    }

    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            chunk_size: self.chunk_size,
            framing: self.framing,
            min_client_port: self.min_client_port,
            restrict_data_host_to_peer: self.restrict_data_host_to_peer,
            data_connect_timeout: optional_secs(self.data_connect_timeout_secs),
            control_read_timeout: optional_secs(self.control_read_timeout_secs),
        }
    }
}

fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid_and_untimed() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());

        let settings = config.session_settings();
        assert_eq!(settings.chunk_size, 100);
        assert_eq!(settings.framing, Framing::Fixed);
        assert!(settings.data_connect_timeout.is_none());
        assert!(settings.control_read_timeout.is_none());
    }

    #[test]
    fn loads_values_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "server_root = \"/srv/share\"\nchunk_size = 4096\nframing = \"length_prefixed\"\ndata_connect_timeout_secs = 5\n",
        )
        .unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server_root, "/srv/share");
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.framing, Framing::LengthPrefixed);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.listen_backlog, 3);
        assert_eq!(
            config.session_settings().data_connect_timeout,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServerConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let zero_chunk = ServerConfig {
            chunk_size: 0,
            ..ServerConfig::default()
        };
        assert!(zero_chunk.validate().is_err());

        let huge_chunk = ServerConfig {
            chunk_size: MAX_CHUNK_SIZE + 1,
            ..ServerConfig::default()
        };
        assert!(huge_chunk.validate().is_err());

        let no_root = ServerConfig {
            server_root: String::new(),
            ..ServerConfig::default()
        };
        assert!(no_root.validate().is_err());
    }
}
