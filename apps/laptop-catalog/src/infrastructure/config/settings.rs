//! Catalog Configuration Settings
//!
//! Configuration types for the catalog server and the demo client, loaded
//! from environment variables. Parsing goes through a lookup function so it
//! can be exercised without touching the process environment.

use std::path::PathBuf;

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// gRPC server port.
    pub grpc_port: u16,
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            grpc_port: 8080,
            health_port: 8081,
        }
    }
}

/// Image storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Folder uploaded images are written to.
    pub image_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("img"),
        }
    }
}

/// Streaming call settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Outbound channel capacity per streaming call.
    pub buffer: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self { buffer: 64 }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Image storage settings.
    pub storage: StorageSettings,
    /// Streaming call settings.
    pub stream: StreamSettings,
}

impl CatalogConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but empty or unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but empty or unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerSettings {
            grpc_port: parse_var(
                &lookup,
                "LAPTOP_GRPC_PORT",
                ServerSettings::default().grpc_port,
            )?,
            health_port: parse_var(
                &lookup,
                "LAPTOP_HEALTH_PORT",
                ServerSettings::default().health_port,
            )?,
        };

        let storage = StorageSettings {
            image_dir: non_empty_var(&lookup, "LAPTOP_IMAGE_DIR")?
                .map_or_else(|| StorageSettings::default().image_dir, PathBuf::from),
        };

        let buffer = parse_var(
            &lookup,
            "LAPTOP_STREAM_BUFFER",
            StreamSettings::default().buffer,
        )?;
        if buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LAPTOP_STREAM_BUFFER".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            server,
            storage,
            stream: StreamSettings { buffer },
        })
    }

    /// Whether the health server should run.
    #[must_use]
    pub const fn health_enabled(&self) -> bool {
        self.server.health_port != 0
    }
}

/// Demo client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server URI.
    pub server_addr: String,
    /// Number of random laptops to create.
    pub laptops: usize,
    /// Image file to upload for the first laptop.
    pub image: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "http://127.0.0.1:8080".to_string(),
            laptops: 10,
            image: None,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but empty or unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but empty or unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            server_addr: non_empty_var(&lookup, "LAPTOP_SERVER_ADDR")?
                .unwrap_or(defaults.server_addr),
            laptops: parse_var(&lookup, "LAPTOP_CLIENT_LAPTOPS", defaults.laptops)?,
            image: non_empty_var(&lookup, "LAPTOP_CLIENT_IMAGE")?.map(PathBuf::from),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

fn non_empty_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
        other => Ok(other),
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty_var(lookup, key)? {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}
