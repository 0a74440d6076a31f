//! Configuration Module
//!
//! Configuration loading for the catalog server and the demo client.

mod settings;

pub use settings::{
    CatalogConfig, ClientConfig, ConfigError, ServerSettings, StorageSettings, StreamSettings,
};
