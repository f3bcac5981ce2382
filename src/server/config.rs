//! Server configuration types

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

/// Contact store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Delimited file the operator can open in a spreadsheet
    Flatfile,
    /// SQLite database
    Sqlite,
}

/// Contact store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// File path: the roster file for flatfile, the database for sqlite
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
        }
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Flatfile
}
fn default_store_path() -> String {
    "data/contacts.csv".to_string()
}

/// Batch send settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pause between consecutive sends, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Snapshot the store before a batch pass
    #[serde(default = "default_true")]
    pub backup_before_send: bool,
    /// Template used when a batch request names none
    #[serde(default = "default_template")]
    pub default_template: String,
    /// Template language code
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            backup_before_send: true,
            default_template: default_template(),
            default_language: default_language(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1500
}
fn default_true() -> bool {
    true
}
fn default_template() -> String {
    "confirmacion_asistencia".to_string()
}
fn default_language() -> String {
    "es_CO".to_string()
}

/// Periodic Drive roster sync settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Drive file id of the roster document
    #[serde(default)]
    pub file_id: String,
    /// Seconds between sync passes
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Push tracking state back to the source document after importing
    #[serde(default = "default_true")]
    pub write_back: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file_id: String::new(),
            interval_secs: default_sync_interval(),
            write_back: true,
        }
    }
}

fn default_sync_interval() -> u64 {
    300
}
