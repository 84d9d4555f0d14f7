//! # Configuration Management
//!
//! Settings for the cow_kv server, read from an optional TOML file and then
//! from `COW_KV_*` environment variables, which win over the file. Missing
//! keys fall back to [`Config::default`].
//!
//! ## Example Configuration File (config.toml)
//! ```toml
//! host = "127.0.0.1"
//! port = 7379
//! engine = "trie"
//! max_line_bytes = 65536
//! ```

use anyhow::Result;
use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::store::EngineKind;

/// Main configuration structure for the cow_kv server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IP address to bind the TCP server to (e.g., "127.0.0.1" or "0.0.0.0")
    pub host: String,

    /// Port number for the TCP server to listen on
    pub port: u16,

    /// Storage engine backing the server ("map" or "trie", or the longer
    /// "MapStore"/"TrieStore")
    pub engine: EngineKind,

    /// Longest request line a client may send, newline excluded. Longer
    /// lines are answered with an error and skipped.
    pub max_line_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7379,
            engine: EngineKind::Trie,
            max_line_bytes: 64 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) layered under the
    /// `COW_KV_` environment.
    ///
    /// # Example
    /// ```no_run
    /// use std::path::Path;
    /// let config = cow_kv::config::Config::load(Path::new("config.toml"))?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let settings = ConfigLib::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("COW_KV"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
