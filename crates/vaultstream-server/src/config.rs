//! Server configuration.
//!
//! A plain struct with defaults matching the reference deployment, each
//! field overridable through a `VAULTSTREAM_*` environment variable.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use vaultstream_core::ContentCategory;

/// How secured blobs are pinned.
#[derive(Debug, Clone)]
pub enum PinningConfig {
    /// Content-address locally under the data dir. The dev/demo fallback.
    Local,
    /// POST to a remote pinning service with API credentials.
    Remote {
        endpoint: String,
        api_key: String,
        secret: String,
    },
}

/// Configuration for the delivery server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on.
    pub listen_addr: SocketAddr,

    /// Root for the database, pinned blobs, and the decrypted cache.
    pub data_dir: PathBuf,

    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: String,

    /// Address of the licensing contract.
    pub licensing_contract: String,

    /// Base URL of the originality engine per content category.
    pub engine_endpoints: HashMap<ContentCategory, String>,

    /// Blob pinning backend.
    pub pinning: PinningConfig,

    /// Watermark filter binary.
    pub ffmpeg_binary: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let engine_endpoints = HashMap::from([
            (ContentCategory::Video, "http://localhost:5003".to_string()),
            (ContentCategory::Image, "http://localhost:8081".to_string()),
            (ContentCategory::Text, "http://localhost:5002".to_string()),
            (ContentCategory::Audio, "http://localhost:8080".to_string()),
        ]);

        Self {
            listen_addr: "127.0.0.1:8090".parse().expect("valid default addr"),
            data_dir: PathBuf::from("./data"),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            licensing_contract: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
            engine_endpoints,
            pinning: PinningConfig::Local,
            ffmpeg_binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("VAULTSTREAM_LISTEN") {
            match addr.parse() {
                Ok(addr) => config.listen_addr = addr,
                Err(_) => tracing::warn!(%addr, "ignoring unparseable VAULTSTREAM_LISTEN"),
            }
        }
        if let Ok(dir) = std::env::var("VAULTSTREAM_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("VAULTSTREAM_RPC_URL") {
            config.rpc_url = url;
        }
        if let Ok(contract) = std::env::var("VAULTSTREAM_LICENSING_CONTRACT") {
            config.licensing_contract = contract;
        }
        for category in ContentCategory::ALL {
            let var = format!("VAULTSTREAM_ENGINE_{}", category.as_str().to_uppercase());
            if let Ok(url) = std::env::var(var) {
                config.engine_endpoints.insert(category, url);
            }
        }
        if let (Ok(endpoint), Ok(api_key), Ok(secret)) = (
            std::env::var("VAULTSTREAM_PIN_ENDPOINT"),
            std::env::var("VAULTSTREAM_PIN_API_KEY"),
            std::env::var("VAULTSTREAM_PIN_SECRET"),
        ) {
            config.pinning = PinningConfig::Remote {
                endpoint,
                api_key,
                secret,
            };
        }
        if let Ok(bin) = std::env::var("VAULTSTREAM_FFMPEG") {
            config.ffmpeg_binary = PathBuf::from(bin);
        }

        config
    }

    /// Directory for decrypted working copies.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Directory for locally pinned blobs.
    pub fn pin_dir(&self) -> PathBuf {
        self.data_dir.join("pins")
    }

    /// Path of the SQLite database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("vaultstream.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_categories() {
        let config = Config::default();
        for category in ContentCategory::ALL {
            assert!(config.engine_endpoints.contains_key(&category));
        }
    }

    #[test]
    fn test_derived_paths() {
        let config = Config {
            data_dir: PathBuf::from("/srv/vaultstream"),
            ..Config::default()
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/srv/vaultstream/cache"));
        assert_eq!(config.db_path(), PathBuf::from("/srv/vaultstream/vaultstream.db"));
    }
}
