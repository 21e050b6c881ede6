//! Runtime configuration
//!
//! Read from `config.json` inside the data directory. A missing file means
//! defaults; unknown keys are ignored so older binaries keep working.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FrigoResult;

/// File name looked up inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the product lookup endpoint
pub const PRODUCT_API_ENV: &str = "FRIGOFLOW_PRODUCT_API_URL";

/// Default Open Food Facts endpoint
pub const DEFAULT_PRODUCT_API_URL: &str = "https://world.openfoodfacts.org";

/// How inserted items are placed in a mirrored list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    /// Append in notification arrival order
    #[default]
    Arrival,
    /// Insert at the position given by `created_at`
    CreatedAt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrigoConfig {
    /// Placement of inserted items in synchronized lists
    pub ordering: Ordering,
    /// Base URL of the product lookup API
    pub product_api_url: String,
    /// Name written into JSONL log entries
    pub device_name: String,
}

impl Default for FrigoConfig {
    fn default() -> Self {
        Self {
            ordering: Ordering::Arrival,
            product_api_url: DEFAULT_PRODUCT_API_URL.to_string(),
            device_name: "frigoflow".to_string(),
        }
    }
}

impl FrigoConfig {
    /// Load `config.json` from `data_dir`, then apply environment overrides.
    pub fn load(data_dir: impl AsRef<Path>) -> FrigoResult<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(PRODUCT_API_ENV) {
            if !url.trim().is_empty() {
                self.product_api_url = url.trim().to_string();
            }
        }
    }
}
