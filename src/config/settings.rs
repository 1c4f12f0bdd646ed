use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DownloadSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplaySettings {
    /// How many invoices the "recent" view shows
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_output_dir() -> String {
    "downloads".to_string()
}

fn default_recent_limit() -> usize {
    5
}
