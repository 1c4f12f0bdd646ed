mod session;
mod settings;

pub use session::Session;
pub use settings::{ApiSettings, Config, DisplaySettings, DownloadSettings};

use crate::error::{PortalError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides `api.base_url`
pub const API_URL_ENV: &str = "PORTAL_API_URL";

/// Get the config directory path (~/.portal/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "portal") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.portal/
    let home = dirs_home().ok_or_else(|| {
        PortalError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".portal"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the download directory; relative paths are anchored at the config dir
pub fn resolve_output_dir(output_dir: &str, config_dir: &Path) -> PathBuf {
    let expanded = expand_path(output_dir);
    if expanded.is_absolute() {
        expanded
    } else {
        config_dir.join(expanded)
    }
}

/// Load the main config.toml, applying the environment override
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(PortalError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| PortalError::ConfigParse { path, source: e })?;

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            debug!(%url, "api base url overridden from environment");
            config.api.base_url = url;
        }
    }

    Ok(config)
}

fn session_path(config_dir: &Path) -> PathBuf {
    config_dir.join("session.toml")
}

/// Load session.toml, or None when nobody is logged in
pub fn load_session(config_dir: &Path) -> Result<Option<Session>> {
    let path = session_path(config_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let session: Session =
        toml::from_str(&content).map_err(|e| PortalError::ConfigParse { path, source: e })?;
    Ok(Some(session))
}

/// Save session.toml
pub fn save_session(config_dir: &Path, session: &Session) -> Result<()> {
    let path = session_path(config_dir);
    let content = toml::to_string_pretty(session).map_err(|e| PortalError::ConfigWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Remove session.toml; returns whether a session existed
pub fn clear_session(config_dir: &Path) -> Result<bool> {
    let path = session_path(config_dir);
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path)?;
    Ok(true)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://localhost:8000/api"   # override with PORTAL_API_URL
timeout_secs = 15

[download]
output_dir = "downloads"   # relative paths live under this config directory

[display]
recent_limit = 5
"#;
