use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

const APP_DIR: &str = "Pipeline-Canvas";

#[cfg(unix)]
fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // Base of the pipeline API, e.g. http://host:port/api/v1
    pub server_url: String,
    pub pipeline_id: u32,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    // Background grid
    pub grid_size: f32,
    pub grid_multiplier: f32,
    // Sprite -> node size scale factor
    pub node_scale: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            server_url: Self::default_server_url(),
            pipeline_id: 0,
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
            grid_size: 20.0,
            grid_multiplier: 3.0,
            node_scale: 0.3,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        let base = home_dir().join("Library").join("Application Support");
        #[cfg(target_os = "windows")]
        let base = std::env::var_os("APPDATA").map(PathBuf::from).unwrap_or_default();
        #[cfg(all(unix, not(target_os = "macos")))]
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".config"));
        base.join(APP_DIR)
    }

    pub fn settings_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::settings_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Self::from_json(&s)
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let v: Self = serde_json::from_str(s).context("parsing settings.json")?;
        v.validate()?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(&path)?;
        f.write_all(s.as_bytes())?;
        Ok(path)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.base_url()?;
        anyhow::ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        anyhow::ensure!(self.node_scale > 0.0, "node_scale must be positive");
        Ok(())
    }

    pub(crate) fn default_server_url() -> String { "http://127.0.0.1:8080/api/v1".to_string() }

    /// `server_url` with a trailing slash so relative joins keep its path.
    pub fn base_url(&self) -> anyhow::Result<Url> {
        let mut s = self.server_url.trim().to_string();
        if !s.ends_with('/') {
            s.push('/');
        }
        Url::parse(&s).with_context(|| format!("invalid server_url '{}'", self.server_url))
    }

    /// `{server_url}/pipelines/{id}[/{action}]`
    pub fn pipeline_url(&self, action: Option<&str>) -> anyhow::Result<Url> {
        let path = match action {
            Some(a) => format!("pipelines/{}/{}", self.pipeline_id, a),
            None => format!("pipelines/{}", self.pipeline_id),
        };
        Ok(self.base_url()?.join(&path)?)
    }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }
}
