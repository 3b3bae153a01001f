use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_phase_one_url")]
    pub phase_one_url: String,

    #[serde(default = "default_phase_two_url")]
    pub phase_two_url: String,

    #[serde(default = "default_storage")]
    pub storage_folder: String,

    #[serde(default = "default_goodbye_delay")]
    pub goodbye_delay_ms: u64,

    #[serde(default = "default_loading_delay")]
    pub loading_delay_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            phase_one_url: default_phase_one_url(),
            phase_two_url: default_phase_two_url(),
            storage_folder: default_storage(),
            goodbye_delay_ms: default_goodbye_delay(),
            loading_delay_ms: default_loading_delay(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_phase_one_url() -> String {
    "https://us-central1-api-skinstric-ai.cloudfunctions.net/skinstricPhaseOne".to_string()
}
fn default_phase_two_url() -> String {
    "https://us-central1-api-skinstric-ai.cloudfunctions.net/skinstricPhaseTwo".to_string()
}
fn default_storage() -> String {
    "storage".to_string()
}
fn default_goodbye_delay() -> u64 {
    3000
}
fn default_loading_delay() -> u64 {
    5000
}
fn default_request_timeout() -> u64 {
    30
}

impl Config {
    /// Loads `config.yml` from the working directory, falling back to the
    /// built-in endpoints when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default endpoints", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.phase_one_url)
            .with_context(|| format!("Invalid phase_one_url: {}", self.phase_one_url))?;
        Url::parse(&self.phase_two_url)
            .with_context(|| format!("Invalid phase_two_url: {}", self.phase_two_url))?;
        if self.storage_folder.trim().is_empty() {
            anyhow::bail!("storage_folder must not be empty");
        }
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.storage_folder)?;
        Ok(())
    }
}
