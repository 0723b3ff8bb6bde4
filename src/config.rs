use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::gateway::DEFAULT_API_URL;
use crate::persona::Persona;

/// Overrides the backend base URL for this run.
pub const API_URL_ENV: &str = "SINGLISH_CHAT_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_persona(persona: Persona) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_persona = Some(persona.as_str().to_string());
        config.save()
    }

    /// Configured persona, falling back to the default for unknown ids.
    pub fn persona(&self) -> Persona {
        self.default_persona
            .as_deref()
            .and_then(Persona::from_id)
            .unwrap_or_default()
    }

    /// Base URL for this run: explicit override, then the environment, then
    /// the config file, then the build-profile default.
    pub fn resolve_base_url(&self, cli_override: Option<&str>) -> String {
        let env_url = std::env::var(API_URL_ENV).ok();
        Self::pick_base_url(cli_override, env_url.as_deref(), self.api_base_url.as_deref())
    }

    fn pick_base_url(cli: Option<&str>, env: Option<&str>, config: Option<&str>) -> String {
        [cli, env, config]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("singlish-chat").join("config.json"))
    }
}
