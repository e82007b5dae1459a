//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which holds the Supabase project settings and the last used login
//! (email and portal role).
//!
//! Configuration is stored at `~/.config/oscavark/config.json`.
//! `SUPABASE_URL` and `SUPABASE_ANON_KEY` in the environment take
//! precedence over the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "oscavark";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub last_email: Option<String>,
    pub last_role: Option<Role>,
}

/// Where to reach the Supabase project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseSettings {
    /// Combine environment values with the config file, environment first.
    /// Blank values count as missing.
    pub fn resolve(
        env_url: Option<String>,
        env_key: Option<String>,
        config: &Config,
    ) -> Result<Self> {
        let pick = |env: Option<String>, file: &Option<String>| {
            env.map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or_else(|| {
                    file.as_deref()
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                })
        };

        let url = pick(env_url, &config.supabase_url)
            .ok_or_else(|| anyhow::anyhow!("Missing {} (set it in .env or config.json)", ENV_SUPABASE_URL))?;
        let anon_key = pick(env_key, &config.supabase_anon_key)
            .ok_or_else(|| anyhow::anyhow!("Missing {} (set it in .env or config.json)", ENV_SUPABASE_ANON_KEY))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("{} must be an http(s) URL, got {}", ENV_SUPABASE_URL, url);
        }

        Ok(Self { url, anon_key })
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Supabase settings from the process environment and this file.
    pub fn supabase_settings(&self) -> Result<SupabaseSettings> {
        SupabaseSettings::resolve(
            std::env::var(ENV_SUPABASE_URL).ok(),
            std::env::var(ENV_SUPABASE_ANON_KEY).ok(),
            self,
        )
    }

    /// Root cache directory (session file, logs).
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Per-account cache directory so two logins never share offline data.
    pub fn user_cache_dir(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(user_id))
    }
}
