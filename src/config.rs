use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::tmdb::TMDB_BASE;

pub const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_PORT: u16 = 8080;

/// Process-wide settings, read once at startup and handed down explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Fallback credential for requests that don't carry their own.
    pub default_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub port: u16,
    pub addon_id: String,
    pub addon_name: String,
    pub addon_description: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_api_key: None,
            tmdb_base_url: TMDB_BASE.to_string(),
            port: DEFAULT_PORT,
            addon_id: "org.stremio.tmdblink".to_string(),
            addon_name: "TMDB Link".to_string(),
            addon_description: "A Stremio metadata addon using TMDB API.".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let default_api_key = non_empty_var("TMDB_API_KEY");
        match default_api_key {
            Some(_) => info!("Using TMDB_API_KEY as the default credential"),
            None => warn!("TMDB_API_KEY not set - requests must supply their own key"),
        }
        let port = match non_empty_var("PORT") {
            Some(p) => p
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{p}'"))?,
            None => defaults.port,
        };
        Ok(Self {
            default_api_key,
            tmdb_base_url: non_empty_var("TMDB_BASE_URL").unwrap_or(defaults.tmdb_base_url),
            port,
            addon_id: non_empty_var("ADDON_ID").unwrap_or(defaults.addon_id),
            addon_name: non_empty_var("ADDON_NAME").unwrap_or(defaults.addon_name),
            addon_description: non_empty_var("ADDON_DESCRIPTION")
                .unwrap_or(defaults.addon_description),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Per-request options chosen by the user when installing the addon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(rename = "apiKeyTMDB", default)]
    pub api_key_tmdb: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
}

impl UserConfig {
    /// Parses the raw, still percent-encoded JSON config segment of an addon
    /// URL. Anything unreadable is treated as no config.
    pub fn from_path_segment(segment: &str) -> Self {
        let decoded = match urlencoding::decode(segment) {
            Ok(d) => d.into_owned(),
            Err(_) => segment.to_string(),
        };
        match serde_json::from_str(&decoded) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring unreadable addon config: {}", e);
                Self::default()
            }
        }
    }

    /// Request key if given, otherwise the process default.
    pub fn api_key(&self, settings: &Settings) -> Option<String> {
        self.api_key_tmdb
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| settings.default_api_key.clone())
    }

    pub fn language(&self) -> &str {
        self.preferred_language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}
