use anyhow::{bail, Result};
use std::env;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// Runtime settings, read from the environment (a `.env` file is loaded by
/// the binary before this runs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub anilist_enabled: bool,
    pub mal_enabled: bool,
    pub prefer_english_titles: bool,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anilist_enabled: true,
            mal_enabled: true,
            prefer_english_titles: true,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| -> Result<bool> {
            match lookup(key).as_deref().map(str::trim) {
                None | Some("") => Ok(default),
                Some(v) => parse_bool(v)
                    .ok_or_else(|| anyhow::anyhow!("{} must be true or false, got '{}'", key, v)),
            }
        };

        let timeout_secs = match lookup("ANIMELINK_HTTP_TIMEOUT_SECS")
            .as_deref()
            .map(str::trim)
        {
            None | Some("") => DEFAULT_HTTP_TIMEOUT_SECS,
            Some(v) => match v.parse::<u64>() {
                Ok(n) => n.clamp(1, MAX_HTTP_TIMEOUT_SECS),
                Err(_) => bail!("ANIMELINK_HTTP_TIMEOUT_SECS must be a number, got '{}'", v),
            },
        };

        Ok(Self {
            anilist_enabled: flag("ANIMELINK_ANILIST_ENABLED", defaults.anilist_enabled)?,
            mal_enabled: flag("ANIMELINK_MAL_ENABLED", defaults.mal_enabled)?,
            prefer_english_titles: flag(
                "ANIMELINK_PREFER_ENGLISH_TITLES",
                defaults.prefer_english_titles,
            )?,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
