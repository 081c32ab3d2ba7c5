//! Process configuration read from the environment at startup

use crate::relay::{RelayConfig, DEFAULT_MODEL, DEFAULT_PROVIDER_URL};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub relay: RelayConfig,
    /// Where the game's oracle client sends its requests
    pub relay_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = var("TWENTYQ_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = var("TWENTYQ_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".twenty-questions").join("scores.db")
            },
            PathBuf::from,
        );

        let relay = RelayConfig {
            api_key: var("OPENAI_API_KEY"),
            provider_url: var("ORACLE_PROVIDER_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            model: var("ORACLE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        let relay_url = var("ORACLE_RELAY_URL")
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}/api/oracle"));

        Self {
            port,
            db_path,
            relay,
            relay_url,
        }
    }
}
