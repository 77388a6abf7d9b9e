//! Application state.

use std::sync::Arc;

use anyhow::Context;

use vsight_gemini::{GeminiClient, GeminiConfig};

use crate::config::ApiConfig;
use crate::sessions::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub gemini: Arc<GeminiClient>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Build state around an already configured client.
    pub fn new(config: ApiConfig, gemini: GeminiClient) -> Self {
        let sessions = Arc::new(SessionStore::new(gemini.clone(), config.max_sessions));
        Self {
            config,
            gemini: Arc::new(gemini),
            sessions,
        }
    }

    /// Build state from environment variables.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let gemini_config = GeminiConfig::from_env().context("Invalid Gemini configuration")?;
        let gemini = GeminiClient::new(gemini_config).context("Failed to create Gemini client")?;
        Ok(Self::new(config, gemini))
    }
}
