//! Signed request configuration.

use crate::services::window::DEFAULT_WINDOW_SECONDS;
use std::{env, fmt};

pub const APP_ID_VAR: &str = "SIGNED_REQUEST_APP_ID";
pub const APP_SECRET_VAR: &str = "SIGNED_REQUEST_APP_SECRET";
pub const WINDOW_VAR: &str = "SIGNED_REQUEST_WINDOW";

/// Errors raised while loading configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Application identity and shared secret issued by the host platform
#[derive(Clone)]
pub struct SignedRequestConfig {
    pub app_id: String,
    pub app_secret: Vec<u8>,
    pub window_seconds: u64,
}

impl fmt::Debug for SignedRequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequestConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("window_seconds", &self.window_seconds)
            .finish()
    }
}

impl SignedRequestConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            window_seconds: DEFAULT_WINDOW_SECONDS,
        }
    }

    pub fn with_window(mut self, window_seconds: u64) -> Self {
        self.window_seconds = window_seconds;
        self
    }

    /// Load configuration from environment variables
    ///
    /// The app id and secret are required; the window falls back to 60 seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_id = lookup(APP_ID_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(APP_ID_VAR))?;

        let app_secret = lookup(APP_SECRET_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(APP_SECRET_VAR))?;

        let window_seconds = match lookup(WINDOW_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: WINDOW_VAR,
                value: raw,
            })?,
            None => DEFAULT_WINDOW_SECONDS,
        };

        Ok(Self {
            app_id,
            app_secret: app_secret.into_bytes(),
            window_seconds,
        })
    }
}
