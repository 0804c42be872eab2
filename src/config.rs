//! Client configuration.

use std::{env, time::Duration};

/// The backend to talk to when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// The environment variable that overrides the backend URL.
pub const BACKEND_URL_ENV: &str = "SOON_BACKEND_URL";
/// How long a toast stays in the notification queue.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(2_400);
/// How close to the bottom of the content the viewport must be before the
/// next page is loaded.
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 200.0;

/// The settings shared by the stores and the API client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing slash.
    pub backend_url: String,
    /// How long a toast lives before it is removed.
    pub toast_duration: Duration,
    /// Distance from the bottom edge that triggers the next page load.
    pub scroll_threshold: f64,
    /// Timeout applied to every backend request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            toast_duration: DEFAULT_TOAST_DURATION,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// The default config with the backend URL taken from [BACKEND_URL_ENV]
    /// when it is set.
    pub fn from_env() -> Self {
        match env::var(BACKEND_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::default().with_backend_url(&url),
            _ => Self::default(),
        }
    }

    /// Replace the backend URL. A trailing slash is removed so endpoint paths
    /// can be appended directly.
    pub fn with_backend_url(mut self, url: &str) -> Self {
        self.backend_url = url.trim().trim_end_matches('/').to_owned();
        self
    }
}
