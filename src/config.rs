//! Endpoint configuration for the HTTP adapter

use std::time::Duration;

pub const DEFAULT_DEX_URL: &str =
    "https://courses.cs.washington.edu/courses/cse154/webservices/pokedex/pokedex.php";
pub const DEFAULT_GAME_URL: &str =
    "https://courses.cs.washington.edu/courses/cse154/webservices/pokedex/game.php";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Catalog and creature detail endpoint.
    pub dex_url: String,
    /// Start, move and flee endpoint.
    pub game_url: String,
    /// Applied to every request.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            dex_url: DEFAULT_DEX_URL.to_string(),
            game_url: DEFAULT_GAME_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Point both endpoints at one base URL, e.g. a local test server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            dex_url: format!("{base}/pokedex.php"),
            game_url: format!("{base}/game.php"),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_keeps_endpoint_names() {
        let config = ApiConfig::with_base("http://127.0.0.1:9000/");
        assert_eq!(config.dex_url, "http://127.0.0.1:9000/pokedex.php");
        assert_eq!(config.game_url, "http://127.0.0.1:9000/game.php");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
