//! Auth configuration and shared state.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use super::bruteforce::{BruteForceGuard, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW};
use crate::api::token::TOKEN_TTL_SECONDS;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_secret: SecretString,
    token_ttl_seconds: i64,
    bruteforce_window: Duration,
    bruteforce_max_attempts: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            token_ttl_seconds: TOKEN_TTL_SECONDS,
            bruteforce_window: DEFAULT_WINDOW,
            bruteforce_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bruteforce_window(mut self, window: Duration) -> Self {
        self.bruteforce_window = window;
        self
    }

    #[must_use]
    pub fn with_bruteforce_max_attempts(mut self, max_attempts: u32) -> Self {
        self.bruteforce_max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn token_secret(&self) -> &[u8] {
        self.token_secret.expose_secret().as_bytes()
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

pub struct AuthState {
    config: AuthConfig,
    guard: BruteForceGuard,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let guard = BruteForceGuard::new(
            config.bruteforce_window,
            config.bruteforce_max_attempts,
        );
        Self { config, guard }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn guard(&self) -> &BruteForceGuard {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = AuthConfig::new(SecretString::from("secreto"));
        assert_eq!(config.token_ttl_seconds(), 8 * 60 * 60);
        assert_eq!(config.token_secret(), b"secreto");

        let config = config
            .with_token_ttl_seconds(60)
            .with_bruteforce_window(Duration::from_secs(1))
            .with_bruteforce_max_attempts(2);
        assert_eq!(config.token_ttl_seconds(), 60);
        assert_eq!(config.bruteforce_window, Duration::from_secs(1));
        assert_eq!(config.bruteforce_max_attempts, 2);
    }
}
