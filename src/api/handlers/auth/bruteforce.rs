//! In-process brute-force guard for login attempts.
//!
//! One record per identifier (lower-cased email, falling back to the client
//! IP): attempt count, first-attempt instant, optional block deadline. The
//! window-elapsed reset runs before the block check, and the block check
//! runs before any credential work. A successful login deletes the record
//! outright.
//!
//! State lives in this process only: it is lost on restart and is not shared
//! across horizontally scaled instances. Scaling out would need a shared
//! keyed TTL store instead.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked,
}

#[derive(Debug)]
struct AttemptRecord {
    attempts: u32,
    first_attempt: Instant,
    blocked_until: Option<Instant>,
}

#[derive(Debug)]
pub struct BruteForceGuard {
    window: Duration,
    max_attempts: u32,
    attempts: Mutex<HashMap<String, AttemptRecord>>,
}

impl Default for BruteForceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_ATTEMPTS)
    }
}

impl BruteForceGuard {
    #[must_use]
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            window,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the guard identifier for a login attempt: the email when one
    /// was supplied, otherwise the client IP, lower-cased either way.
    #[must_use]
    pub fn identifier(email: &str, client_ip: Option<&str>) -> String {
        let email = email.trim();
        if email.is_empty() {
            client_ip.unwrap_or("unknown").to_lowercase()
        } else {
            email.to_lowercase()
        }
    }

    /// Gate an attempt. Runs before credential verification.
    pub async fn check(&self, identifier: &str) -> Decision {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;

        if let Some(record) = attempts.get(identifier) {
            // Window elapsed since the first attempt: forget the record,
            // including any block it carried.
            if now.duration_since(record.first_attempt) > self.window {
                attempts.remove(identifier);
                return Decision::Allowed;
            }
            if let Some(blocked_until) = record.blocked_until
                && now < blocked_until
            {
                return Decision::Blocked;
            }
        }

        Decision::Allowed
    }

    /// Count a failed attempt; the Nth failure sets the block deadline.
    pub async fn register_failure(&self, identifier: &str) {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;

        let record = attempts
            .entry(identifier.to_string())
            .or_insert_with(|| AttemptRecord {
                attempts: 0,
                first_attempt: now,
                blocked_until: None,
            });

        record.attempts += 1;
        if record.attempts >= self.max_attempts {
            record.blocked_until = Some(now + self.window);
            tracing::warn!("Blocked {identifier} after too many failed login attempts");
        }
    }

    /// Full reset on success, not a decrement.
    pub async fn clear(&self, identifier: &str) {
        self.attempts.lock().await.remove(identifier);
    }
}
