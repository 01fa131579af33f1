use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Debug)]
struct RateLimitEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Fixed-window limiter keyed by an arbitrary string (login uses the username).
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    /// Max attempts per window
    max_requests: u32,
    /// Window duration in seconds
    window_seconds: i64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window_seconds,
        }
    }

    /// Count one attempt for `key`.
    /// Returns Ok(()) if allowed, Err(message) if the key is over its budget.
    pub fn check(&self, key: &str) -> Result<(), String> {
        self.check_at(key, Utc::now())
    }

    fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| "Failed to acquire rate limiter lock".to_string())?;

        let window_duration = Duration::seconds(self.window_seconds);

        entries.retain(|_, e| now < e.window_start + window_duration);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: now,
            });

        if now >= entry.window_start + window_duration {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        if entry.count > self.max_requests {
            let retry_after = (entry.window_start + window_duration - now).num_seconds();
            return Err(format!(
                "Too many attempts. Max {} per {} seconds. Try again in {} seconds.",
                self.max_requests,
                self.window_seconds,
                retry_after.max(0)
            ));
        }

        Ok(())
    }

    /// Forget the attempts for `key` (after a successful login).
    pub fn reset(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_budget_and_recovers_after_window() {
        let limiter = RateLimiter::new(2, 60);
        let t0 = Utc::now();

        assert!(limiter.check_at("alice", t0).is_ok());
        assert!(limiter.check_at("alice", t0).is_ok());
        let err = limiter.check_at("alice", t0).unwrap_err();
        assert!(err.contains("Too many attempts"));

        // other keys are independent
        assert!(limiter.check_at("bob", t0).is_ok());

        assert!(limiter.check_at("alice", t0 + Duration::seconds(61)).is_ok());
    }

    #[test]
    fn expired_windows_are_dropped() {
        let limiter = RateLimiter::new(5, 60);
        let t0 = Utc::now();

        for i in 0..100 {
            assert!(limiter.check_at(&format!("user{i}"), t0).is_ok());
        }
        assert_eq!(limiter.entries.lock().unwrap().len(), 100);

        assert!(limiter.check_at("late", t0 + Duration::seconds(61)).is_ok());
        let entries = limiter.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("late"));
    }

    #[test]
    fn reset_clears_attempts() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("carol").is_ok());
        assert!(limiter.check("carol").is_err());

        limiter.reset("carol");
        assert!(limiter.check("carol").is_ok());
    }
}
