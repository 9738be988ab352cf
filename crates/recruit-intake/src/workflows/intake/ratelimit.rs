use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use super::clock::Clock;

/// Key used for the process-wide submission ceiling shared by every caller.
pub const GLOBAL_SUBMISSION_KEY: &str = "global";

/// The throttled request classes. Each tier keeps an independent counter per
/// identity key; exhausting one never touches another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitTier {
    /// OTP send, keyed by network address.
    CodeSend,
    /// OTP verify, keyed by network address.
    VerifyByAddress,
    /// OTP verify, keyed by the declared email. Pre-auth throttle: there is
    /// no authenticated identity at this point, and that is intentional.
    VerifyByEmail,
    /// Application submit, keyed by network address.
    Submission,
    /// Application submit, single shared key across all identities.
    SubmissionGlobal,
}

/// Budget for one tier: at most `max_requests` within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl TierPolicy {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        TierPolicy {
            window,
            max_requests,
        }
    }
}

/// Per-tier budgets. Defaults mirror the public careers deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub code_send: TierPolicy,
    pub verify_by_address: TierPolicy,
    pub verify_by_email: TierPolicy,
    pub submission: TierPolicy,
    pub submission_global: TierPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            code_send: TierPolicy::new(Duration::minutes(10), 5),
            verify_by_address: TierPolicy::new(Duration::minutes(10), 10),
            verify_by_email: TierPolicy::new(Duration::minutes(10), 5),
            submission: TierPolicy::new(Duration::hours(1), 3),
            submission_global: TierPolicy::new(Duration::hours(1), 100),
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self, tier: LimitTier) -> TierPolicy {
        match tier {
            LimitTier::CodeSend => self.code_send,
            LimitTier::VerifyByAddress => self.verify_by_address,
            LimitTier::VerifyByEmail => self.verify_by_email,
            LimitTier::Submission => self.submission,
            LimitTier::SubmissionGlobal => self.submission_global,
        }
    }
}

#[derive(Debug)]
struct WindowCounter {
    window_started: DateTime<Utc>,
    count: u32,
}

/// Fixed-window request counter keyed by `(tier, identity)`.
///
/// Counters are created lazily on first sight of a key. The outer map lock is
/// held only to fetch or create a counter cell; counting itself runs under
/// the per-key lock, so distinct keys do not contend.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<Clock>,
    counters: Mutex<HashMap<(LimitTier, String), Arc<Mutex<WindowCounter>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<Clock>) -> Self {
        RateLimiter {
            config,
            clock,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Consumes one request from the key's budget. Returns false, without
    /// counting the attempt, once the window budget is spent; the window
    /// restarts after `policy.window` elapses.
    pub fn allow(&self, tier: LimitTier, key: &str) -> bool {
        let policy = self.config.policy(tier);
        let cell = {
            let mut counters = self.counters.lock().expect("rate limiter mutex poisoned");
            counters
                .entry((tier, key.to_string()))
                .or_insert_with(|| {
                    Arc::new(Mutex::new(WindowCounter {
                        window_started: self.clock.now(),
                        count: 0,
                    }))
                })
                .clone()
        };

        let mut counter = cell.lock().expect("rate limiter mutex poisoned");
        let now = self.clock.now();
        if now - counter.window_started >= policy.window {
            counter.window_started = now;
            counter.count = 0;
        }

        if counter.count < policy.max_requests {
            counter.count += 1;
            true
        } else {
            false
        }
    }

    /// Drops counters whose window has fully elapsed so idle keys do not
    /// accumulate. Safe to call from a periodic reaper.
    pub fn prune_idle(&self) -> usize {
        let now = self.clock.now();
        let mut counters = self.counters.lock().expect("rate limiter mutex poisoned");
        let before = counters.len();
        counters.retain(|(tier, _), cell| {
            let counter = cell.lock().expect("rate limiter mutex poisoned");
            now - counter.window_started < self.config.policy(*tier).window
        });
        before - counters.len()
    }

    #[cfg(test)]
    pub(crate) fn tracked_keys(&self) -> usize {
        self.counters
            .lock()
            .expect("rate limiter mutex poisoned")
            .len()
    }
}
