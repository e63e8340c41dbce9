//! Per-identity login throttling.
//!
//! Every identity (login email) that has attempted a login owns one
//! [`AttemptRecord`]. After `lockout_attempts` consecutive failures the
//! identity is locked until `lockout_duration` has passed since the last
//! failure; the first attempt after that starts again from zero.
//!
//! The map lock is only held inside each call. A login spans
//! [`LoginGuard::admit`] and a later `record_*` call with credential checks in
//! between, so concurrent attempts for the same identity may interleave and
//! overshoot the threshold by the number of in-flight requests.

use crate::config::LoginGuardConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Consecutive failures since the last reset.
    pub attempts: u32,
    /// Time of the most recent failure or reset.
    pub last_attempt_time: DateTime<Utc>,
}

impl AttemptRecord {
    fn reset(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            last_attempt_time: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Locked { until: DateTime<Utc> },
}

#[derive(Debug)]
pub struct LoginGuard {
    lockout_attempts: u32,
    lockout_duration: Duration,
    cleanup_interval: std::time::Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl LoginGuard {
    pub fn new(config: &LoginGuardConfig) -> Self {
        Self {
            lockout_attempts: config.lockout_attempts.max(1),
            lockout_duration: Duration::minutes(config.lockout_duration_minutes.max(0)),
            cleanup_interval: std::time::Duration::from_secs(config.cleanup_interval_seconds.max(1)),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether an attempt for `identity` may proceed to credential
    /// checks. A lock whose window has elapsed is reset here, so the attempt
    /// is evaluated as if it were the first one.
    pub async fn admit(&self, identity: &str, now: DateTime<Utc>) -> GuardDecision {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(identity) else {
            return GuardDecision::Proceed;
        };

        if record.attempts < self.lockout_attempts {
            return GuardDecision::Proceed;
        }

        if now - record.last_attempt_time < self.lockout_duration {
            return GuardDecision::Locked {
                until: record.last_attempt_time + self.lockout_duration,
            };
        }

        debug!(identity = %identity, "lockout window elapsed, resetting attempts");
        *record = AttemptRecord::reset(now);
        GuardDecision::Proceed
    }

    pub async fn record_success(&self, identity: &str, now: DateTime<Utc>) {
        self.records.lock().await.insert(identity.to_string(), AttemptRecord::reset(now));
    }

    /// Counts one more consecutive failure and returns the new total.
    pub async fn record_failure(&self, identity: &str, now: DateTime<Utc>) -> u32 {
        let mut records = self.records.lock().await;
        let record = records.entry(identity.to_string()).or_insert_with(|| AttemptRecord::reset(now));
        record.attempts += 1;
        record.last_attempt_time = now;
        record.attempts
    }

    pub async fn record(&self, identity: &str) -> Option<AttemptRecord> {
        self.records.lock().await.get(identity).copied()
    }

    /// Drops records that no longer influence any decision: those reset to
    /// zero and expired locks. Partial failure counts are kept.
    pub async fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| {
            let fresh = record.attempts == 0;
            let expired_lock = record.attempts >= self.lockout_attempts && now - record.last_attempt_time >= self.lockout_duration;
            !(fresh || expired_lock)
        });
        before - records.len()
    }

    pub fn spawn_cleanup_task(self: Arc<Self>) {
        let cleanup_interval = self.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_interval);
            loop {
                ticker.tick().await;
                let removed = self.prune(Utc::now()).await;
                if removed > 0 {
                    debug!(removed = removed, "pruned idle login attempt records");
                }
            }
        });
    }
}
