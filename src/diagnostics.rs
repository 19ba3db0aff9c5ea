//! Out-of-band diagnostic record of authentication errors.
//! The protected-view flow never shows error detail; this bounded, newest-first log keeps it
//! for post-hoc debugging.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::config::DEFAULT_DIAGNOSTICS_CAPACITY;
use crate::error::AuthError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub at: DateTime<Utc>,
    pub component: &'static str,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    inner: Arc<Mutex<VecDeque<DiagnosticRecord>>>,
    capacity: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self { Self::new(DEFAULT_DIAGNOSTICS_CAPACITY) }
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity }
    }

    pub fn capacity(&self) -> usize { self.capacity }

    pub fn record(&self, component: &'static str, err: &AuthError) {
        warn!(target: "keygate::diagnostics", component = component, code = err.code_str(), "{}", err);
        let rec = DiagnosticRecord { at: Utc::now(), component, code: err.code_str().to_string(), message: err.to_string() };
        let mut q = self.inner.lock();
        q.push_front(rec);
        q.truncate(self.capacity);
    }

    /// Record a failed authentication attempt. Exhaustion is skipped: the coordinator records it
    /// where it happens, and every waiter sees the same error.
    pub fn record_auth_failure(&self, component: &'static str, err: &AuthError) {
        if matches!(err, AuthError::InitializationExhausted { .. }) { return; }
        self.record(component, err);
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<DiagnosticRecord> { self.inner.lock().iter().cloned().collect() }

    pub fn latest(&self) -> Option<DiagnosticRecord> { self.inner.lock().front().cloned() }

    pub fn len(&self) -> usize { self.inner.lock().len() }

    pub fn is_empty(&self) -> bool { self.inner.lock().is_empty() }

    pub fn clear(&self) { self.inner.lock().clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_bounded() {
        let log = DiagnosticLog::new(3);
        for i in 0..5u64 {
            log.record("gate", &AuthError::AuthenticationTimeout { after_ms: i });
        }
        let recs = log.recent();
        assert_eq!(recs.len(), 3);
        assert!(recs[0].message.contains("4ms"));
        assert!(recs[2].message.contains("2ms"));
        assert_eq!(log.latest().map(|r| r.code), Some("authentication_timeout".to_string()));
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let log = DiagnosticLog::new(0);
        log.record("adapter", &AuthError::CapabilityUnavailable);
        log.record("adapter", &AuthError::NotReady);
        assert_eq!(log.len(), 1);
        assert_eq!(log.recent()[0].code, "not_ready");
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn exhaustion_is_left_to_the_coordinator() {
        let log = DiagnosticLog::new(4);
        log.record_auth_failure("gate", &AuthError::InitializationExhausted { attempts: 5, last_error: "gone".into() });
        assert!(log.is_empty());
        log.record_auth_failure("gate", &AuthError::AuthenticationTimeout { after_ms: 10_000 });
        assert_eq!(log.latest().map(|r| r.component), Some("gate"));
    }

    #[test]
    fn clones_share_storage() {
        let log = DiagnosticLog::default();
        let other = log.clone();
        other.record("router", &AuthError::CapabilityUnavailable);
        assert_eq!(log.len(), 1);
        assert_eq!(log.capacity(), DEFAULT_DIAGNOSTICS_CAPACITY);
    }
}
