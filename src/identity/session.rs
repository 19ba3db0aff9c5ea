//! Identity session store.
//!
//! One `IdentitySession` per process, written only by `resolve*` and `logout`. The whole session
//! lives inside a `watch` channel so status and key are always replaced together and every
//! transition is published to subscribers.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::tprintln;

use super::adapter::SignerAdapter;
use super::keys::PublicKeyHex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Uninitialized,
    Resolving,
    Established,
    Failed,
}

/// Snapshot of the session. Fields are private: `Established` always carries a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySession {
    public_key: Option<PublicKeyHex>,
    status: SessionStatus,
    last_error: Option<AuthError>,
    epoch: u64,
}

impl IdentitySession {
    fn empty(epoch: u64) -> Self { Self { public_key: None, status: SessionStatus::Uninitialized, last_error: None, epoch } }

    pub fn public_key(&self) -> Option<&PublicKeyHex> { self.public_key.as_ref() }
    pub fn status(&self) -> SessionStatus { self.status }
    pub fn last_error(&self) -> Option<&AuthError> { self.last_error.as_ref() }
    /// Bumped by every logout.
    pub fn epoch(&self) -> u64 { self.epoch }

    pub fn is_established(&self) -> bool { self.status == SessionStatus::Established }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<IdentitySession>>,
    ticket: Arc<AtomicU64>,
}

impl Default for SessionStore {
    fn default() -> Self { Self::new() }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IdentitySession::empty(0));
        Self { tx: Arc::new(tx), ticket: Arc::new(AtomicU64::new(0)) }
    }

    pub fn snapshot(&self) -> IdentitySession { self.tx.borrow().clone() }

    pub fn status(&self) -> SessionStatus { self.tx.borrow().status }

    pub fn public_key(&self) -> Option<PublicKeyHex> { self.tx.borrow().public_key.clone() }

    pub fn subscribe(&self) -> watch::Receiver<IdentitySession> { self.tx.subscribe() }

    /// Resolve through the adapter.
    pub async fn resolve(&self, adapter: &SignerAdapter) -> AuthResult<PublicKeyHex> {
        self.resolve_with(adapter.get_identity()).await
    }

    /// Resolve using an arbitrary lookup (callers wrap it in their own deadline).
    ///
    /// A result that lands after a logout is discarded. If this future is dropped before the
    /// lookup finishes, a still-`Resolving` session goes back to `Uninitialized`.
    pub async fn resolve_with<F>(&self, lookup: F) -> AuthResult<PublicKeyHex>
    where
        F: Future<Output = AuthResult<PublicKeyHex>>,
    {
        let ticket = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut epoch = 0;
        self.tx.send_modify(|s| {
            epoch = s.epoch;
            *s = IdentitySession { status: SessionStatus::Resolving, ..IdentitySession::empty(s.epoch) };
        });
        debug!(target: "keygate::session", epoch, ticket, "resolving");
        let mut guard = ResolveGuard { store: self, epoch, ticket, armed: true };

        let result = lookup.await;
        guard.armed = false;

        let applied = self.tx.send_if_modified(|s| {
            if s.epoch != epoch { return false; }
            *s = match &result {
                Ok(pk) => IdentitySession { public_key: Some(pk.clone()), status: SessionStatus::Established, last_error: None, epoch },
                Err(e) => IdentitySession { status: SessionStatus::Failed, last_error: Some(e.clone()), ..IdentitySession::empty(epoch) },
            };
            true
        });
        match (&result, applied) {
            (Ok(pk), true) => info!(target: "keygate::session", pubkey = pk.short(), "session established"),
            (Err(e), true) => warn!(target: "keygate::session", code = e.code_str(), "session resolution failed: {}", e),
            (_, false) => tprintln!("session.resolve discarded epoch={} ticket={}", epoch, ticket),
        }
        if !applied {
            // Logged out while resolving; the caller must not treat this as a live session.
            return Err(AuthError::NotReady);
        }
        result
    }

    /// Reset to `Uninitialized`. Safe to call repeatedly.
    pub fn logout(&self) {
        let mut prev = SessionStatus::Uninitialized;
        self.tx.send_modify(|s| {
            prev = s.status;
            *s = IdentitySession::empty(s.epoch + 1);
        });
        info!(target: "keygate::session", previous = ?prev, "session cleared");
    }

    fn abandon(&self, epoch: u64, ticket: u64) {
        if self.ticket.load(Ordering::SeqCst) != ticket { return; }
        let reset = self.tx.send_if_modified(|s| {
            if s.epoch != epoch || s.status != SessionStatus::Resolving { return false; }
            *s = IdentitySession::empty(epoch);
            true
        });
        if reset { debug!(target: "keygate::session", epoch, "resolution abandoned"); }
    }
}

struct ResolveGuard<'a> {
    store: &'a SessionStore,
    epoch: u64,
    ticket: u64,
    armed: bool,
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        if self.armed { self.store.abandon(self.epoch, self.ticket); }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
