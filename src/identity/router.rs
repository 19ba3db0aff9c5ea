//! Auth event router.
//!
//! Turns login/signup/logout notifications into session work. Login and signup are debounced
//! (only the latest scheduled re-resolution fires); logout is applied synchronously and cancels
//! whatever re-resolution was pending.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::diagnostics::DiagnosticLog;
use crate::tprintln;

use super::adapter::SignerAdapter;
use super::coordinator::ProviderCoordinator;
use super::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthEventKind {
    Login,
    Signup,
    Logout,
}

/// Broadcast payload: `{"type": "login", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthNotification {
    #[serde(rename = "type")]
    pub kind: AuthEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

impl AuthNotification {
    pub fn new(kind: AuthEventKind) -> Self { Self { kind, method: None, pubkey: None } }
    pub fn login() -> Self { Self::new(AuthEventKind::Login) }
    pub fn signup() -> Self { Self::new(AuthEventKind::Signup) }
    pub fn logout() -> Self { Self::new(AuthEventKind::Logout) }
}

/// Spawned task that is aborted when the guard is replaced or dropped.
#[derive(Debug)]
struct TaskGuard(Option<JoinHandle<()>>);

impl TaskGuard {
    /// Let a finished task go without aborting it.
    fn release(mut self) { self.0.take(); }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(h) = self.0.take() { h.abort(); }
    }
}

/// Everything a debounced re-resolution needs; cloned into timer tasks.
#[derive(Clone)]
struct RouterCore {
    session: SessionStore,
    adapter: SignerAdapter,
    coordinator: Option<ProviderCoordinator>,
    diagnostics: DiagnosticLog,
    debounce: Duration,
    pending: Arc<Mutex<Option<TaskGuard>>>,
    seq: Arc<AtomicU64>,
}

/// Owns the listener task; dropping the router tears both the listener and any timer down.
pub struct AuthEventRouter {
    core: RouterCore,
    listener: Mutex<Option<TaskGuard>>,
}

impl AuthEventRouter {
    pub fn new(session: SessionStore, adapter: SignerAdapter, diagnostics: DiagnosticLog, debounce: Duration) -> Self {
        let core = RouterCore {
            session,
            adapter,
            coordinator: None,
            diagnostics,
            debounce,
            pending: Arc::new(Mutex::new(None)),
            seq: Arc::new(AtomicU64::new(0)),
        };
        Self { core, listener: Mutex::new(None) }
    }

    /// Re-resolution first makes sure the capability is attached.
    pub fn with_coordinator(mut self, coordinator: ProviderCoordinator) -> Self {
        self.core.coordinator = Some(coordinator);
        self
    }

    pub fn debounce(&self) -> Duration { self.core.debounce }

    pub fn has_pending(&self) -> bool { self.core.pending.lock().is_some() }

    pub fn is_listening(&self) -> bool { self.listener.lock().is_some() }

    /// Start consuming notifications. Replaces any previous listener.
    pub fn attach(&self, mut rx: broadcast::Receiver<AuthNotification>) {
        let core = self.core.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(n) => core.handle(&n),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: "keygate::router", skipped, "auth notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(target: "keygate::router", "notification channel closed");
        });
        *self.listener.lock() = Some(TaskGuard(Some(handle)));
    }

    /// Apply one notification. Logout takes effect before this returns.
    pub fn handle(&self, n: &AuthNotification) { self.core.handle(n) }

    /// Detach the listener and cancel any pending timer.
    pub fn shutdown(&self) {
        let had_listener = self.listener.lock().take().is_some();
        let had_pending = self.core.pending.lock().take().is_some();
        if had_listener || had_pending {
            debug!(target: "keygate::router", had_listener, had_pending, "router shut down");
        }
    }
}

impl Drop for AuthEventRouter {
    fn drop(&mut self) { self.shutdown(); }
}

impl RouterCore {
    fn handle(&self, n: &AuthNotification) {
        match n.kind {
            AuthEventKind::Login | AuthEventKind::Signup => self.schedule_resolution(n.kind),
            AuthEventKind::Logout => self.apply_logout(),
        }
    }

    fn schedule_resolution(&self, kind: AuthEventKind) {
        let this = self.clone();
        let delay = self.debounce;
        let mut pending = self.pending.lock();
        let my_seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        // Replacing the guard aborts the superseded timer.
        pending.take();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.reresolve().await;
            let mut p = this.pending.lock();
            if this.seq.load(Ordering::SeqCst) == my_seq {
                if let Some(g) = p.take() { g.release(); }
            }
        });
        *pending = Some(TaskGuard(Some(handle)));
        tprintln!("router.schedule kind={:?} delay_ms={}", kind, delay.as_millis());
    }

    async fn reresolve(&self) {
        // New account: never serve the previous identity from cache.
        self.adapter.invalidate();
        let coordinator = self.coordinator.as_ref();
        let adapter = &self.adapter;
        let lookup = async move {
            if let Some(c) = coordinator { c.ensure_initialized().await?; }
            adapter.get_identity().await
        };
        match self.session.resolve_with(lookup).await {
            Ok(pk) => info!(target: "keygate::router", pubkey = pk.short(), "re-resolved after auth event"),
            Err(e) => self.diagnostics.record_auth_failure("router", &e),
        }
    }

    fn apply_logout(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        if self.pending.lock().take().is_some() {
            debug!(target: "keygate::router", "pending re-resolution cancelled by logout");
        }
        self.adapter.invalidate();
        self.session.logout();
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod router_tests;
