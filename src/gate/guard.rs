//! Access gate for protected views.
//!
//! `CheckingAuth -> Authenticating -> {Ready | WaitingForConnection | Redirecting}`.
//! The fallback deadline covers the whole authentication attempt (signer initialization plus
//! key resolution). It is a scoped timer: it disappears with the attempt on every exit path,
//! including when the caller drops `enter()` on unmount.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::diagnostics::DiagnosticLog;
use crate::error::AuthError;
use crate::identity::{ProviderCoordinator, SessionStatus, SessionStore, SignerAdapter};
use crate::tprintln;

use super::allowlist::Allowlist;
use super::policy::{evaluate, fetch_inputs, AccessDecision, PolicySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    CheckingAuth,
    Authenticating,
    Redirecting,
    WaitingForConnection,
    Ready,
}

impl GateState {
    /// Text for the protected view. Redirects are silent.
    pub fn status_message(self) -> Option<&'static str> {
        match self {
            GateState::CheckingAuth => Some("Checking authentication..."),
            GateState::Authenticating => Some("Authenticating..."),
            GateState::WaitingForConnection => Some("Connecting to relays..."),
            GateState::Redirecting | GateState::Ready => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOptions {
    pub require_auth: bool,
    pub require_connection: bool,
}

impl Default for GateOptions {
    fn default() -> Self { Self { require_auth: true, require_connection: false } }
}

/// Shared collaborators, normally handed out by `AuthContext`.
#[derive(Debug, Clone)]
pub struct GateDeps {
    pub session: SessionStore,
    pub adapter: SignerAdapter,
    pub coordinator: ProviderCoordinator,
    pub allowlist: Arc<Allowlist>,
    pub diagnostics: DiagnosticLog,
    pub auth_timeout: Duration,
    pub redirect_target: String,
}

/// One mounted protected view.
pub struct AccessGate {
    deps: GateDeps,
    options: GateOptions,
    connection: Option<watch::Receiver<bool>>,
    state: watch::Sender<GateState>,
    /// Session epoch of the one resolution attempt this mount may make.
    attempted: Mutex<Option<u64>>,
}

impl AccessGate {
    pub fn new(deps: GateDeps, options: GateOptions) -> Self {
        let (state, _rx) = watch::channel(GateState::CheckingAuth);
        Self { deps, options, connection: None, state, attempted: Mutex::new(None) }
    }

    /// Connectivity to the backing service; only consulted when `require_connection` is set.
    pub fn with_connection(mut self, rx: watch::Receiver<bool>) -> Self {
        self.connection = Some(rx);
        self
    }

    pub fn state(&self) -> GateState { *self.state.borrow() }

    pub fn subscribe(&self) -> watch::Receiver<GateState> { self.state.subscribe() }

    pub fn status_message(&self) -> Option<&'static str> { self.state().status_message() }

    /// Where to navigate, once the gate has decided to redirect.
    pub fn redirect_target(&self) -> Option<&str> {
        (self.state() == GateState::Redirecting).then_some(self.deps.redirect_target.as_str())
    }

    fn set(&self, next: GateState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(target: "keygate::gate", from = ?prev, to = ?next, "gate transition");
        }
    }

    /// Run the gate to a resting state and return it.
    pub async fn enter(&self) -> GateState {
        if !self.options.require_auth { return self.after_auth(); }
        let snap = self.deps.session.snapshot();
        if snap.is_established() { return self.after_auth(); }

        {
            let mut attempted = self.attempted.lock();
            if *attempted == Some(snap.epoch()) {
                // Already tried for this session; never start a second resolution.
                let current = self.state();
                let settled = match snap.status() {
                    SessionStatus::Failed | SessionStatus::Uninitialized => GateState::Redirecting,
                    SessionStatus::Resolving | SessionStatus::Established => current,
                };
                drop(attempted);
                self.set(settled);
                return settled;
            }
            *attempted = Some(snap.epoch());
        }

        self.set(GateState::Authenticating);
        let timeout = self.deps.auth_timeout;
        let coordinator = &self.deps.coordinator;
        let adapter = &self.deps.adapter;
        let lookup = async move {
            let attempt = async {
                coordinator.ensure_initialized().await?;
                adapter.get_identity().await
            };
            match tokio::time::timeout(timeout, attempt).await {
                Ok(r) => r,
                Err(_) => Err(AuthError::AuthenticationTimeout { after_ms: timeout.as_millis() as u64 }),
            }
        };
        match self.deps.session.resolve_with(lookup).await {
            Ok(pk) => {
                info!(target: "keygate::gate", pubkey = pk.short(), "authenticated");
                self.after_auth()
            }
            Err(e) => {
                warn!(target: "keygate::gate", code = e.code_str(), "authentication failed, redirecting");
                self.deps.diagnostics.record_auth_failure("gate", &e);
                self.set(GateState::Redirecting);
                GateState::Redirecting
            }
        }
    }

    fn after_auth(&self) -> GateState {
        let next = if self.options.require_connection && !self.connected() {
            GateState::WaitingForConnection
        } else {
            GateState::Ready
        };
        self.set(next);
        next
    }

    fn connected(&self) -> bool {
        self.connection.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// From `WaitingForConnection`, wait until the connection is up and become `Ready`.
    /// Returns the state unchanged from any other state, or if the connection source closes.
    pub async fn wait_for_connection(&self) -> GateState {
        if self.state() != GateState::WaitingForConnection { return self.state(); }
        let Some(mut rx) = self.connection.clone() else { return self.state(); };
        if rx.wait_for(|up| *up).await.is_ok() {
            self.set(GateState::Ready);
        }
        self.state()
    }

    /// End this mount: the next `enter()` may attempt resolution again.
    pub fn unmount(&self) {
        *self.attempted.lock() = None;
        self.set(GateState::CheckingAuth);
        tprintln!("gate.unmount");
    }

    /// Policy overlay; `Pending` while the gate is still settling, `Denied` once it redirects.
    pub async fn check_access(&self, source: &dyn PolicySource) -> AccessDecision {
        match self.state() {
            GateState::Ready => {}
            GateState::Redirecting => return AccessDecision::Denied,
            GateState::CheckingAuth | GateState::Authenticating | GateState::WaitingForConnection => {
                return AccessDecision::Pending;
            }
        }
        let Some(key) = self.deps.session.public_key() else {
            return if self.options.require_auth { AccessDecision::Pending } else { AccessDecision::Denied };
        };
        // Allowlist first, independently of the remote lookups.
        if !self.deps.allowlist.contains(&key) {
            debug!(target: "keygate::gate", pubkey = key.short(), "not allowlisted");
            return AccessDecision::Denied;
        }
        let inputs = fetch_inputs(source, &self.deps.allowlist, &key, &self.deps.diagnostics, Utc::now()).await;
        evaluate(&inputs)
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod guard_tests;
