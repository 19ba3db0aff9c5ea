//! Provider initialization coordinator.
//!
//! Attaches the external signing capability with device-aware retries. Concurrent callers of
//! [`ProviderCoordinator::ensure_initialized`] share one in-flight attempt sequence; the
//! sequence runs on its own task so it keeps going even if every waiter goes away.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DeviceClass;
use crate::diagnostics::DiagnosticLog;
use crate::error::{AuthError, AuthResult};
use crate::tprintln;

use super::signer::{CapabilityAttacher, CapabilityHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
}

type InFlight = Shared<BoxFuture<'static, AuthResult<()>>>;

/// Live attempt bookkeeping; one per coordinator, never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitializationAttempt {
    pub attempt_number: u32,
    pub max_attempts: u32,
    #[serde(serialize_with = "ser_millis")]
    pub retry_delay: Duration,
}

fn ser_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

struct CoordinatorState {
    state: InitState,
    attempt: InitializationAttempt,
    in_flight: Option<InFlight>,
}

#[derive(Clone)]
pub struct ProviderCoordinator {
    inner: Arc<Mutex<CoordinatorState>>,
    attacher: Arc<dyn CapabilityAttacher>,
    host: CapabilityHost,
    diagnostics: DiagnosticLog,
}

impl std::fmt::Debug for ProviderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCoordinator").field("state", &self.state()).field("attempt", &self.attempt()).finish()
    }
}

impl ProviderCoordinator {
    pub fn new(device: DeviceClass, attacher: Arc<dyn CapabilityAttacher>, host: CapabilityHost, diagnostics: DiagnosticLog) -> Self {
        Self::with_policy(device.max_attempts(), device.retry_delay(), attacher, host, diagnostics)
    }

    pub fn with_policy(
        max_attempts: u32,
        retry_delay: Duration,
        attacher: Arc<dyn CapabilityAttacher>,
        host: CapabilityHost,
        diagnostics: DiagnosticLog,
    ) -> Self {
        let attempt = InitializationAttempt { attempt_number: 0, max_attempts: max_attempts.max(1), retry_delay };
        Self {
            inner: Arc::new(Mutex::new(CoordinatorState { state: InitState::NotStarted, attempt, in_flight: None })),
            attacher,
            host,
            diagnostics,
        }
    }

    pub fn state(&self) -> InitState { self.inner.lock().state }

    pub fn attempt(&self) -> InitializationAttempt { self.inner.lock().attempt }

    pub fn is_in_flight(&self) -> bool { self.inner.lock().in_flight.is_some() }

    /// Attach the capability once. Returns immediately after success, joins an attempt that is
    /// already running, and starts a fresh sequence after a previous failure.
    pub async fn ensure_initialized(&self) -> AuthResult<()> {
        let fut = {
            let mut g = self.inner.lock();
            match (g.state, g.in_flight.clone()) {
                (InitState::Succeeded, _) => return Ok(()),
                (InitState::InProgress, Some(f)) => {
                    tprintln!("coordinator.join attempt={}", g.attempt.attempt_number);
                    f
                }
                _ => {
                    g.state = InitState::InProgress;
                    g.attempt.attempt_number = 0;
                    let this = self.clone();
                    let handle = tokio::spawn(async move { this.run_attempts().await });
                    let f: InFlight = async move {
                        match handle.await {
                            Ok(r) => r,
                            Err(e) => Err(AuthError::InitializationExhausted { attempts: 0, last_error: e.to_string() }),
                        }
                    }
                    .boxed()
                    .shared();
                    g.in_flight = Some(f.clone());
                    debug!(target: "keygate::coordinator", max_attempts = g.attempt.max_attempts, "initialization started");
                    f
                }
            }
        };
        fut.await
    }

    async fn run_attempts(&self) -> AuthResult<()> {
        let (max, delay) = {
            let g = self.inner.lock();
            (g.attempt.max_attempts, g.attempt.retry_delay)
        };
        let mut last_error = String::new();
        for n in 1..=max {
            self.inner.lock().attempt.attempt_number = n;
            match self.attacher.attach().await {
                Ok(cap) => {
                    self.host.install(cap);
                    self.finish(InitState::Succeeded);
                    info!(target: "keygate::coordinator", attempt = n, "signing capability attached");
                    return Ok(());
                }
                Err(e) => {
                    last_error = format!("{:#}", e);
                    debug!(target: "keygate::coordinator", attempt = n, max, "attach failed: {}", last_error);
                }
            }
            if n < max { tokio::time::sleep(delay).await; }
        }
        let err = AuthError::InitializationExhausted { attempts: max, last_error };
        self.finish(InitState::Failed);
        warn!(target: "keygate::coordinator", attempts = max, "signing capability never attached");
        self.diagnostics.record("coordinator", &err);
        Err(err)
    }

    fn finish(&self, state: InitState) {
        let mut g = self.inner.lock();
        g.state = state;
        g.in_flight = None;
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod coordinator_tests;
