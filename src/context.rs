//! Startup wiring. One `AuthContext` is built per process and threaded to every protected view;
//! nothing in the crate reaches for ambient globals when a context is available.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::config::GateConfig;
use crate::diagnostics::DiagnosticLog;
use crate::gate::{AccessGate, Allowlist, GateDeps, GateOptions};
use crate::identity::{
    AuthEventRouter, AuthNotification, CapabilityAttacher, CapabilityHost, HostProbe, ProviderCoordinator, SessionStore,
    SignerAdapter,
};

#[derive(Debug, Clone)]
pub struct AuthContext {
    config: GateConfig,
    host: CapabilityHost,
    adapter: SignerAdapter,
    session: SessionStore,
    coordinator: ProviderCoordinator,
    allowlist: Arc<Allowlist>,
    diagnostics: DiagnosticLog,
}

impl AuthContext {
    pub fn new(config: GateConfig, attacher: Arc<dyn CapabilityAttacher>) -> Self {
        Self::with_host(config, CapabilityHost::new(), attacher)
    }

    /// Default wiring: the capability appears when the host environment installs it.
    pub fn with_host_probe(config: GateConfig) -> Self {
        let host = CapabilityHost::new();
        let probe = Arc::new(HostProbe::new(host.clone()));
        Self::with_host(config, host, probe)
    }

    pub fn with_host(config: GateConfig, host: CapabilityHost, attacher: Arc<dyn CapabilityAttacher>) -> Self {
        let diagnostics = DiagnosticLog::new(config.diagnostics_capacity);
        let coordinator = ProviderCoordinator::new(config.device_class, attacher, host.clone(), diagnostics.clone());
        let allowlist = Arc::new(Allowlist::from_config(&config));
        info!(
            target: "keygate::context",
            device = ?config.device_class,
            allowlist_enabled = allowlist.is_enabled(),
            allowlist_entries = allowlist.len(),
            "auth context ready"
        );
        Self {
            adapter: SignerAdapter::new(host.clone()),
            session: SessionStore::new(),
            coordinator,
            allowlist,
            diagnostics,
            host,
            config,
        }
    }

    pub fn config(&self) -> &GateConfig { &self.config }
    pub fn host(&self) -> &CapabilityHost { &self.host }
    pub fn adapter(&self) -> &SignerAdapter { &self.adapter }
    pub fn session(&self) -> &SessionStore { &self.session }
    pub fn coordinator(&self) -> &ProviderCoordinator { &self.coordinator }
    pub fn allowlist(&self) -> &Allowlist { &self.allowlist }
    pub fn diagnostics(&self) -> &DiagnosticLog { &self.diagnostics }

    /// A router listening on `rx`, debounced for this device class. Must be called inside a runtime.
    pub fn router(&self, rx: broadcast::Receiver<AuthNotification>) -> AuthEventRouter {
        let router = AuthEventRouter::new(
            self.session.clone(),
            self.adapter.clone(),
            self.diagnostics.clone(),
            self.config.device_class.debounce_delay(),
        )
        .with_coordinator(self.coordinator.clone());
        router.attach(rx);
        router
    }

    /// A gate for one protected view.
    pub fn gate(&self, options: GateOptions) -> AccessGate {
        AccessGate::new(
            GateDeps {
                session: self.session.clone(),
                adapter: self.adapter.clone(),
                coordinator: self.coordinator.clone(),
                allowlist: self.allowlist.clone(),
                diagnostics: self.diagnostics.clone(),
                auth_timeout: self.config.auth_timeout,
                redirect_target: self.config.redirect_target.clone(),
            },
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::DeviceClass;
    use crate::gate::GateState;
    use crate::identity::test_support::{FakeSigner, ALICE};
    use crate::identity::SessionStatus;

    #[test]
    fn wiring_follows_config() {
        let cfg = GateConfig::default().with_device_class(DeviceClass::Mobile).with_allowlist(true, [ALICE]);
        let cfg = GateConfig { diagnostics_capacity: 3, ..cfg };
        let ctx = AuthContext::with_host_probe(cfg);
        assert_eq!(ctx.coordinator().attempt().max_attempts, 8);
        assert_eq!(ctx.diagnostics().capacity(), 3);
        assert!(ctx.allowlist().is_whitelisted(ALICE));
        assert!(!ctx.host().is_present());
    }

    #[tokio::test(start_paused = true)]
    async fn late_host_install_lets_gate_through() {
        let ctx = AuthContext::with_host_probe(GateConfig::default().with_redirect("/welcome"));
        let gate = ctx.gate(GateOptions::default());
        let host = ctx.host().clone();
        let install = async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            host.install(FakeSigner::new(ALICE).arc());
        };
        let (state, ()) = tokio::join!(gate.enter(), install);
        assert_eq!(state, GateState::Ready);
        assert_eq!(ctx.session().public_key().unwrap().as_str(), ALICE);
    }

    #[tokio::test(start_paused = true)]
    async fn router_shares_the_session() {
        let ctx = AuthContext::with_host_probe(GateConfig::default());
        ctx.host().install(FakeSigner::new(ALICE).arc());
        let (tx, rx) = broadcast::channel(8);
        let router = ctx.router(rx);
        assert_eq!(router.debounce(), Duration::from_millis(200));
        tx.send(AuthNotification::login()).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(ctx.session().status(), SessionStatus::Established);
        assert_eq!(ctx.coordinator().state(), crate::identity::InitState::Succeeded);
        tx.send(AuthNotification::logout()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(ctx.session().status(), SessionStatus::Uninitialized);
    }
}
