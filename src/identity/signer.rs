//! Contract for the injected signing capability.
//!
//! The capability is external: this crate never signs or encrypts by itself. A host installs
//! whatever implementation it has into a [`CapabilityHost`] slot, possibly late and possibly
//! never; everything downstream treats presence as a plain existence check.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Event before signing. `pubkey` may be left empty; the adapter fills it from the resolved identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnsignedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    pub created_at: i64,
    pub kind: u32,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
}

impl UnsignedEvent {
    pub fn new(kind: u32, content: impl Into<String>) -> Self {
        Self { pubkey: None, created_at: chrono::Utc::now().timestamp(), kind, tags: Vec::new(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

/// One encryption scheme offered by a capability (NIP-04 or NIP-44 style).
#[async_trait]
pub trait EventCipher: Send + Sync {
    async fn encrypt(&self, peer_hex: &str, plaintext: &str) -> anyhow::Result<String>;
    async fn decrypt(&self, peer_hex: &str, ciphertext: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait SigningCapability: Send + Sync {
    async fn get_public_key(&self) -> anyhow::Result<String>;
    async fn sign_event(&self, event: UnsignedEvent) -> anyhow::Result<SignedEvent>;
    fn nip04(&self) -> Option<&dyn EventCipher> { None }
    fn nip44(&self) -> Option<&dyn EventCipher> { None }
}

/// Nullable, shared handle the host fills in when (and if) a signer shows up.
#[derive(Clone, Default)]
pub struct CapabilityHost {
    slot: Arc<RwLock<Option<Arc<dyn SigningCapability>>>>,
}

impl std::fmt::Debug for CapabilityHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityHost").field("present", &self.is_present()).finish()
    }
}

impl CapabilityHost {
    pub fn new() -> Self { Self::default() }

    pub fn with_capability(cap: Arc<dyn SigningCapability>) -> Self {
        let h = Self::default();
        h.install(cap);
        h
    }

    pub fn install(&self, cap: Arc<dyn SigningCapability>) { *self.slot.write() = Some(cap); }

    pub fn remove(&self) -> Option<Arc<dyn SigningCapability>> { self.slot.write().take() }

    pub fn get(&self) -> Option<Arc<dyn SigningCapability>> { self.slot.read().clone() }

    pub fn is_present(&self) -> bool { self.slot.read().is_some() }
}

/// A single attempt at attaching the external capability.
#[async_trait]
pub trait CapabilityAttacher: Send + Sync {
    async fn attach(&self) -> anyhow::Result<Arc<dyn SigningCapability>>;
}

/// Default attacher: succeeds iff the host slot is occupied at the time of the attempt.
#[derive(Debug, Clone)]
pub struct HostProbe {
    host: CapabilityHost,
}

impl HostProbe {
    pub fn new(host: CapabilityHost) -> Self { Self { host } }
}

#[async_trait]
impl CapabilityAttacher for HostProbe {
    async fn attach(&self) -> anyhow::Result<Arc<dyn SigningCapability>> {
        self.host.get().ok_or_else(|| anyhow!("no signing capability injected"))
    }
}
