use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::tprintln;

use super::keys::PublicKeyHex;
use super::signer::{CapabilityHost, EventCipher, SignedEvent, SigningCapability, UnsignedEvent};

const NIP04: &str = "nip04";
const NIP44: &str = "nip44";

/// Stable facade over whatever signing capability the host injected.
///
/// Only the public key is cached. Signing and encryption always go to the live capability
/// because the material behind them can rotate.
#[derive(Debug, Clone)]
pub struct SignerAdapter {
    host: CapabilityHost,
    cached: Arc<RwLock<Option<PublicKeyHex>>>,
}

impl SignerAdapter {
    pub fn new(host: CapabilityHost) -> Self { Self { host, cached: Arc::new(RwLock::new(None)) } }

    pub fn host(&self) -> &CapabilityHost { &self.host }

    pub fn is_available(&self) -> bool { self.host.is_present() }

    fn capability(&self) -> AuthResult<Arc<dyn SigningCapability>> {
        self.host.get().ok_or(AuthError::CapabilityUnavailable)
    }

    /// Resolve the public key, asking the capability only until the first success.
    pub async fn get_identity(&self) -> AuthResult<PublicKeyHex> {
        let cap = self.capability()?;
        let cached = self.cached.read().clone();
        if let Some(pk) = cached { return Ok(pk); }
        let raw = cap.get_public_key().await?;
        let pk = PublicKeyHex::parse(&raw)?;
        *self.cached.write() = Some(pk.clone());
        debug!(target: "keygate::adapter", pubkey = pk.short(), "identity cached");
        Ok(pk)
    }

    /// Identity from the cache only; `NotReady` before the first successful resolution.
    pub fn cached_identity(&self) -> AuthResult<PublicKeyHex> {
        self.cached.read().clone().ok_or(AuthError::NotReady)
    }

    pub fn invalidate(&self) {
        if self.cached.write().take().is_some() {
            tprintln!("adapter.invalidate");
        }
    }

    pub async fn sign(&self, mut event: UnsignedEvent) -> AuthResult<SignedEvent> {
        let cap = self.capability()?;
        if event.pubkey.as_deref().map(str::is_empty).unwrap_or(true) {
            event.pubkey = Some(self.get_identity().await?.to_string());
        }
        Ok(cap.sign_event(event).await?)
    }

    pub async fn encrypt_to(&self, peer: &str, plaintext: &str) -> AuthResult<String> {
        let cap = self.capability()?;
        let peer = PublicKeyHex::parse(peer)?;
        let cipher = cipher(cap.nip04(), AuthError::EncryptionUnsupported { scheme: NIP04 })?;
        Ok(cipher.encrypt(peer.as_str(), plaintext).await?)
    }

    pub async fn decrypt_from(&self, peer: &str, ciphertext: &str) -> AuthResult<String> {
        let cap = self.capability()?;
        let peer = PublicKeyHex::parse(peer)?;
        let cipher = cipher(cap.nip04(), AuthError::DecryptionUnsupported { scheme: NIP04 })?;
        Ok(cipher.decrypt(peer.as_str(), ciphertext).await?)
    }

    /// Encrypt to our own key with the newer scheme (private notes, settings blobs).
    pub async fn encrypt_self(&self, plaintext: &str) -> AuthResult<String> {
        let cap = self.capability()?;
        let cipher = cipher(cap.nip44(), AuthError::EncryptionUnsupported { scheme: NIP44 })?;
        let me = self.get_identity().await?;
        Ok(cipher.encrypt(me.as_str(), plaintext).await?)
    }

    pub async fn decrypt_self(&self, ciphertext: &str) -> AuthResult<String> {
        let cap = self.capability()?;
        let cipher = cipher(cap.nip44(), AuthError::DecryptionUnsupported { scheme: NIP44 })?;
        let me = self.get_identity().await?;
        Ok(cipher.decrypt(me.as_str(), ciphertext).await?)
    }
}

fn cipher(c: Option<&dyn EventCipher>, missing: AuthError) -> AuthResult<&dyn EventCipher> {
    c.ok_or(missing)
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod adapter_tests;
