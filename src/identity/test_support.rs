//! Scripted signer doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::signer::{CapabilityAttacher, EventCipher, SignedEvent, SigningCapability, UnsignedEvent};

pub const ALICE: &str = "7e7e9c42a91bfef19fa929e5fda1b72e0ebc1a4c1141673e2794234d86addf4e";
pub const BOB: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";

/// Reversible marker "cipher": `tag:peer:text`.
pub struct TagCipher(pub &'static str);

#[async_trait]
impl EventCipher for TagCipher {
    async fn encrypt(&self, peer_hex: &str, plaintext: &str) -> anyhow::Result<String> {
        Ok(format!("{}:{}:{}", self.0, peer_hex, plaintext))
    }
    async fn decrypt(&self, peer_hex: &str, ciphertext: &str) -> anyhow::Result<String> {
        let prefix = format!("{}:{}:", self.0, peer_hex);
        ciphertext.strip_prefix(&prefix).map(|s| s.to_string()).ok_or_else(|| anyhow!("bad ciphertext"))
    }
}

pub struct FakeSigner {
    pub pubkey: Mutex<String>,
    pub key_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
    nip04: Option<TagCipher>,
    nip44: Option<TagCipher>,
}

impl FakeSigner {
    pub fn new(pubkey: &str) -> Self {
        Self { pubkey: Mutex::new(pubkey.to_string()), key_calls: AtomicUsize::new(0), sign_calls: AtomicUsize::new(0), nip04: None, nip44: None }
    }
    pub fn with_nip04(mut self) -> Self { self.nip04 = Some(TagCipher("nip04")); self }
    pub fn with_nip44(mut self) -> Self { self.nip44 = Some(TagCipher("nip44")); self }
    pub fn arc(self) -> Arc<dyn SigningCapability> { Arc::new(self) }
}

#[async_trait]
impl SigningCapability for FakeSigner {
    async fn get_public_key(&self) -> anyhow::Result<String> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pubkey.lock().clone())
    }

    async fn sign_event(&self, event: UnsignedEvent) -> anyhow::Result<SignedEvent> {
        let n = self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SignedEvent {
            id: format!("{:064x}", n),
            pubkey: event.pubkey.unwrap_or_default(),
            created_at: event.created_at,
            kind: event.kind,
            tags: event.tags,
            content: event.content,
            sig: format!("sig-{}", n),
        })
    }

    fn nip04(&self) -> Option<&dyn EventCipher> { self.nip04.as_ref().map(|c| c as &dyn EventCipher) }
    fn nip44(&self) -> Option<&dyn EventCipher> { self.nip44.as_ref().map(|c| c as &dyn EventCipher) }
}

/// Fails the first `failures` attempts, then attaches `cap`. Counts every attempt.
pub struct FlakyAttacher {
    pub failures: usize,
    pub attempts: AtomicUsize,
    pub cap: Option<Arc<dyn SigningCapability>>,
}

impl FlakyAttacher {
    pub fn new(failures: usize, cap: Option<Arc<dyn SigningCapability>>) -> Self {
        Self { failures, attempts: AtomicUsize::new(0), cap }
    }
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }
}

#[async_trait]
impl CapabilityAttacher for FlakyAttacher {
    async fn attach(&self) -> anyhow::Result<Arc<dyn SigningCapability>> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(anyhow!("attach attempt {} failed", n + 1));
        }
        self.cap.clone().ok_or_else(|| anyhow!("signer never appeared"))
    }
}
