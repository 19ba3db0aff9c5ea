use std::collections::HashSet;

use tracing::warn;

use crate::config::GateConfig;
use crate::identity::PublicKeyHex;

/// Static set of approved keys for restricted rollout.
///
/// Disabled: everyone passes. Enabled with no entries: nobody passes.
/// Stored and presented keys are both canonicalized, so hex and npub forms compare equal.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    enabled: bool,
    entries: HashSet<PublicKeyHex>,
}

impl Allowlist {
    pub fn disabled() -> Self { Self::default() }

    pub fn new<I, S>(enabled: bool, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = HashSet::new();
        for raw in keys {
            let raw = raw.as_ref();
            match PublicKeyHex::parse(raw) {
                Ok(k) => { entries.insert(k); }
                Err(e) => warn!(target: "keygate::allowlist", entry = raw, "dropping allowlist entry: {}", e),
            }
        }
        Self { enabled, entries }
    }

    pub fn from_config(cfg: &GateConfig) -> Self { Self::new(cfg.allowlist_enabled, &cfg.allowlist) }

    pub fn is_enabled(&self) -> bool { self.enabled }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn contains(&self, key: &PublicKeyHex) -> bool {
        if !self.enabled { return true; }
        self.entries.contains(key)
    }

    /// Check any textual encoding of a key. Text that is not a key never matches.
    pub fn is_whitelisted(&self, key: &str) -> bool {
        if !self.enabled { return true; }
        if self.entries.is_empty() { return false; }
        PublicKeyHex::parse(key).map(|k| self.entries.contains(&k)).unwrap_or(false)
    }
}
