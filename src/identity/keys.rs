//! Public key canonicalization.
//!
//! Keys arrive as 64-char hex (any case), NIP-19 `npub1…` bech32, or either form behind a
//! `nostr:` URI prefix. Everything is reduced to lowercase hex before comparison so two
//! encodings of the same key are equal and nothing else is.

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AuthError, AuthResult};

const NPUB_HRP: Hrp = Hrp::parse_unchecked("npub");
const URI_PREFIX: &str = "nostr:";
pub const KEY_BYTES: usize = 32;

/// Canonical public key: exactly 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKeyHex(String);

impl PublicKeyHex {
    /// Canonicalize any supported textual encoding.
    pub fn parse(input: &str) -> AuthResult<Self> {
        let mut s = input.trim();
        if s.get(..URI_PREFIX.len()).is_some_and(|p| p.eq_ignore_ascii_case(URI_PREFIX)) {
            s = &s[URI_PREFIX.len()..];
        }
        if s.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("npub1")) {
            // bech32 rejects mixed case itself
            return Self::from_npub(s);
        }
        Self::from_hex(&s.to_ascii_lowercase())
    }

    pub fn from_hex(s: &str) -> AuthResult<Self> {
        if s.len() != KEY_BYTES * 2 {
            return Err(AuthError::InvalidKey(format!("expected {} hex chars, got {}", KEY_BYTES * 2, s.len())));
        }
        let bytes = hex::decode(s).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn from_npub(s: &str) -> AuthResult<Self> {
        let (hrp, data) = bech32::decode(s).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        if hrp != NPUB_HRP {
            return Err(AuthError::InvalidKey(format!("unexpected prefix '{}'", hrp)));
        }
        if data.len() != KEY_BYTES {
            return Err(AuthError::InvalidKey(format!("npub payload is {} bytes", data.len())));
        }
        Ok(Self::from_bytes(&data))
    }

    fn from_bytes(bytes: &[u8]) -> Self { PublicKeyHex(hex::encode(bytes)) }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Invariant: always valid lowercase hex of KEY_BYTES length
        hex::decode(&self.0).unwrap_or_default()
    }

    pub fn to_npub(&self) -> String {
        bech32::encode::<Bech32>(NPUB_HRP, &self.to_bytes()).unwrap_or_default()
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str { &self.0[..8] }
}

impl fmt::Display for PublicKeyHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for PublicKeyHex {
    type Err = AuthError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { PublicKeyHex::parse(s) }
}

impl AsRef<str> for PublicKeyHex {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Serialize for PublicKeyHex {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(&self.0) }
}

impl<'de> Deserialize<'de> for PublicKeyHex {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        PublicKeyHex::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Canonical hex for any supported encoding, or `None` when the text is not a key.
pub fn normalize_key(input: &str) -> Option<String> {
    PublicKeyHex::parse(input).ok().map(|k| k.0)
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod keys_tests;
