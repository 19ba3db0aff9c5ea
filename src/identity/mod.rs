//! Identity: the injected signer, the session derived from it, and the machinery that keeps
//! both current. Keep the public surface thin and split implementation across sub-modules.

mod adapter;
mod coordinator;
mod keys;
mod router;
mod session;
mod signer;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::SignerAdapter;
pub use coordinator::{InitState, InitializationAttempt, ProviderCoordinator};
pub use keys::{normalize_key, PublicKeyHex};
pub use router::{AuthEventKind, AuthEventRouter, AuthNotification};
pub use session::{IdentitySession, SessionStatus, SessionStore};
pub use signer::{CapabilityAttacher, CapabilityHost, EventCipher, HostProbe, SignedEvent, SigningCapability, UnsignedEvent};
