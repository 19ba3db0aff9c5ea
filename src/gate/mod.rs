//! Protected-view gating: the auth state machine, the allowlist and the access policy overlay.

mod allowlist;
mod guard;
mod policy;

pub use allowlist::Allowlist;
pub use guard::{AccessGate, GateDeps, GateOptions, GateState};
pub use policy::{evaluate, fetch_inputs, AccessDecision, AccessPolicyInputs, PolicyProbe, PolicySource, SubscriptionStatus};
