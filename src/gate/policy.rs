//! Access policy: subscription, grace period and override status layered over the allowlist.
//! Inputs are fetched per evaluation and never cached past it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::DiagnosticLog;
use crate::error::AuthError;
use crate::identity::PublicKeyHex;

use super::allowlist::Allowlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Granted,
    Denied,
    Pending,
}

/// Subscription record as served by the backing data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub last_payment: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_in_buffer: bool,
}

impl SubscriptionStatus {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_pro && self.expires_at.map(|e| e > now).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccessPolicyInputs {
    pub allowlisted: bool,
    pub subscription_active: bool,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub in_grace_period: bool,
    pub override_active: bool,
}

impl AccessPolicyInputs {
    pub fn from_parts(allowlisted: bool, sub: &SubscriptionStatus, override_active: bool, now: DateTime<Utc>) -> Self {
        Self {
            allowlisted,
            subscription_active: sub.is_active(now),
            subscription_expires_at: sub.expires_at,
            in_grace_period: sub.is_in_buffer,
            override_active,
        }
    }
}

/// Granted iff allowlisted and any of subscription, grace period or override holds.
pub fn evaluate(inputs: &AccessPolicyInputs) -> AccessDecision {
    if !inputs.allowlisted { return AccessDecision::Denied; }
    if inputs.subscription_active || inputs.in_grace_period || inputs.override_active {
        AccessDecision::Granted
    } else {
        AccessDecision::Denied
    }
}

/// Eventually consistent lookup keyed by canonical public key.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn subscription_status(&self, key: &PublicKeyHex) -> anyhow::Result<SubscriptionStatus>;
    /// Legend/override flag granting access regardless of subscription.
    async fn override_active(&self, key: &PublicKeyHex) -> anyhow::Result<bool>;
}

/// Partially loaded inputs, for callers that render while lookups are outstanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyProbe {
    pub allowlisted: bool,
    pub subscription: Option<SubscriptionStatus>,
    pub override_active: Option<bool>,
}

impl PolicyProbe {
    pub fn new(allowlisted: bool) -> Self { Self { allowlisted, ..Default::default() } }

    /// Allowlist is decided first; otherwise `Pending` until every input has arrived.
    pub fn decision(&self, now: DateTime<Utc>) -> AccessDecision {
        if !self.allowlisted { return AccessDecision::Denied; }
        match (&self.subscription, self.override_active) {
            (Some(sub), Some(ov)) => evaluate(&AccessPolicyInputs::from_parts(true, sub, ov, now)),
            _ => AccessDecision::Pending,
        }
    }
}

/// Fetch both inputs concurrently. Lookup failures count as "not granted" and are recorded.
pub async fn fetch_inputs(
    source: &dyn PolicySource,
    allowlist: &Allowlist,
    key: &PublicKeyHex,
    diagnostics: &DiagnosticLog,
    now: DateTime<Utc>,
) -> AccessPolicyInputs {
    let allowlisted = allowlist.contains(key);
    let (sub, ov) = tokio::join!(source.subscription_status(key), source.override_active(key));
    let sub = sub.unwrap_or_else(|e| {
        diagnostics.record("policy", &AuthError::from(e));
        SubscriptionStatus::default()
    });
    let ov = ov.unwrap_or_else(|e| {
        diagnostics.record("policy", &AuthError::from(e));
        false
    });
    let inputs = AccessPolicyInputs::from_parts(allowlisted, &sub, ov, now);
    debug!(target: "keygate::policy", pubkey = key.short(), ?inputs, "policy inputs");
    inputs
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;
