//!
//! keygate configuration
//! ---------------------
//! Device class and timing constants, allowlist settings and gate defaults.
//! Everything can be supplied through `KEYGATE_*` environment variables; values
//! that fail to parse fall back to defaults with a warning.

use std::env;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

/// Device class drives retry counts and delays: signer attachment is less predictable on mobile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

const MOBILE_MARKERS: &[&str] = &["android", "webos", "iphone", "ipad", "ipod", "blackberry", "iemobile", "opera mini", "mobile"];

impl DeviceClass {
    pub fn max_attempts(self) -> u32 {
        match self { DeviceClass::Desktop => 5, DeviceClass::Mobile => 8 }
    }

    pub fn retry_delay(self) -> Duration {
        match self { DeviceClass::Desktop => Duration::from_millis(1000), DeviceClass::Mobile => Duration::from_millis(1500) }
    }

    /// Delay between a login/signup notification and session re-resolution.
    pub fn debounce_delay(self) -> Duration {
        match self { DeviceClass::Desktop => Duration::from_millis(200), DeviceClass::Mobile => Duration::from_millis(500) }
    }

    pub fn from_user_agent(ua: &str) -> Self {
        let ua = ua.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|m| ua.contains(m)) { DeviceClass::Mobile } else { DeviceClass::Desktop }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Some(DeviceClass::Mobile),
            "desktop" => Some(DeviceClass::Desktop),
            _ => None,
        }
    }
}

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REDIRECT: &str = "/";
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct GateConfig {
    pub device_class: DeviceClass,
    /// Bound on one whole authentication attempt before the gate redirects.
    #[serde(serialize_with = "ser_millis")]
    pub auth_timeout: Duration,
    pub allowlist_enabled: bool,
    /// Raw key texts (hex or npub); canonicalized when the allowlist is built.
    pub allowlist: Vec<String>,
    pub redirect_target: String,
    pub diagnostics_capacity: usize,
}

fn ser_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            device_class: DeviceClass::Desktop,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            allowlist_enabled: false,
            allowlist: Vec::new(),
            redirect_target: DEFAULT_REDIRECT.to_string(),
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a whitelist string on commas and whitespace.
pub fn split_key_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

impl GateConfig {
    pub fn from_env() -> Self {
        let mut cfg = GateConfig::default();
        if let Some(v) = env_nonempty("KEYGATE_DEVICE_CLASS") {
            match DeviceClass::parse(&v) {
                Some(dc) => cfg.device_class = dc,
                None => warn!(target: "keygate::config", "ignoring KEYGATE_DEVICE_CLASS='{}'", v),
            }
        } else if let Some(ua) = env_nonempty("KEYGATE_USER_AGENT") {
            cfg.device_class = DeviceClass::from_user_agent(&ua);
        }
        if let Some(v) = env_nonempty("KEYGATE_AUTH_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.auth_timeout = Duration::from_millis(ms),
                _ => warn!(target: "keygate::config", "ignoring KEYGATE_AUTH_TIMEOUT_MS='{}'", v),
            }
        }
        if let Some(v) = env_nonempty("KEYGATE_WHITELIST_ENABLED") {
            match parse_bool(&v) {
                Some(b) => cfg.allowlist_enabled = b,
                None => warn!(target: "keygate::config", "ignoring KEYGATE_WHITELIST_ENABLED='{}'", v),
            }
        }
        if let Some(v) = env_nonempty("KEYGATE_WHITELIST") { cfg.allowlist = split_key_list(&v); }
        if let Some(v) = env_nonempty("KEYGATE_REDIRECT") { cfg.redirect_target = v.trim().to_string(); }
        if let Some(v) = env_nonempty("KEYGATE_DIAGNOSTICS_CAPACITY") {
            match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => cfg.diagnostics_capacity = n,
                _ => warn!(target: "keygate::config", "ignoring KEYGATE_DIAGNOSTICS_CAPACITY='{}'", v),
            }
        }
        cfg
    }

    pub fn with_device_class(mut self, dc: DeviceClass) -> Self { self.device_class = dc; self }
    pub fn with_auth_timeout(mut self, d: Duration) -> Self { self.auth_timeout = d; self }
    pub fn with_redirect(mut self, target: impl Into<String>) -> Self { self.redirect_target = target.into(); self }

    pub fn with_allowlist<I, S>(mut self, enabled: bool, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist_enabled = enabled;
        self.allowlist = keys.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
