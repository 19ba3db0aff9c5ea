use super::*;

#[test]
fn code_mapping() {
    assert_eq!(AuthError::CapabilityUnavailable.code_str(), "capability_unavailable");
    assert_eq!(AuthError::NotReady.code_str(), "not_ready");
    assert_eq!(AuthError::InitializationExhausted { attempts: 5, last_error: "x".into() }.code_str(), "initialization_exhausted");
    assert_eq!(AuthError::AuthenticationTimeout { after_ms: 10_000 }.code_str(), "authentication_timeout");
    assert_eq!(AuthError::EncryptionUnsupported { scheme: "nip44" }.code_str(), "encryption_unsupported");
    assert_eq!(AuthError::DecryptionUnsupported { scheme: "nip04" }.code_str(), "decryption_unsupported");
    assert_eq!(AuthError::signer("user_rejected", "denied").code_str(), "user_rejected");
    assert_eq!(AuthError::InvalidKey("zz".into()).code_str(), "invalid_key");
}

#[test]
fn only_exhaustion_and_timeout_are_terminal() {
    assert!(AuthError::InitializationExhausted { attempts: 8, last_error: "gone".into() }.is_terminal());
    assert!(AuthError::AuthenticationTimeout { after_ms: 1 }.is_terminal());
    assert!(!AuthError::CapabilityUnavailable.is_terminal());
    assert!(!AuthError::NotReady.is_terminal());
    assert!(!AuthError::EncryptionUnsupported { scheme: "nip04" }.is_terminal());
}

#[test]
fn anyhow_maps_to_signer_error() {
    let err: AuthError = anyhow::anyhow!("extension closed").into();
    assert_eq!(err.code_str(), "signer_error");
    assert!(err.to_string().contains("extension closed"));
}

#[test]
fn display_includes_detail() {
    let e = AuthError::InitializationExhausted { attempts: 5, last_error: "no signer".into() };
    assert_eq!(e.to_string(), "signer initialization exhausted after 5 attempts: no signer");
}
