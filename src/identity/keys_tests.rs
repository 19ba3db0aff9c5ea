use super::*;

// Example pair published with NIP-19
const NIP19_HEX: &str = "7e7e9c42a91bfef19fa929e5fda1b72e0ebc1a4c1141673e2794234d86addf4e";
const NIP19_NPUB: &str = "npub10elfcs4fr0l0r8af98jlmgdh9c8tcxjvz9qkw038js35mp4dma8qzvjptg";

#[test]
fn npub_decodes_to_hex() {
    let k = PublicKeyHex::parse(NIP19_NPUB).unwrap();
    assert_eq!(k.as_str(), NIP19_HEX);
    assert_eq!(k.to_npub(), NIP19_NPUB);
}

#[test]
fn every_encoding_is_the_same_key() {
    let canonical = PublicKeyHex::parse(NIP19_HEX).unwrap();
    let upper = NIP19_HEX.to_ascii_uppercase();
    let spaced = format!("  {}\n", NIP19_HEX);
    let uri_hex = format!("nostr:{}", NIP19_HEX);
    let uri_npub = format!("NOSTR:{}", NIP19_NPUB);
    let upper_npub = NIP19_NPUB.to_ascii_uppercase();
    for enc in [upper.as_str(), spaced.as_str(), uri_hex.as_str(), uri_npub.as_str(), NIP19_NPUB, upper_npub.as_str()] {
        assert_eq!(PublicKeyHex::parse(enc).unwrap(), canonical, "encoding {enc}");
    }
}

#[test]
fn npub_roundtrip_for_arbitrary_bytes() {
    let hex_key = "00ff".repeat(16);
    let k = PublicKeyHex::parse(&hex_key).unwrap();
    let npub = k.to_npub();
    assert!(npub.starts_with("npub1"));
    assert_eq!(PublicKeyHex::parse(&npub).unwrap(), k);
    assert_eq!(k.to_bytes().len(), KEY_BYTES);
    assert_eq!(k.short(), "00ff00ff");
}

#[test]
fn rejects_non_keys() {
    assert!(PublicKeyHex::parse("").is_err());
    assert!(PublicKeyHex::parse("abc").is_err());
    assert!(PublicKeyHex::parse(&"g".repeat(64)).is_err());
    assert!(PublicKeyHex::parse(&"a".repeat(66)).is_err());
    // valid bech32 but wrong prefix
    let nsec_like = bech32::encode::<Bech32>(Hrp::parse("nsec").unwrap(), &[7u8; 32]).unwrap();
    assert!(PublicKeyHex::parse(&nsec_like).is_err());
    // npub with a short payload
    let short = bech32::encode::<Bech32>(NPUB_HRP, &[1u8; 20]).unwrap();
    assert!(matches!(PublicKeyHex::parse(&short), Err(AuthError::InvalidKey(_))));
    // corrupted checksum
    let mut bad = NIP19_NPUB.to_string();
    bad.pop();
    bad.push('q');
    assert!(PublicKeyHex::parse(&bad).is_err());
}

#[test]
fn normalize_key_helper() {
    assert_eq!(normalize_key(NIP19_NPUB).as_deref(), Some(NIP19_HEX));
    assert_eq!(normalize_key("not a key"), None);
}

#[test]
fn serde_accepts_any_encoding_and_emits_hex() {
    let k: PublicKeyHex = serde_json::from_str(&format!("\"{}\"", NIP19_NPUB)).unwrap();
    assert_eq!(serde_json::to_string(&k).unwrap(), format!("\"{}\"", NIP19_HEX));
    assert!(serde_json::from_str::<PublicKeyHex>("\"zz\"").is_err());
}

#[test]
fn mixed_case_npub_is_rejected() {
    let mixed: String = NIP19_NPUB.chars().enumerate().map(|(i, c)| if i % 2 == 0 { c.to_ascii_uppercase() } else { c }).collect();
    assert!(matches!(PublicKeyHex::parse(&mixed), Err(AuthError::InvalidKey(_))));
    assert!(PublicKeyHex::parse("nPuB1").is_err());
    // all-uppercase is valid bech32
    assert_eq!(PublicKeyHex::parse(&NIP19_NPUB.to_ascii_uppercase()).unwrap().as_str(), NIP19_HEX);
}
