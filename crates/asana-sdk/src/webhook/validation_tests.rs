//! Tests for webhook signature verification.

use super::*;

const SECRET: &str = "d5d1f4a1c9e24b5f8e1b0a7f4a1c9e24";
const BODY: &[u8] = br#"{"events":[{"action":"changed","resource":{"gid":"1","resource_type":"task"}}]}"#;

#[test]
fn test_valid_signature_verifies() {
    let signature = SignatureVerifier::compute_signature(SECRET, BODY);

    assert!(SignatureVerifier::verify(Some(SECRET), &signature, BODY));
}

#[test]
fn test_known_vector() {
    // RFC 4231 test case 2
    let signature = SignatureVerifier::compute_signature("Jefe", b"what do ya want for nothing?");

    assert_eq!(
        signature,
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}

#[test]
fn test_uppercase_hex_and_whitespace_are_accepted() {
    let signature = SignatureVerifier::compute_signature(SECRET, BODY).to_uppercase();
    let padded = format!("  {}\n", signature);

    assert!(SignatureVerifier::verify(Some(SECRET), &padded, BODY));
}

#[test]
fn test_missing_secret_never_verifies() {
    let signature = SignatureVerifier::compute_signature(SECRET, BODY);

    assert!(!SignatureVerifier::verify(None, &signature, BODY));
    assert!(!SignatureVerifier::verify(None, "", b""));
}

#[test]
fn test_every_single_byte_body_mutation_fails() {
    let signature = SignatureVerifier::compute_signature(SECRET, BODY);

    for index in 0..BODY.len() {
        let mut mutated = BODY.to_vec();
        mutated[index] ^= 0x01;
        assert!(
            !SignatureVerifier::verify(Some(SECRET), &signature, &mutated),
            "mutation at byte {} verified",
            index
        );
    }
}

#[test]
fn test_every_single_digit_signature_mutation_fails() {
    let signature = SignatureVerifier::compute_signature(SECRET, BODY);

    for index in 0..signature.len() {
        let mut chars: Vec<char> = signature.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        let mutated: String = chars.into_iter().collect();
        assert!(
            !SignatureVerifier::verify(Some(SECRET), &mutated, BODY),
            "mutation at digit {} verified",
            index
        );
    }
}

#[test]
fn test_wrong_secret_fails() {
    let signature = SignatureVerifier::compute_signature("other-secret", BODY);

    assert!(!SignatureVerifier::verify(Some(SECRET), &signature, BODY));
}

#[test]
fn test_malformed_signature_fails() {
    assert!(!SignatureVerifier::verify(Some(SECRET), "not-hex", BODY));
    assert!(!SignatureVerifier::verify(Some(SECRET), "abcd", BODY));
    assert!(!SignatureVerifier::verify(Some(SECRET), "", BODY));
}

#[test]
fn test_reserialized_body_is_not_equivalent() {
    let signature = SignatureVerifier::compute_signature(SECRET, BODY);
    let value: serde_json::Value = serde_json::from_slice(BODY).unwrap();
    let pretty = serde_json::to_vec_pretty(&value).unwrap();

    assert!(!SignatureVerifier::verify(Some(SECRET), &signature, &pretty));
}
