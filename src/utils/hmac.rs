//! HMAC-SHA256 signature generation and verification utilities.
//!
//! Signatures are the standard base64 encoding of the raw 32-byte MAC, which is
//! what the host platform's own client libraries produce.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(secret: &[u8], message: &str) -> Result<HmacSha256, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| format!("Invalid secret key: {e}"))?;
    mac.update(message.as_bytes());
    Ok(mac)
}

/// Generate the base64-encoded HMAC-SHA256 of `message` keyed with `secret`
pub fn generate_signature(secret: &[u8], message: &str) -> Result<String, String> {
    let result = keyed_mac(secret, message)?.finalize();
    Ok(STANDARD.encode(result.into_bytes()))
}

/// Verify a base64-encoded HMAC-SHA256 signature against `message`
///
/// The MAC comparison is constant-time. A signature that is not valid base64
/// or has the wrong length is rejected without comparing.
pub fn verify_signature(secret: &[u8], message: &str, signature: &str) -> Result<bool, String> {
    let Ok(signature_bytes) = STANDARD.decode(signature) else {
        return Ok(false);
    };

    Ok(keyed_mac(secret, message)?
        .verify_slice(&signature_bytes)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_base64_of_32_bytes() {
        let signature = generate_signature(b"s3cr3t", "a=1&b=2").unwrap();
        let raw = STANDARD.decode(&signature).unwrap();
        assert_eq!(raw.len(), 32);
        // 32 bytes encode to 44 base64 characters with one pad.
        assert_eq!(signature.len(), 44);
        assert!(signature.ends_with('='));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signature = generate_signature(b"Jefe", "what do ya want for nothing?").unwrap();
        let raw = STANDARD.decode(signature).unwrap();
        let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let signature = generate_signature(b"secret", "payload").unwrap();
        assert_eq!(verify_signature(b"secret", "payload", &signature), Ok(true));
        assert_eq!(verify_signature(b"other", "payload", &signature), Ok(false));
        assert_eq!(verify_signature(b"secret", "payload2", &signature), Ok(false));
    }

    #[test]
    fn test_verify_rejects_malformed_signature() {
        assert_eq!(verify_signature(b"secret", "payload", "not base64!"), Ok(false));
        assert_eq!(verify_signature(b"secret", "payload", ""), Ok(false));
        assert_eq!(verify_signature(b"secret", "payload", "AAAA"), Ok(false));
    }

    #[test]
    fn test_any_key_length_is_accepted() {
        // keys longer than the SHA-256 block are hashed first
        let long_key = [0x5a_u8; 200];
        assert!(generate_signature(&[], "payload").is_ok());
        let signature = generate_signature(&long_key, "payload").unwrap();
        assert_eq!(verify_signature(&long_key, "payload", &signature), Ok(true));
    }
}
