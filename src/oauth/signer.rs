//! HMAC-SHA256 signing shared by the state and session codecs.
//!
//! Signatures travel as lowercase hex (64 chars).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{GatewayError, Result};

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|_| GatewayError::CryptoUnavailable)
}

/// Sign `message` under `key`, returning the lowercase hex digest.
pub fn sign(message: &[u8], key: &[u8]) -> Result<String> {
    let mut mac = mac(key)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex `signature` against `message` in constant time.
pub fn verify(message: &[u8], signature: &str, key: &[u8]) -> Result<()> {
    // Only the canonical lowercase form is accepted, so "A" for "a" is a tamper.
    if !signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(GatewayError::InvalidSignature);
    }
    let expected = hex::decode(signature).map_err(|_| GatewayError::InvalidSignature)?;
    let mut mac = mac(key)?;
    mac.update(message);
    mac.verify_slice(&expected)
        .map_err(|_| GatewayError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic_hex() {
        let a = sign(b"hello", b"key").unwrap();
        let b = sign(b"hello", b"key").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = sign(b"what do ya want for nothing?", b"Jefe").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let sig = sign(b"payload", b"key-a").unwrap();
        assert!(verify(b"payload", &sig, b"key-a").is_ok());
        assert_eq!(
            verify(b"payload", &sig, b"key-b"),
            Err(GatewayError::InvalidSignature)
        );
    }

    #[test]
    fn test_verify_rejects_non_hex() {
        assert_eq!(
            verify(b"payload", "zz", b"key"),
            Err(GatewayError::InvalidSignature)
        );
    }
}
