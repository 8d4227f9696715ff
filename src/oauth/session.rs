//! Stateless session tokens carried in the session cookie.
//!
//! Format:  `base64url(payload) "." hex(hmac_sha256(payload))`
//!
//! The payload is JSON:
//! ```json
//! { "identity": "octocat", "exp": 1700000000000 }
//! ```
//! `exp` is epoch milliseconds. Logging out only tells the browser to drop
//! the cookie; a copied token stays valid until `exp`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::oauth::signer;

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    identity: String,
    exp: u64,
}

/// A session that verified and has not expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: String,
    pub expires_at: u64,
}

/// Mint a token for `identity`, valid for `ttl` milliseconds from `now`.
pub fn encode(identity: &str, now: u64, ttl: u64, key: &[u8]) -> Result<String> {
    let payload = SessionPayload {
        identity: identity.to_string(),
        exp: now.saturating_add(ttl),
    };
    let json = serde_json::to_vec(&payload).map_err(|_| GatewayError::InvalidSessionData)?;
    let signature = signer::sign(&json, key)?;
    Ok(format!("{}.{signature}", URL_SAFE_NO_PAD.encode(&json)))
}

/// Verify a token and check it belongs to `allowed_identity` and is unexpired.
pub fn decode(token: &str, key: &[u8], allowed_identity: &str, now: u64) -> Result<Session> {
    let (encoded, signature) = match token.split('.').collect::<Vec<_>>().as_slice() {
        [encoded, signature] => (*encoded, *signature),
        _ => return Err(GatewayError::InvalidSession),
    };

    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| GatewayError::InvalidSession)?;

    signer::verify(&json, signature, key)?;

    let payload: SessionPayload =
        serde_json::from_slice(&json).map_err(|_| GatewayError::InvalidSessionData)?;

    if payload.identity != allowed_identity || now > payload.exp {
        return Err(GatewayError::SessionExpiredOrInvalid);
    }

    Ok(Session {
        identity: payload.identity,
        expires_at: payload.exp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = &[0xAA; 32];
    const NOW: u64 = 1_700_000_000_000;
    const TTL: u64 = 14 * 24 * 60 * 60 * 1000;

    #[test]
    fn test_round_trip_until_expiry() {
        let token = encode("youngjaylao", NOW, TTL, KEY).unwrap();

        let session = decode(&token, KEY, "youngjaylao", NOW).unwrap();
        assert_eq!(session.identity, "youngjaylao");
        assert_eq!(session.expires_at, NOW + TTL);

        assert!(decode(&token, KEY, "youngjaylao", NOW + TTL).is_ok());
        assert_eq!(
            decode(&token, KEY, "youngjaylao", NOW + TTL + 1),
            Err(GatewayError::SessionExpiredOrInvalid)
        );
    }

    #[test]
    fn test_wrong_identity_rejected() {
        let token = encode("someone-else", NOW, TTL, KEY).unwrap();
        assert_eq!(
            decode(&token, KEY, "youngjaylao", NOW),
            Err(GatewayError::SessionExpiredOrInvalid)
        );
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = encode("youngjaylao", NOW, TTL, KEY).unwrap();
        assert_eq!(
            decode(&token, &[0xBB; 32], "youngjaylao", NOW),
            Err(GatewayError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let token = encode("youngjaylao", NOW, TTL, KEY).unwrap();
        let (payload, sig) = token.split_once('.').unwrap();
        for i in 0..sig.len() {
            let mut flipped = sig.as_bytes().to_vec();
            flipped[i] = if flipped[i] == b'f' { b'e' } else { b'f' };
            let tampered = format!("{payload}.{}", String::from_utf8(flipped).unwrap());
            assert_eq!(
                decode(&tampered, KEY, "youngjaylao", NOW),
                Err(GatewayError::InvalidSignature)
            );
        }
    }

    #[test]
    fn test_payload_swap_rejected() {
        // Re-encode a payload with a later expiry but keep the old signature.
        let token = encode("youngjaylao", NOW, TTL, KEY).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"identity":"youngjaylao","exp":99999999999999}"#);
        assert_eq!(
            decode(&format!("{forged}.{sig}"), KEY, "youngjaylao", NOW),
            Err(GatewayError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(decode("", KEY, "x", NOW), Err(GatewayError::InvalidSession));
        assert_eq!(decode("a.b.c", KEY, "x", NOW), Err(GatewayError::InvalidSession));
        assert_eq!(decode("!!!.abcd", KEY, "x", NOW), Err(GatewayError::InvalidSession));
    }

    #[test]
    fn test_signed_garbage_is_invalid_data() {
        let json = b"not json";
        let sig = signer::sign(json, KEY).unwrap();
        let token = format!("{}.{sig}", URL_SAFE_NO_PAD.encode(json));
        assert_eq!(
            decode(&token, KEY, "x", NOW),
            Err(GatewayError::InvalidSessionData)
        );
    }
}
