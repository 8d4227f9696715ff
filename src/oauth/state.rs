//! Signed, time-bound CSRF state for the login handshake.
//!
//! Format:  `{timestamp}.{nonce}.{signature}|{percent-encoded return target}`
//!
//! `timestamp` is epoch milliseconds, `nonce` is 128 random bits in hex and
//! `signature` is HMAC-SHA256 over `"{timestamp}.{nonce}"`. Nothing is stored
//! server-side: the callback re-derives the signature to prove this gateway
//! issued the state. Replays inside the validity window are not detected.

use crate::error::{GatewayError, Result};
use crate::oauth::signer;

/// Where to send the browser once the handshake completes, and which
/// targets are acceptable.
#[derive(Debug, Clone)]
pub struct ReturnPolicy<'a> {
    /// Origin every return target must live under.
    pub allowed_origin: &'a str,
    /// Used when no target is given or the given one is rejected.
    pub default_target: &'a str,
}

impl ReturnPolicy<'_> {
    /// Whether `target` is the allowed origin itself or a location under it.
    ///
    /// A bare prefix match would let `https://good.example.evil.net` through,
    /// so the character after the origin must end the authority.
    pub fn permits(&self, target: &str) -> bool {
        match target.strip_prefix(self.allowed_origin) {
            Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
            None => false,
        }
    }

    /// `target` if permitted, else the default.
    pub fn resolve(&self, target: Option<&str>) -> String {
        match target {
            Some(t) if self.permits(t) => t.to_string(),
            _ => self.default_target.to_string(),
        }
    }
}

/// A state that passed signature and age checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedState {
    pub issued_at: u64,
    pub return_target: String,
}

fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Build a fresh state token issued at `now` (epoch millis).
pub fn encode(
    return_target: Option<&str>,
    policy: &ReturnPolicy<'_>,
    key: &[u8],
    now: u64,
) -> Result<String> {
    let nonce = generate_nonce();
    let signed = format!("{now}.{nonce}");
    let signature = signer::sign(signed.as_bytes(), key)?;
    let target = policy.resolve(return_target);
    Ok(format!(
        "{signed}.{signature}|{}",
        urlencoding::encode(&target)
    ))
}

/// Verify a state token and recover its return target.
///
/// `max_age` is in milliseconds. A target outside the allowed origin is not
/// an error; it is replaced by the default.
pub fn decode(
    state: &str,
    policy: &ReturnPolicy<'_>,
    key: &[u8],
    now: u64,
    max_age: u64,
) -> Result<VerifiedState> {
    let (signed_part, target_part) = split_exact2(state, '|').ok_or(GatewayError::MalformedState)?;

    let fields: Vec<&str> = signed_part.split('.').collect();
    let [timestamp, nonce, signature] = fields.as_slice() else {
        return Err(GatewayError::MalformedState);
    };

    signer::verify(format!("{timestamp}.{nonce}").as_bytes(), signature, key)?;

    let issued_at: u64 = timestamp.parse().map_err(|_| GatewayError::MalformedState)?;
    if now.saturating_sub(issued_at) > max_age {
        return Err(GatewayError::StateExpired);
    }

    let decoded = urlencoding::decode(target_part).ok();
    let return_target = policy.resolve(decoded.as_deref());

    Ok(VerifiedState {
        issued_at,
        return_target,
    })
}

fn split_exact2(s: &str, sep: char) -> Option<(&str, &str)> {
    let mut parts = s.split(sep);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Some((a, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = &[0xAA; 32];
    const MAX_AGE: u64 = 14 * 24 * 60 * 60 * 1000;
    const NOW: u64 = 1_700_000_000_000;

    fn policy() -> ReturnPolicy<'static> {
        ReturnPolicy {
            allowed_origin: "https://good.example",
            default_target: "https://good.example/",
        }
    }

    /// Forge a correctly signed state with an arbitrary timestamp.
    fn state_at(timestamp: u64, target: &str) -> String {
        let signed = format!("{timestamp}.abc123");
        let sig = signer::sign(signed.as_bytes(), KEY).unwrap();
        format!("{signed}.{sig}|{}", urlencoding::encode(target))
    }

    #[test]
    fn test_round_trip_keeps_return_target() {
        let state = encode(Some("https://good.example/x?y=1"), &policy(), KEY, NOW).unwrap();
        let verified = decode(&state, &policy(), KEY, NOW + 1000, MAX_AGE).unwrap();
        assert_eq!(verified.return_target, "https://good.example/x?y=1");
        assert_eq!(verified.issued_at, NOW);
    }

    #[test]
    fn test_shape() {
        let state = encode(None, &policy(), KEY, NOW).unwrap();
        let (signed, target) = state.split_once('|').unwrap();
        assert_eq!(signed.split('.').count(), 3);
        assert_eq!(target, urlencoding::encode("https://good.example/"));
    }

    #[test]
    fn test_foreign_target_replaced_by_default() {
        let state = encode(Some("https://evil.example/x"), &policy(), KEY, NOW).unwrap();
        let verified = decode(&state, &policy(), KEY, NOW, MAX_AGE).unwrap();
        assert_eq!(verified.return_target, "https://good.example/");

        let forged = state_at(NOW, "https://good.example.evil.net/");
        let verified = decode(&forged, &policy(), KEY, NOW, MAX_AGE).unwrap();
        assert_eq!(verified.return_target, "https://good.example/");
    }

    #[test]
    fn test_expiry_boundary() {
        let expired = state_at(NOW - (MAX_AGE + 1), "https://good.example/");
        assert_eq!(
            decode(&expired, &policy(), KEY, NOW, MAX_AGE),
            Err(GatewayError::StateExpired)
        );

        let fresh = state_at(NOW - (MAX_AGE - 1), "https://good.example/");
        assert!(decode(&fresh, &policy(), KEY, NOW, MAX_AGE).is_ok());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let state = encode(None, &policy(), KEY, NOW).unwrap();
        let (signed, target) = state.split_once('|').unwrap();
        let mut fields: Vec<String> = signed.split('.').map(str::to_string).collect();
        let sig = fields[2].clone().into_bytes();
        for i in 0..sig.len() {
            let mut flipped = sig.clone();
            flipped[i] = if flipped[i] == b'0' { b'1' } else { b'0' };
            fields[2] = String::from_utf8(flipped).unwrap();
            let tampered = format!("{}|{target}", fields.join("."));
            assert_eq!(
                decode(&tampered, &policy(), KEY, NOW, MAX_AGE),
                Err(GatewayError::InvalidSignature)
            );
        }
    }

    #[test]
    fn test_other_key_fails() {
        let state = encode(None, &policy(), KEY, NOW).unwrap();
        assert_eq!(
            decode(&state, &policy(), &[0xBB; 32], NOW, MAX_AGE),
            Err(GatewayError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in ["", "no-pipe", "a.b.c|x|y", "a.b|x", "a.b.c.d|x"] {
            assert_eq!(
                decode(bad, &policy(), KEY, NOW, MAX_AGE),
                Err(GatewayError::MalformedState),
                "input {bad:?}"
            );
        }
    }
}
