//! Session cookie handling: reading the cookie back, building `Set-Cookie`,
//! and turning a request's headers into a verified session.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::error::{GatewayError, Result};
use crate::oauth::{self, session::Session};
use crate::state::AppState;

/// Find the value of cookie `name` in a `Cookie` header.
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value carrying the session token.
///
/// `SameSite=None` because the front-end calls this gateway cross-site.
pub fn session_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!("{name}={value}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={max_age_secs}")
}

/// Same attributes as the session cookie with `Max-Age=0` so the browser drops it.
pub fn clear_session_cookie(name: &str) -> String {
    session_cookie(name, "", 0)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| parse_cookie(h, name))
}

/// Verify the session cookie on a request.
///
/// No cookie is `LoginRequired`; anything else is the codec's own failure.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Session> {
    let token =
        cookie_value(headers, &state.config.server.cookie_name).ok_or(GatewayError::LoginRequired)?;

    oauth::session::decode(
        token,
        &state.signing_key,
        &state.config.oauth.allowed_identity,
        oauth::now_millis(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_cookie_finds_named_entry() {
        let header = "theme=dark; blog_session=abc.def; other=1";
        assert_eq!(parse_cookie(header, "blog_session"), Some("abc.def"));
        assert_eq!(parse_cookie(header, "theme"), Some("dark"));
        assert_eq!(parse_cookie(header, "missing"), None);
    }

    #[test]
    fn test_parse_cookie_requires_exact_name() {
        assert_eq!(parse_cookie("xblog_session=1", "blog_session"), None);
        assert_eq!(parse_cookie("blog_session_old=1", "blog_session"), None);
        assert_eq!(parse_cookie("", "blog_session"), None);
    }

    #[test]
    fn test_parse_cookie_keeps_equals_in_value() {
        assert_eq!(parse_cookie("s=a=b==", "s"), Some("a=b=="));
    }

    #[test]
    fn test_cookie_value_scans_all_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("blog_session=tok"));
        assert_eq!(cookie_value(&headers, "blog_session"), Some("tok"));
    }

    #[test]
    fn test_set_cookie_attributes() {
        assert_eq!(
            session_cookie("blog_session", "tok", 1209600),
            "blog_session=tok; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=1209600"
        );
        assert_eq!(
            clear_session_cookie("blog_session"),
            "blog_session=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0"
        );
    }
}
