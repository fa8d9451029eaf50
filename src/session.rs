//! Accumulated cookie state for one campaign run.
//!
//! The runner owns exactly one [`SessionState`] and threads it through every
//! exchange. Cookies accumulate monotonically: a name already recorded is only
//! replaced by a later directive redefining that same name, never dropped
//! because a response omitted it.

use std::collections::BTreeMap;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    cookies: BTreeMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every `set-cookie` directive from a response. Absent or malformed
    /// directives are a no-op.
    pub fn record_from_response(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            let Some((name, cookie_value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            self.cookies
                .insert(name.to_string(), cookie_value.trim().to_string());
        }
    }

    /// Accumulated cookies as a single `cookie` header value, if any.
    pub fn as_header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Layer the cookie header onto an outbound header set when present.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.as_header_value()
            && let Ok(header) = HeaderValue::from_str(&value)
        {
            headers.insert(COOKIE, header);
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_headers(directives: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for directive in directives {
            headers.append(SET_COOKIE, directive.parse().unwrap());
        }
        headers
    }

    #[test]
    fn accumulates_disjoint_cookies() {
        let mut session = SessionState::new();
        session.record_from_response(&response_headers(&["sid=abc; Path=/; HttpOnly"]));
        session.record_from_response(&response_headers(&["csrf=xyz"]));

        let header = session.as_header_value().unwrap();
        assert_eq!(header, "csrf=xyz; sid=abc");
    }

    #[test]
    fn redefinition_overwrites_only_that_name() {
        let mut session = SessionState::new();
        session.record_from_response(&response_headers(&["sid=abc", "csrf=xyz"]));
        session.record_from_response(&response_headers(&["sid=def"]));

        assert_eq!(session.as_header_value().unwrap(), "csrf=xyz; sid=def");
    }

    #[test]
    fn response_without_cookies_is_noop() {
        let mut session = SessionState::new();
        session.record_from_response(&response_headers(&["sid=abc"]));
        session.record_from_response(&HeaderMap::new());

        assert_eq!(session.len(), 1);
        assert_eq!(session.as_header_value().unwrap(), "sid=abc");
    }

    #[test]
    fn empty_session_yields_no_header() {
        let session = SessionState::new();
        assert!(session.as_header_value().is_none());

        let mut headers = HeaderMap::new();
        session.apply_to(&mut headers);
        assert!(!headers.contains_key(COOKIE));
    }

    #[test]
    fn apply_to_inserts_cookie_header() {
        let mut session = SessionState::new();
        session.record_from_response(&response_headers(&["sid=abc"]));

        let mut headers = HeaderMap::new();
        session.apply_to(&mut headers);
        assert_eq!(headers.get(COOKIE).unwrap(), "sid=abc");
    }
}
