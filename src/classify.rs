//! Failure classification for gated exchanges.
//!
//! A failed exchange lands in exactly one bucket, and the bucket decides the
//! retry treatment. Classification never panics; payload shapes we do not
//! recognize degrade to [`FailureKind::GenericServer`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::captcha::CaptchaError;

/// Failure taxonomy shared by the executor, runner, and progress log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response received, or a connection-level fault.
    Network,
    /// Anti-bot interstitial blocked the request.
    BotProtection,
    /// Server rejected the submitted challenge token.
    CaptchaRejected,
    /// Any other non-success response or structured error payload.
    GenericServer,
    SolverUnavailable,
    SolverTimeout,
    SolverRejected,
}

impl FailureKind {
    pub fn from_captcha_error(err: &CaptchaError) -> Self {
        match err {
            CaptchaError::Timeout(_) => FailureKind::SolverTimeout,
            CaptchaError::Rejected(_) => FailureKind::SolverRejected,
            CaptchaError::Configuration(_) | CaptchaError::Unavailable(_) => {
                FailureKind::SolverUnavailable
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Network => "network_error",
            FailureKind::BotProtection => "bot_protection_block",
            FailureKind::CaptchaRejected => "captcha_rejected",
            FailureKind::GenericServer => "generic_server_error",
            FailureKind::SolverUnavailable => "solver_unavailable",
            FailureKind::SolverTimeout => "solver_timeout",
            FailureKind::SolverRejected => "solver_rejected",
        };
        f.write_str(name)
    }
}

/// Structured body shape spoken by the socialdrop endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerPayload {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl ServerPayload {
    /// Parse a response body, returning `None` for non-JSON content.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// The server's captcha-validation failures are only identifiable by a
    /// substring of the free-text message field.
    pub fn mentions_captcha_failure(&self) -> bool {
        self.message
            .as_deref()
            .is_some_and(|message| message.to_lowercase().contains("captcha"))
    }
}

static PROTECTION_MARKERS: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"cloudflare|cf-ray|__cf_chl|just a moment|please wait|checking your browser|attention required",
    )
    .case_insensitive(true)
    .dot_matches_new_line(true)
    .build()
    .expect("invalid protection marker regex")
});

/// Assign a failure bucket to a received (non-success) HTTP response.
///
/// Transport-level faults never reach this function; callers map those to
/// [`FailureKind::Network`] directly.
pub fn classify_response(status: u16, body: &str) -> FailureKind {
    if let Some(payload) = ServerPayload::parse(body) {
        if payload.mentions_captcha_failure() {
            return FailureKind::CaptchaRejected;
        }
        return FailureKind::GenericServer;
    }

    if status == 403 && PROTECTION_MARKERS.is_match(body) {
        return FailureKind::BotProtection;
    }

    FailureKind::GenericServer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protection_interstitial_is_bot_block() {
        let body = r#"<html><head><title>Just a moment...</title></head>
            <body>Checking your browser before accessing umcoin.org.</body></html>"#;
        assert_eq!(classify_response(403, body), FailureKind::BotProtection);
    }

    #[test]
    fn protection_markers_require_403() {
        let body = "<html>please wait while we verify your browser</html>";
        assert_eq!(classify_response(503, body), FailureKind::GenericServer);
    }

    #[test]
    fn structured_captcha_message_is_captcha_rejected() {
        let body = r#"{"status":"error","message":"Invalid captcha token"}"#;
        assert_eq!(classify_response(400, body), FailureKind::CaptchaRejected);
    }

    #[test]
    fn structured_other_error_is_generic() {
        let body = r#"{"status":"error","message":"handle already registered"}"#;
        assert_eq!(classify_response(400, body), FailureKind::GenericServer);
    }

    #[test]
    fn unrecognized_shapes_degrade_to_generic() {
        assert_eq!(classify_response(500, "internal error"), FailureKind::GenericServer);
        assert_eq!(classify_response(403, "forbidden"), FailureKind::GenericServer);
        assert_eq!(classify_response(200, ""), FailureKind::GenericServer);
    }

    #[test]
    fn payload_success_detection() {
        let payload = ServerPayload::parse(r#"{"status":"success","message":"done"}"#).unwrap();
        assert!(payload.is_success());
        assert!(!payload.mentions_captcha_failure());

        let payload = ServerPayload::parse(r#"{"message":"CAPTCHA verification failed"}"#).unwrap();
        assert!(!payload.is_success());
        assert!(payload.mentions_captcha_failure());
    }

    #[test]
    fn solver_errors_map_to_solver_kinds() {
        assert_eq!(
            FailureKind::from_captcha_error(&CaptchaError::Timeout(std::time::Duration::from_secs(
                1
            ))),
            FailureKind::SolverTimeout
        );
        assert_eq!(
            FailureKind::from_captcha_error(&CaptchaError::Rejected("no".into())),
            FailureKind::SolverRejected
        );
        assert_eq!(
            FailureKind::from_captcha_error(&CaptchaError::Unavailable("down".into())),
            FailureKind::SolverUnavailable
        );
    }
}
