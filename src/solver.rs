//! Token acquisition and challenge registration.
//!
//! Wraps the configured captcha backend: solve the challenge, normalize the
//! token, register it with the remote endpoint's captcha sub-protocol, then
//! wait out the registration settle window. Tokens are single-use; callers
//! acquire a fresh one per attempt.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use log::debug;
use serde_json::json;
use tokio::time::sleep;
use url::Url;

use crate::captcha::{CaptchaError, CaptchaProvider, ChallengeSpec};
use crate::classify::ServerPayload;
use crate::session::SessionState;
use crate::transport::ActionTransport;

pub struct TokenSource {
    provider: Arc<dyn CaptchaProvider>,
    challenge: ChallengeSpec,
    register_url: Url,
    settle_delay: Duration,
}

impl TokenSource {
    pub fn new(
        provider: Arc<dyn CaptchaProvider>,
        challenge: ChallengeSpec,
        register_url: Url,
        settle_delay: Duration,
    ) -> Self {
        Self {
            provider,
            challenge,
            register_url,
            settle_delay,
        }
    }

    /// Produce a registered, ready-to-submit token.
    ///
    /// Any non-success registration response counts as a rejected solution.
    /// Cookies set during registration are folded into the session.
    pub async fn acquire(
        &self,
        transport: &dyn ActionTransport,
        base_headers: &HeaderMap,
        session: &mut SessionState,
    ) -> Result<String, CaptchaError> {
        let solution = self.provider.solve(&self.challenge).await?;
        // The endpoint only accepts tokens in canonical lowercase form.
        let token = solution.token.to_lowercase();
        debug!(
            "solved challenge via {} ({} chars)",
            self.provider.name(),
            token.len()
        );

        let mut headers = base_headers.clone();
        session.apply_to(&mut headers);

        let body = json!({ "captcha": token });
        let response = transport
            .post_json(&self.register_url, &headers, &body)
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))?;
        session.record_from_response(&response.headers);

        let registered = ServerPayload::parse(&response.body)
            .is_some_and(|payload| payload.is_success());
        if !registered {
            return Err(CaptchaError::Rejected(format!(
                "challenge registration refused (status {})",
                response.status
            )));
        }

        // Registration completes asynchronously on the remote side.
        if self.settle_delay > Duration::ZERO {
            sleep(self.settle_delay).await;
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::captcha::{CaptchaResult, CaptchaSolution, ChallengeType};
    use crate::transport::{TransportError, TransportResponse};

    struct UppercaseProvider;

    #[async_trait]
    impl CaptchaProvider for UppercaseProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn solve(&self, _challenge: &ChallengeSpec) -> CaptchaResult {
            Ok(CaptchaSolution::new("P0_TOKEN-ABC"))
        }
    }

    struct RecordingTransport {
        response: TransportResponse,
        bodies: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl ActionTransport for RecordingTransport {
        async fn post_json(
            &self,
            _url: &Url,
            _headers: &HeaderMap,
            body: &serde_json::Value,
        ) -> Result<TransportResponse, TransportError> {
            self.bodies.lock().unwrap().push(body.clone());
            Ok(self.response.clone())
        }
    }

    fn token_source() -> TokenSource {
        TokenSource::new(
            Arc::new(UppercaseProvider),
            ChallengeSpec::new(
                "site-key",
                Url::parse("https://umcoin.org/").unwrap(),
                ChallengeType::HCaptcha,
            ),
            Url::parse("https://umcoin.org/socialdrop/captcha").unwrap(),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn acquire_lowercases_and_registers_token() {
        let transport = RecordingTransport {
            response: TransportResponse {
                status: 200,
                headers: HeaderMap::new(),
                body: r#"{"status":"success"}"#.to_string(),
            },
            bodies: Mutex::new(Vec::new()),
        };
        let mut session = SessionState::new();

        let token = token_source()
            .acquire(&transport, &HeaderMap::new(), &mut session)
            .await
            .unwrap();

        assert_eq!(token, "p0_token-abc");
        let bodies = transport.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["captcha"], "p0_token-abc");
    }

    #[tokio::test]
    async fn non_success_registration_is_rejected() {
        let transport = RecordingTransport {
            response: TransportResponse {
                status: 200,
                headers: HeaderMap::new(),
                body: r#"{"status":"error","message":"expired"}"#.to_string(),
            },
            bodies: Mutex::new(Vec::new()),
        };
        let mut session = SessionState::new();

        let err = token_source()
            .acquire(&transport, &HeaderMap::new(), &mut session)
            .await
            .expect_err("registration refused");
        assert!(matches!(err, CaptchaError::Rejected(_)));
    }
}
