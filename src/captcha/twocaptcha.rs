//! TwoCaptcha adapter.
//!
//! Submits the challenge through the classic `in.php` endpoint and polls
//! `res.php` until the worker produces a token (`OK|<token>`) or the
//! configured timeout elapses.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{Instant, sleep};

use super::{
    CaptchaConfig, CaptchaError, CaptchaProvider, CaptchaResult, CaptchaSolution, ChallengeSpec,
    ChallengeType,
};

const SUBMIT_URL: &str = "https://2captcha.com/in.php";
const RESULT_URL: &str = "https://2captcha.com/res.php";
const NOT_READY: &str = "CAPCHA_NOT_READY";

#[derive(Serialize)]
struct SubmitForm<'a> {
    key: &'a str,
    method: &'a str,
    sitekey: &'a str,
    pageurl: &'a str,
}

/// Adapter for the TwoCaptcha service.
pub struct TwoCaptchaProvider {
    api_key: String,
    config: CaptchaConfig,
    client: reqwest::Client,
}

impl TwoCaptchaProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CaptchaError> {
        Self::with_config(api_key, CaptchaConfig::default())
    }

    pub fn with_config(
        api_key: impl Into<String>,
        config: CaptchaConfig,
    ) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| CaptchaError::Configuration(err.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn method_for(challenge_type: ChallengeType) -> &'static str {
        match challenge_type {
            ChallengeType::HCaptcha => "hcaptcha",
            ChallengeType::RecaptchaV2 => "userrecaptcha",
            ChallengeType::Turnstile => "turnstile",
        }
    }

    async fn submit(&self, challenge: &ChallengeSpec) -> Result<String, CaptchaError> {
        let form = SubmitForm {
            key: &self.api_key,
            method: Self::method_for(challenge.challenge_type),
            sitekey: &challenge.site_key,
            pageurl: challenge.page_url.as_str(),
        };

        let text = self
            .client
            .post(SUBMIT_URL)
            .form(&form)
            .send()
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))?
            .text()
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))?;

        match text.strip_prefix("OK|") {
            Some(id) => Ok(id.to_string()),
            None if is_key_error(&text) => Err(CaptchaError::Configuration(text)),
            None => Err(CaptchaError::Unavailable(text)),
        }
    }

    async fn poll(&self, captcha_id: &str) -> Result<Option<String>, CaptchaError> {
        let url = format!(
            "{RESULT_URL}?key={}&action=get&id={}",
            self.api_key, captcha_id
        );

        let text = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))?
            .text()
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))?;

        if let Some(token) = text.strip_prefix("OK|") {
            return Ok(Some(token.to_string()));
        }
        if text == NOT_READY {
            return Ok(None);
        }
        if text.contains("ERROR_CAPTCHA_UNSOLVABLE") {
            return Err(CaptchaError::Rejected(text));
        }
        Err(CaptchaError::Unavailable(text))
    }
}

fn is_key_error(text: &str) -> bool {
    text.contains("ERROR_WRONG_USER_KEY")
        || text.contains("ERROR_KEY_DOES_NOT_EXIST")
        || text.contains("ERROR_ZERO_BALANCE")
}

#[async_trait]
impl CaptchaProvider for TwoCaptchaProvider {
    fn name(&self) -> &'static str {
        "twocaptcha"
    }

    async fn solve(&self, challenge: &ChallengeSpec) -> CaptchaResult {
        let captcha_id = self.submit(challenge).await?;
        let deadline = Instant::now() + self.config.timeout;

        loop {
            sleep(self.config.poll_interval).await;
            if let Some(token) = self.poll(&captcha_id).await? {
                return Ok(CaptchaSolution::new(token));
            }
            if Instant::now() >= deadline {
                return Err(CaptchaError::Timeout(self.config.timeout));
            }
        }
    }
}
