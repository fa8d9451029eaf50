//! Captcha provider integrations.
//!
//! These adapters provide a unified interface for third-party captcha
//! solvers. The orchestration engine stays agnostic of vendor-specific wire
//! details: it hands over a challenge descriptor and receives a solved token
//! string or a typed failure.

mod capsolver;
mod twocaptcha;

pub use capsolver::CapSolverProvider;
pub use twocaptcha::TwoCaptchaProvider;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// High-level configuration that controls captcha solving behaviour.
#[derive(Debug, Clone)]
pub struct CaptchaConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Challenge families the backends know how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeType {
    HCaptcha,
    RecaptchaV2,
    Turnstile,
}

/// Static description of the challenge gating the remote endpoint.
#[derive(Debug, Clone)]
pub struct ChallengeSpec {
    pub site_key: String,
    pub page_url: Url,
    pub challenge_type: ChallengeType,
}

impl ChallengeSpec {
    pub fn new(site_key: impl Into<String>, page_url: Url, challenge_type: ChallengeType) -> Self {
        Self {
            site_key: site_key.into(),
            page_url,
            challenge_type,
        }
    }
}

/// Raw solved token as returned by the vendor, before normalization.
#[derive(Debug, Clone)]
pub struct CaptchaSolution {
    pub token: String,
}

impl CaptchaSolution {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Common result type returned by captcha providers.
pub type CaptchaResult = Result<CaptchaSolution, CaptchaError>;

/// Shared interface implemented by captcha vendors.
#[async_trait]
pub trait CaptchaProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn solve(&self, challenge: &ChallengeSpec) -> CaptchaResult;
}

/// Errors surfaced by captcha providers and token registration.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha provider misconfigured: {0}")]
    Configuration(String),
    #[error("captcha provider unavailable: {0}")]
    Unavailable(String),
    #[error("captcha solving timed out after {0:?}")]
    Timeout(Duration),
    #[error("captcha solution rejected: {0}")]
    Rejected(String),
}
