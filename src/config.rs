//! Runner configuration.
//!
//! Collects the endpoint URLs, browser-like header set, captcha backend
//! selection, and every pacing knob behind a builder so the binary and tests
//! construct runners the same way.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use http::header::{CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use http::{HeaderMap, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::captcha::{
    CapSolverProvider, CaptchaConfig, CaptchaError, CaptchaProvider, ChallengeSpec, ChallengeType,
    TwoCaptchaProvider,
};
use crate::executor::RetryPolicy;

const DEFAULT_ACTION_URL: &str = "https://umcoin.org/socialdrop";
const DEFAULT_REGISTER_URL: &str = "https://umcoin.org/socialdrop/captcha";
const DEFAULT_ORIGIN: &str = "https://umcoin.org";
const DEFAULT_REFERER: &str = "https://umcoin.org/";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

const DEFAULT_INTER_ACTION_SECS: u64 = 2;
const DEFAULT_INTER_IDENTITY_SECS: u64 = 5;
const DEFAULT_SETTLE_SECS: u64 = 2;

/// Fatal configuration problems detected before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("identity/wallet count mismatch: {handles} handles, {wallets} wallets")]
    CountMismatch { handles: usize, wallets: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid url for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("unknown solver backend '{0}'")]
    UnknownSolver(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Captcha backend selected for the run. Exactly one is active per campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    TwoCaptcha,
    CapSolver,
}

impl SolverBackend {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "twocaptcha" | "2captcha" => Ok(Self::TwoCaptcha),
            "capsolver" => Ok(Self::CapSolver),
            other => Err(ConfigError::UnknownSolver(other.to_string())),
        }
    }
}

/// Complete configuration for one campaign run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub action_url: Url,
    pub register_url: Url,
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
    pub challenge: ChallengeSpec,
    pub solver: SolverBackend,
    pub solver_api_key: String,
    pub captcha: CaptchaConfig,
    pub policy: RetryPolicy,
    pub inter_action_delay: Duration,
    pub inter_identity_delay: Duration,
    pub settle_delay: Duration,
}

impl RunnerConfig {
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::new()
    }

    /// Build the configuration from `SOCIALDROP_*` environment variables.
    ///
    /// Required: `SOCIALDROP_SOLVER_KEY` and `SOCIALDROP_SITE_KEY`. Everything
    /// else falls back to the defaults baked into the builder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Ok(raw) = env::var("SOCIALDROP_ACTION_URL") {
            builder = builder.with_action_url(parse_url("SOCIALDROP_ACTION_URL", &raw)?);
        }
        if let Ok(raw) = env::var("SOCIALDROP_REGISTER_URL") {
            builder = builder.with_register_url(parse_url("SOCIALDROP_REGISTER_URL", &raw)?);
        }
        if let Ok(raw) = env::var("SOCIALDROP_SOLVER") {
            builder = builder.with_solver(SolverBackend::parse(&raw)?);
        }
        if let Ok(key) = env::var("SOCIALDROP_SOLVER_KEY") {
            builder = builder.with_solver_api_key(key);
        }
        if let Ok(site_key) = env::var("SOCIALDROP_SITE_KEY") {
            let page_url = match env::var("SOCIALDROP_PAGE_URL") {
                Ok(raw) => parse_url("SOCIALDROP_PAGE_URL", &raw)?,
                Err(_) => parse_url("SOCIALDROP_PAGE_URL", DEFAULT_REFERER)?,
            };
            builder = builder.with_challenge(ChallengeSpec::new(
                site_key,
                page_url,
                ChallengeType::HCaptcha,
            ));
        }
        if let Some(attempts) = env_u64("SOCIALDROP_MAX_ATTEMPTS")? {
            builder = builder.with_max_attempts(attempts as u32);
        }
        if let Some(secs) = env_u64("SOCIALDROP_RETRY_DELAY_SECS")? {
            builder = builder.with_retry_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = env_u64("SOCIALDROP_PROTECTION_BACKOFF_SECS")? {
            builder = builder.with_protection_backoff(Duration::from_secs(secs));
        }
        if let Some(secs) = env_u64("SOCIALDROP_INTER_ACTION_SECS")? {
            builder = builder.with_inter_action_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = env_u64("SOCIALDROP_INTER_IDENTITY_SECS")? {
            builder = builder.with_inter_identity_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = env_u64("SOCIALDROP_SETTLE_SECS")? {
            builder = builder.with_settle_delay(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Header set sent with every outbound request. The session cookie header
    /// is layered on separately from the accumulated [`SessionState`].
    ///
    /// [`SessionState`]: crate::session::SessionState
    pub fn base_headers(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&self.origin)
                .map_err(|_| ConfigError::InvalidHeader("origin"))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&self.referer)
                .map_err(|_| ConfigError::InvalidHeader("referer"))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|_| ConfigError::InvalidHeader("user-agent"))?,
        );
        Ok(headers)
    }

    /// Instantiate the configured captcha backend.
    pub fn provider(&self) -> Result<Arc<dyn CaptchaProvider>, CaptchaError> {
        match self.solver {
            SolverBackend::TwoCaptcha => Ok(Arc::new(TwoCaptchaProvider::with_config(
                self.solver_api_key.clone(),
                self.captcha.clone(),
            )?)),
            SolverBackend::CapSolver => Ok(Arc::new(CapSolverProvider::with_config(
                self.solver_api_key.clone(),
                self.captcha.clone(),
            )?)),
        }
    }
}

/// Fluent builder for [`RunnerConfig`].
pub struct RunnerConfigBuilder {
    action_url: Url,
    register_url: Url,
    origin: String,
    referer: String,
    user_agent: String,
    challenge: Option<ChallengeSpec>,
    solver: SolverBackend,
    solver_api_key: String,
    captcha: CaptchaConfig,
    policy: RetryPolicy,
    inter_action_delay: Duration,
    inter_identity_delay: Duration,
    settle_delay: Duration,
}

impl RunnerConfigBuilder {
    pub fn new() -> Self {
        Self {
            action_url: Url::parse(DEFAULT_ACTION_URL).expect("default action url"),
            register_url: Url::parse(DEFAULT_REGISTER_URL).expect("default register url"),
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            challenge: None,
            solver: SolverBackend::TwoCaptcha,
            solver_api_key: String::new(),
            captcha: CaptchaConfig::default(),
            policy: RetryPolicy::default(),
            inter_action_delay: Duration::from_secs(DEFAULT_INTER_ACTION_SECS),
            inter_identity_delay: Duration::from_secs(DEFAULT_INTER_IDENTITY_SECS),
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_SECS),
        }
    }

    pub fn with_action_url(mut self, url: Url) -> Self {
        self.action_url = url;
        self
    }

    pub fn with_register_url(mut self, url: Url) -> Self {
        self.register_url = url;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_challenge(mut self, challenge: ChallengeSpec) -> Self {
        self.challenge = Some(challenge);
        self
    }

    pub fn with_solver(mut self, solver: SolverBackend) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_solver_api_key(mut self, key: impl Into<String>) -> Self {
        self.solver_api_key = key.into();
        self
    }

    pub fn with_captcha_config(mut self, captcha: CaptchaConfig) -> Self {
        self.captcha = captcha;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.policy.retry_delay = delay;
        self
    }

    pub fn with_protection_backoff(mut self, backoff: Duration) -> Self {
        self.policy.protection_backoff = backoff;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_inter_action_delay(mut self, delay: Duration) -> Self {
        self.inter_action_delay = delay;
        self
    }

    pub fn with_inter_identity_delay(mut self, delay: Duration) -> Self {
        self.inter_identity_delay = delay;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn build(self) -> Result<RunnerConfig, ConfigError> {
        let challenge = self
            .challenge
            .ok_or_else(|| ConfigError::Invalid("challenge site key not configured".into()))?;
        if challenge.site_key.trim().is_empty() {
            return Err(ConfigError::Invalid("challenge site key is empty".into()));
        }
        if self.solver_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("solver api key is empty".into()));
        }

        Ok(RunnerConfig {
            action_url: self.action_url,
            register_url: self.register_url,
            origin: self.origin,
            referer: self.referer,
            user_agent: self.user_agent,
            challenge,
            solver: self.solver,
            solver_api_key: self.solver_api_key,
            captcha: self.captcha,
            policy: self.policy,
            inter_action_delay: self.inter_action_delay,
            inter_identity_delay: self.inter_identity_delay,
            settle_delay: self.settle_delay,
        })
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}
