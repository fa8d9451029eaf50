//! # socialdrop-runner
//!
//! Request-orchestration engine for captcha-gated "socialdrop" campaigns: it
//! sequences a fixed list of per-identity actions against a remote endpoint,
//! interleaves challenge solving with submissions, carries session cookies
//! across calls, and applies a differentiated retry policy per failure class
//! (rejected captcha, bot-protection block, network fault, server error).
//!
//! The campaign is deliberately single-flow: one identity, one action, one
//! attempt at a time, with cooperative pacing between each step.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use socialdrop_runner::{
//!     ActionExecutor, CampaignRunner, Identity, ProgressLog, ReqwestTransport, RunnerConfig,
//!     TokenSource,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunnerConfig::from_env()?;
//!     let identities = Identity::load_pairs("user.txt".as_ref(), "wallets.txt".as_ref())?;
//!
//!     let transport = Arc::new(ReqwestTransport::new()?);
//!     let tokens = TokenSource::new(
//!         config.provider()?,
//!         config.challenge.clone(),
//!         config.register_url.clone(),
//!         config.settle_delay,
//!     );
//!     let executor = ActionExecutor::new(
//!         transport,
//!         tokens,
//!         config.action_url.clone(),
//!         config.base_headers()?,
//!         config.policy.clone(),
//!     );
//!     let progress = ProgressLog::open("progress.log".as_ref())?;
//!
//!     let mut runner = CampaignRunner::new(
//!         executor,
//!         progress,
//!         config.inter_action_delay,
//!         config.inter_identity_delay,
//!     );
//!     let summary = runner.run(&identities).await?;
//!     println!("{} actions ok", summary.actions_succeeded);
//!     Ok(())
//! }
//! ```

pub mod captcha;
pub mod classify;
pub mod config;
pub mod executor;
pub mod identity;
pub mod progress;
pub mod runner;
pub mod session;
pub mod solver;
pub mod transport;

pub use crate::captcha::{
    CapSolverProvider, CaptchaConfig, CaptchaError, CaptchaProvider, CaptchaResult,
    CaptchaSolution, ChallengeSpec, ChallengeType, TwoCaptchaProvider,
};
pub use crate::classify::{FailureKind, ServerPayload, classify_response};
pub use crate::config::{ConfigError, RunnerConfig, RunnerConfigBuilder, SolverBackend};
pub use crate::executor::{ActionExecutor, ActionKind, ActionOutcome, RetryPolicy};
pub use crate::identity::{Identity, normalize_handle};
pub use crate::progress::ProgressLog;
pub use crate::runner::{CampaignRunner, CampaignSummary, IdentityReport, RunnerError};
pub use crate::session::SessionState;
pub use crate::solver::TokenSource;
pub use crate::transport::{ActionTransport, ReqwestTransport, TransportError, TransportResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
