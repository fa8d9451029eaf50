//! Single gated action execution.
//!
//! One action is a bounded retry loop around solve-submit-interpret. Each
//! attempt resolves to an explicit directive, and the loop applies the retry
//! policy to the directive instead of branching inline. Tokens are single-use,
//! so every attempt acquires a fresh one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use log::{debug, warn};
use serde_json::json;
use tokio::time::sleep;
use url::Url;

use crate::classify::{FailureKind, ServerPayload, classify_response};
use crate::identity::Identity;
use crate::session::SessionState;
use crate::solver::TokenSource;
use crate::transport::ActionTransport;

/// Actions the campaign performs, in wire-protocol terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    FollowTwitter,
    FollowTelegram,
    PostTwitter,
}

impl ActionKind {
    /// Fixed per-identity execution order.
    pub const CAMPAIGN_SEQUENCE: [ActionKind; 3] = [
        ActionKind::FollowTwitter,
        ActionKind::FollowTelegram,
        ActionKind::PostTwitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::FollowTwitter => "followTwitter",
            ActionKind::FollowTelegram => "followTelegram",
            ActionKind::PostTwitter => "postTwitter",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one action: the first success or the last attempt.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub succeeded: bool,
    pub server_message: Option<String>,
    pub failure: Option<FailureKind>,
    pub attempts: u32,
}

/// Retry budget and the per-failure-class delays.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub protection_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration, protection_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            protection_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            protection_backoff: Duration::from_secs(30),
        }
    }
}

/// What a single attempt decided, before the policy is applied.
#[derive(Debug)]
enum AttemptDirective {
    Succeed(Option<String>),
    RetryImmediately(FailureKind),
    RetryAfter(Duration, FailureKind),
    FailFast(FailureKind, Option<String>),
}

/// Executes one gated action against the remote endpoint.
pub struct ActionExecutor {
    transport: Arc<dyn ActionTransport>,
    tokens: TokenSource,
    action_url: Url,
    base_headers: HeaderMap,
    policy: RetryPolicy,
}

impl ActionExecutor {
    pub fn new(
        transport: Arc<dyn ActionTransport>,
        tokens: TokenSource,
        action_url: Url,
        base_headers: HeaderMap,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            tokens,
            action_url,
            base_headers,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the bounded retry loop for one action.
    pub async fn execute(
        &self,
        kind: ActionKind,
        identity: &Identity,
        session: &mut SessionState,
    ) -> ActionOutcome {
        let mut last_failure = FailureKind::GenericServer;
        let mut last_message = None;

        for attempt in 1..=self.policy.max_attempts {
            debug!(
                "[{kind}] {} attempt {attempt}/{}",
                identity.handle, self.policy.max_attempts
            );

            match self.attempt(kind, identity, session).await {
                AttemptDirective::Succeed(message) => {
                    return ActionOutcome {
                        action: kind,
                        succeeded: true,
                        server_message: message,
                        failure: None,
                        attempts: attempt,
                    };
                }
                AttemptDirective::FailFast(failure, message) => {
                    warn!("[{kind}] {} failed: {failure}", identity.handle);
                    return ActionOutcome {
                        action: kind,
                        succeeded: false,
                        server_message: message,
                        failure: Some(failure),
                        attempts: attempt,
                    };
                }
                AttemptDirective::RetryImmediately(failure) => {
                    last_failure = failure;
                    last_message = None;
                }
                AttemptDirective::RetryAfter(delay, failure) => {
                    last_failure = failure;
                    last_message = None;
                    if attempt < self.policy.max_attempts {
                        debug!("[{kind}] {} backing off {delay:?} ({failure})", identity.handle);
                        sleep(delay).await;
                    }
                }
            }
        }

        warn!(
            "[{kind}] {} exhausted {} attempts ({last_failure})",
            identity.handle, self.policy.max_attempts
        );
        ActionOutcome {
            action: kind,
            succeeded: false,
            server_message: last_message,
            failure: Some(last_failure),
            attempts: self.policy.max_attempts,
        }
    }

    async fn attempt(
        &self,
        kind: ActionKind,
        identity: &Identity,
        session: &mut SessionState,
    ) -> AttemptDirective {
        // Solver failures are soft: they consume the attempt but share the
        // same budget as submission failures.
        let token = match self
            .tokens
            .acquire(self.transport.as_ref(), &self.base_headers, session)
            .await
        {
            Ok(token) => token,
            Err(err) => {
                warn!("[{kind}] {} solver failed: {err}", identity.handle);
                return AttemptDirective::RetryAfter(
                    self.policy.retry_delay,
                    FailureKind::from_captcha_error(&err),
                );
            }
        };

        let body = json!({
            "action": kind.as_str(),
            "handle": identity.handle,
            "wallet": identity.wallet,
            "captcha": token,
        });
        let mut headers = self.base_headers.clone();
        session.apply_to(&mut headers);

        let response = match self.transport.post_json(&self.action_url, &headers, &body).await {
            Ok(response) => response,
            Err(err) => {
                warn!("[{kind}] {} transport error: {err}", identity.handle);
                return AttemptDirective::RetryAfter(self.policy.retry_delay, FailureKind::Network);
            }
        };
        session.record_from_response(&response.headers);

        if let Some(payload) = ServerPayload::parse(&response.body) {
            if payload.is_success() {
                return AttemptDirective::Succeed(payload.message);
            }
            if payload.mentions_captcha_failure() {
                // Token was burned; re-solve and resubmit straight away.
                return AttemptDirective::RetryImmediately(FailureKind::CaptchaRejected);
            }
            // Not every rejection is retryable; surface it as-is.
            return AttemptDirective::FailFast(FailureKind::GenericServer, payload.message);
        }

        match classify_response(response.status, &response.body) {
            FailureKind::BotProtection => AttemptDirective::RetryAfter(
                self.policy.protection_backoff,
                FailureKind::BotProtection,
            ),
            failure => AttemptDirective::FailFast(failure, None),
        }
    }
}
