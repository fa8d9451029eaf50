//! Campaign sequencing.
//!
//! Processes identities strictly in input order, runs the fixed action list
//! for each, and paces between actions and identities to mimic human
//! interaction. Per-action failures are recorded and the run moves on; only
//! upfront configuration problems abort a campaign.

use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use tokio::time::sleep;

use crate::config::ConfigError;
use crate::executor::{ActionExecutor, ActionKind, ActionOutcome};
use crate::identity::Identity;
use crate::progress::ProgressLog;
use crate::session::SessionState;
use crate::transport::TransportError;

/// Campaign-level fatal errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("progress log write failed: {0}")]
    Progress(#[from] std::io::Error),
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

/// All outcomes for one identity, in action order.
#[derive(Debug, Clone)]
pub struct IdentityReport {
    pub handle: String,
    pub wallet: String,
    pub outcomes: Vec<ActionOutcome>,
}

impl IdentityReport {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }
}

/// Aggregate view of a finished campaign.
#[derive(Debug, Clone, Default)]
pub struct CampaignSummary {
    pub identities: usize,
    pub actions_succeeded: usize,
    pub actions_failed: usize,
    pub reports: Vec<IdentityReport>,
}

/// Drives the whole campaign over a single sequential flow of execution.
pub struct CampaignRunner {
    executor: ActionExecutor,
    session: SessionState,
    progress: ProgressLog,
    inter_action_delay: Duration,
    inter_identity_delay: Duration,
}

impl CampaignRunner {
    pub fn new(
        executor: ActionExecutor,
        progress: ProgressLog,
        inter_action_delay: Duration,
        inter_identity_delay: Duration,
    ) -> Self {
        Self {
            executor,
            session: SessionState::new(),
            progress,
            inter_action_delay,
            inter_identity_delay,
        }
    }

    /// Run every identity through the fixed action sequence, in input order.
    pub async fn run(&mut self, identities: &[Identity]) -> Result<CampaignSummary, RunnerError> {
        let mut summary = CampaignSummary {
            identities: identities.len(),
            ..CampaignSummary::default()
        };

        for (index, identity) in identities.iter().enumerate() {
            info!(
                "processing {} ({}/{})",
                identity.handle,
                index + 1,
                identities.len()
            );

            let sequence = ActionKind::CAMPAIGN_SEQUENCE;
            let mut outcomes = Vec::with_capacity(sequence.len());
            for (slot, kind) in sequence.iter().enumerate() {
                let outcome = self
                    .executor
                    .execute(*kind, identity, &mut self.session)
                    .await;
                self.progress.record_action(&identity.handle, &outcome)?;

                if outcome.succeeded {
                    summary.actions_succeeded += 1;
                } else {
                    summary.actions_failed += 1;
                }
                outcomes.push(outcome);

                if slot + 1 < sequence.len() {
                    sleep(self.inter_action_delay).await;
                }
            }

            let report = IdentityReport {
                handle: identity.handle.clone(),
                wallet: identity.wallet.clone(),
                outcomes,
            };
            if !report.all_succeeded() {
                warn!(
                    "{}: {}/{} actions succeeded",
                    report.handle,
                    report.succeeded_count(),
                    report.outcomes.len()
                );
            }
            self.progress.record_identity(&report)?;
            summary.reports.push(report);

            if index + 1 < identities.len() {
                sleep(self.inter_identity_delay).await;
            }
        }

        info!(
            "campaign finished: {} identities, {} actions ok, {} failed",
            summary.identities, summary.actions_succeeded, summary.actions_failed
        );
        Ok(summary)
    }
}
