//! Campaign binary.
//!
//! Usage: `socialdrop-runner [users-file] [wallets-file] [progress-log]`
//! (defaults: `user.txt`, `wallets.txt`, `progress.log`). Endpoint, solver,
//! and pacing configuration come from `SOCIALDROP_*` environment variables.

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use log::info;

use socialdrop_runner::{
    ActionExecutor, CampaignRunner, ConfigError, Identity, ProgressLog, ReqwestTransport,
    RunnerConfig, RunnerError, TokenSource,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RunnerError> {
    let mut args = env::args().skip(1);
    let users_path = args.next().unwrap_or_else(|| "user.txt".to_string());
    let wallets_path = args.next().unwrap_or_else(|| "wallets.txt".to_string());
    let progress_path = args.next().unwrap_or_else(|| "progress.log".to_string());

    let config = RunnerConfig::from_env()?;
    let identities = Identity::load_pairs(Path::new(&users_path), Path::new(&wallets_path))?;
    info!("loaded {} identities", identities.len());

    let provider = config
        .provider()
        .map_err(|err| ConfigError::Invalid(err.to_string()))?;
    let transport = Arc::new(ReqwestTransport::new()?);
    let tokens = TokenSource::new(
        provider,
        config.challenge.clone(),
        config.register_url.clone(),
        config.settle_delay,
    );
    let executor = ActionExecutor::new(
        transport,
        tokens,
        config.action_url.clone(),
        config.base_headers()?,
        config.policy.clone(),
    );
    let progress = ProgressLog::open(Path::new(&progress_path))?;

    let mut runner = CampaignRunner::new(
        executor,
        progress,
        config.inter_action_delay,
        config.inter_identity_delay,
    );
    let summary = runner.run(&identities).await?;

    println!(
        "campaign finished: {} identities, {} actions ok, {} failed",
        summary.identities, summary.actions_succeeded, summary.actions_failed
    );
    Ok(())
}
