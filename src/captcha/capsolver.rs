//! CapSolver adapter.
//!
//! Speaks the JSON task protocol: `createTask` returns a task id which is
//! polled through `getTaskResult` until the task is ready or fails.

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};

use super::{
    CaptchaConfig, CaptchaError, CaptchaProvider, CaptchaResult, CaptchaSolution, ChallengeSpec,
    ChallengeType,
};

const CREATE_TASK_URL: &str = "https://api.capsolver.com/createTask";
const TASK_RESULT_URL: &str = "https://api.capsolver.com/getTaskResult";

/// Adapter for the CapSolver service.
pub struct CapSolverProvider {
    api_key: String,
    config: CaptchaConfig,
    client: reqwest::Client,
}

impl CapSolverProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CaptchaError> {
        Self::with_config(api_key, CaptchaConfig::default())
    }

    pub fn with_config(
        api_key: impl Into<String>,
        config: CaptchaConfig,
    ) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|err| CaptchaError::Configuration(err.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn task_type(challenge_type: ChallengeType) -> &'static str {
        match challenge_type {
            ChallengeType::HCaptcha => "HCaptchaTaskProxyLess",
            ChallengeType::RecaptchaV2 => "ReCaptchaV2TaskProxyLess",
            ChallengeType::Turnstile => "AntiTurnstileTaskProxyLess",
        }
    }

    async fn call(&self, url: &str, body: &Value) -> Result<Value, CaptchaError> {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))?
            .json::<Value>()
            .await
            .map_err(|err| CaptchaError::Unavailable(err.to_string()))
    }

    async fn create_task(&self, challenge: &ChallengeSpec) -> Result<String, CaptchaError> {
        let body = json!({
            "clientKey": self.api_key,
            "task": {
                "type": Self::task_type(challenge.challenge_type),
                "websiteURL": challenge.page_url.as_str(),
                "websiteKey": challenge.site_key,
            },
        });

        let response = self.call(CREATE_TASK_URL, &body).await?;
        if response["errorId"].as_i64().unwrap_or(0) != 0 {
            return Err(vendor_error(&response));
        }

        response["taskId"]
            .as_str()
            .map(str::to_string)
            .or_else(|| response["taskId"].as_i64().map(|id| id.to_string()))
            .ok_or_else(|| CaptchaError::Unavailable("createTask returned no taskId".into()))
    }

    async fn poll_task(&self, task_id: &str) -> Result<Option<String>, CaptchaError> {
        let body = json!({
            "clientKey": self.api_key,
            "taskId": task_id,
        });

        let response = self.call(TASK_RESULT_URL, &body).await?;
        if response["errorId"].as_i64().unwrap_or(0) != 0 {
            return Err(vendor_error(&response));
        }

        match response["status"].as_str() {
            Some("ready") => {
                let solution = &response["solution"];
                solution["gRecaptchaResponse"]
                    .as_str()
                    .or_else(|| solution["token"].as_str())
                    .map(|token| Some(token.to_string()))
                    .ok_or_else(|| {
                        CaptchaError::Unavailable("ready task carried no token".into())
                    })
            }
            Some("processing") | None => Ok(None),
            Some(other) => Err(CaptchaError::Rejected(format!("task status '{other}'"))),
        }
    }
}

fn vendor_error(response: &Value) -> CaptchaError {
    let code = response["errorCode"].as_str().unwrap_or("");
    let description = response["errorDescription"]
        .as_str()
        .unwrap_or("unknown capsolver error");

    if code.contains("KEY") || code.contains("BALANCE") {
        CaptchaError::Configuration(format!("{code}: {description}"))
    } else if code.contains("UNSOLVABLE") || code.contains("FAILED") {
        CaptchaError::Rejected(format!("{code}: {description}"))
    } else {
        CaptchaError::Unavailable(format!("{code}: {description}"))
    }
}

#[async_trait]
impl CaptchaProvider for CapSolverProvider {
    fn name(&self) -> &'static str {
        "capsolver"
    }

    async fn solve(&self, challenge: &ChallengeSpec) -> CaptchaResult {
        let task_id = self.create_task(challenge).await?;
        let deadline = Instant::now() + self.config.timeout;

        loop {
            sleep(self.config.poll_interval).await;
            if let Some(token) = self.poll_task(&task_id).await? {
                return Ok(CaptchaSolution::new(token));
            }
            if Instant::now() >= deadline {
                return Err(CaptchaError::Timeout(self.config.timeout));
            }
        }
    }
}
