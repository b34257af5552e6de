//! HTTP client for the advisory risk evaluation service.
//!
//! POSTs the evaluation context as JSON and expects a JSON advisory back.
//! The request timeout is short on purpose: a slow advisory degrades the
//! engine, it must not stall agents.

use async_trait::async_trait;
use overseer_application::ports::risk_evaluator::{
    RiskAdvisory, RiskContext, RiskEvaluator, RiskServiceError,
};
use std::time::Duration;

pub struct HttpRiskEvaluator {
    client: reqwest::Client,
    url: String,
}

impl HttpRiskEvaluator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RiskServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RiskServiceError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RiskEvaluator for HttpRiskEvaluator {
    async fn evaluate(
        &self,
        context: &RiskContext<'_>,
    ) -> Result<RiskAdvisory, RiskServiceError> {
        let response = self
            .client
            .post(&self.url)
            .json(context)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RiskServiceError::Timeout
                } else {
                    RiskServiceError::Unreachable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(RiskServiceError::Malformed(format!(
                "http status {}",
                response.status()
            )));
        }

        response
            .json::<RiskAdvisory>()
            .await
            .map_err(|e| RiskServiceError::Malformed(e.to_string()))
    }
}
