//! Typed client for the remote pension API. The calculation engine itself
//! is external; this module only knows the request and response shapes and
//! where to send them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_flow::{CompletionRecord, CompletionSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayedScenario {
    pub years: u32,
    pub pension: f64,
    pub increase_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionDetails {
    pub with_sick_leave: f64,
    pub without_sick_leave: f64,
    pub replacement_rate: f64,
    pub vs_average_pension: f64,
    pub delayed_scenarios: Vec<DelayedScenario>,
    pub salary_needed_for_expected: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProgression {
    pub year: i32,
    pub balance_nominal: f64,
    pub balance_real: f64,
}

/// Response of `POST /pension/calculate`; consumed for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionResponse {
    pub nominal_pension: PensionDetails,
    pub real_pension: PensionDetails,
    pub account_progression: Vec<AccountProgression>,
}

/// One historical calculation, as returned by `GET /pension/audit`. The
/// response payload stays opaque; reporting only reads the request side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub calculated_at: DateTime<Utc>,
    pub request: CompletionRecord,
    pub response: Value,
}

#[derive(Clone)]
pub struct PensionClient {
    http: reqwest::Client,
    base_url: String,
}

impl PensionClient {
    pub fn from_env() -> Self {
        let base_url = std::env::var("PENSION_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn calculate(&self, record: &CompletionRecord) -> anyhow::Result<PensionResponse> {
        let url = format!("{}/pension/calculate", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(record)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn audit(&self) -> anyhow::Result<Vec<AuditRecord>> {
        let url = format!("{}/pension/audit", self.base_url);
        let records = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(records)
    }
}

/// Completion sink that submits the finished intake record for
/// calculation. Failures are logged and swallowed; the chat already ended
/// with its closing message and must not surface transport errors.
pub struct CalculationSink {
    client: PensionClient,
}

impl CalculationSink {
    pub fn new(client: PensionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionSink for CalculationSink {
    async fn deliver(&self, record: CompletionRecord) {
        info!(
            retirement_year = record.retirement_year,
            zip_code = ?record.zip_code,
            "submitting completed intake for calculation"
        );
        match self.client.calculate(&record).await {
            Ok(response) => info!(
                nominal = response.nominal_pension.with_sick_leave,
                real = response.real_pension.with_sick_leave,
                "pension calculation received"
            ),
            Err(e) => error!(error = %e, "pension calculation failed"),
        }
    }
}
