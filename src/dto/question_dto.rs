use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::database::question_store::AccuracyCounts;
use crate::error::{Error, Result};
use crate::models::domain::Domain;
use crate::models::question::{Accuracy, QuestionRecord};
use crate::services::batch_service::BatchSummary;
use crate::services::grading_service::{GradingOutcome, GradingStatus};

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DomainQuery {
    /// One of `Computer_Security`, `History`, `Social_Science`.
    pub domain: Option<String>,
}

impl DomainQuery {
    pub fn parse(&self) -> Result<Domain> {
        self.domain
            .as_deref()
            .ok_or_else(|| Error::InvalidDomain("missing domain parameter".to_string()))?
            .parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GradeQuestionRequest {
    #[serde(default)]
    pub domain: String,
    #[serde(rename = "_id")]
    pub id: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub question: String,
    #[serde(rename = "A", default)]
    #[validate(length(min = 1))]
    pub a: String,
    #[serde(rename = "B", default)]
    #[validate(length(min = 1))]
    pub b: String,
    #[serde(rename = "C", default)]
    #[validate(length(min = 1))]
    pub c: String,
    #[serde(rename = "D", default)]
    #[validate(length(min = 1))]
    pub d: String,
}

impl GradeQuestionRequest {
    /// Domain and id, checked before the body fields so an unknown domain wins.
    pub fn target(&self) -> Result<(Domain, i64)> {
        let domain: Domain = self.domain.parse()?;
        let id = self
            .id
            .ok_or_else(|| Error::InvalidInput("Missing _id".to_string()))?;
        Ok((domain, id))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeQuestionResponse {
    pub model_response: String,
    pub accuracy: Accuracy,
    pub response_time_ms: i64,
    pub status: GradingStatus,
    pub persisted: bool,
    pub updated_record: QuestionRecord,
}

impl From<GradingOutcome> for GradeQuestionResponse {
    fn from(outcome: GradingOutcome) -> Self {
        Self {
            persisted: outcome.persisted(),
            model_response: outcome.model_response,
            accuracy: outcome.accuracy,
            response_time_ms: outcome.response_time_ms,
            status: outcome.status,
            updated_record: outcome.record,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchResponse {
    pub message: String,
    pub summary: BatchSummary,
}

impl From<BatchSummary> for BatchResponse {
    fn from(summary: BatchSummary) -> Self {
        let message = if summary.cancelled {
            format!(
                "Grading for {} was cancelled after {} of {} questions",
                summary.domain, summary.attempted, summary.total
            )
        } else {
            format!("Generated responses for all questions in {}", summary.domain)
        };
        Self { message, summary }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AverageResponseTimeResponse {
    pub domain: Domain,
    pub average_response_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccuracySummaryResponse {
    pub domain: Domain,
    pub total: i64,
    pub graded: i64,
    pub correct: i64,
    pub incorrect: i64,
    pub accuracy_percent: Option<f64>,
}

impl AccuracySummaryResponse {
    pub fn new(domain: Domain, counts: AccuracyCounts) -> Self {
        let accuracy_percent = (counts.graded > 0)
            .then(|| counts.correct as f64 * 100.0 / counts.graded as f64);
        Self {
            domain,
            total: counts.total,
            graded: counts.graded,
            correct: counts.correct,
            incorrect: counts.incorrect,
            accuracy_percent,
        }
    }
}
