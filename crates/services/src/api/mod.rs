//! Boundary with the remote exam backend.

mod http;
mod memory;
mod wire;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use exam_core::model::{ExamId, ExamMode, ExamOverview, OptionLetter, PartData, PartId, QuestionId};

use crate::error::ApiError;

pub use http::HttpExamApi;
pub use memory::InMemoryExamApi;

/// The three backend calls the exam controller depends on.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// `GET /exams/public/{examId}`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, status or payload failures.
    async fn fetch_exam(&self, exam_id: ExamId) -> Result<ExamOverview, ApiError>;

    /// `GET /question-groups/by-parts?partIds=<csv>`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, status or payload failures.
    async fn fetch_parts(&self, part_ids: &[PartId]) -> Result<Vec<PartData>, ApiError>;

    /// `POST /exams/submit`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, status or payload failures.
    async fn submit_exam(&self, request: &SubmitExamRequest) -> Result<ExamResult, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_option: OptionLetter,
}

/// Aggregated answer sheet for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub exam_id: ExamId,
    pub mode: ExamMode,
    pub part_ids: Vec<PartId>,
    pub answers: Vec<SubmittedAnswer>,
    pub time_spent_seconds: u32,
    pub submitted_at: DateTime<Utc>,
}

/// Score breakdown returned by the backend. Displayed as-is, never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamResult(Value);

impl ExamResult {
    #[must_use]
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn total_score(&self) -> Option<f64> {
        self.field("totalScore").and_then(Value::as_f64)
    }

    #[must_use]
    pub fn listening_score(&self) -> Option<f64> {
        self.field("listeningScore").and_then(Value::as_f64)
    }

    #[must_use]
    pub fn reading_score(&self) -> Option<f64> {
        self.field("readingScore").and_then(Value::as_f64)
    }
}
