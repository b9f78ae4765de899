use chrono::{DateTime, Utc};
use tracing::{info, warn};

use exam_core::model::{ExamId, ExamMode, PartId};
use storage::{AnswerStore, StorageError};

use crate::api::{ExamApi, ExamResult, SubmitExamRequest, SubmittedAnswer};
use crate::error::{ApiError, SubmissionError};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Submitted(ExamResult),
    /// Local answers are kept; the learner may retry.
    Failed { message: String },
}

/// Exactly-once submission of an attempt.
///
/// `begin` claims the submission, so a double click or a time-up that races a
/// manual submit is rejected instead of sending a second request.
#[derive(Debug, Default)]
pub struct SubmissionFlow {
    state: SubmissionState,
}

impl SubmissionFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self.state, SubmissionState::Submitting)
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self.state, SubmissionState::Submitted(_))
    }

    #[must_use]
    pub fn can_retry(&self) -> bool {
        matches!(self.state, SubmissionState::Failed { .. })
    }

    #[must_use]
    pub fn result(&self) -> Option<&ExamResult> {
        match &self.state {
            SubmissionState::Submitted(result) => Some(result),
            _ => None,
        }
    }

    /// Claim the submission.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySubmitting` or `AlreadySubmitted` when the claim is
    /// held or spent.
    pub fn begin(&mut self) -> Result<(), SubmissionError> {
        match self.state {
            SubmissionState::Submitting => Err(SubmissionError::AlreadySubmitting),
            SubmissionState::Submitted(_) => Err(SubmissionError::AlreadySubmitted),
            SubmissionState::Idle | SubmissionState::Failed { .. } => {
                self.state = SubmissionState::Submitting;
                Ok(())
            }
        }
    }

    /// Give the claim back without a backend answer, e.g. when the request
    /// could not be assembled.
    pub fn abort(&mut self) {
        if self.is_submitting() {
            self.state = SubmissionState::Idle;
        }
    }

    /// Record the backend's answer to the claimed submission.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Api` when the backend rejected the request;
    /// the flow is then `Failed` and may be retried.
    pub fn complete(
        &mut self,
        outcome: Result<ExamResult, ApiError>,
    ) -> Result<ExamResult, SubmissionError> {
        match outcome {
            Ok(result) => {
                info!(score = ?result.total_score(), "exam submitted");
                self.state = SubmissionState::Submitted(result.clone());
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "exam submission failed");
                self.state = SubmissionState::Failed {
                    message: err.to_string(),
                };
                Err(SubmissionError::Api(err))
            }
        }
    }

    /// `begin`, send, `complete`.
    ///
    /// # Errors
    ///
    /// See [`Self::begin`] and [`Self::complete`].
    pub async fn submit(
        &mut self,
        api: &dyn ExamApi,
        request: &SubmitExamRequest,
    ) -> Result<ExamResult, SubmissionError> {
        self.begin()?;
        let outcome = api.submit_exam(request).await;
        self.complete(outcome)
    }
}

/// Assemble the answer sheet from every part's cached answers, in part order.
///
/// # Errors
///
/// Returns `StorageError` if the answer cache cannot be read.
pub fn build_request(
    exam_id: ExamId,
    mode: ExamMode,
    part_ids: &[PartId],
    store: &dyn AnswerStore,
    time_spent_seconds: u32,
    submitted_at: DateTime<Utc>,
) -> Result<SubmitExamRequest, StorageError> {
    let mut answers = Vec::new();
    for part in part_ids {
        let slice = store.load_answers(*part)?;
        answers.extend(
            slice
                .answers
                .into_iter()
                .map(|(question_id, selected_option)| SubmittedAnswer {
                    question_id,
                    selected_option,
                }),
        );
    }
    Ok(SubmitExamRequest {
        exam_id,
        mode,
        part_ids: part_ids.to_vec(),
        answers,
        time_spent_seconds,
        submitted_at,
    })
}
