//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ExamId, OptionLetter, PartId, QuestionId};
use storage::StorageError;

/// Errors emitted by `AuthContext`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("auth context is not ready")]
    NotReady,
    #[error("cannot {action} while auth is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
}

/// Errors emitted by `ExamApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("part {0} missing from response")]
    MissingPart(PartId),
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Failures that may succeed when retried unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(_) | ApiError::Unavailable(_) => true,
            ApiError::HttpStatus(status) => status.is_server_error(),
            _ => false,
        }
    }
}

/// Errors emitted by `ExamLoader`. Every variant ends the attempt unless the
/// part-fetch policy keeps the learner on the current part.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no parts were requested")]
    MissingParts,
    #[error("exam {0} has no parts")]
    NoParts(ExamId),
    #[error("none of the requested parts belong to exam {0}")]
    EmptySelection(ExamId),
    #[error("part {0} has no questions")]
    EmptyPart(PartId),
    #[error(transparent)]
    Fetch(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LoadError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, LoadError::Fetch(err) if err.is_transient())
    }
}

/// Errors emitted by `AnswerState`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question {0} is not part of the current part")]
    UnknownQuestion(QuestionId),
    #[error("question {question} has no option {letter}")]
    OptionNotOffered {
        question: QuestionId,
        letter: OptionLetter,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SubmissionFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("the exam has already been submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExamSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("part index {index} is out of range ({count} parts)")]
    NoSuchPart { index: usize, count: usize },
    #[error("cannot return to part {target} from part {current} in a full exam")]
    PartLocked { current: usize, target: usize },
    #[error("listening groups cannot be revisited in a full exam")]
    GroupLocked,
    #[error("the attempt has ended")]
    Finished,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("invalid api base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}
