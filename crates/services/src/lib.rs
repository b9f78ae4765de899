#![forbid(unsafe_code)]

pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod debounce;
pub mod error;
pub mod exam;
pub mod notices;

pub use exam_core::Clock;

pub use access::{GuardChain, RouteDecision, RouteGuard, RouteRequirement};
pub use api::{ExamApi, ExamResult, HttpExamApi, InMemoryExamApi, SubmitExamRequest};
pub use auth::{AuthContext, AuthPhase, Identity, Role};
pub use config::{ExamTimings, PartFetchPolicy, ServicesConfig};
pub use error::{
    AnswerError, ApiError, AuthError, ConfigError, LoadError, SessionError, SubmissionError,
};
pub use exam::{
    ExamLoader, ExamRuntime, ExamSession, NavigationIntent, NavigationMediator, SessionDeps,
    SessionEvent, SessionRequest,
};
pub use notices::{Notice, NoticeKind, Notices, Redirect};
