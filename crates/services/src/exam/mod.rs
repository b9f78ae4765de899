mod answers;
mod audio;
mod loader;
mod navigation;
mod progress;
mod runtime;
mod session;
mod submission;
mod timer;

// Public API of the exam subsystem.
pub use answers::AnswerState;
pub use audio::{AudioEvent, AudioGuard, AudioPoll, AudioStatus, MediaCommand};
pub use loader::{ExamLoader, LoadedSession};
pub use navigation::{
    GuardDecision, GuardRegistration, NavigationIntent, NavigationMediator, NavigationOutcome,
    PendingNavigation, Resolution, evaluate,
};
pub use progress::ExamProgress;
pub use runtime::ExamRuntime;
pub use session::{ExamSession, FetchTicket, SessionDeps, SessionEvent, SessionRequest};
pub use submission::{SubmissionFlow, SubmissionState, build_request};
pub use timer::{ExamTimer, TimerEvent};
