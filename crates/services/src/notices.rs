//! User-facing notices and the redirect that follows a fatal one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    MissingParts,
    ExamHasNoParts,
    EmptySelection,
    EmptyPart,
    /// Exam or part could not be fetched or parsed.
    InvalidExam,
    /// A later part failed to load; the learner may retry.
    PartFetchFailed,
    SubmissionFailed,
}

impl NoticeKind {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            NoticeKind::MissingParts => "No parts were selected for this test.",
            NoticeKind::ExamHasNoParts => "This test has no parts yet.",
            NoticeKind::EmptySelection => "The selected parts are not available in this test.",
            NoticeKind::EmptyPart => "This part has no questions.",
            NoticeKind::InvalidExam => "This test could not be loaded.",
            NoticeKind::PartFetchFailed => "The next part could not be loaded. Please try again.",
            NoticeKind::SubmissionFailed => "Your answers could not be submitted. Please try again.",
        }
    }

    /// Fatal notices end the attempt and are shown at most once.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        !matches!(self, NoticeKind::PartFetchFailed | NoticeKind::SubmissionFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Catalog,
}

#[derive(Debug)]
struct Board {
    redirect_delay: Duration,
    shown: HashSet<NoticeKind>,
    queue: Vec<Notice>,
    redirect_at: Option<Duration>,
    redirected: bool,
}

/// Shared notice board for one attempt.
#[derive(Debug, Clone)]
pub struct Notices {
    board: Arc<Mutex<Board>>,
}

impl Notices {
    #[must_use]
    pub fn new(redirect_delay: Duration) -> Self {
        Self {
            board: Arc::new(Mutex::new(Board {
                redirect_delay,
                shown: HashSet::new(),
                queue: Vec::new(),
                redirect_at: None,
                redirected: false,
            })),
        }
    }

    fn board(&self) -> std::sync::MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a notice. Fatal kinds already shown are suppressed; the first
    /// fatal notice schedules the redirect. Returns whether it was queued.
    pub fn raise(&self, kind: NoticeKind, now: Duration) -> bool {
        let mut board = self.board();
        if kind.is_fatal() {
            if !board.shown.insert(kind) {
                debug!(?kind, "duplicate notice suppressed");
                return false;
            }
            if board.redirect_at.is_none() {
                board.redirect_at = Some(now + board.redirect_delay);
            }
        }
        info!(?kind, "notice raised");
        board.queue.push(Notice {
            kind,
            message: kind.message(),
        });
        true
    }

    /// Notices not yet handed to the view.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut self.board().queue)
    }

    #[must_use]
    pub fn redirect_pending(&self) -> bool {
        let board = self.board();
        board.redirect_at.is_some() && !board.redirected
    }

    /// The catalog redirect, once its delay has elapsed. Yields at most once.
    pub fn take_due_redirect(&self, now: Duration) -> Option<Redirect> {
        let mut board = self.board();
        let due = board.redirect_at.is_some_and(|at| at <= now);
        if !due || board.redirected {
            return None;
        }
        board.redirected = true;
        Some(Redirect::Catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_notices_are_deduplicated() {
        let notices = Notices::new(Duration::from_secs(2));
        assert!(notices.raise(NoticeKind::EmptyPart, Duration::ZERO));
        assert!(!notices.raise(NoticeKind::EmptyPart, Duration::from_millis(10)));
        assert_eq!(notices.drain().len(), 1);
        assert!(notices.drain().is_empty());
    }

    #[test]
    fn redirect_fires_once_after_delay() {
        let notices = Notices::new(Duration::from_secs(2));
        notices.raise(NoticeKind::InvalidExam, Duration::from_secs(1));
        assert!(notices.redirect_pending());
        assert_eq!(notices.take_due_redirect(Duration::from_millis(2_999)), None);
        assert_eq!(
            notices.take_due_redirect(Duration::from_secs(3)),
            Some(Redirect::Catalog)
        );
        assert_eq!(notices.take_due_redirect(Duration::from_secs(10)), None);
        assert!(!notices.redirect_pending());
    }

    #[test]
    fn recoverable_notices_repeat_without_redirect() {
        let notices = Notices::new(Duration::from_secs(2));
        assert!(notices.raise(NoticeKind::SubmissionFailed, Duration::ZERO));
        assert!(notices.raise(NoticeKind::SubmissionFailed, Duration::ZERO));
        assert_eq!(notices.drain().len(), 2);
        assert!(!notices.redirect_pending());
    }
}
