use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::ExamResult;
use crate::error::SessionError;
use crate::exam::session::{ExamSession, FetchTicket, SessionEvent};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Drives one `ExamSession` on a tokio task.
///
/// The task ticks the timer every second, polls deadlines at the session's
/// poll interval, fetches parts the session requests and submits on
/// time-up. Fetches and submissions run beside the loop, so ticks keep
/// landing on the timer while it is paused for a fetch. Events are forwarded
/// on the returned channel. Offsets handed to the session are measured from
/// `spawn`; use [`ExamRuntime::now`] for calls made through
/// [`ExamRuntime::session`].
pub struct ExamRuntime {
    session: Arc<Mutex<ExamSession>>,
    origin: Instant,
    task: JoinHandle<()>,
}

impl ExamRuntime {
    #[must_use]
    pub fn spawn(session: ExamSession) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let poll_interval = session.poll_interval();
        let session = Arc::new(Mutex::new(session));
        let origin = Instant::now();
        let (events, receiver) = mpsc::unbounded_channel();
        let driver = Driver {
            session: Arc::clone(&session),
            origin,
            events,
        };
        let task = tokio::spawn(driver.run(poll_interval));
        (
            Self {
                session,
                origin,
                task,
            },
            receiver,
        )
    }

    /// Offset of the runtime's time base.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    #[must_use]
    pub fn session(&self) -> Arc<Mutex<ExamSession>> {
        Arc::clone(&self.session)
    }

    /// Submit on the learner's request. The session is not locked while the
    /// request is in flight.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submission` when another submission holds the
    /// claim or the backend rejects the request.
    pub async fn submit(&self) -> Result<ExamResult, SessionError> {
        submit(&self.session, self.origin).await
    }

    /// Move to the part at `index`, fetching it without holding the session.
    ///
    /// # Errors
    ///
    /// See `ExamSession::begin_part_change` and
    /// `ExamSession::complete_part_change`.
    pub async fn go_to_part(&self, index: usize) -> Result<bool, SessionError> {
        let ticket = self.session.lock().await.begin_part_change(index)?;
        fetch_part(&self.session, ticket, self.origin).await
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the driver task. Timers stop with it.
    pub fn shutdown(&self) {
        debug!("exam runtime shut down");
        self.task.abort();
    }
}

impl Drop for ExamRuntime {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver {
    session: Arc<Mutex<ExamSession>>,
    origin: Instant,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Driver {
    async fn run(self, poll_interval: Duration) {
        let mut seconds = time::interval_at(self.origin + ONE_SECOND, ONE_SECOND);
        let mut polls = time::interval(poll_interval);
        polls.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Dropped with the driver, which aborts whatever is still in flight.
        let mut jobs = JoinSet::new();

        loop {
            tokio::select! {
                _ = seconds.tick() => {
                    let event = self.session.lock().await.tick();
                    if let Some(event) = event {
                        self.handle(event, &mut jobs);
                    }
                }
                _ = polls.tick() => {
                    let now = self.origin.elapsed();
                    let events = self.session.lock().await.poll(now);
                    for event in events {
                        self.handle(event, &mut jobs);
                    }
                }
                Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "exam runtime job aborted");
                    }
                }
            }
        }
    }

    fn handle(&self, event: SessionEvent, jobs: &mut JoinSet<()>) {
        match event {
            SessionEvent::ForceSubmit => {
                self.emit(SessionEvent::ForceSubmit);
                let session = Arc::clone(&self.session);
                let origin = self.origin;
                // The outcome (`Submitted` or a notice) surfaces on a later poll.
                jobs.spawn(async move {
                    if let Err(err) = submit(&session, origin).await {
                        warn!(error = %err, "submission on time-up failed");
                    }
                });
            }
            SessionEvent::PartRequested(ticket) => {
                self.emit(SessionEvent::PartRequested(ticket));
                let session = Arc::clone(&self.session);
                let origin = self.origin;
                jobs.spawn(async move {
                    if let Err(err) = fetch_part(&session, ticket, origin).await {
                        warn!(error = %err, "part change failed");
                    }
                });
            }
            other => self.emit(other),
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("session event dropped, receiver closed");
        }
    }
}

async fn submit(session: &Mutex<ExamSession>, origin: Instant) -> Result<ExamResult, SessionError> {
    let (request, api) = {
        let mut session = session.lock().await;
        (session.begin_submission()?, session.api())
    };
    let outcome = api.submit_exam(&request).await;
    session
        .lock()
        .await
        .complete_submission(outcome, origin.elapsed())
}

async fn fetch_part(
    session: &Mutex<ExamSession>,
    ticket: FetchTicket,
    origin: Instant,
) -> Result<bool, SessionError> {
    let (loader, part_id) = {
        let session = session.lock().await;
        (session.loader(), session.part_id_for(ticket))
    };
    let Some(part_id) = part_id else {
        return Ok(false);
    };
    let outcome = loader.load_part(part_id, origin.elapsed()).await;
    session.lock().await.complete_part_change(ticket, outcome)
}
