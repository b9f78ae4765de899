//! Controller for one exam attempt.
//!
//! `ExamSession` owns the pieces of an attempt (answer state, timer, audio
//! guard, submission flow, navigation guard) and applies the cross-part rules
//! between them. It never sleeps: the host calls `tick` once per second and
//! `poll` frequently, passing a monotonic offset. `ExamRuntime` does both on a
//! tokio task.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use exam_core::Clock;
use exam_core::model::{
    AttemptId, ExamId, ExamMode, ExamOverview, ExamPartInfo, OptionLetter, PartData, PartId, QuestionId,
    TimeParam,
};
use storage::SessionStores;

use crate::api::{ExamApi, ExamResult, SubmitExamRequest};
use crate::config::ServicesConfig;
use crate::error::{ApiError, LoadError, SessionError, SubmissionError};
use crate::exam::answers::AnswerState;
use crate::exam::audio::{AudioEvent, AudioGuard, MediaCommand};
use crate::exam::loader::ExamLoader;
use crate::exam::navigation::{GuardRegistration, NavigationMediator};
use crate::exam::progress::ExamProgress;
use crate::exam::submission::{SubmissionFlow, SubmissionState, build_request};
use crate::exam::timer::{ExamTimer, TimerEvent};
use crate::notices::{NoticeKind, Notices, Redirect};

/// What the learner asked for when opening the attempt page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub exam_id: ExamId,
    pub mode: ExamMode,
    /// Raw `parts` query value: `all` or a CSV of part ids.
    pub parts: Option<String>,
    pub time: TimeParam,
    /// Location of the attempt page, restored when a history traversal is declined.
    pub location: String,
}

impl SessionRequest {
    #[must_use]
    pub fn new(exam_id: ExamId, mode: ExamMode) -> Self {
        Self {
            exam_id,
            mode,
            parts: None,
            time: TimeParam::Absent,
            location: format!("/exams/{exam_id}/take"),
        }
    }

    #[must_use]
    pub fn with_parts(mut self, parts: impl Into<String>) -> Self {
        self.parts = Some(parts.into());
        self
    }

    #[must_use]
    pub fn with_time(mut self, time: TimeParam) -> Self {
        self.time = time;
        self
    }

    #[must_use]
    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// Collaborators shared by the attempt and the page hosting it.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn ExamApi>,
    pub stores: SessionStores,
    pub navigation: NavigationMediator,
    pub notices: Notices,
    pub config: ServicesConfig,
    pub clock: Clock,
}

impl SessionDeps {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>, config: ServicesConfig) -> Self {
        Self {
            api,
            stores: SessionStores::in_memory(),
            navigation: NavigationMediator::new(),
            notices: Notices::new(config.timings.redirect_delay),
            config,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Claim on an in-flight part change. Only the latest ticket is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    index: usize,
}

impl FetchTicket {
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Media(MediaCommand),
    GroupChanged { part_index: usize, group_index: usize },
    PartChanged { part_index: usize },
    /// A part change was started; the host fetches the part and completes it.
    PartRequested(FetchTicket),
    /// The last part's audio finished; nothing is left but to submit.
    EndOfExam,
    ForceSubmit,
    Submitted(ExamResult),
    AnswersSynced,
    Redirect(Redirect),
}

pub struct ExamSession {
    attempt_id: AttemptId,
    exam_id: ExamId,
    mode: ExamMode,
    overview: ExamOverview,
    parts: Vec<ExamPartInfo>,
    part_index: usize,
    answers: AnswerState,
    timer: ExamTimer,
    audio: AudioGuard,
    submission: SubmissionFlow,
    api: Arc<dyn ExamApi>,
    loader: ExamLoader,
    stores: SessionStores,
    notices: Notices,
    clock: Clock,
    guard: Option<GuardRegistration>,
    fetch_seq: u64,
    pending_fetch: Option<FetchTicket>,
    outbox: Vec<SessionEvent>,
    poll_interval: Duration,
    ended: bool,
}

impl ExamSession {
    /// Load the exam and open the attempt on its first selected part.
    ///
    /// The timer starts running and the navigation guard is attached.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when the exam cannot be opened; a notice
    /// and the catalog redirect are already scheduled on `deps.notices`.
    pub async fn start(
        request: SessionRequest,
        deps: SessionDeps,
        now: Duration,
    ) -> Result<Self, SessionError> {
        let loader = ExamLoader::new(
            Arc::clone(&deps.api),
            Arc::clone(&deps.stores.parts),
            deps.notices.clone(),
            deps.config.part_fetch_policy,
        );
        let loaded = loader
            .load_session(request.exam_id, request.parts.as_deref(), now)
            .await?;

        let snapshot = deps.stores.answers.load_answers(loaded.first_part.part_id)?;
        let answers = AnswerState::new(
            loaded.first_part,
            snapshot,
            request.mode,
            Arc::clone(&deps.stores.answers),
            deps.config.timings.answer_sync_debounce,
        );
        let timer = ExamTimer::for_mode(request.mode, request.time);
        let attempt_id = AttemptId::generate();
        info!(
            %attempt_id,
            exam_id = %request.exam_id,
            mode = ?request.mode,
            seconds = timer.initial_seconds(),
            "exam attempt started"
        );

        let mut session = Self {
            attempt_id,
            exam_id: request.exam_id,
            mode: request.mode,
            overview: loaded.overview,
            parts: loaded.parts,
            part_index: 0,
            answers,
            timer,
            audio: AudioGuard::new(&deps.config.timings),
            submission: SubmissionFlow::new(),
            api: deps.api,
            loader,
            stores: deps.stores,
            notices: deps.notices,
            clock: deps.clock,
            guard: Some(deps.navigation.attach(request.location, true)),
            fetch_seq: 0,
            pending_fetch: None,
            outbox: Vec::new(),
            poll_interval: deps.config.timings.poll_interval,
            ended: false,
        };
        session.mount_group();
        Ok(session)
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.mode
    }

    #[must_use]
    pub fn overview(&self) -> &ExamOverview {
        &self.overview
    }

    #[must_use]
    pub fn parts(&self) -> &[ExamPartInfo] {
        &self.parts
    }

    #[must_use]
    pub fn part_index(&self) -> usize {
        self.part_index
    }

    #[must_use]
    pub fn current_part(&self) -> &Arc<PartData> {
        self.answers.part()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerState {
        &self.answers
    }

    #[must_use]
    pub fn timer(&self) -> &ExamTimer {
        &self.timer
    }

    #[must_use]
    pub fn audio(&self) -> &AudioGuard {
        &self.audio
    }

    /// Media element events (`on_playing`, `on_seeking`, ...) go here.
    pub fn audio_mut(&mut self) -> &mut AudioGuard {
        &mut self.audio
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionState {
        self.submission.state()
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.pending_fetch.is_some()
    }

    /// Submitted, or ended by a fatal load failure.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guard.as_ref().is_some_and(GuardRegistration::is_active)
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            part_index: self.part_index,
            part_count: self.parts.len(),
            group_index: self.answers.group_index(),
            group_count: self.answers.group_count(),
            answered: self.answers.answered_count(),
            total: self.answers.total_questions(),
            marked: self.answers.marked_count(),
            remaining_seconds: (!self.timer.is_unlimited()).then(|| self.timer.remaining_seconds()),
            elapsed_seconds: self.timer.elapsed_seconds(),
        }
    }

    /// How often deadlines should be polled.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn api(&self) -> Arc<dyn ExamApi> {
        Arc::clone(&self.api)
    }

    pub(crate) fn loader(&self) -> ExamLoader {
        self.loader.clone()
    }

    // ─── Parts ─────────────────────────────────────────────────────────────────

    /// Part id a ticket refers to.
    #[must_use]
    pub fn part_id_for(&self, ticket: FetchTicket) -> Option<PartId> {
        self.parts.get(ticket.index).map(|part| part.part_id)
    }

    /// Start moving to the part at `index`. The timer pauses and pending
    /// answers are written until `complete_part_change`.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchPart` for an index out of range, `PartLocked` for a
    /// move that is not forward in a full exam, `AlreadySubmitting` while a
    /// submission is in flight, and `Finished` once the attempt ended.
    pub fn begin_part_change(&mut self, index: usize) -> Result<FetchTicket, SessionError> {
        self.ensure_open()?;
        if self.submission.is_submitting() {
            return Err(SubmissionError::AlreadySubmitting.into());
        }
        if index >= self.parts.len() {
            return Err(SessionError::NoSuchPart {
                index,
                count: self.parts.len(),
            });
        }
        // Re-entering the current part would restart its groups and audio.
        if self.mode.is_full() && index <= self.part_index {
            return Err(SessionError::PartLocked {
                current: self.part_index,
                target: index,
            });
        }

        self.answers.flush()?;
        self.timer.pause();
        self.fetch_seq += 1;
        let ticket = FetchTicket {
            seq: self.fetch_seq,
            index,
        };
        self.pending_fetch = Some(ticket);
        debug!(index, seq = ticket.seq, "part change started");
        Ok(ticket)
    }

    /// Apply the outcome of the fetch started by `ticket`. Returns `false`
    /// when a newer change superseded it; the part stays cached by the loader.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when the part could not be loaded. Unless
    /// the failure is recoverable under the fetch policy, the attempt ends and
    /// the catalog redirect is pending.
    pub fn complete_part_change(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<Arc<PartData>, LoadError>,
    ) -> Result<bool, SessionError> {
        if self.pending_fetch != Some(ticket) {
            debug!(index = ticket.index, seq = ticket.seq, "stale part response ignored");
            return Ok(false);
        }
        self.pending_fetch = None;

        let part = match outcome {
            Ok(part) => part,
            Err(err) => {
                if self.loader.is_recoverable(&err) {
                    self.timer.resume();
                } else {
                    self.end_attempt();
                }
                return Err(err.into());
            }
        };

        let snapshot = self.stores.answers.load_answers(part.part_id)?;
        self.answers.load_part(part, snapshot)?;
        self.part_index = ticket.index;
        self.timer.resume();
        info!(part_index = self.part_index, part = %self.current_part().part_number, "part opened");
        self.outbox.push(SessionEvent::PartChanged {
            part_index: self.part_index,
        });
        self.mount_group();
        Ok(true)
    }

    /// `begin_part_change`, fetch, `complete_part_change`.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_part_change`] and [`Self::complete_part_change`].
    pub async fn go_to_part(&mut self, index: usize, now: Duration) -> Result<bool, SessionError> {
        let ticket = self.begin_part_change(index)?;
        let part_id = self.parts[ticket.index].part_id;
        let outcome = self.loader.load_part(part_id, now).await;
        self.complete_part_change(ticket, outcome)
    }

    // ─── Groups ────────────────────────────────────────────────────────────────

    /// Returns whether the group changed.
    ///
    /// # Errors
    ///
    /// Returns `Finished` once the attempt ended.
    pub fn next_group(&mut self) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if !self.answers.next_group() {
            return Ok(false);
        }
        self.group_changed();
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns `GroupLocked` inside a listening part of a full exam.
    pub fn previous_group(&mut self) -> Result<bool, SessionError> {
        let target = self.answers.group_index().checked_sub(1);
        match target {
            Some(index) => self.go_to_group(index),
            None => Ok(false),
        }
    }

    /// # Errors
    ///
    /// Returns `GroupLocked` for a backward move inside a listening part of a
    /// full exam, and `Finished` once the attempt ended.
    pub fn go_to_group(&mut self, index: usize) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if index == self.answers.group_index() {
            return Ok(false);
        }
        let listening_lock =
            self.mode.restricts_audio(self.current_part().part_number) && index < self.answers.group_index();
        if listening_lock {
            return Err(SessionError::GroupLocked);
        }
        if !self.answers.set_group_index(index) {
            return Ok(false);
        }
        self.group_changed();
        Ok(true)
    }

    // ─── Answers ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `SessionError::Answer` for a question or option outside the
    /// current part, and `Finished` once the attempt ended.
    pub fn set_answer(
        &mut self,
        question: QuestionId,
        letter: OptionLetter,
        now: Duration,
    ) -> Result<bool, SessionError> {
        self.ensure_open()?;
        Ok(self.answers.set_answer(question, letter, now)?)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Answer` for a question outside the current part,
    /// and `Finished` once the attempt ended.
    pub fn toggle_review(&mut self, question: QuestionId, now: Duration) -> Result<bool, SessionError> {
        self.ensure_open()?;
        Ok(self.answers.toggle_review(question, now)?)
    }

    // ─── Time ──────────────────────────────────────────────────────────────────

    /// One wall-clock second passed. Returns `ForceSubmit` when time ran out
    /// and no submission already holds the claim.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        match self.timer.tick()? {
            TimerEvent::TimeUp => {
                info!(exam_id = %self.exam_id, "time is up");
                let claimed = self.submission.is_submitting() || self.submission.is_submitted();
                (!claimed).then_some(SessionEvent::ForceSubmit)
            }
        }
    }

    /// Drive deadlines: answer sync, audio countdown and advance, redirect.
    pub fn poll(&mut self, now: Duration) -> Vec<SessionEvent> {
        match self.answers.poll(now) {
            Ok(true) => self.outbox.push(SessionEvent::AnswersSynced),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "answer sync failed"),
        }

        let audio = self.audio.poll(now);
        self.outbox
            .extend(audio.commands.into_iter().map(SessionEvent::Media));
        match audio.event {
            Some(AudioEvent::AdvanceGroup) => {
                if let Err(err) = self.next_group() {
                    debug!(error = %err, "automatic group advance skipped");
                }
            }
            Some(AudioEvent::PartComplete) => self.advance_part(),
            None => {}
        }

        if let Some(redirect) = self.notices.take_due_redirect(now) {
            self.outbox.push(SessionEvent::Redirect(redirect));
        }
        std::mem::take(&mut self.outbox)
    }

    // ─── Submission ────────────────────────────────────────────────────────────

    /// Claim the submission and assemble the answer sheet.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submission` when a submission is in flight or
    /// done, and `SessionError::Storage` when answers cannot be read.
    pub fn begin_submission(&mut self) -> Result<SubmitExamRequest, SessionError> {
        self.submission.begin()?;
        let request = self.answers.flush().and_then(|_| {
            let part_ids: Vec<PartId> = self.parts.iter().map(|part| part.part_id).collect();
            build_request(
                self.exam_id,
                self.mode,
                &part_ids,
                self.stores.answers.as_ref(),
                self.timer.elapsed_seconds(),
                self.clock.now(),
            )
        });
        match request {
            Ok(request) => {
                info!(attempt_id = %self.attempt_id, answers = request.answers.len(), "submitting exam");
                Ok(request)
            }
            Err(err) => {
                self.submission.abort();
                Err(err.into())
            }
        }
    }

    /// Record the backend's answer. Success ends the attempt and removes the
    /// navigation guard; failure keeps every answer and allows a retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submission` when the backend rejected the request.
    pub fn complete_submission(
        &mut self,
        outcome: Result<ExamResult, ApiError>,
        now: Duration,
    ) -> Result<ExamResult, SessionError> {
        match self.submission.complete(outcome) {
            Ok(result) => {
                self.end_attempt();
                self.outbox.push(SessionEvent::Submitted(result.clone()));
                Ok(result)
            }
            Err(err) => {
                self.notices.raise(NoticeKind::SubmissionFailed, now);
                Err(err.into())
            }
        }
    }

    /// `begin_submission`, send, `complete_submission`.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_submission`] and [`Self::complete_submission`].
    pub async fn submit(&mut self, now: Duration) -> Result<ExamResult, SessionError> {
        let request = self.begin_submission()?;
        let outcome = self.api.submit_exam(&request).await;
        self.complete_submission(outcome, now)
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.ended {
            Err(SessionError::Finished)
        } else {
            Ok(())
        }
    }

    fn end_attempt(&mut self) {
        self.ended = true;
        self.timer.finish();
        self.audio.reset();
        self.pending_fetch = None;
        // Dropping the registration detaches the guard.
        self.guard = None;
    }

    fn group_changed(&mut self) {
        self.outbox.push(SessionEvent::GroupChanged {
            part_index: self.part_index,
            group_index: self.answers.group_index(),
        });
        self.mount_group();
    }

    fn mount_group(&mut self) {
        let restricted = self.mode.restricts_audio(self.current_part().part_number)
            && self
                .answers
                .current_group()
                .is_some_and(|group| group.audio_url.is_some());
        let commands = self.audio.mount(restricted, self.answers.is_last_group());
        self.outbox
            .extend(commands.into_iter().map(SessionEvent::Media));
    }

    fn advance_part(&mut self) {
        let next = self.part_index + 1;
        if next >= self.parts.len() {
            info!("last part complete");
            self.outbox.push(SessionEvent::EndOfExam);
            return;
        }
        match self.begin_part_change(next) {
            Ok(ticket) => self.outbox.push(SessionEvent::PartRequested(ticket)),
            Err(err) => warn!(error = %err, "automatic part advance failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryExamApi;
    use exam_core::model::{
        AnswerOption, GroupId, OptionId, PartNumber, Question, QuestionGroup,
    };
    use exam_core::time::fixed_clock;

    const SECOND: Duration = Duration::from_secs(1);

    fn question(id: u64) -> Question {
        let options = [OptionLetter::A, OptionLetter::B, OptionLetter::C]
            .into_iter()
            .enumerate()
            .map(|(i, letter)| AnswerOption {
                option_id: OptionId::new(id * 10 + i as u64),
                letter,
                text: None,
            })
            .collect();
        Question::new(QuestionId::new(id), u32::try_from(id % 100).unwrap(), None, options).unwrap()
    }

    fn part(id: u64, number: u8, groups: u64) -> PartData {
        PartData {
            part_id: PartId::new(id),
            part_number: PartNumber::new(number).unwrap(),
            part_name: format!("Part {number}"),
            description: None,
            groups: (1..=groups)
                .map(|g| QuestionGroup {
                    group_id: GroupId::new(id * 10 + g),
                    image_url: None,
                    audio_url: (number <= 4).then(|| format!("https://cdn.test/{id}/{g}.mp3")),
                    passage_text: None,
                    questions: vec![question(id * 100 + g)],
                })
                .collect(),
        }
    }

    fn api() -> InMemoryExamApi {
        let api = InMemoryExamApi::new();
        api.insert_exam(ExamOverview {
            exam_id: ExamId::new(7),
            title: None,
            parts: vec![
                ExamPartInfo {
                    part_id: PartId::new(2),
                    part_number: PartNumber::new(2).unwrap(),
                    part_name: "Part 2".into(),
                },
                ExamPartInfo {
                    part_id: PartId::new(5),
                    part_number: PartNumber::new(5).unwrap(),
                    part_name: "Part 5".into(),
                },
            ],
        });
        api.insert_part(part(2, 2, 2));
        api.insert_part(part(5, 5, 2));
        api
    }

    async fn start(api: &InMemoryExamApi, mode: ExamMode) -> ExamSession {
        let config = ServicesConfig::new(ServicesConfig::DEFAULT_BASE_URL).unwrap();
        let deps = SessionDeps::new(Arc::new(api.clone()), config).with_clock(fixed_clock());
        let request = SessionRequest::new(ExamId::new(7), mode).with_parts("all");
        ExamSession::start(request, deps, Duration::ZERO).await.unwrap()
    }

    #[tokio::test]
    async fn full_exam_starts_restricted_audio_and_locks_review() {
        let mut session = start(&api(), ExamMode::Full).await;
        assert_eq!(session.timer().remaining_seconds(), 7_200);
        assert!(session.is_guarded());
        assert!(session.audio().is_restricted());
        assert_eq!(
            session.poll(Duration::ZERO),
            vec![
                SessionEvent::Media(MediaCommand::Mute),
                SessionEvent::Media(MediaCommand::SeekTo(0.0)),
                SessionEvent::Media(MediaCommand::Play),
            ]
        );
        assert!(!session.toggle_review(QuestionId::new(201), Duration::ZERO).unwrap());
    }

    #[tokio::test]
    async fn audio_end_advances_groups_then_parts() {
        let mut session = start(&api(), ExamMode::Full).await;
        session.poll(Duration::ZERO);

        session.audio_mut().on_ended(SECOND);
        let events = session.poll(6 * SECOND);
        assert!(events.contains(&SessionEvent::GroupChanged {
            part_index: 0,
            group_index: 1
        }));
        assert!(matches!(session.previous_group(), Err(SessionError::GroupLocked)));

        session.audio_mut().on_ended(7 * SECOND);
        let events = session.poll(12 * SECOND);
        let ticket = events
            .iter()
            .find_map(|event| match event {
                SessionEvent::PartRequested(ticket) => Some(*ticket),
                _ => None,
            })
            .unwrap();
        assert!(session.is_fetching());
        assert!(session.timer().is_paused());

        let part = session.loader().load_part(PartId::new(5), 12 * SECOND).await;
        assert!(session.complete_part_change(ticket, part).unwrap());
        assert_eq!(session.part_index(), 1);
        assert!(!session.timer().is_paused());
        assert!(!session.audio().is_restricted());
        assert!(matches!(
            session.begin_part_change(0),
            Err(SessionError::PartLocked { current: 1, target: 0 })
        ));
    }

    #[tokio::test]
    async fn full_exam_cannot_reenter_the_current_listening_part() {
        let mut session = start(&api(), ExamMode::Full).await;
        session.poll(Duration::ZERO);
        session.audio_mut().on_ended(SECOND);
        session.poll(6 * SECOND);
        assert_eq!(session.answers().group_index(), 1);

        assert!(matches!(
            session.go_to_part(0, 7 * SECOND).await,
            Err(SessionError::PartLocked { current: 0, target: 0 })
        ));
        assert_eq!(session.answers().group_index(), 1);
        assert!(!session.is_fetching());
        assert!(!session.timer().is_paused());
    }

    #[tokio::test]
    async fn part_change_is_refused_while_submitting() {
        let mut session = start(&api(), ExamMode::Partial).await;
        session.begin_submission().unwrap();
        assert!(matches!(
            session.begin_part_change(1),
            Err(SessionError::Submission(SubmissionError::AlreadySubmitting))
        ));
        assert!(!session.is_fetching());
        assert!(!session.timer().is_paused());
    }

    #[tokio::test]
    async fn stale_part_response_is_not_applied() {
        let mut session = start(&api(), ExamMode::Partial).await;
        let first = session.begin_part_change(1).unwrap();
        let second = session.begin_part_change(0).unwrap();

        let part = session.loader().load_part(PartId::new(5), Duration::ZERO).await;
        assert!(!session.complete_part_change(first, part).unwrap());
        assert_eq!(session.part_index(), 0);
        assert!(session.is_fetching());

        let part = session.loader().load_part(PartId::new(2), Duration::ZERO).await;
        assert!(session.complete_part_change(second, part).unwrap());
        assert!(!session.is_fetching());
    }

    #[tokio::test]
    async fn answers_survive_part_switches_in_partial_mode() {
        let mut session = start(&api(), ExamMode::Partial).await;
        session.set_answer(QuestionId::new(201), OptionLetter::B, Duration::ZERO).unwrap();
        session.toggle_review(QuestionId::new(202), Duration::ZERO).unwrap();

        assert!(session.go_to_part(1, SECOND).await.unwrap());
        assert_eq!(session.progress().answered, 0);
        assert!(session.go_to_part(0, 2 * SECOND).await.unwrap());
        assert_eq!(session.answers().answer(QuestionId::new(201)), Some(OptionLetter::B));
        assert!(session.answers().is_marked(QuestionId::new(202)));
    }

    #[tokio::test]
    async fn time_up_forces_a_single_submission() {
        let api = api();
        let config = ServicesConfig::new(ServicesConfig::DEFAULT_BASE_URL).unwrap();
        let deps = SessionDeps::new(Arc::new(api.clone()), config);
        let request = SessionRequest::new(ExamId::new(7), ExamMode::Partial)
            .with_parts("5")
            .with_time(TimeParam::Minutes(1));
        let mut session = ExamSession::start(request, deps, Duration::ZERO).await.unwrap();

        for _ in 0..59 {
            assert_eq!(session.tick(), None);
        }
        assert_eq!(session.tick(), Some(SessionEvent::ForceSubmit));
        assert_eq!(session.tick(), None);

        let request = session.begin_submission().unwrap();
        assert_eq!(request.time_spent_seconds, 60);
        assert_eq!(request.part_ids, vec![PartId::new(5)]);
        assert!(matches!(
            session.begin_submission(),
            Err(SessionError::Submission(SubmissionError::AlreadySubmitting))
        ));
    }

    #[tokio::test]
    async fn successful_submission_detaches_guard() {
        let api = api();
        let mut session = start(&api, ExamMode::Partial).await;
        session.set_answer(QuestionId::new(201), OptionLetter::A, Duration::ZERO).unwrap();

        api.fail_next_submissions(1);
        assert!(session.submit(SECOND).await.is_err());
        assert!(session.is_guarded());
        assert_eq!(session.notices().drain()[0].kind, NoticeKind::SubmissionFailed);

        session.submit(2 * SECOND).await.unwrap();
        assert!(!session.is_guarded());
        assert!(session.is_ended());
        assert!(matches!(
            session.set_answer(QuestionId::new(202), OptionLetter::A, 3 * SECOND),
            Err(SessionError::Finished)
        ));
        let submitted = api.submissions();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].answers.len(), 1);
    }
}
