use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use exam_core::model::{ExamMode, OptionLetter, PartAnswers, PartData, QuestionGroup, QuestionId};
use storage::{AnswerStore, StorageError};

use crate::debounce::Debouncer;
use crate::error::AnswerError;

/// Answers and review flags for the part on screen.
///
/// Changes are copied into the session answer cache through a debounce, so a
/// burst of clicks produces one write. Counts are derived from the part's
/// structure on every call.
pub struct AnswerState {
    part: Arc<PartData>,
    mode: ExamMode,
    current: PartAnswers,
    group_index: usize,
    sync: Debouncer<PartAnswers>,
    store: Arc<dyn AnswerStore>,
}

impl AnswerState {
    #[must_use]
    pub fn new(
        part: Arc<PartData>,
        snapshot: PartAnswers,
        mode: ExamMode,
        store: Arc<dyn AnswerStore>,
        debounce: Duration,
    ) -> Self {
        let current = snapshot.restricted_to(&part);
        Self {
            part,
            mode,
            current,
            group_index: 0,
            sync: Debouncer::new(debounce),
            store,
        }
    }

    /// Switch to another part. Pending changes of the previous part are
    /// written first so nothing is lost.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the pending snapshot cannot be written.
    pub fn load_part(&mut self, part: Arc<PartData>, snapshot: PartAnswers) -> Result<(), StorageError> {
        self.flush()?;
        self.current = snapshot.restricted_to(&part);
        self.part = part;
        self.group_index = 0;
        Ok(())
    }

    #[must_use]
    pub fn part(&self) -> &Arc<PartData> {
        &self.part
    }

    #[must_use]
    pub fn answers(&self) -> &PartAnswers {
        &self.current
    }

    #[must_use]
    pub fn answer(&self, question: QuestionId) -> Option<OptionLetter> {
        self.current.answer(question)
    }

    #[must_use]
    pub fn is_marked(&self, question: QuestionId) -> bool {
        self.current.is_marked(question)
    }

    #[must_use]
    pub fn review_allowed(&self) -> bool {
        self.mode.allows_review(self.part.part_number)
    }

    /// Record `letter` for `question`. Re-answering overwrites; answering with
    /// the same letter changes nothing. Returns whether the state changed.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if the question is not in this part or does not
    /// offer `letter`.
    pub fn set_answer(
        &mut self,
        question: QuestionId,
        letter: OptionLetter,
        now: Duration,
    ) -> Result<bool, AnswerError> {
        let offered = self
            .part
            .question(question)
            .ok_or(AnswerError::UnknownQuestion(question))?
            .offers(letter);
        if !offered {
            return Err(AnswerError::OptionNotOffered { question, letter });
        }

        if self.current.answers.insert(question, letter) == Some(letter) {
            return Ok(false);
        }
        self.schedule_sync(now);
        Ok(true)
    }

    /// Flip the review flag of `question`. A no-op returning `false` while
    /// listening in a full exam.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::UnknownQuestion` if the question is not in this part.
    pub fn toggle_review(&mut self, question: QuestionId, now: Duration) -> Result<bool, AnswerError> {
        if !self.review_allowed() {
            debug!(%question, part = %self.part.part_number, "review toggle ignored");
            return Ok(false);
        }
        if self.part.question(question).is_none() {
            return Err(AnswerError::UnknownQuestion(question));
        }
        let flag = self.current.marked_for_review.entry(question).or_insert(false);
        *flag = !*flag;
        self.schedule_sync(now);
        Ok(true)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.part
            .questions()
            .filter(|question| self.current.answers.contains_key(&question.id()))
            .count()
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.part.total_questions()
    }

    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.part
            .questions()
            .filter(|question| self.current.is_marked(question.id()))
            .count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answered_count() == self.total_questions()
    }

    // ─── Groups ────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn group_index(&self) -> usize {
        self.group_index
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.part.groups.len()
    }

    #[must_use]
    pub fn current_group(&self) -> Option<&QuestionGroup> {
        self.part.groups.get(self.group_index)
    }

    #[must_use]
    pub fn is_last_group(&self) -> bool {
        self.group_index + 1 >= self.group_count()
    }

    /// Returns false if `index` is out of range.
    pub fn set_group_index(&mut self, index: usize) -> bool {
        if index >= self.group_count() {
            return false;
        }
        self.group_index = index;
        true
    }

    pub fn next_group(&mut self) -> bool {
        self.set_group_index(self.group_index + 1)
    }

    pub fn previous_group(&mut self) -> bool {
        match self.group_index.checked_sub(1) {
            Some(index) => self.set_group_index(index),
            None => false,
        }
    }

    // ─── Sync ──────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn sync_pending(&self) -> bool {
        self.sync.is_pending()
    }

    /// Write the snapshot if the debounce is due. Returns whether it wrote.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the answer cache cannot be written.
    pub fn poll(&mut self, now: Duration) -> Result<bool, StorageError> {
        match self.sync.poll(now) {
            Some(snapshot) => self.write(snapshot).map(|()| true),
            None => Ok(false),
        }
    }

    /// Write any pending snapshot now.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the answer cache cannot be written.
    pub fn flush(&mut self) -> Result<bool, StorageError> {
        match self.sync.flush() {
            Some(snapshot) => self.write(snapshot).map(|()| true),
            None => Ok(false),
        }
    }

    fn schedule_sync(&mut self, now: Duration) {
        self.sync.schedule(self.current.clone(), now);
    }

    fn write(&self, snapshot: PartAnswers) -> Result<(), StorageError> {
        debug!(part = %self.part.part_id, answers = snapshot.answers.len(), "answers synced");
        self.store.save_answers(self.part.part_id, snapshot)
    }
}
