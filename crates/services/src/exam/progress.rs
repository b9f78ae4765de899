/// Snapshot of where the learner is in the attempt, for the header and the
/// question palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamProgress {
    pub part_index: usize,
    pub part_count: usize,
    pub group_index: usize,
    pub group_count: usize,
    pub answered: usize,
    pub total: usize,
    pub marked: usize,
    /// `None` when the attempt has no time limit.
    pub remaining_seconds: Option<u32>,
    pub elapsed_seconds: u32,
}

impl ExamProgress {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    #[must_use]
    pub fn is_part_complete(&self) -> bool {
        self.answered == self.total
    }

    #[must_use]
    pub fn is_last_part(&self) -> bool {
        self.part_index + 1 >= self.part_count
    }
}
