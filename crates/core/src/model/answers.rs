use std::collections::BTreeMap;

use crate::model::ids::QuestionId;
use crate::model::part::{OptionLetter, PartData};

/// Answers and review flags recorded for one part.
///
/// This is the slice kept in the session-wide answer cache, keyed by part id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartAnswers {
    pub answers: BTreeMap<QuestionId, OptionLetter>,
    pub marked_for_review: BTreeMap<QuestionId, bool>,
}

impl PartAnswers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && !self.marked_for_review.values().any(|flag| *flag)
    }

    #[must_use]
    pub fn answer(&self, question: QuestionId) -> Option<OptionLetter> {
        self.answers.get(&question).copied()
    }

    #[must_use]
    pub fn is_marked(&self, question: QuestionId) -> bool {
        self.marked_for_review.get(&question).copied().unwrap_or(false)
    }

    /// Drop entries that do not refer to a question of `part` or to an
    /// option that question offers.
    #[must_use]
    pub fn restricted_to(mut self, part: &PartData) -> Self {
        self.answers.retain(|id, letter| {
            part.question(*id)
                .is_some_and(|question| question.offers(*letter))
        });
        self.marked_for_review
            .retain(|id, _| part.question(*id).is_some());
        self
    }
}
