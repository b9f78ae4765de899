use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::exam::PartNumber;
use crate::model::ids::{GroupId, OptionId, PartId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("invalid option letter: {0:?}")]
    InvalidLetter(String),

    #[error("question {question} has no options")]
    NoOptions { question: QuestionId },

    #[error("question {question} repeats option {letter}")]
    DuplicateLetter {
        question: QuestionId,
        letter: OptionLetter,
    },

    #[error("question {question} skips option {expected}")]
    NonContiguousLetters {
        question: QuestionId,
        expected: OptionLetter,
    },
}

//
// ─── OPTION LETTER ─────────────────────────────────────────────────────────────
//

/// Answer choice label (`A`, `B`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptionLetter(char);

impl OptionLetter {
    pub const A: Self = Self('A');
    pub const B: Self = Self('B');
    pub const C: Self = Self('C');
    pub const D: Self = Self('D');

    /// # Errors
    ///
    /// Returns `QuestionError::InvalidLetter` for anything but an ASCII letter.
    pub fn new(letter: char) -> Result<Self, QuestionError> {
        if letter.is_ascii_alphabetic() {
            Ok(Self(letter.to_ascii_uppercase()))
        } else {
            Err(QuestionError::InvalidLetter(letter.to_string()))
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        self.0
    }

    /// Zero-based position in the alphabet.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0 as u8 - b'A')
    }

    fn from_index(index: usize) -> Option<Self> {
        let offset = u8::try_from(index).ok().filter(|o| *o < 26)?;
        Some(Self(char::from(b'A' + offset)))
    }
}

impl FromStr for OptionLetter {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => Self::new(letter),
            _ => Err(QuestionError::InvalidLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for OptionLetter {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptionLetter> for String {
    fn from(value: OptionLetter) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub option_id: OptionId,
    pub letter: OptionLetter,
    pub text: Option<String>,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    question_id: QuestionId,
    question_number: u32,
    question_text: Option<String>,
    options: Vec<AnswerOption>,
}

impl Question {
    /// Build a question, checking that option letters are unique and run
    /// contiguously from `A`. Options are stored in letter order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the options are empty, repeated or have gaps.
    pub fn new(
        question_id: QuestionId,
        question_number: u32,
        question_text: Option<String>,
        mut options: Vec<AnswerOption>,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions {
                question: question_id,
            });
        }
        options.sort_by_key(|option| option.letter);

        for (index, option) in options.iter().enumerate() {
            let Some(expected) = OptionLetter::from_index(index) else {
                return Err(QuestionError::InvalidLetter(option.letter.to_string()));
            };
            if option.letter == expected {
                continue;
            }
            if index > 0 && options[index - 1].letter == option.letter {
                return Err(QuestionError::DuplicateLetter {
                    question: question_id,
                    letter: option.letter,
                });
            }
            return Err(QuestionError::NonContiguousLetters {
                question: question_id,
                expected,
            });
        }

        Ok(Self {
            question_id,
            question_number,
            question_text,
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.question_id
    }

    /// Global ordering key across the whole exam.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.question_number
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.question_text.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn offers(&self, letter: OptionLetter) -> bool {
        self.options.iter().any(|option| option.letter == letter)
    }
}

/// Questions sharing one audio clip, picture or passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGroup {
    pub group_id: GroupId,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub passage_text: Option<String>,
    pub questions: Vec<Question>,
}

//
// ─── PART DATA ─────────────────────────────────────────────────────────────────
//

/// Question content for one part, as loaded for an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartData {
    pub part_id: PartId,
    pub part_number: PartNumber,
    pub part_name: String,
    pub description: Option<String>,
    pub groups: Vec<QuestionGroup>,
}

impl PartData {
    /// A part is usable when at least one group carries a question.
    #[must_use]
    pub fn has_questions(&self) -> bool {
        self.groups.iter().any(|group| !group.questions.is_empty())
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.groups.iter().map(|group| group.questions.len()).sum()
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.groups.iter().flat_map(|group| group.questions.iter())
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions().find(|question| question.id() == id)
    }

    /// Index of the group holding `id`.
    #[must_use]
    pub fn group_of(&self, id: QuestionId) -> Option<usize> {
        self.groups
            .iter()
            .position(|group| group.questions.iter().any(|q| q.id() == id))
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.part_number.is_listening()
    }
}
