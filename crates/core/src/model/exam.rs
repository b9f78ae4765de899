use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ExamId, PartId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PartNumberError {
    #[error("part number must be between 1 and 7, got {0}")]
    OutOfRange(u8),
}

//
// ─── PART NUMBER ───────────────────────────────────────────────────────────────
//

/// Position of a section in the TOEIC layout.
///
/// Parts 1-4 are listening, parts 5-7 are reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PartNumber(u8);

impl PartNumber {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 7;

    /// # Errors
    ///
    /// Returns `PartNumberError::OutOfRange` outside `1..=7`.
    pub fn new(value: u8) -> Result<Self, PartNumberError> {
        if (Self::FIRST..=Self::LAST).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PartNumberError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_listening(self) -> bool {
        self.0 <= 4
    }

    #[must_use]
    pub fn is_reading(self) -> bool {
        !self.is_listening()
    }
}

impl TryFrom<u8> for PartNumber {
    type Error = PartNumberError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartNumber> for u8 {
    fn from(value: PartNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part {}", self.0)
    }
}

//
// ─── EXAM OVERVIEW ─────────────────────────────────────────────────────────────
//

/// Metadata for one part as listed on the exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPartInfo {
    pub part_id: PartId,
    pub part_number: PartNumber,
    pub part_name: String,
}

/// Exam metadata: which parts exist, before any question is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamOverview {
    pub exam_id: ExamId,
    pub title: Option<String>,
    pub parts: Vec<ExamPartInfo>,
}

impl ExamOverview {
    #[must_use]
    pub fn has_parts(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Parts ordered by part number. The sort is stable so parts sharing a
    /// number keep the backend's order.
    #[must_use]
    pub fn sorted_parts(&self) -> Vec<ExamPartInfo> {
        let mut parts = self.parts.clone();
        parts.sort_by_key(|part| part.part_number);
        parts
    }
}
