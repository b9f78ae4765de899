use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::exam::PartNumber;

/// Fixed duration of a full TOEIC exam.
pub const FULL_EXAM_SECONDS: u32 = 7_200;

/// How strictly an attempt is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamMode {
    /// Continuous listening + reading with audio and cross-part restrictions.
    Full,
    /// One or a few parts with relaxed constraints.
    Partial,
}

impl ExamMode {
    #[must_use]
    pub fn is_full(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Listening parts of a full exam play once, without pause or seek.
    #[must_use]
    pub fn restricts_audio(self, part: PartNumber) -> bool {
        self.is_full() && part.is_listening()
    }

    /// Review flags are off-limits only while listening in a full exam.
    #[must_use]
    pub fn allows_review(self, part: PartNumber) -> bool {
        part.is_reading() || !self.is_full()
    }
}

/// Parsed `time` query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeParam {
    #[default]
    Absent,
    Unlimited,
    Minutes(i64),
    /// Present but not a number; treated like `Unlimited`.
    Invalid,
}

impl TimeParam {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Absent,
            Some(value) if value.eq_ignore_ascii_case("unlimited") => Self::Unlimited,
            Some(value) => value.parse::<i64>().map_or(Self::Invalid, Self::Minutes),
        }
    }
}

impl FromStr for TimeParam {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(Some(s)))
    }
}

/// Total allotted seconds for an attempt. `0` means no countdown.
#[must_use]
pub fn derive_total_seconds(mode: ExamMode, time: TimeParam) -> u32 {
    match (mode, time) {
        (ExamMode::Full, _) => FULL_EXAM_SECONDS,
        (ExamMode::Partial, TimeParam::Minutes(minutes)) if minutes > 0 => {
            u32::try_from(minutes.saturating_mul(60)).unwrap_or(u32::MAX)
        }
        (ExamMode::Partial, _) => 0,
    }
}
