mod answers;
mod exam;
mod ids;
mod mode;
mod part;
mod selector;

pub use answers::PartAnswers;
pub use exam::{ExamOverview, ExamPartInfo, PartNumber, PartNumberError};
pub use ids::{AttemptId, ExamId, GroupId, OptionId, ParseIdError, PartId, QuestionId};
pub use mode::{ExamMode, FULL_EXAM_SECONDS, TimeParam, derive_total_seconds};
pub use part::{AnswerOption, OptionLetter, PartData, Question, QuestionError, QuestionGroup};
pub use selector::{PartsSelector, SelectorError};
