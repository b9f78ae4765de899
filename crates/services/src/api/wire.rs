//! JSON shapes of the backend, mapped into the domain model.

use serde::Deserialize;

use exam_core::model::{
    AnswerOption, ExamId, ExamOverview, ExamPartInfo, GroupId, OptionId, OptionLetter, PartData,
    PartId, PartNumber, Question, QuestionGroup, QuestionId,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExamDto {
    #[serde(default)]
    exam_id: Option<ExamId>,
    #[serde(default, alias = "examName")]
    title: Option<String>,
    #[serde(default)]
    exam_parts: Vec<ExamPartDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExamPartDto {
    part_id: PartId,
    part_number: u8,
    #[serde(default)]
    part_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartDto {
    part_id: PartId,
    part_number: u8,
    #[serde(default)]
    part_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    groups: Vec<GroupDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDto {
    group_id: GroupId,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    passage_text: Option<String>,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    question_id: QuestionId,
    question_number: u32,
    #[serde(default)]
    question_text: Option<String>,
    #[serde(default)]
    options: Vec<OptionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionDto {
    option_id: OptionId,
    option_letter: String,
    #[serde(default)]
    option_text: Option<String>,
}

fn part_number(raw: u8) -> Result<PartNumber, ApiError> {
    PartNumber::new(raw).map_err(|e| ApiError::Malformed(e.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

impl ExamDto {
    pub(crate) fn into_overview(self, requested: ExamId) -> Result<ExamOverview, ApiError> {
        let parts = self
            .exam_parts
            .into_iter()
            .map(|part| {
                Ok(ExamPartInfo {
                    part_id: part.part_id,
                    part_number: part_number(part.part_number)?,
                    part_name: part.part_name,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(ExamOverview {
            exam_id: self.exam_id.unwrap_or(requested),
            title: non_blank(self.title),
            parts,
        })
    }
}

impl TryFrom<PartDto> for PartData {
    type Error = ApiError;

    fn try_from(dto: PartDto) -> Result<Self, Self::Error> {
        let groups = dto
            .groups
            .into_iter()
            .map(QuestionGroup::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PartData {
            part_id: dto.part_id,
            part_number: part_number(dto.part_number)?,
            part_name: dto.part_name,
            description: non_blank(dto.description),
            groups,
        })
    }
}

impl TryFrom<GroupDto> for QuestionGroup {
    type Error = ApiError;

    fn try_from(dto: GroupDto) -> Result<Self, Self::Error> {
        let mut questions = dto
            .questions
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        questions.sort_by_key(Question::number);
        Ok(QuestionGroup {
            group_id: dto.group_id,
            image_url: non_blank(dto.image_url),
            audio_url: non_blank(dto.audio_url),
            passage_text: non_blank(dto.passage_text),
            questions,
        })
    }
}

impl TryFrom<QuestionDto> for Question {
    type Error = ApiError;

    fn try_from(dto: QuestionDto) -> Result<Self, Self::Error> {
        let options = dto
            .options
            .into_iter()
            .map(|option| {
                let letter = option
                    .option_letter
                    .parse::<OptionLetter>()
                    .map_err(|e| ApiError::Malformed(e.to_string()))?;
                Ok(AnswerOption {
                    option_id: option.option_id,
                    letter,
                    text: non_blank(option.option_text),
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;
        Question::new(
            dto.question_id,
            dto.question_number,
            non_blank(dto.question_text),
            options,
        )
        .map_err(|e| ApiError::Malformed(e.to_string()))
    }
}
