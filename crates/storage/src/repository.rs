use exam_core::model::{PartAnswers, PartData, PartId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Cache of loaded part content, keyed by part id.
pub trait PartStore: Send + Sync {
    /// Fetch a cached part.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    fn get_part(&self, id: PartId) -> Result<Option<Arc<PartData>>, StorageError>;

    /// Cache a part, replacing any earlier copy.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    fn put_part(&self, part: PartData) -> Result<Arc<PartData>, StorageError>;
}

/// Session-wide answer cache, one `PartAnswers` slice per part.
///
/// Each slice has a single writer: the answer state of the active part.
pub trait AnswerStore: Send + Sync {
    /// Answers recorded for `part`, empty if none were saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    fn load_answers(&self, part: PartId) -> Result<PartAnswers, StorageError>;

    /// Replace the slice for `part`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    fn save_answers(&self, part: PartId, answers: PartAnswers) -> Result<(), StorageError>;

    /// Every saved slice ordered by part id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    fn all_answers(&self) -> Result<Vec<(PartId, PartAnswers)>, StorageError>;
}

/// In-memory implementation of both stores.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    parts: Arc<Mutex<HashMap<PartId, Arc<PartData>>>>,
    answers: Arc<Mutex<BTreeMap<PartId, PartAnswers>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartStore for InMemoryStore {
    fn get_part(&self, id: PartId) -> Result<Option<Arc<PartData>>, StorageError> {
        let guard = self
            .parts
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    fn put_part(&self, part: PartData) -> Result<Arc<PartData>, StorageError> {
        let mut guard = self
            .parts
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        let part = Arc::new(part);
        guard.insert(part.part_id, Arc::clone(&part));
        Ok(part)
    }
}

impl AnswerStore for InMemoryStore {
    fn load_answers(&self, part: PartId) -> Result<PartAnswers, StorageError> {
        let guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(guard.get(&part).cloned().unwrap_or_default())
    }

    fn save_answers(&self, part: PartId, answers: PartAnswers) -> Result<(), StorageError> {
        let mut guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        guard.insert(part, answers);
        Ok(())
    }

    fn all_answers(&self) -> Result<Vec<(PartId, PartAnswers)>, StorageError> {
        let guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        Ok(guard
            .iter()
            .map(|(id, answers)| (*id, answers.clone()))
            .collect())
    }
}

/// Both stores behind trait objects, shared by the loader, the answer state
/// and the submission flow of one attempt.
#[derive(Clone)]
pub struct SessionStores {
    pub parts: Arc<dyn PartStore>,
    pub answers: Arc<dyn AnswerStore>,
}

impl SessionStores {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        let parts: Arc<dyn PartStore> = Arc::new(store.clone());
        let answers: Arc<dyn AnswerStore> = Arc::new(store);
        Self { parts, answers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        AnswerOption, GroupId, OptionId, OptionLetter, PartNumber, Question, QuestionGroup,
        QuestionId,
    };

    fn build_part(id: u64) -> PartData {
        let question = Question::new(
            QuestionId::new(1),
            1,
            None,
            vec![AnswerOption {
                option_id: OptionId::new(1),
                letter: OptionLetter::A,
                text: None,
            }],
        )
        .unwrap();
        PartData {
            part_id: PartId::new(id),
            part_number: PartNumber::new(5).unwrap(),
            part_name: "Part 5".into(),
            description: None,
            groups: vec![QuestionGroup {
                group_id: GroupId::new(1),
                image_url: None,
                audio_url: None,
                passage_text: None,
                questions: vec![question],
            }],
        }
    }

    #[test]
    fn caches_parts_by_id() {
        let store = InMemoryStore::new();
        assert!(store.get_part(PartId::new(5)).unwrap().is_none());

        store.put_part(build_part(5)).unwrap();
        let cached = store.get_part(PartId::new(5)).unwrap().unwrap();
        assert_eq!(cached.part_id, PartId::new(5));
    }

    #[test]
    fn answer_slices_are_isolated_per_part() {
        let stores = SessionStores::in_memory();
        let mut first = PartAnswers::new();
        first.answers.insert(QuestionId::new(1), OptionLetter::B);
        stores.answers.save_answers(PartId::new(1), first.clone()).unwrap();

        assert_eq!(stores.answers.load_answers(PartId::new(1)).unwrap(), first);
        assert!(stores.answers.load_answers(PartId::new(2)).unwrap().is_empty());
        assert_eq!(stores.answers.all_answers().unwrap().len(), 1);
    }
}
