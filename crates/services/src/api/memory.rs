use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use exam_core::model::{ExamId, ExamOverview, PartData, PartId};

use super::{ExamApi, ExamResult, SubmitExamRequest};
use crate::error::ApiError;

#[derive(Default)]
struct State {
    exams: HashMap<ExamId, ExamOverview>,
    parts: HashMap<PartId, PartData>,
    failing_parts: HashSet<PartId>,
    part_delays: HashMap<PartId, Duration>,
    submit_failures: u32,
    result: Option<Value>,
    part_requests: Vec<Vec<PartId>>,
    submissions: Vec<SubmitExamRequest>,
}

/// In-memory backend for tests and offline prototyping.
///
/// Records every request so callers can assert on caching and exactly-once
/// submission.
#[derive(Clone, Default)]
pub struct InMemoryExamApi {
    state: Arc<Mutex<State>>,
}

impl InMemoryExamApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_exam(&self, overview: ExamOverview) {
        self.state().exams.insert(overview.exam_id, overview);
    }

    pub fn insert_part(&self, part: PartData) {
        self.state().parts.insert(part.part_id, part);
    }

    /// Make fetches of `part` fail with a transient error until `heal_part`.
    pub fn fail_part(&self, part: PartId) {
        self.state().failing_parts.insert(part);
    }

    pub fn heal_part(&self, part: PartId) {
        self.state().failing_parts.remove(&part);
    }

    /// Make fetches that include `part` take `delay` (tokio time).
    pub fn delay_part(&self, part: PartId, delay: Duration) {
        self.state().part_delays.insert(part, delay);
    }

    /// Make the next `count` submissions fail with a transient error.
    pub fn fail_next_submissions(&self, count: u32) {
        self.state().submit_failures = count;
    }

    pub fn set_result(&self, result: Value) {
        self.state().result = Some(result);
    }

    /// Part ids of every `fetch_parts` call, in call order.
    #[must_use]
    pub fn part_requests(&self) -> Vec<Vec<PartId>> {
        self.state().part_requests.clone()
    }

    /// Every request that reached the submit endpoint, failed ones included.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmitExamRequest> {
        self.state().submissions.clone()
    }
}

#[async_trait]
impl ExamApi for InMemoryExamApi {
    async fn fetch_exam(&self, exam_id: ExamId) -> Result<ExamOverview, ApiError> {
        self.state()
            .exams
            .get(&exam_id)
            .cloned()
            .ok_or(ApiError::ExamNotFound(exam_id))
    }

    async fn fetch_parts(&self, part_ids: &[PartId]) -> Result<Vec<PartData>, ApiError> {
        let delay = {
            let mut state = self.state();
            state.part_requests.push(part_ids.to_vec());
            part_ids
                .iter()
                .filter_map(|id| state.part_delays.get(id).copied())
                .max()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        let mut found = Vec::with_capacity(part_ids.len());
        for id in part_ids {
            if state.failing_parts.contains(id) {
                return Err(ApiError::Unavailable(format!("part {id} unreachable")));
            }
            if let Some(part) = state.parts.get(id) {
                found.push(part.clone());
            }
        }
        Ok(found)
    }

    async fn submit_exam(&self, request: &SubmitExamRequest) -> Result<ExamResult, ApiError> {
        let mut state = self.state();
        state.submissions.push(request.clone());
        if state.submit_failures > 0 {
            state.submit_failures -= 1;
            return Err(ApiError::Unavailable("submit rejected".into()));
        }
        let raw = state.result.clone().unwrap_or_else(|| {
            json!({
                "examId": request.exam_id,
                "answered": request.answers.len(),
            })
        });
        Ok(ExamResult::new(raw))
    }
}
