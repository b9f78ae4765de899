use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use exam_core::model::{ExamId, ExamOverview, ExamPartInfo, PartData, PartId, PartsSelector};
use storage::PartStore;

use crate::api::ExamApi;
use crate::config::PartFetchPolicy;
use crate::error::{ApiError, LoadError};
use crate::notices::{NoticeKind, Notices};

/// Result of opening an attempt: the selected parts in exam order and the
/// first part's content.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub overview: ExamOverview,
    pub parts: Vec<ExamPartInfo>,
    pub first_part: Arc<PartData>,
}

/// Fetches exam structure and part content, caching parts for the attempt.
///
/// Failures are reported to the notice board before they are returned, so
/// callers only decide what to do with the session itself.
#[derive(Clone)]
pub struct ExamLoader {
    api: Arc<dyn ExamApi>,
    parts: Arc<dyn PartStore>,
    notices: Notices,
    policy: PartFetchPolicy,
}

impl ExamLoader {
    #[must_use]
    pub fn new(
        api: Arc<dyn ExamApi>,
        parts: Arc<dyn PartStore>,
        notices: Notices,
        policy: PartFetchPolicy,
    ) -> Self {
        Self {
            api,
            parts,
            notices,
            policy,
        }
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Open an attempt on `exam_id` covering the parts named by `selector`
    /// (`"all"` or a CSV of part ids).
    ///
    /// # Errors
    ///
    /// Returns `LoadError` for a missing selector, an exam without parts, a
    /// selection matching none of them, or a first part that cannot be
    /// loaded. All of them are fatal to the attempt.
    pub async fn load_session(
        &self,
        exam_id: ExamId,
        selector: Option<&str>,
        now: Duration,
    ) -> Result<LoadedSession, LoadError> {
        let result = self.open(exam_id, selector).await;
        if let Err(err) = &result {
            self.report(err, now, true);
        }
        result
    }

    /// The part's content, from cache when it was loaded before.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` when the part cannot be fetched or has no
    /// questions.
    pub async fn load_part(&self, part_id: PartId, now: Duration) -> Result<Arc<PartData>, LoadError> {
        let result = self.fetch_part(part_id).await;
        if let Err(err) = &result {
            self.report(err, now, false);
        }
        result
    }

    /// Whether a failed `load_part` leaves the attempt running.
    #[must_use]
    pub fn is_recoverable(&self, err: &LoadError) -> bool {
        self.policy == PartFetchPolicy::StayAndRetry && err.is_transient()
    }

    async fn open(&self, exam_id: ExamId, selector: Option<&str>) -> Result<LoadedSession, LoadError> {
        let selector = PartsSelector::parse(selector).map_err(|_| LoadError::MissingParts)?;
        let overview = self.api.fetch_exam(exam_id).await?;
        if !overview.has_parts() {
            return Err(LoadError::NoParts(exam_id));
        }

        let parts = selector.resolve(&overview.sorted_parts());
        let Some(first) = parts.first() else {
            return Err(LoadError::EmptySelection(exam_id));
        };
        let first_part = self.fetch_part(first.part_id).await?;
        info!(%exam_id, parts = parts.len(), "exam session loaded");
        Ok(LoadedSession {
            overview,
            parts,
            first_part,
        })
    }

    async fn fetch_part(&self, part_id: PartId) -> Result<Arc<PartData>, LoadError> {
        if let Some(cached) = self.parts.get_part(part_id)? {
            debug!(%part_id, "part served from cache");
            return Ok(cached);
        }

        let part = self
            .api
            .fetch_parts(&[part_id])
            .await?
            .into_iter()
            .find(|part| part.part_id == part_id)
            .ok_or(ApiError::MissingPart(part_id))?;
        if !part.has_questions() {
            return Err(LoadError::EmptyPart(part_id));
        }
        debug!(%part_id, questions = part.total_questions(), "part fetched");
        Ok(self.parts.put_part(part)?)
    }

    fn report(&self, err: &LoadError, now: Duration, opening: bool) {
        let kind = if !opening && self.is_recoverable(err) {
            NoticeKind::PartFetchFailed
        } else {
            notice_kind(err)
        };
        warn!(error = %err, ?kind, "exam load failed");
        self.notices.raise(kind, now);
    }
}

fn notice_kind(err: &LoadError) -> NoticeKind {
    match err {
        LoadError::MissingParts => NoticeKind::MissingParts,
        LoadError::NoParts(_) => NoticeKind::ExamHasNoParts,
        LoadError::EmptySelection(_) => NoticeKind::EmptySelection,
        LoadError::EmptyPart(_) => NoticeKind::EmptyPart,
        LoadError::Fetch(_) | LoadError::Storage(_) => NoticeKind::InvalidExam,
    }
}
