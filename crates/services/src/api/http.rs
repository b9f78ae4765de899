use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use exam_core::model::{ExamId, ExamOverview, PartData, PartId};

use super::wire::{ExamDto, PartDto};
use super::{ExamApi, ExamResult, SubmitExamRequest};
use crate::auth::AuthContext;
use crate::config::ServicesConfig;
use crate::error::ApiError;

/// `ExamApi` backed by the REST backend.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    base_url: Url,
    auth: AuthContext,
}

impl HttpExamApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ServicesConfig, auth: AuthContext) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Attach the bearer token once auth is ready. Requests issued before
    /// hydration finishes are refused rather than sent anonymously.
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        Ok(match self.auth.bearer_token()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_exam(&self, exam_id: ExamId) -> Result<ExamOverview, ApiError> {
        let url = self.endpoint(&format!("exams/public/{exam_id}"))?;
        debug!(%url, "fetching exam");
        let response = self.authorize(self.client.get(url))?.send().await?;
        let dto: ExamDto = Self::read_json(response).await?;
        dto.into_overview(exam_id)
    }

    async fn fetch_parts(&self, part_ids: &[PartId]) -> Result<Vec<PartData>, ApiError> {
        let csv = part_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint("question-groups/by-parts")?;
        url.query_pairs_mut().append_pair("partIds", &csv);
        debug!(%url, "fetching parts");

        let response = self.authorize(self.client.get(url))?.send().await?;
        let dtos: Vec<PartDto> = Self::read_json(response).await?;
        dtos.into_iter().map(PartData::try_from).collect()
    }

    async fn submit_exam(&self, request: &SubmitExamRequest) -> Result<ExamResult, ApiError> {
        let url = self.endpoint("exams/submit")?;
        debug!(%url, exam_id = %request.exam_id, answers = request.answers.len(), "submitting exam");
        let response = self
            .authorize(self.client.post(url))?
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }
}
