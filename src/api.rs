//! HTTP client for the records API.

use crate::model::{EnrollmentRecord, LookupData, RosterSnapshot};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API base url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Query for one roster: the selected course and subject plus the
/// course-subject link id of the selected descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterQuery {
    pub course_id: i64,
    pub subject_id: i64,
    pub course_subject_id: i64,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::BaseUrl {
                url: base_url.to_string(),
                reason: "not a base url".to_string(),
            });
        }
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            http: Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|e| ApiError::BaseUrl {
            url: self.base.to_string(),
            reason: e.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self) -> Result<LookupData, ApiError> {
        let url = self.endpoint("buscar-dados")?;
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    pub async fn roster(&self, query: RosterQuery) -> Result<RosterSnapshot, ApiError> {
        let url = self.endpoint("turmas")?;
        let params = [
            ("curso_id", query.course_id.to_string()),
            ("disciplinas", query.subject_id.to_string()),
            ("id_curso_disciplina", query.course_subject_id.to_string()),
        ];
        self.get_json(url, &params).await
    }

    /// `PUT /lancar` with one or more records. The response body is ignored.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn submit(&self, records: &[EnrollmentRecord]) -> Result<(), ApiError> {
        let url = self.endpoint("lancar")?;
        let url_s = url.to_string();
        let resp = self
            .http
            .put(url)
            .json(records)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                url: url_s.clone(),
                source: e,
            })?;
        check_status(&url_s, resp.status())?;
        debug!(url = %url_s, "records submitted");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url_s = url.to_string();
        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                url: url_s.clone(),
                source: e,
            })?;
        check_status(&url_s, resp.status())?;
        resp.json::<T>().await.map_err(|e| ApiError::Transport {
            url: url_s,
            source: e,
        })
    }
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    Err(ApiError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    })
}
