//! HTTP client for the member directory.
//!
//! ## API Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v1/members` | List members |
//! | GET    | `/api/v1/members/{id}` | Get member (404 when unknown) |
//! | PUT    | `/api/v1/members/{id}/category` | Set category |

use std::time::Duration;

use async_trait::async_trait;
use memcat_core::{Category, MemberId, MemberSnapshot};
use memcat_engine::{DirectoryError, MemberDirectory};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{ConfigError, DirectoryConfig};
use crate::error::DirectoryClientError;
use crate::retry::{send_with_backoff, Backoff};
use crate::types::{MemberRecord, SetCategoryRequest};

/// Member directory gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMemberDirectory {
    http: reqwest::Client,
    base_url: Url,
    backoff: Backoff,
}

impl HttpMemberDirectory {
    /// Create a client from configuration.
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ConfigError::InvalidToken)?,
            );
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| DirectoryClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: config.base_url,
            backoff: Backoff::default(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, DirectoryClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConfigError::InvalidUrl("base_url".into(), self.base_url.to_string())
            })?
            .pop_if_empty()
            .extend(["api", "v1", "members"])
            .extend(segments);
        Ok(url)
    }

    async fn check(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, DirectoryClientError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        Err(DirectoryClientError::ApiError {
            endpoint: endpoint.into(),
            status,
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: Url,
    ) -> Result<T, DirectoryClientError> {
        let resp = send_with_backoff(self.backoff, endpoint, || self.http.get(url.clone()).send())
            .await
            .map_err(|e| DirectoryClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        Self::check(endpoint, resp)
            .await?
            .json()
            .await
            .map_err(|e| DirectoryClientError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })
    }

    /// Fetch every member record.
    ///
    /// Calls `GET {base_url}/api/v1/members`.
    pub async fn list_records(&self) -> Result<Vec<MemberRecord>, DirectoryClientError> {
        self.get_json("GET /members", self.url(&[])?).await
    }

    /// Fetch one member record; `Ok(None)` on 404.
    ///
    /// Calls `GET {base_url}/api/v1/members/{id}`.
    pub async fn get_record(
        &self,
        id: &MemberId,
    ) -> Result<Option<MemberRecord>, DirectoryClientError> {
        match self
            .get_json("GET /members/{id}", self.url(&[id.as_str()])?)
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a member's category.
    ///
    /// Calls `PUT {base_url}/api/v1/members/{id}/category`.
    pub async fn put_category(
        &self,
        id: &MemberId,
        category: &Category,
    ) -> Result<(), DirectoryClientError> {
        let endpoint = "PUT /members/{id}/category";
        let url = self.url(&[id.as_str(), "category"])?;
        let body = SetCategoryRequest {
            category: category.as_str(),
        };
        let send = || self.http.put(url.clone()).json(&body).send();
        let resp = send_with_backoff(self.backoff, endpoint, send)
            .await
            .map_err(|e| DirectoryClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        Self::check(endpoint, resp).await?;
        Ok(())
    }
}

fn into_snapshots(records: Vec<MemberRecord>) -> Vec<MemberSnapshot> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            match MemberSnapshot::try_from(record) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!(member_id = %id, error = %e, "skipping invalid member record");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl MemberDirectory for HttpMemberDirectory {
    fn name(&self) -> &str {
        "http"
    }

    async fn list_members(&self) -> Result<Vec<MemberSnapshot>, DirectoryError> {
        Ok(into_snapshots(self.list_records().await?))
    }

    async fn get_members(&self, ids: &[MemberId]) -> Result<Vec<MemberSnapshot>, DirectoryError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_record(id).await? {
                records.push(record);
            }
        }
        Ok(into_snapshots(records))
    }

    async fn set_category(
        &self,
        member_id: &MemberId,
        category: &Category,
    ) -> Result<(), DirectoryError> {
        self.put_category(member_id, category)
            .await
            .map_err(|e| e.into_write_error(member_id))
    }
}
