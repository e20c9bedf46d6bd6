//! Remote record/config service over HTTP
//!
//! Implements the storage traits against a JSON service:
//!
//! - `POST /projects/{project}/sessions/{session}/records` appends a batch
//! - `GET  /projects/{project}/sessions/{session}/records?tagId=` queries
//! - `GET  /projects/{project}/configs/latest` or `/configs/{version}`
//! - `POST /projects/{project}/configs` publishes and returns `{version}`
//!
//! A missing resource comes back as `404` and maps to an empty result, the
//! same shape the local stores produce.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use retrace_core::error::{RetraceError, RetraceResult};
use retrace_core::eval::EvalConfig;
use retrace_core::record::CallRecord;
use retrace_core::store::{
    ConfigStore, RecordSink, RecordStore, VersionSelector, VersionedConfig,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpStore {
    base: String,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl HttpStore {
    /// Connect to a service at `endpoint`, optionally authenticating every
    /// request with a bearer token
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> RetraceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RetraceError::http(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            base: endpoint.into().trim_end_matches('/').to_string(),
            client,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base
    }

    fn records_url(&self, project: &str, session: &str) -> String {
        format!(
            "{}/projects/{}/sessions/{}/records",
            self.base, project, session
        )
    }

    fn configs_url(&self, project: &str) -> String {
        format!("{}/projects/{}/configs", self.base, project)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> RetraceResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RetraceError::http(format!("request to {} failed: {}", url, e)))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }
        Err(RetraceError::http_with_status(
            format!("service answered {}", status),
            url,
            status.as_u16(),
        ))
    }
}

#[async_trait]
impl RecordStore for HttpStore {
    async fn append(
        &self,
        project: &str,
        session: &str,
        records: &[CallRecord],
    ) -> RetraceResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let url = self.records_url(project, session);
        let response = self
            .send(self.client.post(&url).json(records), &url)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RetraceError::http_with_status(
                "record endpoint not found",
                &url,
                404,
            ));
        }
        debug!(count = records.len(), session, "records pushed");
        Ok(())
    }

    async fn query(
        &self,
        project: &str,
        session: &str,
        tag_id: Option<&str>,
    ) -> RetraceResult<Vec<CallRecord>> {
        let url = self.records_url(project, session);
        let mut request = self.client.get(&url);
        if let Some(tag) = tag_id {
            request = request.query(&[("tagId", tag)]);
        }
        let response = self.send(request, &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        response
            .json()
            .await
            .map_err(|e| RetraceError::http(format!("malformed record response: {}", e)))
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    version: u32,
    config: EvalConfig,
}

#[derive(Deserialize)]
struct PublishedVersion {
    version: u32,
}

#[async_trait]
impl ConfigStore for HttpStore {
    async fn get_config(
        &self,
        project: &str,
        selector: VersionSelector,
    ) -> RetraceResult<Option<VersionedConfig>> {
        let url = match selector {
            VersionSelector::Latest => format!("{}/latest", self.configs_url(project)),
            VersionSelector::Exact(version) => {
                format!("{}/{}", self.configs_url(project), version)
            }
        };
        let response = self.send(self.client.get(&url), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: ConfigDocument = response
            .json()
            .await
            .map_err(|e| RetraceError::http(format!("malformed config response: {}", e)))?;
        Ok(Some(VersionedConfig {
            version: document.version,
            config: document.config,
        }))
    }

    async fn put_config(&self, project: &str, config: &EvalConfig) -> RetraceResult<u32> {
        let url = self.configs_url(project);
        let response = self.send(self.client.post(&url).json(config), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RetraceError::http_with_status(
                "config endpoint not found",
                &url,
                404,
            ));
        }
        let published: PublishedVersion = response
            .json()
            .await
            .map_err(|e| RetraceError::http(format!("malformed publish response: {}", e)))?;
        debug!(project, version = published.version, "config published");
        Ok(published.version)
    }
}

#[async_trait]
impl RecordSink for HttpStore {
    async fn emit(&self, record: &CallRecord) -> RetraceResult<()> {
        let (Some(project), Some(session)) = (record.project.as_deref(), record.session.as_deref())
        else {
            return Err(RetraceError::invalid_input(
                "record carries no session context; nothing to push it under",
            ));
        };
        self.append(project, session, std::slice::from_ref(record))
            .await
    }
}
