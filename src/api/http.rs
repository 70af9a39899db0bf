//! reqwest-backed REST client.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{CreateIssueRequest, Issue, PageRequest, PageResponse, Project, UpdateIssueRequest};

use super::{IssueApi, ProjectApi};

/// Per-request timeout for REST calls (streams use their own client).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body returned by the server on failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// REST client for the issue tracker API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApi {
    /// Build a client for `base_url` (e.g. `http://localhost:8080/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request).send().await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-2xx response into `Error::Api`, keeping the server message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "API request failed");
    Err(Error::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Extract the user-facing message from an error body, if any.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

fn not_found_as(err: Error, missing: impl FnOnce() -> Error) -> Error {
    match err {
        Error::Api { status: 404, .. } => missing(),
        other => other,
    }
}

impl IssueApi for HttpApi {
    async fn list_issues(&self, request: &PageRequest) -> Result<PageResponse<Issue>> {
        let builder = self.client.get(self.url("issues")).query(&request.query_pairs());
        self.send(builder).await
    }

    async fn get_issue(&self, id: &str) -> Result<Issue> {
        let builder = self.client.get(self.url(&format!("issues/{id}")));
        self.send(builder)
            .await
            .map_err(|e| not_found_as(e, || Error::IssueNotFound { id: id.to_string() }))
    }

    async fn create_issue(&self, request: &CreateIssueRequest) -> Result<Issue> {
        let builder = self.client.post(self.url("issues")).json(request);
        self.send(builder).await
    }

    async fn update_issue(&self, id: &str, request: &UpdateIssueRequest) -> Result<Issue> {
        let builder = self.client.put(self.url(&format!("issues/{id}"))).json(request);
        self.send(builder)
            .await
            .map_err(|e| not_found_as(e, || Error::IssueNotFound { id: id.to_string() }))
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        let builder = self.client.delete(self.url(&format!("issues/{id}")));
        let response = self.authorize(builder).send().await?;
        check(response)
            .await
            .map_err(|e| not_found_as(e, || Error::IssueNotFound { id: id.to_string() }))?;
        Ok(())
    }
}

impl ProjectApi for HttpApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.send(self.client.get(self.url("projects"))).await
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        let builder = self.client.get(self.url(&format!("projects/{id}")));
        self.send(builder)
            .await
            .map_err(|e| not_found_as(e, || Error::ProjectNotFound { id: id.to_string() }))
    }
}
