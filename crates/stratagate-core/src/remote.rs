//! HTTP clients for the judgment and permission collaborators.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use stratagate_store::{PermissionCheck, PermissionDecision, PermissionQuery};
use tracing::debug;

use crate::domain::{Result, ValidateError};
use crate::stage_gate::{JudgeError, Judgment, JudgmentClient, JudgmentRequest};

const USER_AGENT: &str = concat!("stratagate/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ValidateError::InvalidRequest(format!("cannot build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// HttpJudge
// ---------------------------------------------------------------------------

/// Judgment collaborator reached over HTTP: `POST <url>` with a
/// [`JudgmentRequest`] body, answered by a [`Judgment`] body.
pub struct HttpJudge {
    client: Client,
    url: String,
}

impl HttpJudge {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JudgmentClient for HttpJudge {
    async fn judge(&self, request: &JudgmentRequest) -> std::result::Result<Judgment, JudgeError> {
        debug!(url = %self.url, gate = %request.gate_number, "requesting judgment");
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::Status(status.as_u16()));
        }
        response
            .json::<Judgment>()
            .await
            .map_err(|e| JudgeError::Malformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// HttpPermissionCheck
// ---------------------------------------------------------------------------

/// Permission collaborator reached over HTTP: `POST <url>` with a
/// [`PermissionQuery`] body, answered by `{"decision": "allow"}` or
/// `{"decision": "deny", "reason": "..."}`.
///
/// Any transport, status or decoding failure is reported as
/// `PermissionDecision::Unavailable`.
pub struct HttpPermissionCheck {
    client: Client,
    url: String,
}

impl HttpPermissionCheck {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    async fn ask(
        &self,
        query: &PermissionQuery,
    ) -> std::result::Result<PermissionDecision, String> {
        let response = self
            .client
            .post(&self.url)
            .json(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("permission service responded with HTTP {}", status.as_u16()));
        }
        response
            .json::<PermissionDecision>()
            .await
            .map_err(|e| format!("undecodable permission answer: {e}"))
    }
}

#[async_trait]
impl PermissionCheck for HttpPermissionCheck {
    async fn check(&self, query: &PermissionQuery) -> PermissionDecision {
        match self.ask(query).await {
            Ok(decision) => decision,
            Err(reason) => PermissionDecision::Unavailable { reason },
        }
    }
}

// ---------------------------------------------------------------------------
// NoPermissionService
// ---------------------------------------------------------------------------

/// Stand-in when no permission endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPermissionService;

#[async_trait]
impl PermissionCheck for NoPermissionService {
    async fn check(&self, _query: &PermissionQuery) -> PermissionDecision {
        PermissionDecision::Unavailable {
            reason: "no permission service configured".to_string(),
        }
    }
}
