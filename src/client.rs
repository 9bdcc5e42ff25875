use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    source_code: &'a str,
}

#[derive(Deserialize)]
struct RunResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    ai_fix: Option<String>,
}

/// Failure to get a usable response from the backend at all.
///
/// Errors the backend reports in a well-formed body are not `ClientError`s;
/// they arrive as [`TutorReply::Error`] or a non-accepted [`RunStatus`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the tutor backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("tutor backend returned HTTP {0}")]
    Status(StatusCode),

    #[error("invalid response from the tutor backend: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Answer to an `/ask_tutor` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorReply {
    Answer(String),
    Error(String),
}

/// Outcome classification of a `/run_code` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Accepted,
    TimeLimitExceeded,
    /// "Runtime Error" and anything else the backend reports.
    Other(String),
}

impl RunStatus {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "" => None,
            "Accepted" => Some(RunStatus::Accepted),
            "Time Limit Exceeded" => Some(RunStatus::TimeLimitExceeded),
            other => Some(RunStatus::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Accepted => "Accepted",
            RunStatus::TimeLimitExceeded => "Time Limit Exceeded",
            RunStatus::Other(s) => s,
        }
    }

    /// CSS class of the status badge.
    pub fn badge_class(&self) -> &'static str {
        match self {
            RunStatus::Accepted => "status-accepted",
            RunStatus::TimeLimitExceeded => "status-timeout",
            RunStatus::Other(_) => "status-error",
        }
    }
}

/// Result of executing a program on the backend. Missing output fields are
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub status: Option<RunStatus>,
    pub stdout: String,
    pub stderr: String,
    pub ai_fix: String,
}

impl From<RunResponse> for RunReport {
    fn from(resp: RunResponse) -> Self {
        Self {
            status: resp.status.as_deref().and_then(RunStatus::parse),
            stdout: resp.stdout.unwrap_or_default(),
            stderr: resp.stderr.unwrap_or_default(),
            ai_fix: resp.ai_fix.unwrap_or_default(),
        }
    }
}

impl From<AskResponse> for TutorReply {
    fn from(resp: AskResponse) -> Self {
        match (resp.error, resp.answer) {
            (Some(error), _) if !error.is_empty() => TutorReply::Error(error),
            (_, answer) => TutorReply::Answer(answer.unwrap_or_default()),
        }
    }
}

/// The two operations the tutor backend offers.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn ask_tutor(&self, question: &str) -> Result<TutorReply, ClientError>;
    async fn run_code(&self, source_code: &str) -> Result<RunReport, ClientError>;
}

#[derive(Clone)]
pub struct TutorClient {
    client: Client,
    base_url: String,
}

impl TutorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String, ClientError> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST");

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "tutor backend request failed");
            return Err(ClientError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Backend for TutorClient {
    async fn ask_tutor(&self, question: &str) -> Result<TutorReply, ClientError> {
        let body = self.post("ask_tutor", &AskRequest { question }).await?;
        decode_ask(&body)
    }

    async fn run_code(&self, source_code: &str) -> Result<RunReport, ClientError> {
        let body = self.post("run_code", &RunRequest { source_code }).await?;
        decode_run(&body)
    }
}

fn decode_ask(body: &str) -> Result<TutorReply, ClientError> {
    let resp: AskResponse = serde_json::from_str(body)?;
    Ok(resp.into())
}

fn decode_run(body: &str) -> Result<RunReport, ClientError> {
    let resp: RunResponse = serde_json::from_str(body)?;
    Ok(resp.into())
}
