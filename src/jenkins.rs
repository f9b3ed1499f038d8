// src/jenkins.rs
use log::{debug, info};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::config::JenkinsSettings;

#[derive(Debug, thiserror::Error)]
pub enum JenkinsError {
    #[error("invalid jenkins base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: StatusCode, url: String },
}

/// A job as listed on the Jenkins root API.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSummary {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// What `GET {base}/api/json` tells us about the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsInfo {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub node_description: Option<String>,
    #[serde(default)]
    pub num_executors: u32,
    #[serde(default)]
    pub jobs: Vec<JobSummary>,
    /// Taken from the `X-Jenkins` response header.
    #[serde(skip)]
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JenkinsClient {
    http: Client,
    base_url: Url,
    username: Option<String>,
    api_token: Option<String>,
}

impl JenkinsClient {
    /// Build the client. No request is sent until `init`.
    pub fn new(settings: &JenkinsSettings) -> Result<Self, JenkinsError> {
        // Url::join drops the last path segment unless the base ends with '/'
        let raw = if settings.base_url.ends_with('/') {
            settings.base_url.clone()
        } else {
            format!("{}/", settings.base_url)
        };
        let base_url = Url::parse(&raw).map_err(|e| JenkinsError::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            username: settings.username.clone(),
            api_token: settings.api_token.clone(),
        })
    }

    /// Build the client and verify the server answers.
    pub async fn connect(settings: &JenkinsSettings) -> Result<Self, JenkinsError> {
        let client = Self::new(settings)?;
        let info = client.init().await?;
        info!(
            "Connected to Jenkins {} at {} ({} jobs)",
            info.version.as_deref().unwrap_or("unknown"),
            client.base_url,
            info.jobs.len()
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Poll the root API once. Any transport error or non-success status is an error.
    pub async fn init(&self) -> Result<JenkinsInfo, JenkinsError> {
        let url = self
            .base_url
            .join("api/json")
            .map_err(|e| JenkinsError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Polling Jenkins root API at {}", url);

        let mut request = self.http.get(url.clone());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.api_token.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(JenkinsError::Status {
                status,
                url: url.to_string(),
            });
        }

        let version = response
            .headers()
            .get("X-Jenkins")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut info: JenkinsInfo = response.json().await?;
        info.version = version;
        Ok(info)
    }
}
