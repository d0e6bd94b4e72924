//! HTTP client for the coffee-expert and roast-analysis endpoints.

use crate::analysis::AnalysisResult;
use crate::config::{Config, ConfigError};
use crate::conversation::{ChatReply, ChatRequest};
use crate::error::TransportError;
use crate::upload::SelectedFile;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use std::future::Future;
use tracing::{debug, warn};

/// Remote side of the app. Implemented over HTTP in production and by
/// in-memory fakes in tests.
pub trait CoffeeApi: Send + Sync + 'static {
    /// Ask the coffee expert a question.
    fn ask(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send;

    /// Upload an image for roast analysis.
    fn analyze(
        &self,
        file: &SelectedFile,
    ) -> impl Future<Output = Result<AnalysisResult, TransportError>> + Send;
}

/// [`CoffeeApi`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    chat_url: Url,
    analysis_url: Url,
}

impl HttpClient {
    /// Build a client for the endpoints in `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("cafe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::Client)?;
        Ok(Self {
            client,
            chat_url: config.chat_url()?,
            analysis_url: config.analysis_url()?,
        })
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    pub fn analysis_url(&self) -> &Url {
        &self.analysis_url
    }
}

/// Turn a non-2xx response into [`TransportError::Status`], keeping the body for the log.
async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %body, "request failed");
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

impl CoffeeApi for HttpClient {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        debug!(url = %self.chat_url, session = %request.session_id, "asking coffee expert");
        let response = self
            .client
            .post(self.chat_url.clone())
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;
        let body = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn analyze(&self, file: &SelectedFile) -> Result<AnalysisResult, TransportError> {
        debug!(
            url = %self.analysis_url,
            name = %file.name,
            bytes = file.bytes.len(),
            "uploading image for analysis"
        );
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(self.analysis_url.clone())
            .multipart(form)
            .send()
            .await?;
        let body = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
