use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};

use crate::agents::types::AgentConfig;
use crate::backend::types::{AgentUpdate, BackendAck, BackendResponse, ConfigBackend, FileUpload};
use crate::config::schema::BackendConfig;
use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// [`ConfigBackend`] speaking the procurement backend's JSON API.
#[derive(Clone)]
pub struct HttpConfigBackend {
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpConfigBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfigBackend")
            .field("base_url", &self.base_url)
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

impl HttpConfigBackend {
    /// Every request carries the configured extra headers; a zero
    /// `timeout_ms` means the 30 second default.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let timeout = match config.timeout_ms {
            0 => DEFAULT_TIMEOUT,
            millis => Duration::from_millis(millis),
        };
        let client = reqwest::Client::builder()
            .default_headers(default_headers(&config.extra_headers)?)
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build backend client: {err}")))?;

        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn agent_endpoint(&self, agent_id: &str, suffix: &str) -> String {
        format!(
            "{}/api/agents/{}/{suffix}",
            self.base_url,
            utf8_percent_encode(agent_id, PATH_SEGMENT)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    async fn send_json(&self, builder: RequestBuilder, operation: &str) -> Result<Value> {
        let response = builder
            .send()
            .await
            .map_err(|err| Error::Connectivity(format!("{operation} failed: {err}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            Error::Connectivity(format!("{operation} response could not be read: {err}"))
        })?;

        tracing::debug!(operation, %status, bytes = body.len(), "backend response");

        serde_json::from_str(&body).map_err(|err| {
            Error::Connectivity(format!(
                "{operation} returned a non-JSON body (status {status}): {err}"
            ))
        })
    }

    async fn send_for_response(
        &self,
        builder: RequestBuilder,
        operation: &str,
    ) -> Result<BackendResponse> {
        let value = self.send_json(builder, operation).await?;
        serde_json::from_value(value).map_err(|err| {
            Error::Remote(format!("{operation} returned an unexpected payload: {err}"))
        })
    }
}

fn default_headers(extra_headers: &[(String, String)]) -> Result<HeaderMap> {
    extra_headers
        .iter()
        .map(|(name, value)| {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                Error::Config(format!("invalid backend header name '{name}': {err}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                Error::Config(format!("invalid backend header value for '{name}': {err}"))
            })?;
            Ok((header_name, header_value))
        })
        .collect()
}

#[async_trait]
impl ConfigBackend for HttpConfigBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_config(&self, agent_id: &str) -> Result<AgentConfig> {
        let url = self.agent_endpoint(agent_id, "config");
        tracing::debug!(agent_id, %url, "fetching agent configuration");

        let value = self
            .send_json(self.request(Method::GET, &url), "fetch configuration")
            .await?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(Error::Remote(error.to_owned()));
        }

        let mut config: AgentConfig = serde_json::from_value(value).map_err(|err| {
            Error::Remote(format!("unexpected configuration payload: {err}"))
        })?;
        if config.id.trim().is_empty() {
            config.id = agent_id.to_owned();
        }
        Ok(config)
    }

    async fn upload_file(
        &self,
        agent_id: &str,
        upload: &FileUpload,
        display_name: &str,
    ) -> Result<BackendAck> {
        let url = self.agent_endpoint(agent_id, "upload-file");
        let part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        let form = Form::new()
            .part("file", part)
            .text("name", display_name.to_owned());

        tracing::debug!(agent_id, file = %upload.file_name, bytes = upload.size(), "uploading knowledge file");

        self.send_for_response(
            self.request(Method::POST, &url).multipart(form),
            "upload file",
        )
        .await?
        .into_ack()
    }

    async fn add_url(&self, agent_id: &str, name: &str, url: &str) -> Result<BackendAck> {
        let endpoint = self.agent_endpoint(agent_id, "add-url");
        let payload = json!({ "name": name, "url": url });

        self.send_for_response(
            self.request(Method::POST, &endpoint).json(&payload),
            "add url",
        )
        .await?
        .into_ack()
    }

    async fn remove_knowledge(&self, agent_id: &str, source_id: &str) -> Result<()> {
        let url = self.agent_endpoint(
            agent_id,
            &format!(
                "knowledge/{}",
                utf8_percent_encode(source_id, PATH_SEGMENT)
            ),
        );

        self.send_for_response(self.request(Method::DELETE, &url), "remove knowledge")
            .await?
            .check_error()
    }

    async fn refresh_url(&self, url: &str) -> Result<()> {
        let endpoint = format!("{}/api/knowledge/refresh-url", self.base_url);
        let payload = json!({ "url": url });

        self.send_for_response(
            self.request(Method::POST, &endpoint).json(&payload),
            "refresh url",
        )
        .await?
        .check_error()
    }

    async fn update(&self, agent_id: &str, update: &AgentUpdate) -> Result<()> {
        let url = self.agent_endpoint(agent_id, "update");

        self.send_for_response(self.request(Method::POST, &url).json(update), "update agent")
            .await?
            .into_ack()
            .map(|_| ())
    }
}
