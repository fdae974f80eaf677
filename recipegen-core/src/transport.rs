use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use secrecy::SecretString;

use crate::config::Config;
use crate::error::CoreResult;
use crate::http_client::{ByteStream, HttpClient, RequestCtx};
use crate::model::GenerateRequest;

/// An opened completion stream.
pub struct OpenedStream {
    pub chunks: ByteStream,
    pub server_request_id: Option<String>,
}

/// Something that accepts a prompt and answers with a chunked body.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    fn name(&self) -> &str;
    /// Issue exactly one request. A rejected request must fail here, before any chunk.
    async fn open(&self, prompt: &str, request_id: Option<&str>) -> CoreResult<OpenedStream>;
}

/// Streams completions from the HTTP generate endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    url: String,
    api_key: Option<SecretString>,
}

impl HttpTransport {
    pub fn new(http: HttpClient, url: String, api_key: Option<SecretString>) -> Self {
        Self { http, url, api_key }
    }

    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        cfg.validate()?;
        let http = HttpClient::from_cfg(&cfg.http)?;
        Ok(Self::new(http, cfg.endpoint.url(), cfg.endpoint.api_key()?))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, prompt: &str, request_id: Option<&str>) -> CoreResult<OpenedStream> {
        let body = GenerateRequest {
            prompt: prompt.to_string(),
        };
        let ctx = RequestCtx { request_id };
        let resp = self
            .http
            .post_stream(&self.url, &body, self.api_key.as_ref(), &ctx)
            .await?;
        tracing::debug!(
            url = %self.url,
            latency_ms = resp.latency_ms,
            server_request_id = resp.server_request_id.as_deref().unwrap_or(""),
            "completion stream opened"
        );
        Ok(OpenedStream {
            chunks: resp.chunks,
            server_request_id: resp.server_request_id,
        })
    }
}

/// Replays a fixed list of chunks. Useful for tests and for re-running a
/// captured response body offline.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    chunks: Vec<Bytes>,
}

impl ScriptedTransport {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Cut one captured body into fixed-size chunks (the last may be shorter).
    pub fn split_every(body: &[u8], chunk_size: usize) -> Self {
        let size = chunk_size.max(1);
        Self::new(body.chunks(size).map(Bytes::copy_from_slice))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self, _prompt: &str, _request_id: Option<&str>) -> CoreResult<OpenedStream> {
        let chunks = futures::stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed();
        Ok(OpenedStream {
            chunks,
            server_request_id: None,
        })
    }
}
