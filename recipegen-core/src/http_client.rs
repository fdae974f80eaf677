use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::HttpCfg;
use crate::error::{CoreResult, RecipeGenError};

/// Request context carries the caller's correlation id.
#[derive(Clone, Copy, Default)]
pub struct RequestCtx<'a> {
    pub request_id: Option<&'a str>,
}

/// A boxed stream of raw body chunks, in arrival order.
pub type ByteStream = futures::stream::BoxStream<'static, CoreResult<bytes::Bytes>>;

/// An accepted streaming response.
pub struct StreamingBody {
    pub chunks: ByteStream,
    /// Correlation id echoed by the server, if any.
    pub server_request_id: Option<String>,
    /// Time to response headers.
    pub latency_ms: u32,
}

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new_default() -> CoreResult<Self> {
        Self::from_cfg(&HttpCfg::default())
    }

    pub fn from_cfg(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms));
        if let Some(n) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(n);
        }
        let inner = builder.build().map_err(|e| {
            RecipeGenError::Other(anyhow::anyhow!("http client build failed: {e}"))
        })?;
        Ok(Self {
            inner,
            user_agent: concat!("recipegen/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }

    /// POST JSON and hand back the response body as a chunk stream.
    ///
    /// A non-success status is answered with `TransportRejected` before any
    /// chunk is read.
    pub async fn post_stream<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        bearer: Option<&SecretString>,
        ctx: &RequestCtx<'_>,
    ) -> CoreResult<StreamingBody> {
        let start = Instant::now();
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/event-stream");

        if let Some(token) = bearer {
            req = req.bearer_auth(token.expose_secret());
        }
        if let Some(rid) = ctx.request_id {
            req = req.header("X-Request-Id", rid);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RecipeGenError::TransportUnavailable {
                reason: e.to_string(),
            })?;

        let latency_ms = start.elapsed().as_millis() as u32;
        let status = resp.status();
        let server_request_id = extract_request_id(resp.headers());

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, &text));
        }

        let chunks = resp
            .bytes_stream()
            .map(|item| {
                item.map_err(|e| RecipeGenError::TransportUnavailable {
                    reason: format!("body read failed: {e}"),
                })
            })
            .boxed();
        Ok(StreamingBody {
            chunks,
            server_request_id,
            latency_ms,
        })
    }
}

fn extract_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    static CANDIDATES: [&str; 4] = [
        "x-request-id",
        "request-id",
        "x-vercel-id",
        "x-amzn-requestid",
    ];
    for k in CANDIDATES {
        if let Some(v) = headers.get(k)
            && let Ok(s) = v.to_str()
        {
            return Some(s.to_string());
        }
    }
    None
}

fn map_http_error(status: StatusCode, body: &str) -> RecipeGenError {
    let message = match status.canonical_reason() {
        Some(reason) if body.trim().is_empty() => reason.to_string(),
        _ => truncate(body, 300),
    };
    RecipeGenError::TransportRejected {
        status: status.as_u16(),
        message,
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut t = s[..cut].to_string();
            t.push_str("...");
            t
        }
        None => s.to_string(),
    }
}
