//! Stream consumer: issues one request per generation and accumulates the
//! generated text as fragments arrive.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::field::Empty;
use tracing_futures::Instrument;

use crate::config::Config;
use crate::error::{CoreResult, RecipeGenError};
use crate::model::FinishReason;
use crate::prompt::build_prompt;
use crate::stream::{FragmentStream, fragment_stream};
use crate::telemetry::{self, GenerationLog};
use crate::transport::{CompletionTransport, HttpTransport};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    format!("gen-{}", NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
}

/// How one generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub request_id: String,
    pub text: String,
    pub fragments: u32,
    pub finish_reason: Option<FinishReason>,
    pub aborted: bool,
}

/// What `accumulate` observed, kept even when it fails.
#[derive(Debug, Default)]
struct RunStats {
    server_request_id: Option<String>,
    fragments: u32,
}

#[derive(Clone)]
pub struct RecipeGenerator {
    transport: Arc<dyn CompletionTransport>,
}

impl RecipeGenerator {
    pub fn new(transport: Arc<dyn CompletionTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::from_config(cfg)?)))
    }

    /// Open one completion stream for `prompt`. Not restartable: call again for a new request.
    pub async fn generate(&self, prompt: &str) -> CoreResult<FragmentStream> {
        let opened = self.transport.open(prompt, None).await?;
        Ok(fragment_stream(opened.chunks))
    }

    /// Run one generation to completion, publishing the growing text on `text`.
    ///
    /// `text` is reset to `""` first and afterwards only ever appended to. On
    /// error or abort, whatever was accumulated stays visible.
    pub async fn run(
        &self,
        prompt: &str,
        request_id: &str,
        text: &watch::Sender<String>,
        cancel: &CancellationToken,
    ) -> CoreResult<GenerationOutcome> {
        let span = tracing::info_span!(
            "recipe.generate",
            req.id = %request_id,
            transport = %self.transport.name(),
            server.req_id = Empty,
            latency.ms = Empty,
            fragments = Empty,
            text.len = Empty,
            finish.reason = Empty,
            aborted = Empty,
            error.kind = Empty,
            error.message = Empty,
        );
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let started = Instant::now();
        text.send_replace(String::new());

        let mut stats = RunStats::default();
        let result = self
            .accumulate(prompt, request_id, text, cancel, &mut stats)
            .instrument(span.clone())
            .await;

        let latency_ms = started.elapsed().as_millis() as u64;
        let final_text = text.borrow().clone();
        let mut log = GenerationLog::new()
            .request_id_opt(Some(request_id))
            .transport(self.transport.name())
            .server_request_id_opt(stats.server_request_id.as_deref())
            .created_at_ms(created_at_ms)
            .latency_ms(latency_ms);

        span.record(telemetry::KEY_LATENCY_MS, latency_ms);
        span.record(telemetry::KEY_TEXT_LEN, final_text.chars().count() as u64);
        if let Some(srid) = stats.server_request_id.as_deref() {
            span.record(telemetry::KEY_SERVER_REQUEST_ID, srid);
        }
        match &result {
            Ok(outcome) => {
                let reason = outcome.finish_reason.map(|r| r.as_str());
                span.record(telemetry::KEY_FRAGMENTS, outcome.fragments);
                span.record(telemetry::KEY_ABORTED, outcome.aborted);
                if let Some(r) = reason {
                    span.record(telemetry::KEY_FINISH_REASON, r);
                }
                log = log
                    .output(outcome.fragments, final_text.chars().count() as u32)
                    .finish_reason_opt(reason)
                    .aborted(outcome.aborted);
                span.in_scope(|| {
                    tracing::info!(
                        fragments = outcome.fragments,
                        aborted = outcome.aborted,
                        "generation finished"
                    )
                });
            }
            Err(e) => {
                let message = e.to_string();
                span.record(telemetry::KEY_FRAGMENTS, stats.fragments);
                span.record(telemetry::KEY_ERROR_KIND, e.kind());
                span.record(telemetry::KEY_ERROR_MESSAGE, message.as_str());
                log = log
                    .output(stats.fragments, final_text.chars().count() as u32)
                    .error(e.kind(), &message);
                span.in_scope(|| tracing::warn!(error = %e, "generation failed"));
            }
        }
        telemetry::emit_generation(log);
        result
    }

    async fn accumulate(
        &self,
        prompt: &str,
        request_id: &str,
        text: &watch::Sender<String>,
        cancel: &CancellationToken,
        stats: &mut RunStats,
    ) -> CoreResult<GenerationOutcome> {
        let mut outcome = GenerationOutcome {
            request_id: request_id.to_string(),
            text: String::new(),
            fragments: 0,
            finish_reason: None,
            aborted: false,
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.aborted = true;
                return Ok(outcome);
            }
            opened = self.transport.open(prompt, Some(request_id)) => opened?,
        };
        stats.server_request_id = opened.server_request_id;

        let mut fragments = fragment_stream(opened.chunks);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.aborted = true;
                    break;
                }
                next = fragments.next() => next,
            };
            match next {
                None => break,
                Some(Ok(fragment)) => {
                    text.send_modify(|t| t.push_str(&fragment.text));
                    outcome.fragments += 1;
                    stats.fragments = outcome.fragments;
                    if fragment.finish_reason.is_some() {
                        outcome.finish_reason = fragment.finish_reason;
                    }
                }
                Some(Err(e)) => return Err(e),
            }
        }
        outcome.text = text.borrow().clone();
        Ok(outcome)
    }

    /// Build the prompt and run the generation on a background task.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start_generation<S: AsRef<str>>(
        &self,
        ingredients: &str,
        utensils: &[S],
    ) -> GenerationHandle {
        let prompt = build_prompt(ingredients, utensils);
        let (text_tx, text_rx) = watch::channel(String::new());
        let (loading_tx, loading_rx) = watch::channel(true);
        let cancel = CancellationToken::new();

        let this = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let _loading = LoadingGuard(loading_tx);
            let request_id = next_request_id();
            this.run(&prompt, &request_id, &text_tx, &task_cancel).await
        });

        GenerationHandle {
            text: text_rx,
            loading: loading_rx,
            cancel,
            task,
        }
    }
}

/// Flips `loading` back to false however the task ends.
struct LoadingGuard(watch::Sender<bool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// Caller's view of a running generation.
pub struct GenerationHandle {
    text: watch::Receiver<String>,
    loading: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: JoinHandle<CoreResult<GenerationOutcome>>,
}

impl GenerationHandle {
    /// Observable generated text; grows monotonically while loading.
    pub fn generated_text(&self) -> watch::Receiver<String> {
        self.text.clone()
    }

    pub fn current_text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Ask the generation to stop at its next suspension point.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub async fn join(self) -> CoreResult<GenerationOutcome> {
        self.task.await.map_err(|e| {
            RecipeGenError::Other(anyhow::anyhow!("generation task failed: {e}"))
        })?
    }
}
