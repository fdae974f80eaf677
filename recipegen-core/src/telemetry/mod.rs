//! Telemetry for recipe generations.
//! By default nothing is emitted unless a sink is installed via `set_telemetry_sink`.

pub mod keys;
pub mod types;
#[cfg(test)]
pub mod test_span;

pub use keys::*;
pub use types::*;

use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Implement this to receive one `GenerationLog` per finished generation.
///
/// Implementations must be thread-safe; `record_generation` may be called from
/// any tokio worker.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record_generation(&self, log: GenerationLog);
}

static TELEMETRY_SINK: OnceCell<Arc<dyn TelemetrySink>> = OnceCell::new();

// In tests, gate emission to the calling test thread. `#[tokio::test]` runs
// spawned tasks on that same thread.
#[cfg(test)]
thread_local! {
    static TEST_CAPTURE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Install a global telemetry sink. Returns `false` if a sink is already installed.
pub fn set_telemetry_sink(sink: Arc<dyn TelemetrySink>) -> bool {
    TELEMETRY_SINK.set(sink).is_ok()
}

#[inline]
pub(crate) fn emit_generation(log: GenerationLog) {
    #[cfg(test)]
    {
        if !TEST_CAPTURE.with(|c| c.get()) {
            return;
        }
    }
    if let Some(sink) = TELEMETRY_SINK.get() {
        sink.record_generation(log);
    }
}

#[cfg(test)]
/// Test-only helper: enable or disable capture for the current test thread.
pub fn test_set_capture_enabled(enabled: bool) {
    TEST_CAPTURE.with(|c| c.set(enabled));
}
