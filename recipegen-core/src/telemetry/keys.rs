/// Span/log attribute keys for a recipe generation.
/// Keep these stable; dashboards key on them.
pub const KEY_REQUEST_ID: &str = "req.id";
pub const KEY_TRANSPORT: &str = "transport";
pub const KEY_SERVER_REQUEST_ID: &str = "server.req_id";

pub const KEY_LATENCY_MS: &str = "latency.ms";
pub const KEY_FRAGMENTS: &str = "fragments";
pub const KEY_TEXT_LEN: &str = "text.len";
pub const KEY_FINISH_REASON: &str = "finish.reason";
pub const KEY_ABORTED: &str = "aborted";

pub const KEY_ERROR_KIND: &str = "error.kind";
pub const KEY_ERROR_MESSAGE: &str = "error.message";
