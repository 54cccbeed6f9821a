/// Default configuration constants used across the system.

/// Default backend REST base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Default prefix of the WhatsApp session routes.
pub const DEFAULT_WHATSAPP_PREFIX: &str = "/whatsapp";

/// Path of the realtime channel when the URL is derived from the base URL.
pub const DEFAULT_REALTIME_PATH: &str = "/ws";

/// Default per-request timeout (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default status poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default chat history poll interval.
pub const DEFAULT_HISTORY_POLL_INTERVAL_MS: u64 = 3_000;

/// File name of the persisted session token inside the state directory.
pub const TOKEN_FILE_NAME: &str = "token";
