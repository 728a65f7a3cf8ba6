pub const DEFAULT_API_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 0;
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 30;

/// Tools that never need operator confirmation.
pub const DEFAULT_CONFIRMATION_EXEMPT: &[&str] = &["final_answer", "user_input"];
