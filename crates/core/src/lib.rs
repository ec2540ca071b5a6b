pub mod classify;
pub mod domain;
pub mod present;
pub mod service;
pub mod storage;
pub mod workflow;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_BUSINESS_ID: u64 = 1;
    const DEFAULT_ANALYSIS_LANG: &str = "en";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
    const DEFAULT_SESSION_DIR_NAME: &str = "fhat-session";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base_url: Option<String>,
        pub business_id: u64,
        pub analysis_lang: String,
        pub http_timeout_secs: u64,
        pub session_dir: PathBuf,
        /// True when `FHAT_SESSION_DIR` names the session. Otherwise the
        /// directory is fresh for this process and removed when it ends.
        pub resume_session: bool,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let business_id = match std::env::var("FHAT_BUSINESS_ID") {
                Ok(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("FHAT_BUSINESS_ID must be an integer (got {raw:?})"))?,
                Err(_) => DEFAULT_BUSINESS_ID,
            };

            let (session_dir, resume_session) =
                session_dir_from(std::env::var("FHAT_SESSION_DIR").ok());

            Ok(Self {
                api_base_url: std::env::var("FHAT_API_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                business_id,
                analysis_lang: std::env::var("FHAT_ANALYSIS_LANG")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ANALYSIS_LANG.to_string()),
                http_timeout_secs: std::env::var("FHAT_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
                session_dir,
                resume_session,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_api_base_url(&self) -> anyhow::Result<&str> {
            self.api_base_url
                .as_deref()
                .context("FHAT_API_BASE_URL is required")
        }
    }

    /// An explicit directory resumes that session; otherwise each boot gets
    /// its own directory, so a new process never sees an older result.
    pub fn session_dir_from(explicit: Option<String>) -> (PathBuf, bool) {
        match explicit.filter(|s| !s.trim().is_empty()) {
            Some(dir) => (PathBuf::from(dir), true),
            None => {
                let boot = uuid::Uuid::new_v4();
                let dir = std::env::temp_dir()
                    .join(DEFAULT_SESSION_DIR_NAME)
                    .join(boot.to_string());
                (dir, false)
            }
        }
    }

}
