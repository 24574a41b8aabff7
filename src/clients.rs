use crate::config::Config;
use crate::errors::AppError;
use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// Creates the shared HTTP client used for every remote call in a run.
// One client means one connection pool across the image host, the
// platform and the text generator.
pub fn create_http_client(config: &Config) -> Result<reqwest::Client, AppError> {
    tracing::info!(timeout_secs = config.http_timeout.as_secs(), "Building HTTP client");
    build_client(config.http_timeout)
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::InitError(format!("Failed to build HTTP client: {}", e)))
}

// Reads the body for diagnostics; a body that cannot be read becomes a note
// rather than hiding the status code.
pub(crate) async fn body_text(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {}>", e),
    }
}
