use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.facebook.com/v18.0";
pub const DEFAULT_IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";
pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Instagram accepts between 2 and 10 children per carousel; a single image
/// still goes through the same path and is rejected remotely.
const MAX_MEME_COUNT: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

#[derive(Clone)]
pub struct Config {
    pub access_token: String,
    pub account_id: String,
    pub imgbb_api_key: String,
    // Absent key means the static meme lists are used
    pub groq_api_key: Option<String>,
    pub meme_count: usize,
    pub publish_max_attempts: u32,
    pub publish_retry_base: Duration,
    pub publish_pre_delay: Duration,
    pub image_pause: Duration,
    pub output_dir: PathBuf,
    pub keep_rendered: bool,
    pub graph_api_base_url: String,
    pub imgbb_upload_url: String,
    pub groq_api_url: String,
    pub http_timeout: Duration,
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("imgbb_api_key", &"<redacted>")
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "<redacted>"))
            .field("meme_count", &self.meme_count)
            .field("publish_max_attempts", &self.publish_max_attempts)
            .field("publish_retry_base", &self.publish_retry_base)
            .field("publish_pre_delay", &self.publish_pre_delay)
            .field("image_pause", &self.image_pause)
            .field("output_dir", &self.output_dir)
            .field("keep_rendered", &self.keep_rendered)
            .field("graph_api_base_url", &self.graph_api_base_url)
            .field("imgbb_upload_url", &self.imgbb_upload_url)
            .field("groq_api_url", &self.groq_api_url)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Required credentials are checked first so a missing one is reported
    /// before anything else is parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.into()))
        };

        let access_token = required("INSTAGRAM_ACCESS_TOKEN")?;
        let account_id = required("INSTAGRAM_ACCOUNT_ID")?;
        let imgbb_api_key = required("IMGBB_API_KEY")?;

        let groq_api_key = lookup("GROQ_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let meme_count: usize = parse_or(&lookup, "MEME_COUNT", 5)?;
        if meme_count == 0 || meme_count > MAX_MEME_COUNT {
            return Err(ConfigError::InvalidVar(
                "MEME_COUNT".into(),
                format!("must be between 1 and {}, got {}", MAX_MEME_COUNT, meme_count),
            ));
        }

        let publish_max_attempts: u32 = parse_or(&lookup, "PUBLISH_MAX_ATTEMPTS", 5)?;
        if publish_max_attempts == 0 {
            return Err(ConfigError::InvalidVar(
                "PUBLISH_MAX_ATTEMPTS".into(),
                "must be at least 1".into(),
            ));
        }

        let publish_retry_base = Duration::from_secs(parse_or(&lookup, "PUBLISH_RETRY_BASE_SECS", 10)?);
        let publish_pre_delay = Duration::from_secs(parse_or(&lookup, "PUBLISH_PRE_DELAY_SECS", 5)?);
        let image_pause = Duration::from_millis(parse_or(&lookup, "IMAGE_PAUSE_MILLIS", 1000)?);
        let http_timeout = Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 60)?);
        let keep_rendered: bool = parse_or(&lookup, "KEEP_RENDERED", false)?;

        let output_dir = lookup("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        // Allow overriding endpoints for local mocks/testing
        let graph_api_base_url = lookup("GRAPH_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE_URL.to_string());
        let imgbb_upload_url = lookup("IMGBB_UPLOAD_URL")
            .unwrap_or_else(|| DEFAULT_IMGBB_UPLOAD_URL.to_string());
        let groq_api_url = lookup("GROQ_API_URL")
            .unwrap_or_else(|| DEFAULT_GROQ_API_URL.to_string());

        Ok(Config {
            access_token,
            account_id,
            imgbb_api_key,
            groq_api_key,
            meme_count,
            publish_max_attempts,
            publish_retry_base,
            publish_pre_delay,
            image_pause,
            output_dir,
            keep_rendered,
            graph_api_base_url: graph_api_base_url.trim_end_matches('/').to_string(),
            imgbb_upload_url,
            groq_api_url,
            http_timeout,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidVar(key.into(), e.to_string())),
        _ => Ok(default),
    }
}
