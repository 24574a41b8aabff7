use pisces_carousel::{config::Config, errors::AppError};
use std::error::Error as _;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pisces_carousel=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present (optional, good for development)
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(".env file loaded from path: {}", path.display()),
        Err(_) => tracing::info!(".env file not found, relying on environment variables"), // Don't error if not found
    };

    match try_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Walk the source chain so the remote payload ends up in the log
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {}", cause));
                source = cause.source();
            }
            tracing::error!(error = %message, "Run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> Result<(), AppError> {
    let config = Config::load().map_err(|e| {
        tracing::error!("Missing or invalid configuration: {}", e);
        e
    })?;

    let summary = pisces_carousel::run(config).await?;
    tracing::info!(
        post_id = %summary.post_id,
        images = summary.image_urls.len(),
        "Successfully posted carousel"
    );
    Ok(())
}
