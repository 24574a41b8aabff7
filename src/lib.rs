//! Renders Pisces meme images, hosts them on ImgBB and publishes them as an
//! Instagram carousel. One run is one sequential attempt.

pub mod clients;
pub mod config;
pub mod content;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod groq;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod render;
pub mod storage;

use crate::{
    clients::create_http_client,
    config::Config,
    content::StaticContentSource,
    domain::{ContentSource, TokioPause},
    errors::AppError,
    graph::GraphClient,
    groq::GroqContentSource,
    models::RunSummary,
    pipeline::{Pipeline, PipelineSettings},
    render::{FONT_SIZE, Face, MemeRenderer},
    storage::ImgbbHost,
};
use tracing::Instrument;

/// Validates configuration from `lookup` and runs the pipeline. Nothing touches
/// the network unless the configuration is complete.
pub async fn run_with_lookup<F>(lookup: F) -> Result<RunSummary, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::from_lookup(lookup)?;
    run(config).await
}

pub async fn run(config: Config) -> Result<RunSummary, AppError> {
    let run_id = uuid::Uuid::new_v4();
    async move {
        tracing::debug!(?config, "Loaded configuration");
        let http = create_http_client(&config)?;

        let fallback = StaticContentSource::pisces();
        let content: Box<dyn ContentSource> = match &config.groq_api_key {
            Some(key) => Box::new(GroqContentSource::new(
                http.clone(),
                config.groq_api_url.clone(),
                key.clone(),
                fallback,
            )),
            None => {
                tracing::warn!("GROQ_API_KEY not found, using fallback memes");
                Box::new(fallback)
            }
        };

        let host = ImgbbHost::new(http.clone(), config.imgbb_upload_url.clone(), config.imgbb_api_key.clone());
        let platform = GraphClient::new(
            http,
            config.graph_api_base_url.clone(),
            config.account_id.clone(),
            config.access_token.clone(),
        );
        let renderer = MemeRenderer::new(Face::load(FONT_SIZE));

        let pipeline = Pipeline {
            content: content.as_ref(),
            renderer: &renderer,
            host: &host,
            platform: &platform,
            pause: &TokioPause,
            settings: PipelineSettings::from_config(&config),
        };
        pipeline.run().await
    }
    .instrument(tracing::info_span!("run", %run_id))
    .await
}
