use crate::{
    clients::body_text,
    domain::ImageHost,
    errors::UploadError,
    models::HostedImageUrl,
};
use anyhow::Context;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use std::path::Path;

/// ImgBB upload client.
#[derive(Clone)]
pub struct ImgbbHost {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
}

impl std::fmt::Debug for ImgbbHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgbbHost").field("upload_url", &self.upload_url).finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
}

impl ImgbbHost {
    pub fn new(client: reqwest::Client, upload_url: String, api_key: String) -> Self {
        Self { client, upload_url, api_key }
    }
}

#[async_trait]
impl ImageHost for ImgbbHost {
    /// Uploads the file as a base64 form field. No retry at this layer.
    async fn upload(&self, path: &Path) -> Result<HostedImageUrl, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Read { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "ImgBB: Uploading file");

        let encoded = STANDARD.encode(&bytes);
        let response = self
            .client
            .post(&self.upload_url)
            .form(&[("key", self.api_key.as_str()), ("image", encoded.as_str())])
            .send()
            .await
            .context(format!("ImgBB: Failed to upload '{}'", path.display()))?;

        let status = response.status();
        let body = body_text(response).await;
        if status != reqwest::StatusCode::OK {
            tracing::error!(status = status.as_u16(), body = %body, "ImgBB: Upload rejected");
            return Err(UploadError::Rejected { status: status.as_u16(), body });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::MalformedResponse(format!("{}: {}", e, body)))?;

        tracing::info!(url = %parsed.data.url, "ImgBB: Upload successful");
        Ok(HostedImageUrl::new(parsed.data.url))
    }
}
