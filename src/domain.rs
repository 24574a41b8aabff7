use crate::errors::{CarouselError, ContainerError, ContentError, UploadError};
use crate::models::{
    Caption, CarouselContainerId, HostedImageUrl, MediaContainerId, MemeBatch,
};
use crate::graph::GraphResponse;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Supplies the meme texts and caption for one run.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Produces up to `count` memes plus one caption.
    async fn produce(&self, count: usize) -> Result<MemeBatch, ContentError>;
}

/// Trait defining the image hosting backend (rendered PNG -> public URL).
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<HostedImageUrl, UploadError>;
}

/// Operations against the publishing platform for one account.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Registers one hosted image as a pending media container.
    async fn create_media_container(
        &self,
        image_url: &HostedImageUrl,
        is_carousel_item: bool,
    ) -> Result<MediaContainerId, ContainerError>;

    /// Groups child containers, in order, into a single carousel container.
    async fn create_carousel_container(
        &self,
        children: &[MediaContainerId],
        caption: &Caption,
    ) -> Result<CarouselContainerId, CarouselError>;

    /// Issues one publish request. The tagged response is returned as-is so
    /// the caller decides what is retryable; only transport failures are `Err`.
    async fn publish(&self, creation_id: &CarouselContainerId) -> anyhow::Result<GraphResponse>;
}

/// Suspension point used between images and between publish attempts.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
