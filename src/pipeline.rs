use crate::{
    config::Config,
    domain::{ContentSource, ImageHost, MediaPlatform, Pause},
    errors::AppError,
    models::{HostedImageUrl, MediaContainerId, MemeText, RunSummary},
    publisher::{PublishPolicy, Publisher},
    render::MemeRenderer,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub meme_count: usize,
    pub output_dir: PathBuf,
    /// Pause between consecutive images, for the image host's rate limits.
    pub image_pause: Duration,
    pub keep_rendered: bool,
    pub publish: PublishPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            meme_count: config.meme_count,
            output_dir: config.output_dir.clone(),
            image_pause: config.image_pause,
            keep_rendered: config.keep_rendered,
            publish: PublishPolicy {
                max_attempts: config.publish_max_attempts,
                retry_base: config.publish_retry_base,
                pre_delay: config.publish_pre_delay,
            },
        }
    }
}

/// One run: content, then render/upload/register per image in order, then
/// carousel and publish. The first failure aborts; remote containers that
/// were already created are left as they are.
pub struct Pipeline<'a> {
    pub content: &'a dyn ContentSource,
    pub renderer: &'a MemeRenderer,
    pub host: &'a dyn ImageHost,
    pub platform: &'a dyn MediaPlatform,
    pub pause: &'a dyn Pause,
    pub settings: PipelineSettings,
}

impl Pipeline<'_> {
    pub async fn run(&self) -> Result<RunSummary, AppError> {
        tracing::info!(count = self.settings.meme_count, "Generating memes");
        let batch = self.content.produce(self.settings.meme_count).await?;
        let total = batch.memes.len();

        let mut image_urls: Vec<HostedImageUrl> = Vec::with_capacity(total);
        let mut container_ids: Vec<MediaContainerId> = Vec::with_capacity(total);

        for (offset, meme) in batch.memes.iter().enumerate() {
            let index = offset + 1;
            let (url, container_id) = self
                .process_image(index, meme)
                .instrument(tracing::info_span!("meme", image_index = index, total))
                .await?;
            image_urls.push(url);
            container_ids.push(container_id);

            if index < total {
                self.pause.pause(self.settings.image_pause).await;
            }
        }

        tracing::info!(images = container_ids.len(), "Creating carousel");
        let carousel_id = self
            .platform
            .create_carousel_container(&container_ids, &batch.caption)
            .await?;

        tracing::info!(carousel_id = %carousel_id, "Publishing carousel");
        let publisher = Publisher::new(self.platform, self.pause, self.settings.publish.clone());
        let post_id = publisher.publish(&carousel_id).await?;

        Ok(RunSummary { post_id, image_urls, container_ids })
    }

    /// Render, upload and register one meme.
    async fn process_image(
        &self,
        index: usize,
        meme: &MemeText,
    ) -> Result<(HostedImageUrl, MediaContainerId), AppError> {
        tracing::info!(text = %meme.as_str().replace('\n', " / "), "Processing meme");

        let path = self.settings.output_dir.join(format!("meme_{}.png", index));
        self.renderer
            .render_to(meme, &path)
            .map_err(|source| AppError::Render { index, source })?;

        tracing::info!("Uploading image");
        let url = self
            .host
            .upload(&path)
            .await
            .map_err(|source| AppError::Upload { index, source })?;

        if !self.settings.keep_rendered {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove rendered image");
            }
        }

        tracing::info!("Creating media container");
        let container_id = self
            .platform
            .create_media_container(&url, true)
            .await
            .map_err(|source| AppError::Container { index, source })?;

        Ok((url, container_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CarouselError, ContainerError, ContentError, UploadError};
    use crate::graph::GraphResponse;
    use crate::models::{Caption, CarouselContainerId, MemeBatch};
    use crate::render::{FONT_SIZE, Face};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedContent(Vec<&'static str>);

    #[async_trait]
    impl ContentSource for FixedContent {
        async fn produce(&self, count: usize) -> Result<MemeBatch, ContentError> {
            Ok(MemeBatch {
                memes: self.0.iter().take(count).filter_map(|m| MemeText::new(*m)).collect(),
                caption: Caption::new("pisces energy 💙 #zodiac"),
            })
        }
    }

    /// Hands out sequential URLs; fails on the configured upload number.
    #[derive(Default)]
    struct FakeHost {
        uploads: Mutex<Vec<PathBuf>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl ImageHost for FakeHost {
        async fn upload(&self, path: &Path) -> Result<HostedImageUrl, UploadError> {
            assert!(path.exists(), "rendered file must exist before upload");
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(path.to_path_buf());
            if Some(uploads.len()) == self.fail_on {
                return Err(UploadError::Rejected { status: 400, body: "Invalid API v1 key.".into() });
            }
            Ok(HostedImageUrl::new(format!("https://i.ibb.co/{}.png", uploads.len())))
        }
    }

    #[derive(Default)]
    struct FakePlatform {
        containers: Mutex<Vec<String>>,
        carousels: Mutex<Vec<Vec<String>>>,
        publishes: Mutex<u32>,
    }

    #[async_trait]
    impl MediaPlatform for FakePlatform {
        async fn create_media_container(
            &self,
            image_url: &HostedImageUrl,
            is_carousel_item: bool,
        ) -> Result<MediaContainerId, ContainerError> {
            assert!(is_carousel_item);
            let mut containers = self.containers.lock().unwrap();
            containers.push(image_url.to_string());
            Ok(MediaContainerId::new(format!("c{}", containers.len())))
        }

        async fn create_carousel_container(
            &self,
            children: &[MediaContainerId],
            _caption: &Caption,
        ) -> Result<CarouselContainerId, CarouselError> {
            self.carousels
                .lock()
                .unwrap()
                .push(children.iter().map(|c| c.to_string()).collect());
            Ok(CarouselContainerId::new("carousel"))
        }

        async fn publish(&self, _creation_id: &CarouselContainerId) -> anyhow::Result<GraphResponse> {
            *self.publishes.lock().unwrap() += 1;
            Ok(GraphResponse::Id("post-1".into()))
        }
    }

    #[derive(Default)]
    struct RecordingPause(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Pause for RecordingPause {
        async fn pause(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    fn settings(dir: &TempDir, count: usize) -> PipelineSettings {
        PipelineSettings {
            meme_count: count,
            output_dir: dir.path().to_path_buf(),
            image_pause: Duration::from_secs(1),
            keep_rendered: false,
            publish: PublishPolicy {
                max_attempts: 3,
                retry_base: Duration::from_secs(10),
                pre_delay: Duration::from_secs(5),
            },
        }
    }

    const MEMES: [&str; 3] = [
        "Pisces processing emotions\nat 3am",
        "Pisces: the CEO of escapism",
        "Pisces pretending they\ndon't care\n(they care so much)",
    ];

    #[tokio::test]
    async fn preserves_order_through_every_stage() {
        let dir = TempDir::new().unwrap();
        let renderer = MemeRenderer::new(Face::builtin(FONT_SIZE));
        let content = FixedContent(MEMES.to_vec());
        let host = FakeHost::default();
        let platform = FakePlatform::default();
        let pause = RecordingPause::default();

        let pipeline = Pipeline {
            content: &content,
            renderer: &renderer,
            host: &host,
            platform: &platform,
            pause: &pause,
            settings: settings(&dir, 3),
        };
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.post_id.as_str(), "post-1");
        let uploads = host.uploads.lock().unwrap().clone();
        assert_eq!(
            uploads,
            (1..=3).map(|i| dir.path().join(format!("meme_{}.png", i))).collect::<Vec<_>>()
        );
        assert_eq!(
            *platform.containers.lock().unwrap(),
            vec!["https://i.ibb.co/1.png", "https://i.ibb.co/2.png", "https://i.ibb.co/3.png"]
        );
        assert_eq!(*platform.carousels.lock().unwrap(), vec![vec!["c1", "c2", "c3"]]);

        // two between-image pauses, then the pre-publish delay
        assert_eq!(
            *pause.0.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(5)]
        );
        // rendered files are ephemeral
        assert!(uploads.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn upload_failure_aborts_remaining_work() {
        let dir = TempDir::new().unwrap();
        let renderer = MemeRenderer::new(Face::builtin(FONT_SIZE));
        let content = FixedContent(MEMES.to_vec());
        let host = FakeHost { fail_on: Some(2), ..Default::default() };
        let platform = FakePlatform::default();
        let pause = RecordingPause::default();

        let pipeline = Pipeline {
            content: &content,
            renderer: &renderer,
            host: &host,
            platform: &platform,
            pause: &pause,
            settings: settings(&dir, 3),
        };
        let result = pipeline.run().await;

        assert!(matches!(result, Err(AppError::Upload { index: 2, .. })));
        assert_eq!(host.uploads.lock().unwrap().len(), 2);
        assert_eq!(platform.containers.lock().unwrap().len(), 1);
        assert!(platform.carousels.lock().unwrap().is_empty());
        assert_eq!(*platform.publishes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn keeps_rendered_files_when_asked() {
        let dir = TempDir::new().unwrap();
        let renderer = MemeRenderer::new(Face::builtin(FONT_SIZE));
        let content = FixedContent(MEMES.to_vec());
        let host = FakeHost::default();
        let platform = FakePlatform::default();
        let pause = RecordingPause::default();

        let pipeline = Pipeline {
            content: &content,
            renderer: &renderer,
            host: &host,
            platform: &platform,
            pause: &pause,
            settings: PipelineSettings { keep_rendered: true, ..settings(&dir, 2) },
        };
        pipeline.run().await.unwrap();

        assert!(dir.path().join("meme_1.png").exists());
        assert!(dir.path().join("meme_2.png").exists());
        assert!(!dir.path().join("meme_3.png").exists());
    }
}
