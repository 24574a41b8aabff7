use std::path::PathBuf;
use thiserror::Error; // Use thiserror for cleaner error definitions

// --- Remote payloads ---

/// Error object returned by the Graph API, kept alongside the raw body so
/// failures can be debugged by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphApiError {
    pub status: u16,
    pub code: Option<i64>,
    pub subcode: Option<i64>,
    pub message: String,
    pub raw: String,
}

impl std::fmt::Display for GraphApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = self.code {
            write!(f, ", code {}", code)?;
        }
        if let Some(subcode) = self.subcode {
            write!(f, ", subcode {}", subcode)?;
        }
        write!(f, ": {} (body: {})", self.message, self.raw)
    }
}

impl std::error::Error for GraphApiError {}

// --- Stage errors ---

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Could not prepare output directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write image to {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Could not read rendered image {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image host rejected upload (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Image host returned an unexpected body: {0}")]
    MalformedResponse(String),

    #[error("Image host request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Platform rejected media container: {0}")]
    Rejected(GraphApiError),

    #[error("Media container request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum CarouselError {
    #[error("A carousel needs at least one child container")]
    NoChildren,

    #[error("Platform rejected carousel container: {0}")]
    Rejected(GraphApiError),

    #[error("Carousel container request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Media still processing after {attempts} publish attempts: {last}")]
    NotReady { attempts: u32, last: GraphApiError },

    #[error("Platform rejected publish request: {0}")]
    Rejected(GraphApiError),

    #[error("Publish request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Text generation rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Text generation returned no usable content")]
    EmptyCompletion,

    #[error("Text generation request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

// --- Run level error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("No content available")]
    Content(#[from] ContentError),

    #[error("Failed to render meme {index}")]
    Render {
        index: usize,
        #[source]
        source: RenderError,
    },

    #[error("Failed to upload image {index}")]
    Upload {
        index: usize,
        #[source]
        source: UploadError,
    },

    #[error("Failed to create container for image {index}")]
    Container {
        index: usize,
        #[source]
        source: ContainerError,
    },

    #[error("Failed to create carousel container")]
    Carousel(#[from] CarouselError),

    #[error("Failed to publish carousel")]
    Publish(#[from] PublishError),
}
