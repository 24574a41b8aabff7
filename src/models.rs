use serde::{Deserialize, Serialize};
use std::fmt;

/// Short meme text: one to three newline-separated lines.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct MemeText(String);

impl MemeText {
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.split('\n')
    }
}

impl TryFrom<String> for MemeText {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MemeText::new(value).ok_or_else(|| "meme text cannot be empty".to_string())
    }
}

impl From<MemeText> for String {
    fn from(value: MemeText) -> Self {
        value.0
    }
}

impl fmt::Display for MemeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Post description, hashtags included.
    Caption
);
opaque_id!(
    /// Publicly reachable URL returned by the image host.
    HostedImageUrl
);
opaque_id!(MediaContainerId);
opaque_id!(CarouselContainerId);
opaque_id!(
    /// Identifier of the live post.
    PostId
);

/// What a content source hands to the pipeline.
#[derive(Debug, Clone)]
pub struct MemeBatch {
    pub memes: Vec<MemeText>,
    pub caption: Caption,
}

/// Outcome of a completed run.
#[derive(Serialize, Debug, Clone)]
pub struct RunSummary {
    pub post_id: PostId,
    pub image_urls: Vec<HostedImageUrl>,
    pub container_ids: Vec<MediaContainerId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_meme_text_is_rejected() {
        assert!(MemeText::new("").is_none());
        assert!(MemeText::new(" \n ").is_none());
    }

    #[test]
    fn meme_text_keeps_its_lines() {
        let meme = MemeText::new("Pisces: cries in the shower\nso no one can tell").unwrap();
        let lines: Vec<&str> = meme.lines().collect();
        assert_eq!(lines, vec!["Pisces: cries in the shower", "so no one can tell"]);
    }

    #[test]
    fn meme_text_deserialization_rejects_empty() {
        let parsed: Result<MemeText, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }
}
