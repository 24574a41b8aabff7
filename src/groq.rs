//! Meme and caption generation through Groq's OpenAI-compatible chat API.
//!
//! Any failure here degrades to the static lists; text generation never
//! aborts a run.

use crate::{
    clients::body_text,
    content::StaticContentSource,
    domain::ContentSource,
    errors::ContentError,
    models::{Caption, MemeBatch, MemeText},
};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

const CAPTION_PROMPT: &str = r#"Generate a short, engaging Instagram caption for a Pisces zodiac meme carousel post.
Requirements:
- Keep it under 100 characters
- Use 2-3 relevant emojis (pisces ♓️, fish 🐟, water 💙, etc)
- Include 3-5 hashtags: #pisces #zodiac #astrology and similar
- Make it relatable and funny
- Examples: "why am I like this 😭 #pisces #zodiac #memes" or "pisces energy today ♓️💙 #astrology #relatable"

Generate ONE caption:"#;

fn meme_prompt(count: usize) -> String {
    format!(
        "Generate {count} funny, relatable Pisces zodiac meme texts. Each should be:
- 1-3 short lines (max 10 words per line)
- About Pisces personality traits (emotional, daydreaming, avoidant, sensitive, intuitive, etc)
- Humorous and self-deprecating
- Format: exactly one meme per line, separated by blank lines
- No numbering, no bullets, just the text

Examples:
Pisces: cries in the shower
so no one can tell

Pisces avoiding confrontation
like it's their job

POV: Pisces just felt
a vibe shift

Now generate {count} NEW unique Pisces memes:"
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Splits a completion into memes on blank lines and strips a leading
/// "1. " style number when it appears within the first five characters.
pub fn parse_memes(completion: &str) -> Vec<MemeText> {
    completion
        .trim()
        .split("\n\n")
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| {
            let head: String = m.chars().take(5).collect();
            if head.contains(". ") {
                m.split_once(". ").map(|(_, rest)| rest).unwrap_or(m)
            } else {
                m
            }
        })
        .filter_map(MemeText::new)
        .collect()
}

pub fn clean_caption(completion: &str) -> Option<Caption> {
    let caption = completion.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    if caption.is_empty() {
        None
    } else {
        Some(Caption::new(caption))
    }
}

pub struct GroqContentSource {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    fallback: StaticContentSource,
}

impl GroqContentSource {
    pub fn new(client: reqwest::Client, url: String, api_key: String, fallback: StaticContentSource) -> Self {
        Self { client, url, api_key, model: DEFAULT_MODEL.to_string(), fallback }
    }

    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, ContentError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Groq: chat completion request failed")?;

        let status = response.status();
        let body = body_text(response).await;
        if !status.is_success() {
            return Err(ContentError::Rejected { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .context("Groq: unexpected chat completion body")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ContentError::EmptyCompletion)
    }

    async fn generate(&self, count: usize) -> Result<MemeBatch, ContentError> {
        let completion = self.complete(&meme_prompt(count), 1.0, 500).await?;
        let mut memes = parse_memes(&completion);
        if memes.is_empty() {
            return Err(ContentError::EmptyCompletion);
        }
        if memes.len() < count {
            memes.extend(self.fallback.sample_memes(count - memes.len()));
        }
        memes.truncate(count);
        tracing::info!(memes = memes.len(), "Generated fresh AI memes");

        let completion = self.complete(CAPTION_PROMPT, 1.2, 100).await?;
        let caption = clean_caption(&completion).ok_or(ContentError::EmptyCompletion)?;
        tracing::info!(caption = %caption, "Generated caption");

        Ok(MemeBatch { memes, caption })
    }
}

#[async_trait]
impl ContentSource for GroqContentSource {
    async fn produce(&self, count: usize) -> Result<MemeBatch, ContentError> {
        match self.generate(count).await {
            Ok(batch) => Ok(batch),
            Err(e) => {
                tracing::warn!(error = %e, "AI generation failed, using fallback memes instead");
                self.fallback.produce(count).await
            }
        }
    }
}
