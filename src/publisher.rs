//! Final publish step with bounded retry while the platform finishes
//! processing the carousel media.
//!
//! ```text
//! Requested ──ok──────────────► Published
//!    │  ▲
//!    │  └── ProcessingWait ◄── code 9007, attempts left
//!    └── anything else / exhausted ──► Failed
//! ```

use crate::domain::{MediaPlatform, Pause};
use crate::errors::{GraphApiError, PublishError};
use crate::graph::GraphResponse;
use crate::models::{CarouselContainerId, PostId};
use backoff::backoff::Backoff;
use std::time::Duration;

/// Waits `base × attempt` after each failed attempt, giving up once
/// `max_attempts` requests have been issued.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl LinearBackoff {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self { base, max_attempts, attempt: 0 }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            None
        } else {
            Some(self.base * self.attempt)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishState {
    Requested { attempt: u32 },
    ProcessingWait { attempt: u32, delay: Duration },
    Published(PostId),
    Failed,
}

#[derive(Debug, Clone)]
pub struct PublishPolicy {
    pub max_attempts: u32,
    pub retry_base: Duration,
    /// Wait before the first attempt; zero skips it.
    pub pre_delay: Duration,
}

pub struct Publisher<'a> {
    platform: &'a dyn MediaPlatform,
    pause: &'a dyn Pause,
    policy: PublishPolicy,
}

impl<'a> Publisher<'a> {
    pub fn new(platform: &'a dyn MediaPlatform, pause: &'a dyn Pause, policy: PublishPolicy) -> Self {
        Self { platform, pause, policy }
    }

    pub async fn publish(&self, creation_id: &CarouselContainerId) -> Result<PostId, PublishError> {
        if !self.policy.pre_delay.is_zero() {
            tracing::info!(delay_ms = self.policy.pre_delay.as_millis() as u64, "Waiting before first publish attempt");
            self.pause.pause(self.policy.pre_delay).await;
        }

        let mut backoff = LinearBackoff::new(self.policy.retry_base, self.policy.max_attempts.max(1));
        let mut state = PublishState::Requested { attempt: 1 };
        let mut last_error: Option<GraphApiError> = None;

        loop {
            state = match state {
                PublishState::Requested { attempt } => {
                    tracing::debug!(attempt, carousel_id = %creation_id, "Requesting publish");
                    match self.platform.publish(creation_id).await {
                        Err(e) => {
                            tracing::error!(attempt, error = %e, "Publish request failed in transport");
                            return Err(PublishError::Transport(e));
                        }
                        Ok(GraphResponse::Id(id)) => PublishState::Published(PostId::new(id)),
                        Ok(GraphResponse::Error(e)) if e.is_media_not_ready() => {
                            tracing::warn!(attempt, error = %e, "Media still processing");
                            last_error = Some(e);
                            match backoff.next_backoff() {
                                Some(delay) => PublishState::ProcessingWait { attempt, delay },
                                None => PublishState::Failed,
                            }
                        }
                        Ok(GraphResponse::Error(e)) => {
                            tracing::error!(attempt, error = %e, "Publish rejected");
                            return Err(PublishError::Rejected(e));
                        }
                    }
                }
                PublishState::ProcessingWait { attempt, delay } => {
                    tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Retrying publish after delay");
                    self.pause.pause(delay).await;
                    PublishState::Requested { attempt: attempt + 1 }
                }
                PublishState::Published(post_id) => {
                    tracing::info!(post_id = %post_id, "Carousel published");
                    return Ok(post_id);
                }
                PublishState::Failed => {
                    let attempts = self.policy.max_attempts.max(1);
                    tracing::error!(attempts, "Giving up: media never became ready");
                    return Err(match last_error.take() {
                        Some(last) => PublishError::NotReady { attempts, last },
                        None => PublishError::Transport(anyhow::anyhow!("publish failed without a response")),
                    });
                }
            };
        }
    }
}
