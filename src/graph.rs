//! Instagram Graph API client: media containers, carousels and publishing.

use crate::{
    clients::body_text,
    domain::MediaPlatform,
    errors::{CarouselError, ContainerError, GraphApiError},
    models::{Caption, CarouselContainerId, HostedImageUrl, MediaContainerId},
};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

/// "Media ID is not available": the platform is still processing the upload.
pub const MEDIA_NOT_READY_CODE: i64 = 9007;

/// Platform response, tagged by outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphResponse {
    Id(String),
    Error(GraphApiError),
}

#[derive(Deserialize)]
struct IdBody {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<i64>,
    error_subcode: Option<i64>,
}

impl GraphResponse {
    pub fn parse(status: u16, body: String) -> Self {
        if status == 200 {
            if let Ok(IdBody { id: Some(id) }) = serde_json::from_str::<IdBody>(&body) {
                if !id.is_empty() {
                    return GraphResponse::Id(id);
                }
            }
        }

        let (code, subcode, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (
                envelope.error.code,
                envelope.error.error_subcode,
                envelope.error.message.unwrap_or_else(|| "no message".to_string()),
            ),
            Err(_) if status == 200 => (None, None, "response did not contain an id".to_string()),
            Err(_) => (None, None, "unrecognised error body".to_string()),
        };

        GraphResponse::Error(GraphApiError { status, code, subcode, message, raw: body })
    }

    pub fn into_result(self) -> Result<String, GraphApiError> {
        match self {
            GraphResponse::Id(id) => Ok(id),
            GraphResponse::Error(e) => Err(e),
        }
    }
}

impl GraphApiError {
    pub fn is_media_not_ready(&self) -> bool {
        self.code == Some(MEDIA_NOT_READY_CODE)
    }
}

pub fn media_container_form(
    image_url: &HostedImageUrl,
    access_token: &str,
    is_carousel_item: bool,
) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("image_url", image_url.to_string()),
        ("access_token", access_token.to_string()),
    ];
    if is_carousel_item {
        form.push(("is_carousel_item", "true".to_string()));
    }
    form
}

/// Children are comma-joined in the given order; that order is the display
/// order of the post.
pub fn carousel_form(
    children: &[MediaContainerId],
    caption: &Caption,
    access_token: &str,
) -> Vec<(&'static str, String)> {
    let joined = children.iter().map(MediaContainerId::as_str).collect::<Vec<_>>().join(",");
    vec![
        ("media_type", "CAROUSEL".to_string()),
        ("children", joined),
        ("caption", caption.to_string()),
        ("access_token", access_token.to_string()),
    ]
}

pub fn publish_form(creation_id: &CarouselContainerId, access_token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("creation_id", creation_id.to_string()),
        ("access_token", access_token.to_string()),
    ]
}

/// Graph API client bound to one account.
#[derive(Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    access_token: String,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    pub fn new(client: reqwest::Client, base_url: String, account_id: String, access_token: String) -> Self {
        tracing::info!(%base_url, %account_id, "Initializing Graph API client");
        Self { client, base_url, account_id, access_token }
    }

    fn media_endpoint(&self) -> String {
        format!("{}/{}/media", self.base_url, self.account_id)
    }

    fn publish_endpoint(&self) -> String {
        format!("{}/{}/media_publish", self.base_url, self.account_id)
    }

    async fn post_form(&self, url: &str, form: &[(&'static str, String)]) -> anyhow::Result<GraphResponse> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .context(format!("Graph API: POST {} failed", url))?;
        let status = response.status().as_u16();
        let body = body_text(response).await;
        Ok(GraphResponse::parse(status, body))
    }
}

#[async_trait]
impl MediaPlatform for GraphClient {
    async fn create_media_container(
        &self,
        image_url: &HostedImageUrl,
        is_carousel_item: bool,
    ) -> Result<MediaContainerId, ContainerError> {
        let form = media_container_form(image_url, &self.access_token, is_carousel_item);
        let id = self
            .post_form(&self.media_endpoint(), &form)
            .await?
            .into_result()
            .map_err(|e| {
                tracing::error!(error = %e, "Graph API: Media container rejected");
                ContainerError::Rejected(e)
            })?;

        tracing::info!(container_id = %id, "Graph API: Container created");
        Ok(MediaContainerId::new(id))
    }

    async fn create_carousel_container(
        &self,
        children: &[MediaContainerId],
        caption: &Caption,
    ) -> Result<CarouselContainerId, CarouselError> {
        if children.is_empty() {
            return Err(CarouselError::NoChildren);
        }

        let form = carousel_form(children, caption, &self.access_token);
        let id = self
            .post_form(&self.media_endpoint(), &form)
            .await?
            .into_result()
            .map_err(|e| {
                tracing::error!(error = %e, "Graph API: Carousel container rejected");
                CarouselError::Rejected(e)
            })?;

        tracing::info!(carousel_id = %id, children = children.len(), "Graph API: Carousel container created");
        Ok(CarouselContainerId::new(id))
    }

    async fn publish(&self, creation_id: &CarouselContainerId) -> anyhow::Result<GraphResponse> {
        let form = publish_form(creation_id, &self.access_token);
        self.post_form(&self.publish_endpoint(), &form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::build_client;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ids(raw: &[&str]) -> Vec<MediaContainerId> {
        raw.iter().map(|s| MediaContainerId::new(*s)).collect()
    }

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(
            build_client(Duration::from_secs(5)).unwrap(),
            format!("{}/v18.0", server.uri()),
            "1784".into(),
            "secret-token".into(),
        )
    }

    #[test]
    fn parses_success_id() {
        let parsed = GraphResponse::parse(200, r#"{"id":"17890"}"#.into());
        assert_eq!(parsed, GraphResponse::Id("17890".into()));
    }

    #[test]
    fn parses_not_ready_error() {
        let body = r#"{"error":{"message":"Media ID is not available","type":"OAuthException","code":9007,"error_subcode":2207027,"fbtrace_id":"AbC"}}"#;
        match GraphResponse::parse(400, body.into()) {
            GraphResponse::Error(e) => {
                assert!(e.is_media_not_ready());
                assert_eq!(e.subcode, Some(2207027));
                assert_eq!(e.message, "Media ID is not available");
                assert_eq!(e.raw, body);
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn other_codes_are_not_retryable() {
        let body = r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#;
        match GraphResponse::parse(400, body.into()) {
            GraphResponse::Error(e) => assert!(!e.is_media_not_ready()),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn success_status_without_id_is_an_error() {
        let parsed = GraphResponse::parse(200, "{}".into());
        assert!(matches!(parsed, GraphResponse::Error(GraphApiError { code: None, .. })));
    }

    #[test]
    fn non_json_error_keeps_raw_body() {
        match GraphResponse::parse(502, "Bad Gateway".into()) {
            GraphResponse::Error(e) => {
                assert_eq!(e.status, 502);
                assert_eq!(e.raw, "Bad Gateway");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn carousel_form_joins_children_in_order() {
        let form = carousel_form(&ids(&["a", "b", "c", "d", "e"]), &Caption::new("#pisces"), "tok");
        let children = form.iter().find(|(k, _)| *k == "children").map(|(_, v)| v.as_str());
        assert_eq!(children, Some("a,b,c,d,e"));
        assert!(form.contains(&("media_type", "CAROUSEL".to_string())));
        assert!(form.contains(&("caption", "#pisces".to_string())));
    }

    #[test]
    fn carousel_item_flag_is_optional() {
        let url = HostedImageUrl::new("https://i.ibb.co/x.png");
        assert!(!media_container_form(&url, "t", false).iter().any(|(k, _)| *k == "is_carousel_item"));
        assert!(media_container_form(&url, "t", true).contains(&("is_carousel_item", "true".to_string())));
    }

    #[tokio::test]
    async fn carousel_request_transmits_ordered_children() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v18.0/1784/media"))
            .and(body_string_contains("children=a%2Cb%2Cc%2Cd%2Ce"))
            .and(body_string_contains("media_type=CAROUSEL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"carousel-1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .create_carousel_container(&ids(&["a", "b", "c", "d", "e"]), &Caption::new("pisces energy"))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "carousel-1");
    }

    #[tokio::test]
    async fn empty_carousel_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client(&server).create_carousel_container(&[], &Caption::new("x")).await;
        assert!(matches!(result, Err(CarouselError::NoChildren)));
    }

    #[tokio::test]
    async fn media_container_sends_carousel_item_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v18.0/1784/media"))
            .and(body_string_contains("is_carousel_item=true"))
            .and(body_string_contains("access_token=secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"c-1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .create_media_container(&HostedImageUrl::new("https://i.ibb.co/a.png"), true)
            .await
            .unwrap();
        assert_eq!(id.as_str(), "c-1");
    }

    #[tokio::test]
    async fn rejected_container_carries_platform_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error":{"message":"Only photo or video can be accepted as media type.","code":9004,"error_subcode":2207052}}"#,
            ))
            .mount(&server)
            .await;

        match client(&server).create_media_container(&HostedImageUrl::new("not-a-url"), true).await {
            Err(ContainerError::Rejected(e)) => {
                assert_eq!(e.code, Some(9004));
                assert!(!e.to_string().contains("secret-token"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_hits_account_publish_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v18.0/1784/media_publish"))
            .and(body_string_contains("creation_id=carousel-9"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"post-1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).publish(&CarouselContainerId::new("carousel-9")).await.unwrap();
        assert_eq!(response, GraphResponse::Id("post-1".into()));
    }
}
