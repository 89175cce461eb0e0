//! Images API client used by `/draw`

use crate::core::error::BackendError;
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    Medium,
    Large,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "256x256",
            ImageSize::Medium => "512x512",
            ImageSize::Large => "1024x1024",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "small" | "256x256" => Some(ImageSize::Small),
            "medium" | "512x512" => Some(ImageSize::Medium),
            "large" | "1024x1024" => Some(ImageSize::Large),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub revised_prompt: Option<String>,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[derive(Clone)]
pub struct ImageGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ImageGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Generate `count` images for `prompt`
    pub async fn generate(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u8,
    ) -> Result<Vec<GeneratedImage>, BackendError> {
        info!(
            "Requesting {count} image(s) at {} for prompt '{}'",
            size.as_str(),
            prompt.chars().take(100).collect::<String>()
        );

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": prompt,
                "n": count.max(1),
                "size": size.as_str(),
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        let parsed: ImagesResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::transport(format!("unreadable images response: {e}")))?;

        let images: Vec<GeneratedImage> = parsed
            .data
            .into_iter()
            .filter_map(|d| {
                d.url.map(|url| GeneratedImage {
                    url,
                    revised_prompt: d.revised_prompt,
                })
            })
            .collect();

        if images.is_empty() {
            return Err(BackendError::transport("images response contained no URLs"));
        }
        debug!("Received {} image URL(s)", images.len());
        Ok(images)
    }

    /// Fetch the image bytes so they can be attached to a message
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::transport(format!(
                "image download failed with HTTP {status}"
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BackendErrorKind;
    use mockito::Matcher;

    fn generator(url: &str) -> ImageGenerator {
        ImageGenerator::new(url, "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_image_size_parse() {
        assert_eq!(ImageSize::parse("Small"), Some(ImageSize::Small));
        assert_eq!(ImageSize::parse("1024x1024"), Some(ImageSize::Large));
        assert_eq!(ImageSize::parse("huge"), None);
    }

    #[tokio::test]
    async fn test_generate_returns_urls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/images/generations")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({ "prompt": "a red fox", "n": 1, "size": "512x512" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": [{ "url": "https://img.example/fox.png" }] }).to_string())
            .create_async()
            .await;

        let images = generator(&server.url())
            .generate("a red fox", ImageSize::Medium, 1)
            .await
            .unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://img.example/fox.png");
        assert_eq!(images[0].revised_prompt, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_prompt_is_policy_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/images/generations")
            .with_status(400)
            .with_body(
                json!({ "error": { "code": "content_policy_violation", "message": "rejected" } })
                    .to_string(),
            )
            .create_async()
            .await;

        let err = generator(&server.url())
            .generate("something rude", ImageSize::Small, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::PolicyRejected);
        assert!(err.user_message().contains("Inappropriate request"));
    }

    #[tokio::test]
    async fn test_empty_data_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/images/generations")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let err = generator(&server.url())
            .generate("fox", ImageSize::Small, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_download_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fox.png")
            .with_status(200)
            .with_body(vec![0x89, b'P', b'N', b'G'])
            .create_async()
            .await;

        let bytes = generator(&server.url())
            .download(&format!("{}/fox.png", server.url()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }
}
