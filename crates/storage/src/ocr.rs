//! Text extraction from uploaded images via the Vision REST API.
//!
//! Used fire-and-forget after an order is published: extraction failures are
//! logged by the caller and never affect the order transition.

use serde::Deserialize;
use serde_json::json;

/// Why text extraction failed.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OCR service rejected the request: {0}")]
    Service(String),
}

/// Configuration for the OCR client.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// API key passed as the `key` query parameter.
    pub api_key: String,
    /// Annotation endpoint; override for self-hosted gateways and tests.
    pub endpoint: String,
}

/// Default Vision annotation endpoint.
const DEFAULT_OCR_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

impl OcrConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `OCR_API_KEY` is not set, signalling that OCR is
    /// not configured and should be skipped.
    ///
    /// | Variable       | Required | Default                                        |
    /// |----------------|----------|------------------------------------------------|
    /// | `OCR_API_KEY`  | yes      | --                                             |
    /// | `OCR_ENDPOINT` | no       | `https://vision.googleapis.com/v1/images:annotate` |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OCR_API_KEY").ok()?;
        Some(Self {
            api_key,
            endpoint: std::env::var("OCR_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_OCR_ENDPOINT.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(rename = "textAnnotations")]
    text_annotations: Option<Vec<TextAnnotation>>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    message: String,
}

/// Extracts text from public image URLs.
#[derive(Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    config: OcrConfig,
}

impl OcrClient {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Extract text from a single image by its public URL.
    ///
    /// Returns an empty string when the image contains no recognizable text.
    pub async fn extract_text(&self, image_url: &str) -> Result<String, OcrError> {
        let body = json!({
            "requests": [{
                "image": { "source": { "imageUri": image_url } },
                "features": [{ "type": "TEXT_DETECTION" }],
            }]
        });

        let response: AnnotateResponse = self
            .http
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let image = response
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::Service("empty response".to_string()))?;

        if let Some(error) = image.error {
            return Err(OcrError::Service(error.message));
        }

        // The first annotation is the full-image text; the rest are
        // per-word boxes.
        Ok(image
            .text_annotations
            .and_then(|mut annotations| {
                if annotations.is_empty() {
                    None
                } else {
                    Some(annotations.swap_remove(0).description)
                }
            })
            .unwrap_or_default())
    }

    /// Extract and concatenate text from a list of image URLs, in order.
    ///
    /// A failure on any image aborts the batch; the caller decides whether a
    /// partial result matters (here it never does -- extraction is
    /// best-effort).
    pub async fn extract_all(&self, image_urls: &[String]) -> Result<String, OcrError> {
        let mut text = String::new();
        for url in image_urls {
            text.push_str(&self.extract_text(url).await?);
        }
        Ok(text)
    }
}
