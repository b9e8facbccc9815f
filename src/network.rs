use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GenerationError;

/// One part of a model response. Image parts carry `inline_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[cfg(test)]
impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn image(mime_type: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type: mime_type.map(str::to_string), data: data.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

/// The outbound image-generation collaborator: one prompt in, the ordered
/// parts of a single response out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<Part>, GenerationError>;
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiGenerator {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<Part>, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });
        tracing::debug!(model = %self.model, "sending generateContent request");
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text.trim().chars().take(200).collect(),
            });
        }
        parse_parts(&text)
    }
}

/// Parts of the first candidate; a response without candidates yields no parts.
pub fn parse_parts(body: &str) -> Result<Vec<Part>, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;
    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default())
}

/// Fails every request; used by `--offline` to preview placeholders.
pub struct OfflineGenerator;

#[async_trait]
impl Generator for OfflineGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Vec<Part>, GenerationError> {
        Err(GenerationError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_first_candidate_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "QUJD"}}
                ]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let parts = parse_parts(body).unwrap();
        assert_eq!(parts, vec![Part::text("Here you go"), Part::image(Some("image/jpeg"), "QUJD")]);
    }

    #[test]
    fn missing_candidates_is_empty_not_error() {
        assert!(parse_parts("{}").unwrap().is_empty());
        assert!(parse_parts(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_parts("<html>").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[tokio::test]
    async fn gemini_without_key_fails_before_network() {
        let generator = GeminiGenerator::new("https://generativelanguage.googleapis.com/v1beta", "gemini-2.5-flash-image", None);
        let err = generator.generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let generator = GeminiGenerator::new("http://localhost:9000/v1beta/", "m", None);
        assert_eq!(generator.url(), "http://localhost:9000/v1beta/models/m:generateContent");
    }
}
