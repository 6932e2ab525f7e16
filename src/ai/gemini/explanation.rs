use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::ExplanationService;
use crate::models::VisualExplanation;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ExplanationRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ExplanationGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExplanationGenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

fn explanation_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "explanation": { "type": "STRING" },
            "imagePrompt": { "type": "STRING" }
        },
        "required": ["title", "explanation", "imagePrompt"]
    })
}

/// Produces a titled, step-by-step explanation plus a visual prompt.
pub struct GeminiExplanationClient {
    http: GeminiHttpClient,
}

impl GeminiExplanationClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(60),
                client,
            ),
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiExplanationClient);

#[async_trait]
impl ExplanationService for GeminiExplanationClient {
    async fn explain(&self, concept: &str) -> Result<VisualExplanation> {
        let request = ExplanationRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text {
                    text: prompts::render(prompts::EXPLANATION, &[("concept", concept)]),
                }],
            }],
            generation_config: ExplanationGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: explanation_schema(),
            },
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        let text = response
            .candidates
            .first()
            .and_then(|c| {
                c.content.parts.iter().find_map(|p| match p {
                    Part::Text { text } => Some(text.as_str()),
                    _ => None,
                })
            })
            .ok_or_else(|| {
                Error::AiProvider("Failed to generate textual explanation".to_string())
            })?;

        let explanation: VisualExplanation = serde_json::from_str(text).map_err(|e| {
            Error::AiProvider(format!("Failed to parse Gemini explanation response: {}", e))
        })?;

        tracing::info!("Gemini explanation generated: {}", explanation.title);

        Ok(explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use wiremock::matchers::body_string_contains;
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    fn make_client(server: &MockServer) -> GeminiExplanationClient {
        GeminiExplanationClient::new("test-key".to_string(), DEFAULT_MODEL.to_string())
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_explain_parses_json_text() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_string_contains("\"responseMimeType\":\"application/json\""))
            .and(body_string_contains("black holes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{
                            "text": "{\"title\":\"Black Holes\",\"explanation\":\"1. Gravity wins.\",\"imagePrompt\":\"a glowing accretion disk\"}"
                        }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let explanation = make_client(&server).explain("black holes").await.unwrap();
        assert_eq!(
            explanation,
            VisualExplanation {
                title: "Black Holes".to_string(),
                explanation: "1. Gravity wins.".to_string(),
                image_prompt: "a glowing accretion disk".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_explain_skips_inline_parts() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } },
                            { "text": "{\"title\":\"Tides\",\"explanation\":\"The moon pulls.\",\"imagePrompt\":\"a beach at low tide\"}" }
                        ]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let explanation = make_client(&server).explain("tides").await.unwrap();
        assert_eq!(explanation.title, "Tides");
    }

    #[tokio::test]
    async fn test_explain_rejects_empty_candidates() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = make_client(&server).explain("tides").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_explain_rejects_invalid_json() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "not json at all" }] }
                }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server).explain("tides").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(msg) if msg.contains("parse")));
    }

    #[tokio::test]
    async fn test_api_error_returns_ai_provider_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = make_client(&server).explain("tides").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
