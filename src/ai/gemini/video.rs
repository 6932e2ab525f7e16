use super::client::GeminiHttpClient;
use super::types::{OperationResponse, PredictVideoRequest, VideoInstance, VideoParameters};
use crate::ai::VideoGenerationService;
use crate::models::{
    ContentPart, GenerationRequest, MediaResult, Operation, OperationError, OperationOutput,
    DEFAULT_VIDEO_CONTENT_TYPE,
};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Veo video generation over the Gemini REST API.
pub struct GeminiVideoClient {
    http: GeminiHttpClient,
}

impl GeminiVideoClient {
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

    /// Map the wire operation onto the provider-neutral [`Operation`].
    ///
    /// Generated samples become media parts in order; filtered-content reasons
    /// become text parts so a blocked job reads as a success with no media.
    fn to_operation(response: OperationResponse, previous_name: &str) -> Operation {
        let name = response
            .name
            .unwrap_or_else(|| previous_name.to_string());

        if !response.done {
            return Operation::pending(name);
        }

        if let Some(status) = response.error {
            let message = if status.message.is_empty() {
                format!("operation failed with code {:?}", status.code)
            } else {
                status.message
            };
            return Operation {
                name,
                done: true,
                error: Some(OperationError {
                    code: status.code,
                    message,
                }),
                output: None,
            };
        }

        let output = response
            .response
            .and_then(|result| result.generate_video_response)
            .map(|video_response| {
                let media = video_response
                    .generated_samples
                    .into_iter()
                    .filter_map(|sample| sample.video)
                    .filter_map(|video| {
                        let url = video.uri?;
                        Some(ContentPart::Media(MediaResult {
                            url,
                            content_type: Some(
                                video
                                    .mime_type
                                    .unwrap_or_else(|| DEFAULT_VIDEO_CONTENT_TYPE.to_string()),
                            ),
                        }))
                    });
                let reasons = video_response
                    .rai_media_filtered_reasons
                    .into_iter()
                    .map(ContentPart::Text);
                OperationOutput {
                    content: media.chain(reasons).collect(),
                }
            });

        Operation {
            name,
            done: true,
            error: None,
            output,
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiVideoClient);

#[async_trait]
impl VideoGenerationService for GeminiVideoClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Option<Operation>> {
        tracing::debug!(
            "Submitting video generation to Gemini (model: {})",
            self.http.model()
        );

        let body = PredictVideoRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: VideoParameters {
                duration_seconds: request.config.duration_seconds,
                aspect_ratio: request.config.aspect_ratio,
            },
        };

        let response: OperationResponse = self.http.predict_long_running(&body).await?;

        let Some(name) = response.name.clone().filter(|name| !name.is_empty()) else {
            tracing::error!("Gemini accepted the video request but returned no operation name");
            return Ok(None);
        };

        Ok(Some(Self::to_operation(response, &name)))
    }

    async fn check_operation(&self, operation: &Operation) -> Result<Operation> {
        let response: OperationResponse = self.http.get_operation(&operation.name).await?;
        Ok(Self::to_operation(response, &operation.name))
    }
}
