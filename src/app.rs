//! Video generation flows offered by the playground.

use crate::ai::{
    ExplanationService, GeminiExplanationClient, GeminiVideoClient, HttpMediaFetcher,
    MediaFetcher, VideoGenerationService,
};
use crate::models::{
    AspectRatio, Config, GeneratedMedia, GenerationConfig, GenerationRequest, OutputEncoding,
    VisualExplanation,
};
use crate::poller::{MediaSelector, OperationPoller, PollPolicy};
use crate::{prompts, Error, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Result of running the explanation and video requests side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoWithExplanation {
    pub explanation: VisualExplanation,
    pub video: Option<GeneratedMedia>,
}

/// Coordinates the video model, media downloads and the explanation model.
pub struct App {
    poller: OperationPoller,
    explanation: Box<dyn ExplanationService>,
    output_encoding: OutputEncoding,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub video: Arc<dyn VideoGenerationService>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub explanation: Box<dyn ExplanationService>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(
        services: AppServices,
        api_key: Option<String>,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            poller: OperationPoller::new(services.video, services.fetcher, api_key)
                .with_policy(poll_policy),
            explanation: services.explanation,
            output_encoding: OutputEncoding::default(),
        }
    }

    /// Construct an app with live Gemini clients.
    pub fn from_config(config: Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Video provider: Gemini (model: {})", config.video_model);
        info!("Explanation provider: Gemini (model: {})", config.text_model);

        let services = AppServices {
            video: Arc::new(GeminiVideoClient::new_with_client(
                api_key.clone(),
                config.video_model.clone(),
                http_client.clone(),
            )),
            fetcher: Arc::new(HttpMediaFetcher::new_with_client(http_client.clone())),
            explanation: Box::new(GeminiExplanationClient::new_with_client(
                api_key.clone(),
                config.text_model.clone(),
                http_client,
            )),
        };

        Ok(Self::with_services(
            services,
            Some(api_key),
            config.poll_policy,
        ))
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        Self::from_config(Config::from_env()?)
    }

    /// Abandon in-flight polling once `true` is sent on the channel.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.poller = self.poller.with_cancel(cancel_rx);
        self
    }

    /// Hand back provider URLs instead of downloading, or the reverse.
    pub fn with_output_encoding(mut self, output_encoding: OutputEncoding) -> Self {
        self.output_encoding = output_encoding;
        self
    }

    fn default_config(&self) -> GenerationConfig {
        GenerationConfig {
            output_encoding: self.output_encoding,
            ..GenerationConfig::default()
        }
    }

    /// Five second landscape clip straight from the prompt.
    pub async fn generate_video(&self, prompt: &str) -> Result<Option<GeneratedMedia>> {
        let prompt = non_blank(prompt)?;
        info!("Generating video for prompt: {}", prompt);

        let request = GenerationRequest::new(prompt, self.default_config());
        self.poller
            .generate(&request)
            .await
            .inspect_err(|e| error!("Video generation failed: {}", e))
    }

    /// Eight second educational clip, keeping only `video/*` results.
    pub async fn generate_video_explanation(
        &self,
        concept: &str,
    ) -> Result<Option<GeneratedMedia>> {
        let concept = non_blank(concept)?;
        info!("Generating explanatory video for: {}", concept);

        let request = GenerationRequest::new(
            prompts::render(prompts::VIDEO_EXPLANATION, &[("concept", concept)]),
            GenerationConfig {
                duration_seconds: 8,
                aspect_ratio: AspectRatio::Landscape,
                output_encoding: self.output_encoding,
            },
        );

        self.poller
            .generate_with(&request, &MediaSelector::content_type_prefix("video/"))
            .await
            .inspect_err(|e| error!("Explanatory video generation failed: {}", e))
    }

    /// Text explanation and a video for the same concept, requested
    /// concurrently. Either failure fails the whole call.
    pub async fn generate_video_with_explanation(
        &self,
        concept: &str,
    ) -> Result<VideoWithExplanation> {
        let concept = non_blank(concept)?;
        info!("Generating explanation and video for: {}", concept);

        let request = GenerationRequest::new(concept, self.default_config());

        let (explanation, video) = tokio::try_join!(
            self.explanation.explain(concept),
            self.poller.generate(&request)
        )
        .inspect_err(|e| error!("Error generating video explanation: {}", e))?;

        Ok(VideoWithExplanation { explanation, video })
    }
}

fn non_blank(prompt: &str) -> Result<&str> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Prompt is empty".to_string()));
    }
    Ok(trimmed)
}
