//! Long-running operation poller
//!
//! Turns a remote generation job into a single awaited result: submit the
//! request, re-check the operation until it settles, then download the first
//! media part and embed it as a `data:` URI.

use crate::ai::{mime, MediaFetcher, VideoGenerationService};
use crate::models::{
    GeneratedMedia, GenerationRequest, MediaResult, Operation, OperationOutput, OperationState,
    OutputEncoding, DEFAULT_VIDEO_CONTENT_TYPE,
};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_retry::strategy::{ExponentialBackoff, FixedInterval};
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Delay between consecutive status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles from `initial` and never exceeds `max`.
    Exponential { initial: Duration, max: Duration },
}

/// How long and how often an operation is polled.
///
/// The default matches a plain fixed five second interval with no cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub backoff: Backoff,
    /// Maximum number of status checks after submission.
    pub max_attempts: Option<u32>,
    /// Maximum wall time since submission.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(interval),
            max_attempts: None,
            max_wait: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        match self.backoff {
            Backoff::Fixed(interval) => Box::new(FixedInterval::new(interval)),
            Backoff::Exponential { initial, max } => {
                // Unscaled base 2 yields 2ms, 4ms, 8ms, ...; halved, that is the
                // multiplier applied to `initial`.
                Box::new(ExponentialBackoff::from_millis(2).map(move |step| {
                    let multiplier = u32::try_from(step.as_millis() / 2).unwrap_or(u32::MAX);
                    initial.saturating_mul(multiplier).min(max)
                }))
            }
        }
    }

    fn budget_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.max_wait.is_some_and(|max| elapsed >= max)
    }
}

/// Which media part of a finished operation is handed back.
///
/// Parts are scanned in order and the first accepted one wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaSelector {
    #[default]
    AnyMedia,
    ContentTypePrefix(String),
}

impl MediaSelector {
    pub fn content_type_prefix(prefix: impl Into<String>) -> Self {
        Self::ContentTypePrefix(prefix.into())
    }

    fn accepts(&self, media: &MediaResult) -> bool {
        match self {
            MediaSelector::AnyMedia => true,
            MediaSelector::ContentTypePrefix(prefix) => media
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with(prefix.as_str())),
        }
    }

    pub fn select<'a>(&self, output: &'a OperationOutput) -> Option<&'a MediaResult> {
        output
            .content
            .iter()
            .filter_map(|part| part.media())
            .find(|media| self.accepts(media))
    }
}

/// Append the API key to a media URL as a `key` query parameter.
pub fn download_url(media_url: &str, api_key: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(media_url)
        .map_err(|e| Error::Download(format!("Invalid media URL '{}': {}", media_url, e)))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.into())
}

/// Drives one generation request from submission to a finished artifact.
pub struct OperationPoller {
    video: Arc<dyn VideoGenerationService>,
    fetcher: Arc<dyn MediaFetcher>,
    api_key: Option<String>,
    policy: PollPolicy,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl OperationPoller {
    pub fn new(
        video: Arc<dyn VideoGenerationService>,
        fetcher: Arc<dyn MediaFetcher>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            video,
            fetcher,
            api_key,
            policy: PollPolicy::default(),
            cancel_rx: None,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set cancellation signal. Sending `true` stops polling at the next
    /// wait or loop boundary; the remote job keeps running.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Generate media, accepting the first media part of the result.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Option<GeneratedMedia>> {
        self.generate_with(request, &MediaSelector::AnyMedia).await
    }

    /// Generate media and pick the result part with `selector`.
    ///
    /// Returns `Ok(None)` when the operation succeeds without a matching
    /// media part.
    pub async fn generate_with(
        &self,
        request: &GenerationRequest,
        selector: &MediaSelector,
    ) -> Result<Option<GeneratedMedia>> {
        let api_key = match request.config.output_encoding {
            OutputEncoding::DataUri => Some(self.require_api_key()?),
            OutputEncoding::RemoteUrl => None,
        };

        let operation = self.run_to_completion(request).await?;

        let output = match operation.state() {
            OperationState::Pending => {
                return Err(Error::Invariant(format!(
                    "Operation {} left the polling loop while pending",
                    operation.name
                )))
            }
            OperationState::Failed(op_error) => {
                error!(
                    operation = %operation.name,
                    code = ?op_error.code,
                    "Generation failed: {}",
                    op_error.message
                );
                return Err(Error::Generation(op_error.message.clone()));
            }
            OperationState::Succeeded(output) => output,
        };

        let Some(media) = output.and_then(|output| selector.select(output)) else {
            warn!(
                operation = %operation.name,
                "Operation finished without a matching media part"
            );
            return Ok(None);
        };

        info!(operation = %operation.name, url = %media.url, "Operation produced media");

        match api_key {
            Some(api_key) => self.download(media, api_key).await.map(Some),
            None => {
                let content_type = media
                    .content_type
                    .as_deref()
                    .unwrap_or(DEFAULT_VIDEO_CONTENT_TYPE);
                Ok(Some(GeneratedMedia::remote(content_type, &media.url)))
            }
        }
    }

    fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration(
                "GEMINI_API_KEY is not set; it is required to download generated media"
                    .to_string(),
            )
        })
    }

    async fn run_to_completion(&self, request: &GenerationRequest) -> Result<Operation> {
        info!(
            duration_seconds = request.config.duration_seconds,
            aspect_ratio = %request.config.aspect_ratio,
            "Submitting generation request"
        );

        let mut operation = self.video.submit(request).await?.ok_or_else(|| {
            Error::Submission("Expected the model to return an operation".to_string())
        })?;

        info!(operation = %operation.name, "Generation operation submitted");

        let started = Instant::now();
        let mut delays = self.policy.delays();
        let mut cancel_rx = self.cancel_rx.clone();
        let mut attempts: u32 = 0;

        while !operation.done {
            if cancel_rx.as_ref().is_some_and(|rx| *rx.borrow()) {
                warn!(operation = %operation.name, attempts, "Polling cancelled");
                return Err(Error::Cancelled);
            }

            let elapsed = started.elapsed();
            if self.policy.budget_exhausted(attempts, elapsed) {
                warn!(
                    operation = %operation.name,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Polling budget exhausted, abandoning operation"
                );
                return Err(Error::Timeout { attempts, elapsed });
            }

            let mut delay = delays.next().unwrap_or(DEFAULT_POLL_INTERVAL);
            if let Some(max_wait) = self.policy.max_wait {
                delay = delay.min(max_wait.saturating_sub(elapsed));
            }

            Self::wait(delay, &mut cancel_rx).await.inspect_err(|_| {
                warn!(operation = %operation.name, attempts, "Polling cancelled");
            })?;

            attempts += 1;
            operation = self.video.check_operation(&operation).await?;
            debug!(
                operation = %operation.name,
                attempt = attempts,
                done = operation.done,
                "Checked operation status"
            );
        }

        info!(
            operation = %operation.name,
            attempts,
            elapsed_secs = started.elapsed().as_secs(),
            "Operation reached a terminal state"
        );

        Ok(operation)
    }

    async fn wait(delay: Duration, cancel_rx: &mut Option<watch::Receiver<bool>>) -> Result<()> {
        let Some(rx) = cancel_rx else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            Ok(_) = rx.wait_for(|cancelled| *cancelled) => Err(Error::Cancelled),
        }
    }

    async fn download(&self, media: &MediaResult, api_key: &str) -> Result<GeneratedMedia> {
        let url = download_url(&media.url, api_key)?;

        debug!(url = %media.url, "Downloading generated media");
        let fetched = self.fetcher.fetch(&url).await?;

        if !(200..300).contains(&fetched.status) {
            error!(url = %media.url, status = fetched.status, "Media download failed");
            return Err(Error::Download(format!(
                "Failed to fetch video (status {})",
                fetched.status
            )));
        }

        let bytes = fetched
            .body
            .filter(|body| !body.is_empty())
            .ok_or_else(|| Error::Download("Media response had an empty body".to_string()))?;

        let content_type = media
            .content_type
            .clone()
            .filter(|ct| mime::is_media_type(ct))
            .or_else(|| fetched.content_type.filter(|ct| mime::is_media_type(ct)))
            .unwrap_or_else(|| mime::detect_video_mime(&bytes).to_string());

        info!(
            url = %media.url,
            bytes = bytes.len(),
            content_type = %content_type,
            "Downloaded generated media"
        );

        Ok(GeneratedMedia::from_bytes(&content_type, &bytes))
    }
}
