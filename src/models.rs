//! Data models and structures
//!
//! Defines generation requests, the long-running operation handle returned by
//! the video model, the media it produces, and runtime configuration.

use crate::poller::{Backoff, PollPolicy};
use crate::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Content type assumed for generated video when nothing better is known.
pub const DEFAULT_VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How finished media is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// Download the media and embed it as a base64 `data:` URI.
    #[default]
    DataUri,
    /// Return the provider URL as-is. Nothing is downloaded.
    RemoteUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub duration_seconds: u32,
    pub aspect_ratio: AspectRatio,
    pub output_encoding: OutputEncoding,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 5,
            aspect_ratio: AspectRatio::Landscape,
            output_encoding: OutputEncoding::DataUri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            prompt: prompt.into(),
            config,
        }
    }
}

/// Media payload inside a finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResult {
    pub url: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Media(MediaResult),
}

impl ContentPart {
    pub fn media(&self) -> Option<&MediaResult> {
        match self {
            ContentPart::Media(media) => Some(media),
            ContentPart::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub code: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationOutput {
    pub content: Vec<ContentPart>,
}

/// Handle for an in-flight remote generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub done: bool,
    pub error: Option<OperationError>,
    pub output: Option<OperationOutput>,
}

/// Borrowed view of where an [`Operation`] stands.
#[derive(Debug, PartialEq, Eq)]
pub enum OperationState<'a> {
    Pending,
    Failed(&'a OperationError),
    Succeeded(Option<&'a OperationOutput>),
}

impl Operation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            output: None,
        }
    }

    pub fn succeeded(name: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: None,
            output: Some(OperationOutput { content }),
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: Some(OperationError {
                code: None,
                message: message.into(),
            }),
            output: None,
        }
    }

    /// An error on a finished operation wins over any output it also carries.
    pub fn state(&self) -> OperationState<'_> {
        if !self.done {
            return OperationState::Pending;
        }
        match &self.error {
            Some(error) => OperationState::Failed(error),
            None => OperationState::Succeeded(self.output.as_ref()),
        }
    }
}

/// Media handed back to callers once an operation succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMedia {
    pub content_type: String,
    pub uri: String,
}

impl GeneratedMedia {
    pub fn from_bytes(content_type: &str, bytes: &[u8]) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            content_type: content_type.to_string(),
            uri: format!("data:{};base64,{}", content_type, payload),
        }
    }

    pub fn remote(content_type: &str, url: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            uri: url.to_string(),
        }
    }

    pub fn is_data_uri(&self) -> bool {
        self.uri.starts_with("data:")
    }

    /// Recover the raw bytes embedded in a `data:...;base64,` URI.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let payload = self
            .uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(_, payload)| payload)
            .ok_or_else(|| Error::Invariant(format!("Not a base64 data URI: {}", self.uri)))?;

        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::Invariant(format!("Invalid base64 payload in data URI: {}", e)))
    }

    /// File extension matching the content type, used for output file names.
    pub fn file_extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            "image/png" => "png",
            "image/jpeg" => "jpg",
            _ => "mp4",
        }
    }
}

/// Structured textual explanation that accompanies a generated video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisualExplanation {
    pub title: String,
    pub explanation: String,
    pub image_prompt: String,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub video_model: String,
    pub text_model: String,
    pub poll_policy: PollPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let parse_u64 = |name: &str| -> Result<Option<u64>> {
            non_empty(name)
                .map(|value| {
                    value.trim().parse::<u64>().map_err(|_| {
                        Error::Configuration(format!(
                            "{} must be a non-negative integer, got '{}'",
                            name, value
                        ))
                    })
                })
                .transpose()
        };

        let interval_secs = parse_u64("POLL_INTERVAL_SECS")?.unwrap_or(5);
        if interval_secs == 0 {
            return Err(Error::Configuration(
                "POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        let max_wait = parse_u64("POLL_MAX_WAIT_SECS")?.map(Duration::from_secs);
        let max_attempts = parse_u64("POLL_MAX_ATTEMPTS")?
            .map(|n| {
                u32::try_from(n).map_err(|_| {
                    Error::Configuration(format!("POLL_MAX_ATTEMPTS is too large: {}", n))
                })
            })
            .transpose()?;

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            video_model: non_empty("GEMINI_VIDEO_MODEL")
                .unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            text_model: non_empty("GEMINI_TEXT_MODEL")
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            poll_policy: PollPolicy {
                backoff: Backoff::Fixed(Duration::from_secs(interval_secs)),
                max_attempts,
                max_wait,
            },
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            Error::Configuration(
                "The GEMINI_API_KEY environment variable is not set. Please add it to your .env file."
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_operation_state() {
        assert_eq!(Operation::pending("op").state(), OperationState::Pending);

        let failed = Operation::failed("op", "quota exceeded");
        assert!(matches!(failed.state(), OperationState::Failed(e) if e.message == "quota exceeded"));

        let ok = Operation::succeeded("op", vec![ContentPart::Text("x".to_string())]);
        assert!(matches!(ok.state(), OperationState::Succeeded(Some(_))));
    }

    #[test]
    fn test_error_wins_over_output() {
        let mut op = Operation::succeeded("op", vec![]);
        op.error = Some(OperationError {
            code: Some(13),
            message: "internal".to_string(),
        });
        assert!(matches!(op.state(), OperationState::Failed(_)));
    }

    #[test]
    fn test_generated_media_data_uri_round_trip() {
        let media = GeneratedMedia::from_bytes("video/mp4", b"hello");
        assert_eq!(media.uri, "data:video/mp4;base64,aGVsbG8=");
        assert!(media.is_data_uri());
        assert_eq!(media.decode().unwrap(), b"hello");
        assert_eq!(media.file_extension(), "mp4");
    }

    #[test]
    fn test_remote_media_cannot_be_decoded() {
        let media = GeneratedMedia::remote("video/webm", "https://example.com/v.webm");
        assert!(!media.is_data_uri());
        assert!(matches!(media.decode(), Err(Error::Invariant(_))));
        assert_eq!(media.file_extension(), "webm");
    }

    #[test]
    fn test_aspect_ratio_serializes_as_ratio_string() {
        assert_eq!(
            serde_json::to_string(&AspectRatio::Portrait).unwrap(),
            "\"9:16\""
        );
        assert_eq!(AspectRatio::default().to_string(), "16:9");
    }

    #[test]
    fn test_visual_explanation_uses_camel_case() {
        let parsed: VisualExplanation = serde_json::from_str(
            r#"{"title":"Tides","explanation":"The moon pulls.","imagePrompt":"ocean at dusk"}"#,
        )
        .unwrap();
        assert_eq!(parsed.image_prompt, "ocean at dusk");
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.video_model, DEFAULT_VIDEO_MODEL);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(
            config.poll_policy.backoff,
            Backoff::Fixed(Duration::from_secs(5))
        );
        assert!(config.poll_policy.max_attempts.is_none());
        assert!(config.poll_policy.max_wait.is_none());
        assert!(matches!(
            config.require_api_key(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_config_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_VIDEO_MODEL", "veo-3.0-generate-preview"),
            ("POLL_INTERVAL_SECS", "2"),
            ("POLL_MAX_WAIT_SECS", "600"),
            ("POLL_MAX_ATTEMPTS", "120"),
        ]))
        .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "secret");
        assert_eq!(config.video_model, "veo-3.0-generate-preview");
        assert_eq!(
            config.poll_policy.backoff,
            Backoff::Fixed(Duration::from_secs(2))
        );
        assert_eq!(config.poll_policy.max_wait, Some(Duration::from_secs(600)));
        assert_eq!(config.poll_policy.max_attempts, Some(120));
    }

    #[test]
    fn test_config_treats_blank_key_as_missing() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("POLL_INTERVAL_SECS")));
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        let err = Config::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("at least 1")));
    }
}
