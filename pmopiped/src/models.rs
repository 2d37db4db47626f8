//! Data models for Piped API responses
//!
//! Piped deployments do not agree on the exact shape of `/streams/{id}`:
//! fields go missing, numbers come back as strings, lists come back as
//! `null`. Every field is therefore optional and parsed leniently; only the
//! validation in [`StreamsResponse::into_resolved`] decides whether an
//! instance answered usefully.

use crate::error::InstanceError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// MIME type used when neither the provider nor the upstream gives one
pub const DEFAULT_AUDIO_MIME_TYPE: &str = "audio/webm";

// ============================================================================
// Provider payload
// ============================================================================

/// Response of `GET <instance>/streams/<videoId>`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamsResponse {
    /// Present (non-null) when the provider refuses the request
    #[serde(default)]
    pub error: Option<Value>,
    /// Human readable detail sometimes sent next to `error`
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uploader: Option<String>,
    /// Duration in seconds
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient_candidates")]
    pub audio_streams: Option<Vec<AudioCandidate>>,
}

/// One entry of `audioStreams`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCandidate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    /// Bits per second; absent bitrates rank as 0
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bitrate: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mime_type: Option<String>,
}

impl AudioCandidate {
    pub fn new(url: impl Into<String>, bitrate: Option<u64>) -> Self {
        Self {
            url: Some(url.into()),
            bitrate,
            mime_type: None,
        }
    }

    /// Bitrate used for ranking
    pub fn rank(&self) -> u64 {
        self.bitrate.unwrap_or(0)
    }

    fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

impl StreamsResponse {
    /// Error reported by the provider, if any
    pub fn provider_error(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(self.message.clone().unwrap_or_else(|| other.to_string())),
        }
    }

    /// Validates the payload and picks the stream to hand back to the caller
    ///
    /// Fails on an explicit provider error, on a missing or empty
    /// `audioStreams` list, and when no candidate carries a URL.
    pub fn into_resolved(
        self,
        instance: &str,
        scheme: RelativeScheme,
    ) -> Result<ResolvedStream, InstanceError> {
        if let Some(error) = self.provider_error() {
            return Err(InstanceError::Provider(error));
        }

        let candidates = self.audio_streams.unwrap_or_default();
        let best = select_best_candidate(&candidates).ok_or(InstanceError::NoAudioStreams)?;
        let url = best.playable_url().ok_or(InstanceError::NoAudioStreams)?;

        Ok(ResolvedStream {
            url: normalize_stream_url(url, scheme),
            title: self.title,
            author: self.uploader,
            duration: self.duration,
            mime_type: best
                .mime_type
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_AUDIO_MIME_TYPE.to_string()),
            bitrate: best.bitrate,
            instance: instance.to_string(),
        })
    }
}

// ============================================================================
// Resolution result
// ============================================================================

/// The audio stream chosen for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStream {
    /// Absolute URL of the audio stream
    pub url: String,
    pub title: Option<String>,
    /// Uploader of the video
    pub author: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    pub mime_type: String,
    pub bitrate: Option<u64>,
    /// Instance that answered
    pub instance: String,
}

/// Picks the candidate with the highest bitrate
///
/// Missing bitrates count as 0. Ties go to the earliest candidate, and
/// candidates without a URL are never selected.
pub fn select_best_candidate(candidates: &[AudioCandidate]) -> Option<&AudioCandidate> {
    candidates
        .iter()
        .filter(|c| c.playable_url().is_some())
        .fold(None, |best: Option<&AudioCandidate>, candidate| match best {
            Some(current) if current.rank() >= candidate.rank() => Some(current),
            _ => Some(candidate),
        })
}

// ============================================================================
// URL normalization
// ============================================================================

/// Scheme given to stream URLs that come back without one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelativeScheme {
    #[default]
    Https,
    /// For a Piped backend reachable only on a local network
    Http,
}

impl RelativeScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for RelativeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelativeScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            other => Err(format!("unsupported URL scheme: {other}")),
        }
    }
}

/// Makes a provider stream URL absolute
///
/// `://host/path` and `//host/path` get `scheme` prepended; anything else
/// is returned unchanged, so the function is idempotent.
pub fn normalize_stream_url(url: &str, scheme: RelativeScheme) -> String {
    let url = url.trim();
    if url.starts_with("://") {
        format!("{}{}", scheme.as_str(), url)
    } else if url.starts_with("//") {
        format!("{}:{}", scheme.as_str(), url)
    } else {
        url.to_string()
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn number_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
        }
        _ => None,
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_to_u64))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lenient_candidates<'de, D>(deserializer: D) -> Result<Option<Vec<AudioCandidate>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<AudioCandidate>(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}
