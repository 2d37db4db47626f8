//! Byte relay for resolved audio streams
//!
//! Some players cannot follow a redirect to a third-party host, or need
//! `Access-Control-Allow-Origin`. The relay fetches the upstream URL itself
//! and streams the body back chunk by chunk, forwarding `Range` so seeking
//! keeps working.

use crate::client::DEFAULT_USER_AGENT;
use crate::models::DEFAULT_AUDIO_MIME_TYPE;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection timeout towards the upstream; the transfer itself is unbounded
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Headers copied from the upstream response when present
const PASSTHROUGH_HEADERS: [header::HeaderName; 2] =
    [header::CONTENT_LENGTH, header::CONTENT_RANGE];

#[derive(Debug, Clone)]
pub struct StreamRelay {
    client: Client,
}

impl StreamRelay {
    /// Relay with the default User-Agent and connect timeout
    pub fn new() -> crate::Result<Self> {
        Self::with_settings(
            DEFAULT_USER_AGENT,
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        )
    }

    pub fn with_settings(user_agent: &str, connect_timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` and streams it back
    ///
    /// The upstream status is mirrored (206 for partial content). On a
    /// transport failure the caller gets a 502 with a plain text body.
    pub async fn relay(&self, url: &str, inbound: &HeaderMap) -> Response {
        let mut request = self.client.get(url);
        if let Some(range) = inbound.get(header::RANGE) {
            debug!("Forwarding Range {:?}", range);
            request = request.header(header::RANGE, range.clone());
        }

        let upstream = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Relay failed for {}: {}", url, e);
                return relay_error();
            }
        };

        let status = upstream.status();
        debug!("Upstream answered {} for {}", status, url);

        let mut headers = HeaderMap::new();
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_AUDIO_MIME_TYPE));
        headers.insert(header::CONTENT_TYPE, content_type);

        for name in PASSTHROUGH_HEADERS {
            if let Some(value) = upstream.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }

        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );

        let body = Body::from_stream(upstream.bytes_stream());

        (status, headers, body).into_response()
    }
}

fn relay_error() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        "Stream error",
    )
        .into_response()
}
