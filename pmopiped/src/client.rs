//! Failover resolver over a pool of Piped instances
//!
//! Instances are queried one after the other, in registry order, until one
//! returns usable audio metadata. Each attempt is bounded by a timeout, so a
//! full resolution never takes longer than `instances × timeout`.
//!
//! # Example
//!
//! ```no_run
//! use pmopiped::PipedClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PipedClient::new().await?;
//!
//!     let stream = client.resolve("dQw4w9WgXcQ").await?;
//!     println!("{} ({:?} bps) via {}", stream.url, stream.bitrate, stream.instance);
//!
//!     Ok(())
//! }
//! ```

use crate::error::{Error, InstanceError, InstanceFailure, Result};
use crate::instances::{Instance, InstanceRegistry};
use crate::models::{RelativeScheme, ResolvedStream, StreamsResponse};
use reqwest::{redirect, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-instance timeout (10 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Browser-like User-Agent; some instances reject requests without one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Redirects returned by an instance that are followed before giving up on it
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Outcome of [`PipedClient::resolve`]: the chosen stream, or `Error::Exhausted`
pub type ResolutionOutcome = Result<ResolvedStream>;

/// Piped metadata client
///
/// Holds no per-request state: the registry is shared read-only and the
/// underlying `reqwest::Client` pools its own connections, so a single
/// instance can serve any number of concurrent resolutions.
#[derive(Debug, Clone)]
pub struct PipedClient {
    client: Client,
    registry: Arc<InstanceRegistry>,
    timeout: Duration,
    relative_scheme: RelativeScheme,
}

impl PipedClient {
    /// Create a new client over the public instances with default settings
    pub async fn new() -> Result<Self> {
        Self::builder().build().await
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Resolve a video id to its best audio stream
    ///
    /// Instances are tried sequentially; the first one returning a usable
    /// payload wins and the remaining ones are not contacted. Every failure
    /// (transport, timeout, status, payload) moves on to the next instance.
    /// When all of them fail the result is `Error::Exhausted` carrying one
    /// entry per attempt.
    pub async fn resolve(&self, video_id: &str) -> ResolutionOutcome {
        debug!(
            "Resolving {} over {} instance(s)",
            video_id,
            self.registry.len()
        );

        let mut attempts = Vec::with_capacity(self.registry.len());

        for instance in self.registry.iter() {
            debug!("Trying {} for {}", instance, video_id);

            match self.try_instance(instance, video_id).await {
                Ok(stream) => {
                    info!(
                        "Resolved {} via {} ({} bps, {})",
                        video_id,
                        instance,
                        stream.bitrate.unwrap_or(0),
                        stream.mime_type
                    );
                    return Ok(stream);
                }
                Err(error) => {
                    warn!("{} failed for {}: {}", instance, video_id, error);
                    attempts.push(InstanceFailure {
                        instance: instance.to_string(),
                        error,
                    });
                }
            }
        }

        warn!(
            "All {} instance(s) failed for {}",
            attempts.len(),
            video_id
        );
        Err(Error::Exhausted {
            video_id: video_id.to_string(),
            attempts,
        })
    }

    /// One bounded attempt against a single instance
    async fn try_instance(
        &self,
        instance: &Instance,
        video_id: &str,
    ) -> std::result::Result<ResolvedStream, InstanceError> {
        let payload = tokio::time::timeout(self.timeout, self.fetch_streams(instance, video_id))
            .await
            .map_err(|_| InstanceError::Timeout(self.timeout))??;

        payload.into_resolved(instance.as_str(), self.relative_scheme)
    }

    /// Fetch and parse `<instance>/streams/<videoId>`
    async fn fetch_streams(
        &self,
        instance: &Instance,
        video_id: &str,
    ) -> std::result::Result<StreamsResponse, InstanceError> {
        let url = instance.streams_url(video_id)?;

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(InstanceError::Status(status));
        }

        // HTML error pages arrive with a 200 too: parse the raw body ourselves
        let body = response.bytes().await?;
        debug!("{} returned {} bytes", instance, body.len());

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Builder for configuring a PipedClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    registry: Option<Arc<InstanceRegistry>>,
    timeout: Duration,
    user_agent: String,
    max_redirects: usize,
    relative_scheme: RelativeScheme,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            registry: None,
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            relative_scheme: RelativeScheme::default(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    ///
    /// The client's own User-Agent and redirect policy are then used as is.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Share an existing registry
    pub fn registry(mut self, registry: Arc<InstanceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use an explicit list of instances
    pub fn instances<I, S>(mut self, instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry = Some(Arc::new(InstanceRegistry::from_instances(instances)));
        self
    }

    /// Set the per-instance timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set how many redirects an instance may issue
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Scheme given to stream URLs returned without one
    pub fn relative_scheme(mut self, scheme: RelativeScheme) -> Self {
        self.relative_scheme = scheme;
        self
    }

    /// Build the client
    pub async fn build(self) -> Result<PipedClient> {
        let client = if let Some(client) = self.client {
            client
        } else {
            let policy = if self.max_redirects == 0 {
                redirect::Policy::none()
            } else {
                redirect::Policy::limited(self.max_redirects)
            };

            Client::builder()
                .user_agent(&self.user_agent)
                .redirect(policy)
                .build()?
        };

        let registry = self.registry.unwrap_or_default();
        if registry.is_empty() {
            return Err(Error::other("instance registry is empty"));
        }

        Ok(PipedClient {
            client,
            registry,
            timeout: self.timeout,
            relative_scheme: self.relative_scheme,
        })
    }
}
