//! YouTube audio over a pool of Piped instances
//!
//! This crate resolves a YouTube video id into a directly playable audio
//! stream by asking a list of [Piped](https://github.com/TeamPiped/Piped)
//! API instances in turn, and optionally relays the audio bytes itself.
//!
//! # Features
//!
//! - **Failover**: instances are tried sequentially, each attempt bounded by
//!   a timeout; the first usable answer wins
//! - **Best quality**: the audio candidate with the highest bitrate is picked
//! - **Relay**: byte-for-byte proxy with `Range` support and permissive CORS
//! - **HTTP API**: redirect, JSON info, relay, health and instance listing
//! - **Configuration Extension**: typed `piped.*` keys on `pmoconfig::Config`
//!
//! # Example
//!
//! ```no_run
//! use pmopiped::PipedClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PipedClient::builder()
//!         .instances(["http://localhost:8081", "pipedapi.kavin.rocks"])
//!         .build()
//!         .await?;
//!
//!     let stream = client.resolve("dQw4w9WgXcQ").await?;
//!     println!("{}", stream.url);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Server Extension
//!
//! With the `server` feature (default), the `PipedExt` trait mounts the
//! whole HTTP surface on a `pmoserver::Server`; see the `pmoserver_ext`
//! module for a usage example.

pub mod api_rest;
pub mod client;
pub mod error;
pub mod instances;
pub mod models;
pub mod relay;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

#[cfg(feature = "server")]
pub mod pmoserver_ext;

#[cfg(feature = "server")]
mod pmoserver_impl;

// Re-exports for convenience
pub use api_rest::{create_router, PipedApiDoc, PipedState};
pub use client::{ClientBuilder, PipedClient, ResolutionOutcome};
pub use error::{Error, InstanceError, InstanceFailure, Result};
pub use instances::{Instance, InstanceRegistry, DEFAULT_PUBLIC_INSTANCES};
pub use models::{
    normalize_stream_url, select_best_candidate, AudioCandidate, RelativeScheme, ResolvedStream,
    StreamsResponse,
};
pub use relay::StreamRelay;

#[cfg(feature = "pmoconfig")]
pub use config_ext::PipedConfigExt;

#[cfg(feature = "server")]
pub use pmoserver_ext::PipedExt;
