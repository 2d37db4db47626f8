//! Implémentation du trait PipedExt pour pmoserver::Server

use crate::api_rest::{create_router, PipedApiDoc, PipedState};
use crate::client::PipedClient;
use crate::config_ext::PipedConfigExt;
use crate::instances::InstanceRegistry;
use crate::pmoserver_ext::PipedExt;
use crate::relay::{StreamRelay, DEFAULT_CONNECT_TIMEOUT_MS};
use anyhow::Result;
use pmoserver::Server;
use rust_embed::RustEmbed;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use utoipa::OpenApi;

/// Lecteur HTML servi sous `/player`
#[derive(RustEmbed, Clone)]
#[folder = "webapp"]
struct PlayerApp;

impl PipedExt for Server {
    async fn init_piped(&mut self) -> Result<Arc<PipedState>> {
        info!("Initializing Piped resolver...");

        let config = pmoconfig::get_config();
        let registry = InstanceRegistry::new(config.get_piped_primary_instance()?);

        let client = PipedClient::builder()
            .registry(Arc::new(registry))
            .timeout(Duration::from_millis(config.get_piped_request_timeout_ms()?))
            .user_agent(config.get_piped_user_agent()?)
            .max_redirects(config.get_piped_max_redirects()?)
            .relative_scheme(config.get_piped_relative_url_scheme()?)
            .build()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create Piped client: {}", e))?;

        self.init_piped_with_client(Arc::new(client)).await
    }

    async fn init_piped_with_client(
        &mut self,
        client: Arc<PipedClient>,
    ) -> Result<Arc<PipedState>> {
        let user_agent = pmoconfig::get_config().get_piped_user_agent()?;
        let relay = StreamRelay::with_settings(
            &user_agent,
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create stream relay: {}", e))?;

        let state = PipedState::new(client, Arc::new(relay));

        self.add_router("/", create_router(state.clone())).await;
        self.add_dir::<PlayerApp>("/player").await;
        self.add_openapi_docs(PipedApiDoc::openapi(), "piped").await;

        info!(
            "Piped resolver initialized with {} instance(s)",
            state.client.registry().len()
        );
        for (rank, instance) in state.client.registry().iter().enumerate() {
            info!("  {}. {}", rank + 1, instance);
        }

        Ok(Arc::new(state))
    }
}
