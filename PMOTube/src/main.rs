use pmopiped::PipedExt;
use pmoserver::ServerBuilder;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    server
        .add_route("/version", || async {
            serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;

    // ========== PHASE 2 : Résolveur Piped ==========

    info!("🎵 Initializing Piped resolver...");
    let state = server.init_piped().await?;

    let config = pmoconfig::get_config();
    info!(
        "✅ {} instance(s) ready, config in {}",
        state.client.registry().len(),
        config.directory()
    );

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await;

    let info = server.info();
    info!("✅ PMOTube is ready on http://{}:{}", info.base_url, info.http_port);
    info!("   player:  http://{}:{}/player/", info.base_url, info.http_port);
    info!("   swagger: http://{}:{}/swagger-ui/piped", info.base_url, info.http_port);
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
