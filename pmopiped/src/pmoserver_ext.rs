//! Extension pmoserver pour Piped
//!
//! Ce module fournit un trait d'extension pour ajouter le résolveur Piped
//! à un serveur pmoserver.

use crate::api_rest::PipedState;
use crate::client::PipedClient;
use anyhow::Result;
use std::sync::Arc;

/// Trait pour étendre pmoserver avec le résolveur Piped
///
/// `pmoserver` reste un serveur HTTP générique : c'est `pmopiped` qui ajoute
/// ses routes via ce trait, sans que le serveur dépende de `pmopiped`.
///
/// # Exemple
///
/// ```rust,no_run
/// use pmopiped::PipedExt;
/// use pmoserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///
///     server.init_piped().await?;
///
///     server.start().await;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait PipedExt {
    /// Initialise le résolveur depuis la configuration et enregistre les routes
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /`, `GET /watch?v=<id>` - Redirection vers le flux audio
    /// - `GET /info/{id}` - Métadonnées JSON
    /// - `GET /stream/{id}` - Relais des octets audio
    /// - `GET /health`, `GET /instances`
    /// - `GET /player/` - Lecteur HTML embarqué
    /// - `GET /swagger-ui/piped` - Documentation OpenAPI
    async fn init_piped(&mut self) -> Result<Arc<PipedState>>;

    /// Comme `init_piped()`, avec un client déjà construit
    async fn init_piped_with_client(
        &mut self,
        client: Arc<PipedClient>,
    ) -> Result<Arc<PipedState>>;
}

// L'implémentation du trait est dans pmoserver_impl.rs
