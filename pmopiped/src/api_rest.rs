//! Endpoints HTTP du résolveur Piped
//!
//! - `GET /` : page d'usage (ou redirection si `?v=` est fourni)
//! - `GET /watch?v=<id>` : redirection 302 vers le flux audio
//! - `GET /info/{id}` : métadonnées JSON du flux choisi
//! - `GET /stream/{id}` : relais des octets audio
//! - `GET /health` : sonde de vie
//! - `GET /instances` : instances configurées, dans l'ordre d'essai

use crate::client::PipedClient;
use crate::models::ResolvedStream;
use crate::relay::StreamRelay;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Message renvoyé quand une vidéo ne peut pas être résolue
pub const NOT_FOUND_MESSAGE: &str = "Video not found or no audio available";

/// État partagé par les handlers
#[derive(Clone)]
pub struct PipedState {
    pub client: Arc<PipedClient>,
    pub relay: Arc<StreamRelay>,
}

impl PipedState {
    pub fn new(client: Arc<PipedClient>, relay: Arc<StreamRelay>) -> Self {
        Self { client, relay }
    }
}

// ============ Gestion des erreurs ============

enum AppError {
    /// Réponse texte (routes `/watch` et `/stream`)
    NotFoundText,
    /// Réponse JSON (route `/info`)
    NotFoundJson(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFoundText => (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response(),
            Self::NotFoundJson(message) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody { error: message }),
            )
                .into_response(),
        }
    }
}

/// Corps JSON des erreurs
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Paramètres de `/watch` et `/`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WatchQuery {
    /// Identifiant de la vidéo YouTube
    pub v: Option<String>,
}

impl WatchQuery {
    fn video_id(&self) -> Option<&str> {
        self.v.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Instances configurées
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstancesResponse {
    pub count: usize,
    pub instances: Vec<String>,
}

/// Crée le router du résolveur
///
/// Toutes les réponses portent `Access-Control-Allow-Origin: *`.
pub fn create_router(state: PipedState) -> Router {
    Router::new()
        .route("/", get(watch))
        .route("/watch", get(watch))
        .route("/info/{id}", get(get_info))
        .route("/stream/{id}", get(stream))
        .route("/health", get(health))
        .route("/instances", get(list_instances))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}

// ============================================================================
// Handlers des routes
// ============================================================================

/// GET /watch?v=<id> (et GET /)
/// Redirige vers le meilleur flux audio de la vidéo
#[utoipa::path(
    get,
    path = "/watch",
    tag = "piped",
    params(WatchQuery),
    responses(
        (status = 302, description = "Redirection vers le flux audio"),
        (status = 200, description = "Page d'usage quand `v` est absent", content_type = "text/html"),
        (status = 404, description = "Aucun flux audio disponible", body = String, content_type = "text/plain")
    )
)]
async fn watch(State(state): State<PipedState>, Query(query): Query<WatchQuery>) -> Response {
    match query.video_id() {
        Some(video_id) => redirect_to_stream(&state, video_id).await,
        None => usage_page(&state),
    }
}

async fn redirect_to_stream(state: &PipedState, video_id: &str) -> Response {
    match state.client.resolve(video_id).await {
        Ok(stream) => {
            info!("Redirecting {} to {}", video_id, stream.instance);
            (StatusCode::FOUND, [(header::LOCATION, stream.url)]).into_response()
        }
        Err(e) => {
            debug!("{}", e);
            AppError::NotFoundText.into_response()
        }
    }
}

/// GET /info/{id}
/// Renvoie le flux retenu en JSON
#[utoipa::path(
    get,
    path = "/info/{id}",
    tag = "piped",
    params(
        ("id" = String, Path, description = "Identifiant de la vidéo YouTube")
    ),
    responses(
        (status = 200, description = "Flux audio retenu", body = ResolvedStream),
        (status = 404, description = "Aucun flux audio disponible", body = ErrorBody)
    )
)]
async fn get_info(
    State(state): State<PipedState>,
    Path(id): Path<String>,
) -> Result<Json<ResolvedStream>, AppError> {
    let stream = state.client.resolve(&id).await.map_err(|e| {
        debug!("{}", e);
        AppError::NotFoundJson(NOT_FOUND_MESSAGE.to_string())
    })?;

    Ok(Json(stream))
}

/// GET /stream/{id}
/// Relaie les octets audio en respectant `Range`
#[utoipa::path(
    get,
    path = "/stream/{id}",
    tag = "piped",
    params(
        ("id" = String, Path, description = "Identifiant de la vidéo YouTube")
    ),
    responses(
        (status = 200, description = "Flux audio complet"),
        (status = 206, description = "Plage d'octets demandée"),
        (status = 404, description = "Aucun flux audio disponible", body = String, content_type = "text/plain"),
        (status = 502, description = "Erreur de l'amont", body = String, content_type = "text/plain")
    )
)]
async fn stream(
    State(state): State<PipedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let resolved = state.client.resolve(&id).await.map_err(|e| {
        debug!("{}", e);
        AppError::NotFoundText
    })?;

    info!("Relaying {} from {}", id, resolved.instance);
    Ok(state.relay.relay(&resolved.url, &headers).await)
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    tag = "piped",
    responses(
        (status = 200, description = "Service opérationnel", body = String, content_type = "text/plain")
    )
)]
async fn health() -> &'static str {
    "OK"
}

/// GET /instances
#[utoipa::path(
    get,
    path = "/instances",
    tag = "piped",
    responses(
        (status = 200, description = "Instances dans l'ordre d'essai", body = InstancesResponse)
    )
)]
async fn list_instances(State(state): State<PipedState>) -> Json<InstancesResponse> {
    let instances = state.client.registry().hosts();
    Json(InstancesResponse {
        count: instances.len(),
        instances,
    })
}

fn usage_page(state: &PipedState) -> Response {
    let count = state.client.registry().len();
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>PMOTube</title>
  <style>
    body {{ font-family: sans-serif; max-width: 640px; margin: 40px auto; padding: 0 20px; }}
    code {{ background: #f0f0f0; padding: 2px 6px; border-radius: 4px; }}
    li {{ margin: 6px 0; }}
  </style>
</head>
<body>
  <h1>PMOTube</h1>
  <p>YouTube audio through {count} Piped instance(s).</p>
  <ul>
    <li><code>/watch?v=VIDEO_ID</code> redirects to the audio stream</li>
    <li><code>/info/VIDEO_ID</code> returns the stream metadata as JSON</li>
    <li><code>/stream/VIDEO_ID</code> relays the audio bytes</li>
    <li><code>/instances</code> lists the instances in retry order</li>
    <li><code>/health</code> liveness check</li>
  </ul>
  <p>Example: <a href="/watch?v=dQw4w9WgXcQ">/watch?v=dQw4w9WgXcQ</a></p>
</body>
</html>
"#
    ))
    .into_response()
}

/// Documentation OpenAPI des routes du résolveur
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PMOTube Piped API",
        version = "0.1.0",
        description = "Résolution et relais de flux audio YouTube via des instances Piped",
    ),
    paths(watch, get_info, stream, health, list_instances),
    components(schemas(ResolvedStream, ErrorBody, InstancesResponse)),
    tags(
        (name = "piped", description = "Résolution de flux audio")
    )
)]
pub struct PipedApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_video_id_is_ignored() {
        let query = WatchQuery {
            v: Some("  ".to_string()),
        };
        assert_eq!(query.video_id(), None);
        assert_eq!(WatchQuery::default().video_id(), None);
        assert_eq!(
            WatchQuery {
                v: Some("abc".to_string())
            }
            .video_id(),
            Some("abc")
        );
    }

    #[test]
    fn test_openapi_lists_json_routes() {
        let doc = PipedApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/info/{id}"));
        assert!(doc.paths.paths.contains_key("/instances"));
    }

    #[test]
    fn test_openapi_descriptions_come_from_handler_docs() {
        let doc = PipedApiDoc::openapi();
        let watch = doc.paths.paths["/watch"].get.as_ref().unwrap();
        assert!(watch
            .description
            .as_deref()
            .unwrap_or_default()
            .contains("Redirige vers le meilleur flux audio"));

        let stream = doc.paths.paths["/stream/{id}"].get.as_ref().unwrap();
        assert!(stream
            .description
            .as_deref()
            .unwrap_or_default()
            .contains("Relaie les octets audio"));
    }
}
