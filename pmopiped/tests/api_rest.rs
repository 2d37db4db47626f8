//! Integration tests for the HTTP routes

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pmopiped::{create_router, PipedClient, PipedState, StreamRelay};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO_ID: &str = "dQw4w9WgXcQ";

/// Router over a single mocked instance that knows `VIDEO_ID` only
async fn setup() -> (MockServer, Router) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/streams/{}", VIDEO_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Never Gonna Give You Up",
            "uploader": "Rick Astley",
            "duration": 213,
            "audioStreams": [
                { "url": format!("{}/media/low", server.uri()), "bitrate": 48000, "mimeType": "audio/mp4" },
                { "url": format!("{}/media/high", server.uri()), "bitrate": 160000, "mimeType": "audio/webm" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/streams/unknown"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "not found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/high"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"OPUSDATA".to_vec(), "audio/webm"))
        .mount(&server)
        .await;

    let client = PipedClient::builder()
        .instances([server.uri()])
        .build()
        .await
        .unwrap();
    let state = PipedState::new(Arc::new(client), Arc::new(StreamRelay::new().unwrap()));

    (server, create_router(state))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (_server, app) = setup().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_watch_without_id_shows_usage() {
    let (_server, app) = setup().await;

    for uri in ["/watch", "/watch?v=", "/"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let html = body_string(response).await;
        assert!(html.contains("/watch?v="));
        assert!(html.contains("1 Piped instance(s)"));
    }
}

#[tokio::test]
async fn test_watch_redirects_to_best_stream() {
    let (server, app) = setup().await;

    let response = app
        .oneshot(get(&format!("/watch?v={}", VIDEO_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("{}/media/high", server.uri()).as_str()
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_root_with_id_behaves_like_watch() {
    let (_server, app) = setup().await;

    let response = app
        .oneshot(get(&format!("/?v={}", VIDEO_ID)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_watch_unknown_video_is_not_found() {
    let (_server, app) = setup().await;

    let response = app.oneshot(get("/watch?v=unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_string(response).await,
        "Video not found or no audio available"
    );
}

#[tokio::test]
async fn test_info_returns_resolved_stream() {
    let (server, app) = setup().await;

    let response = app
        .oneshot(get(&format!("/info/{}", VIDEO_ID)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let info: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(info["url"], format!("{}/media/high", server.uri()));
    assert_eq!(info["title"], "Never Gonna Give You Up");
    assert_eq!(info["author"], "Rick Astley");
    assert_eq!(info["duration"], 213);
    assert_eq!(info["mimeType"], "audio/webm");
    assert_eq!(info["bitrate"], 160000);
}

#[tokio::test]
async fn test_info_unknown_video_is_json_not_found() {
    let (_server, app) = setup().await;

    let response = app.oneshot(get("/info/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let error: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(error["error"], "Video not found or no audio available");
}

#[tokio::test]
async fn test_stream_relays_audio() {
    let (_server, app) = setup().await;

    let response = app
        .oneshot(get(&format!("/stream/{}", VIDEO_ID)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/webm");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(body_string(response).await, "OPUSDATA");
}

#[tokio::test]
async fn test_stream_unknown_video_is_not_found() {
    let (_server, app) = setup().await;

    let response = app.oneshot(get("/stream/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_instances_lists_registry() {
    let (server, app) = setup().await;

    let response = app.oneshot(get("/instances")).await.unwrap();
    let listing: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["instances"][0], server.uri());
}
