//! Proxy HTTP server
//!
//! `GET /images` relabels the album listing as `{ "uuid": [...] }`.
//! `GET /image/{id}?w=&h=` fetches metadata and preview bytes, composes the
//! frame on the blocking pool and returns it as JPEG.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use super::caption::caption_lines;
use super::errors::ProxyError;
use crate::compose::{letterbox, CaptionRenderer, CompositionRequest};
use crate::config::ProxyConfig;
use crate::photos::{ImageList, PhotoClient};

/// Shared, read-only request context
#[derive(Clone)]
pub struct ProxyState {
    client: PhotoClient,
    captions: Arc<CaptionRenderer>,
    config: Arc<ProxyConfig>,
}

impl ProxyState {
    pub fn new(client: PhotoClient, captions: Arc<CaptionRenderer>, config: ProxyConfig) -> Self {
        Self {
            client,
            captions,
            config: Arc::new(config),
        }
    }
}

/// Optional output size overrides; `?w=&h=` means "not given"
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub w: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub h: Option<u32>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/images", get(list_images))
        .route("/image/:id", get(get_image))
        .with_state(state)
}

async fn list_images(State(state): State<ProxyState>) -> Result<Json<ImageList>, ProxyError> {
    let uuid = state.client.album_image_ids(&state.config.album_id).await?;
    debug!(count = uuid.len(), "Serving image list");
    Ok(Json(ImageList { uuid }))
}

async fn get_image(
    State(state): State<ProxyState>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, ProxyError> {
    let width = query.w.unwrap_or(state.config.default_width);
    let height = query.h.unwrap_or(state.config.default_height);
    letterbox::check_size(width, height)?;

    let asset = state.client.asset(&id).await?;
    let source = state.client.thumbnail(&id).await?;

    let request = CompositionRequest {
        source,
        width,
        height,
        caption_lines: caption_lines(&asset),
    };
    let captions = Arc::clone(&state.captions);
    let quality = state.config.jpeg_quality;

    let jpeg = tokio::task::spawn_blocking(move || request.render_jpeg(&captions, quality))
        .await
        .map_err(|e| ProxyError::Task(e.to_string()))??;

    info!(id = %id, width = width, height = height, size = jpeg.len(), "Served image");
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}

/// Bound proxy server
pub struct ProxyServer {
    state: ProxyState,
}

impl ProxyServer {
    pub fn new(state: ProxyState) -> Self {
        Self { state }
    }

    /// Serve until `shutdown` completes
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listen = self.state.config.listen;
        let listener = tokio::net::TcpListener::bind(listen)
            .await
            .with_context(|| format!("Failed to bind {}", listen))?;

        info!(listen = %listen, album = %self.state.config.album_id, "Proxy listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("Proxy server error")?;

        info!("Proxy stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::CaptionStyle;
    use crate::config::{ClientConfig, DEFAULT_HEIGHT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WIDTH};
    use axum::http::StatusCode;
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::json;
    use std::io::Cursor;
    use std::net::SocketAddr;

    fn preview_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(160, 120, Rgb([90, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Stand-in for the photo server
    async fn spawn_photo_server() -> SocketAddr {
        let app = Router::new()
            .route(
                "/api/albums/:id",
                get(|| async {
                    Json(json!({"assets": [
                        {"id": "p1", "type": "IMAGE"},
                        {"id": "v1", "type": "VIDEO"},
                        {"id": "bad", "type": "IMAGE"}
                    ]}))
                }),
            )
            .route(
                "/api/assets/:id",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    Ok(Json(json!({
                        "id": id,
                        "localDateTime": "2023-06-01T12:00:00.000Z",
                        "exifInfo": {"city": "Paris", "state": "Île-de-France", "country": "France"}
                    })))
                }),
            )
            .route(
                "/api/assets/:id/thumbnail",
                get(|Path(id): Path<String>| async move {
                    if id == "bad" {
                        b"<html>oops</html>".to_vec()
                    } else {
                        preview_png()
                    }
                }),
            );
        serve(app).await
    }

    fn state_for(upstream: &str) -> ProxyState {
        let client = PhotoClient::new(ClientConfig::new(upstream, None, DEFAULT_REQUEST_TIMEOUT)).unwrap();
        // No fonts: keeps the tests independent of the host
        let captions = Arc::new(CaptionRenderer::with_fontdb(
            CaptionStyle::default(),
            Arc::new(usvg::fontdb::Database::new()),
        ));
        let config = ProxyConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            album_id: "frame".to_string(),
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            font_family: CaptionStyle::default().font_family,
            font_dir: None,
            jpeg_quality: 90,
        };
        ProxyState::new(client, captions, config)
    }

    async fn spawn_proxy(upstream: &str) -> String {
        let addr = serve(router(state_for(upstream))).await;
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_images_lists_album_images() {
        let upstream = spawn_photo_server().await;
        let proxy = spawn_proxy(&format!("http://{}/api", upstream)).await;

        let list: ImageList = reqwest::get(format!("{}/images", proxy))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list.uuid, vec!["p1", "bad"]);
    }

    #[tokio::test]
    async fn test_image_default_and_explicit_size() {
        let upstream = spawn_photo_server().await;
        let proxy = spawn_proxy(&format!("http://{}/api", upstream)).await;

        let response = reqwest::get(format!("{}/image/p1", proxy)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let frame = image::load_from_memory(&response.bytes().await.unwrap()).unwrap();
        assert_eq!((frame.width(), frame.height()), (1920, 1080));

        let response = reqwest::get(format!("{}/image/p1?w=&h=", proxy)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let frame = image::load_from_memory(&response.bytes().await.unwrap()).unwrap();
        assert_eq!((frame.width(), frame.height()), (1920, 1080));

        let response = reqwest::get(format!("{}/image/p1?w=320&h=240", proxy)).await.unwrap();
        let frame = image::load_from_memory(&response.bytes().await.unwrap()).unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 240));
    }

    #[test]
    fn test_image_query_empty_values() {
        let parse = |uri: &str| Query::<ImageQuery>::try_from_uri(&uri.parse().unwrap()).map(|q| q.0);

        let query = parse("/image/p1?w=&h=").unwrap();
        assert_eq!((query.w, query.h), (None, None));

        let query = parse("/image/p1").unwrap();
        assert_eq!((query.w, query.h), (None, None));

        let query = parse("/image/p1?w=800&h=").unwrap();
        assert_eq!((query.w, query.h), (Some(800), None));

        assert!(parse("/image/p1?w=wide").is_err());
    }

    #[tokio::test]
    async fn test_image_errors() {
        let upstream = spawn_photo_server().await;
        let proxy = spawn_proxy(&format!("http://{}/api", upstream)).await;

        let status = |path: &'static str| {
            let url = format!("{}{}", proxy, path);
            async move { reqwest::get(url).await.unwrap().status() }
        };

        assert_eq!(status("/image/missing").await, StatusCode::NOT_FOUND);
        assert_eq!(status("/image/bad").await, StatusCode::BAD_GATEWAY);
        assert_eq!(status("/image/p1?w=0").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/image/p1?w=wide").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let proxy = spawn_proxy("http://127.0.0.1:1/api").await;

        let response = reqwest::get(format!("{}/images", proxy)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let response = reqwest::get(format!("{}/image/p1", proxy)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
