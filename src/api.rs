//! HTTP API endpoints next to the WebSocket listener.
//!
//! Health, client-side WebRTC configuration, and media-service access
//! tokens. Everything else clients need travels over the socket.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::media::{self, MediaPermissions};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing required parameters")]
    MissingParams,
    #[error("Media token configuration missing")]
    MediaNotConfigured,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingParams => StatusCode::BAD_REQUEST,
            ApiError::MediaNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
    pub connections: usize,
    pub timestamp: String,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: state.room_count().await,
        connections: state.connection_count().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /api/webrtc-config
///
/// ICE servers for the browser's RTCPeerConnection; the negotiated media
/// flows peer-to-peer, not through this process.
pub async fn webrtc_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let ice_servers: Vec<_> = state
        .config
        .ice_servers
        .iter()
        .map(|url| json!({ "urls": url }))
        .collect();
    Json(json!({ "iceServers": ice_servers }))
}

#[derive(Debug, Deserialize)]
pub struct MediaTokenQuery {
    pub room: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub spectator: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTokenResponse {
    pub token: String,
    pub is_spectator: bool,
    pub permissions: MediaPermissions,
}

/// GET /api/media-token?room=..&username=..&userId=..[&spectator=true]
pub async fn media_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaTokenQuery>,
) -> Result<Json<MediaTokenResponse>, ApiError> {
    let (Some(room), Some(username), Some(user_id)) = (query.room, query.username, query.user_id)
    else {
        return Err(ApiError::MissingParams);
    };

    let Some(media_config) = &state.config.media else {
        tracing::error!("media token requested but MEDIA_API_KEY/MEDIA_API_SECRET are not set");
        return Err(ApiError::MediaNotConfigured);
    };

    let is_spectator = media::is_spectator_request(query.spectator.as_deref(), &username);
    tracing::debug!(%user_id, %room, is_spectator, "minting media token");

    let token = media::mint_access_token(media_config, &room, &user_id, &username, is_spectator);
    Ok(Json(MediaTokenResponse {
        token,
        is_spectator,
        permissions: media::permissions(is_spectator),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediaConfig, ServerConfig};

    fn state_with_media() -> Arc<AppState> {
        let config = ServerConfig {
            media: Some(MediaConfig {
                api_key: "devkey".into(),
                api_secret: "devsecret".into(),
                token_ttl_secs: 3600,
            }),
            ..ServerConfig::default()
        };
        Arc::new(AppState::new(config))
    }

    fn query(room: Option<&str>, username: Option<&str>, user_id: Option<&str>) -> MediaTokenQuery {
        MediaTokenQuery {
            room: room.map(String::from),
            username: username.map(String::from),
            user_id: user_id.map(String::from),
            spectator: None,
        }
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let state = state_with_media();
        let Json(body) = health(State(state.clone())).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.rooms, 0);
        assert_eq!(body.connections, 0);
    }

    #[tokio::test]
    async fn test_webrtc_config_lists_ice_servers() {
        let state = state_with_media();
        let Json(body) = webrtc_config(State(state)).await;
        let servers = body["iceServers"].as_array().unwrap();
        assert_eq!(servers.len(), 2);
        assert!(servers[0]["urls"].as_str().unwrap().starts_with("stun:"));
    }

    #[tokio::test]
    async fn test_media_token_requires_all_params() {
        let state = state_with_media();
        let result = media_token(State(state), Query(query(Some("r1"), None, Some("u1")))).await;
        assert!(matches!(result, Err(ApiError::MissingParams)));
    }

    #[tokio::test]
    async fn test_media_token_requires_configuration() {
        let state = Arc::new(AppState::new(ServerConfig::default()));
        let result = media_token(
            State(state),
            Query(query(Some("r1"), Some("Ana"), Some("u1"))),
        )
        .await;
        assert!(matches!(result, Err(ApiError::MediaNotConfigured)));
    }

    #[tokio::test]
    async fn test_media_token_success_echoes_permissions() {
        let state = state_with_media();
        let Json(body) = media_token(
            State(state),
            Query(query(Some("r1"), Some("Ana"), Some("u1"))),
        )
        .await
        .expect("token minted");
        assert!(!body.is_spectator);
        assert!(body.permissions.can_publish);
        assert_eq!(body.token.split('.').count(), 3);
    }
}
