//! Access tokens for the third-party media service.
//!
//! The server never carries audio or video; it only signs a short-lived
//! HS256 credential that lets a client join the media room matching its game
//! room. Spectators get subscribe-only grants.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::json;
use sha2::Sha256;

use crate::config::MediaConfig;

type HmacSha256 = Hmac<Sha256>;

/// What a minted token allows, echoed back to the client alongside it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPermissions {
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

pub fn permissions(is_spectator: bool) -> MediaPermissions {
    MediaPermissions {
        can_publish: !is_spectator,
        can_subscribe: true,
        can_publish_data: true,
    }
}

/// Spectator heuristics carried over from the browser client: an explicit
/// query flag, or a username that calls itself a spectator.
pub fn is_spectator_request(spectator_param: Option<&str>, username: &str) -> bool {
    spectator_param == Some("true") || username.to_lowercase().contains("spectator")
}

/// Mint an HS256 JWT with room-join claims for the media service.
pub fn mint_access_token(
    config: &MediaConfig,
    room: &str,
    user_id: &str,
    username: &str,
    is_spectator: bool,
) -> String {
    let now = chrono::Utc::now().timestamp();
    let grants = permissions(is_spectator);

    let header = json!({"alg": "HS256", "typ": "JWT"});
    let payload = json!({
        "iss": config.api_key,
        "sub": user_id,
        "iat": now,
        "nbf": now,
        "exp": now + config.token_ttl_secs,
        "video": {
            "roomJoin": true,
            "room": room,
            "canPublish": grants.can_publish,
            "canSubscribe": grants.can_subscribe,
            "canPublishData": grants.can_publish_data,
            "canUpdateOwnMetadata": true,
        },
        "metadata": json!({
            "username": username,
            "userId": user_id,
            "isSpectator": is_spectator,
        })
        .to_string(),
    });

    let head = URL_SAFE_NO_PAD.encode(header.to_string());
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    let signing_input = format!("{head}.{body}");

    let mut mac = HmacSha256::new_from_slice(config.api_secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{signing_input}.{signature}")
}
