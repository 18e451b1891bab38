//! Environment-driven configuration, loaded once at startup.

use std::net::SocketAddr;

/// STUN fallbacks matching what the browser client previously hardcoded.
const DEFAULT_ICE_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port for the HTTP/WebSocket listener.
    pub port: u16,
    /// STUN/TURN URLs handed to clients for peer negotiation. The media path
    /// itself never touches this server.
    pub ice_servers: Vec<String>,
    /// Media-service token signing; None disables the token endpoint.
    pub media: Option<MediaConfig>,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub api_key: String,
    pub api_secret: String,
    pub token_ttl_secs: i64,
}

impl ServerConfig {
    /// Load config from environment variables: PORT, ICE_SERVERS
    /// (comma-separated URLs), MEDIA_API_KEY / MEDIA_API_SECRET /
    /// MEDIA_TOKEN_TTL_SECS.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let ice_servers: Vec<String> = std::env::var("ICE_SERVERS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let ice_servers = if ice_servers.is_empty() {
            DEFAULT_ICE_SERVERS.iter().map(|s| s.to_string()).collect()
        } else {
            ice_servers
        };

        let media = MediaConfig::from_env();
        if media.is_none() {
            tracing::warn!("Media tokens DISABLED - /api/media-token will return an error");
        }

        Self {
            port,
            ice_servers,
            media,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ice_servers: DEFAULT_ICE_SERVERS.iter().map(|s| s.to_string()).collect(),
            media: None,
        }
    }
}

impl MediaConfig {
    /// MEDIA_API_KEY and MEDIA_API_SECRET must both be set to enable token
    /// minting.
    fn from_env() -> Option<Self> {
        let api_key = std::env::var("MEDIA_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let api_secret = std::env::var("MEDIA_API_SECRET")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        match (api_key, api_secret) {
            (Some(api_key), Some(api_secret)) => {
                let token_ttl_secs = std::env::var("MEDIA_TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
                tracing::info!("Media token signing enabled");
                Some(Self {
                    api_key,
                    api_secret,
                    token_ttl_secs,
                })
            }
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "MEDIA_API_KEY and MEDIA_API_SECRET must both be set to enable media tokens"
                );
                None
            }
        }
    }
}
