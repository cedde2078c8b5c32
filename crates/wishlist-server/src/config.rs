use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use wishlist_types::{GuestName, UserId};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Undelivered events buffered per live connection.
    pub room_channel_capacity: usize,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    pub max_guest_name_len: usize,
    /// Static bearer tokens accepted by [`crate::StaticTokenAuth`].
    pub tokens: Vec<TokenEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            room_channel_capacity: 16,
            allowed_origins: vec![
                "http://localhost:5173".into(),
                "http://localhost:3000".into(),
            ],
            max_guest_name_len: GuestName::MAX_LEN,
            tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: UserId,
}
