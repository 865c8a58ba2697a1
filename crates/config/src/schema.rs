//! Config file schema.

use {
    serde::{Deserialize, Serialize},
    twitch_polly_voice::PollyConfig,
};

/// Root of `twitch-polly.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Proxy connection and request defaults (`[polly]`).
    pub polly: PollyConfig,
}
