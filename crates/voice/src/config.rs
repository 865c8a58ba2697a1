//! Client configuration types.

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

use crate::tts::{Engine, OutputFormat, SampleRate, TextType};

/// Default proxy address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Connection and request defaults for the Polly proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollyConfig {
    /// Proxy origin; operation paths are resolved against it.
    pub base_url: String,

    /// Value for the `authorization` header, forwarded verbatim.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret",
        deserialize_with = "deserialize_option_secret"
    )]
    pub authorization: Option<Secret<String>>,

    /// Request defaults used when a flag is not given.
    pub defaults: SynthesisDefaults,
}

impl Default for PollyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            authorization: None,
            defaults: SynthesisDefaults::default(),
        }
    }
}

/// Defaults applied to voice listing and synthesis requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisDefaults {
    /// Voice to synthesize with (e.g. "Joanna").
    pub voice_id: Option<String>,
    pub engine: Engine,
    /// Language for bilingual voices, also the voice listing filter.
    pub language_code: Option<String>,
    pub text_type: TextType,
    pub output_format: OutputFormat,
    pub sample_rate: SampleRate,
    pub include_additional_language_codes: bool,
}

impl Default for SynthesisDefaults {
    fn default() -> Self {
        Self {
            voice_id: None,
            engine: Engine::Standard,
            language_code: None,
            text_type: TextType::Text,
            output_format: OutputFormat::Mp3,
            sample_rate: SampleRate::Hz24000,
            include_additional_language_codes: true,
        }
    }
}

// ── Secret serialization helpers ───────────────────────────────────────────

fn serialize_option_secret<S>(
    value: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use secrecy::ExposeSecret;
    match value {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_option_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(Secret::new))
}
