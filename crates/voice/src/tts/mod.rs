//! Polly request and response types.

mod polly;

pub use polly::PollyClient;

use std::{borrow::Cow, fmt, str::FromStr};

use {
    anyhow::{Context, Result, anyhow},
    bytes::Bytes,
    reqwest::{
        StatusCode,
        header::{AUTHORIZATION, HeaderMap, HeaderValue},
    },
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Deserializer, Serialize, Serializer},
};

use crate::{config::SynthesisDefaults, ssml};

/// Error returned when a string is not one of an enum's wire values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseValueError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseValueError {
    fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Synthesis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Standard,
    Neural,
}

impl Engine {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Neural => "neural",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "neural" => Ok(Self::Neural),
            _ => Err(ParseValueError::new("engine", s, "standard, neural")),
        }
    }
}

/// Whether the input text is plain text or SSML markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    #[default]
    Text,
    Ssml,
}

impl TextType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ssml => "ssml",
        }
    }
}

impl fmt::Display for TextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "ssml" => Ok(Self::Ssml),
            _ => Err(ParseValueError::new("text type", s, "text, ssml")),
        }
    }
}

/// Encoding of the synthesis response body.
///
/// `Json` returns speech marks instead of audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Json,
    #[default]
    Mp3,
    OggVorbis,
    Pcm,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::Pcm => "pcm",
        }
    }

    /// MIME type the service answers with for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/x-json-stream",
            Self::Mp3 => "audio/mpeg",
            Self::OggVorbis => "audio/ogg",
            Self::Pcm => "audio/pcm",
        }
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Pcm => "pcm",
        }
    }

    /// Sample rates the service accepts for this format.
    ///
    /// Speech marks carry no audio, so every rate is ignored rather than
    /// rejected and the list is empty.
    #[must_use]
    pub fn supported_sample_rates(&self) -> &'static [SampleRate] {
        match self {
            Self::Json => &[],
            Self::Mp3 | Self::OggVorbis => &[
                SampleRate::Hz8000,
                SampleRate::Hz16000,
                SampleRate::Hz22050,
                SampleRate::Hz24000,
            ],
            Self::Pcm => &[SampleRate::Hz8000, SampleRate::Hz16000],
        }
    }

    #[must_use]
    pub fn supports_sample_rate(&self, rate: SampleRate) -> bool {
        *self == Self::Json || self.supported_sample_rates().contains(&rate)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "mp3" => Ok(Self::Mp3),
            "ogg_vorbis" => Ok(Self::OggVorbis),
            "pcm" => Ok(Self::Pcm),
            _ => Err(ParseValueError::new(
                "output format",
                s,
                "json, mp3, ogg_vorbis, pcm",
            )),
        }
    }
}

/// Audio sample rate in Hz. Sent as a string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRate {
    Hz8000,
    Hz16000,
    Hz22050,
    #[default]
    Hz24000,
}

impl SampleRate {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hz8000 => "8000",
            Self::Hz16000 => "16000",
            Self::Hz22050 => "22050",
            Self::Hz24000 => "24000",
        }
    }

    pub fn from_hz(hz: u32) -> Result<Self, ParseValueError> {
        match hz {
            8000 => Ok(Self::Hz8000),
            16000 => Ok(Self::Hz16000),
            22050 => Ok(Self::Hz22050),
            24000 => Ok(Self::Hz24000),
            _ => Err(ParseValueError::new(
                "sample rate",
                &hz.to_string(),
                "8000, 16000, 22050, 24000",
            )),
        }
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleRate {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map_err(|_| ParseValueError::new("sample rate", s, "8000, 16000, 22050, 24000"))
            .and_then(Self::from_hz)
    }
}

impl Serialize for SampleRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Config files may spell the rate either as "16000" or as 16000.
impl<'de> Deserialize<'de> for SampleRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u32),
        }

        let rate = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse(),
            Raw::Number(hz) => Self::from_hz(hz),
        };
        rate.map_err(serde::de::Error::custom)
    }
}

/// A voice returned by `DescribeVoices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Voice {
    #[serde(default)]
    pub gender: String,
    /// Identifier to pass as `VoiceId` when synthesizing.
    pub id: String,
    pub language_code: String,
    #[serde(default)]
    pub language_name: String,
    pub name: String,
    /// Extra languages a bilingual voice can speak.
    #[serde(default)]
    pub additional_language_codes: Vec<String>,
    /// Engine names as reported by the service. Kept as strings so engines
    /// this crate does not model still decode.
    #[serde(default)]
    pub supported_engines: Vec<String>,
}

impl Voice {
    #[must_use]
    pub fn supports_engine(&self, engine: Engine) -> bool {
        self.supported_engines
            .iter()
            .any(|e| e.eq_ignore_ascii_case(engine.as_str()))
    }
}

/// Query for the voice listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeVoicesRequest {
    pub engine: Engine,
    /// Language filter; `None` lists every language.
    pub language_code: Option<String>,
    /// Include bilingual voices whose additional language matches the filter.
    pub include_additional_language_codes: bool,
}

impl Default for DescribeVoicesRequest {
    fn default() -> Self {
        Self {
            engine: Engine::Standard,
            language_code: None,
            include_additional_language_codes: true,
        }
    }
}

impl DescribeVoicesRequest {
    /// Query parameters in wire order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("Engine", Cow::Borrowed(self.engine.as_str())),
            (
                "LanguageCode",
                Cow::Borrowed(self.language_code.as_deref().unwrap_or_default()),
            ),
            (
                "IncludeAdditionalLanguageCodes",
                Cow::Borrowed(if self.include_additional_language_codes {
                    "true"
                } else {
                    "false"
                }),
            ),
        ]
    }
}

/// Request to synthesize speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizeRequest {
    /// Plain text, or SSML when `text_type` is [`TextType::Ssml`].
    pub text: String,
    pub voice_id: String,
    pub text_type: TextType,
    pub engine: Engine,
    /// Only needed to pick the second language of a bilingual voice.
    pub language_code: Option<String>,
    pub output_format: OutputFormat,
    pub sample_rate: SampleRate,
}

impl SynthesizeRequest {
    /// Plain-text request with the service defaults.
    #[must_use]
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            text_type: TextType::Text,
            engine: Engine::Standard,
            language_code: None,
            output_format: OutputFormat::Mp3,
            sample_rate: SampleRate::Hz24000,
        }
    }

    /// SSML request with the service defaults.
    #[must_use]
    pub fn ssml(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text_type: TextType::Ssml,
            ..Self::new(text, voice_id)
        }
    }

    /// Request populated from configured defaults.
    #[must_use]
    pub fn from_defaults(
        text: impl Into<String>,
        voice_id: impl Into<String>,
        defaults: &SynthesisDefaults,
    ) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            text_type: defaults.text_type,
            engine: defaults.engine,
            language_code: defaults.language_code.clone(),
            output_format: defaults.output_format,
            sample_rate: defaults.sample_rate,
        }
    }

    /// The text as it goes on the wire: SSML is normalized, plain text is
    /// passed through.
    #[must_use]
    pub fn wire_text(&self) -> Cow<'_, str> {
        match self.text_type {
            TextType::Ssml => Cow::Owned(ssml::normalize(&self.text)),
            TextType::Text => Cow::Borrowed(&self.text),
        }
    }

    /// Query parameters in wire order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("Text", self.wire_text()),
            ("VoiceId", Cow::Borrowed(&self.voice_id)),
            ("TextType", Cow::Borrowed(self.text_type.as_str())),
            ("Engine", Cow::Borrowed(self.engine.as_str())),
            (
                "LanguageCode",
                Cow::Borrowed(self.language_code.as_deref().unwrap_or_default()),
            ),
            ("OutputFormat", Cow::Borrowed(self.output_format.as_str())),
            ("SampleRate", Cow::Borrowed(self.sample_rate.as_str())),
        ]
    }
}

/// Raw synthesis response. The status is left for the caller to interpret.
#[derive(Debug, Clone)]
pub struct SpeechResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    /// Audio bytes, speech marks, or an error body.
    pub data: Bytes,
}

impl SpeechResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-success status into an error carrying the body text.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(anyhow!(
            "synthesize_speech failed: {} - {}",
            self.status,
            String::from_utf8_lossy(&self.data)
        ))
    }
}

/// Build the `authorization` header from a token kept in config.
///
/// The value is marked sensitive so it is redacted from `Debug` output.
pub fn authorization_headers(token: &Secret<String>) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(token.expose_secret())
        .context("authorization token is not a valid header value")?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
