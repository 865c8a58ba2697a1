//! HTTP client for the Polly proxy.
//!
//! Both operations are plain GETs with query parameters. The caller's
//! headers are forwarded verbatim and responses are handed back without
//! inspecting the status.

use std::borrow::Cow;

use {
    anyhow::{Context, Result},
    reqwest::{Client, Url, header::HeaderMap},
    tracing::debug,
};

use super::{DescribeVoicesRequest, SpeechResponse, SynthesizeRequest, Voice};
use crate::config::PollyConfig;

const DESCRIBE_VOICES_PATH: &str = "/describe_voices";
const SYNTHESIZE_SPEECH_PATH: &str = "/synthesize_speech";

/// Client for the `describe_voices` and `synthesize_speech` endpoints.
#[derive(Debug, Clone)]
pub struct PollyClient {
    client: Client,
    base_url: Url,
}

impl PollyClient {
    /// Create a client for the proxy at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base URL '{base_url}'"))?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn from_config(config: &PollyConfig) -> Result<Self> {
        Self::new(&config.base_url)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Operation paths are absolute, so they resolve against the origin of
    /// the base URL and replace any path it carries.
    fn endpoint<'a>(
        &self,
        path: &str,
        pairs: impl IntoIterator<Item = (&'static str, Cow<'a, str>)>,
    ) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("failed to build URL for {path}"))?;
        url.query_pairs_mut().extend_pairs(pairs);
        Ok(url)
    }

    pub fn describe_voices_url(&self, request: &DescribeVoicesRequest) -> Result<Url> {
        self.endpoint(DESCRIBE_VOICES_PATH, request.query_pairs())
    }

    /// SSML text is normalized while the query is built.
    pub fn synthesize_speech_url(&self, request: &SynthesizeRequest) -> Result<Url> {
        self.endpoint(SYNTHESIZE_SPEECH_PATH, request.query_pairs())
    }

    /// List the voices available for synthesis.
    pub async fn describe_voices(
        &self,
        headers: &HeaderMap,
        request: &DescribeVoicesRequest,
    ) -> Result<Vec<Voice>> {
        let url = self.describe_voices_url(request)?;
        debug!(%url, "describe_voices");

        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .context("failed to send describe_voices request")?;

        let status = response.status();
        response
            .json()
            .await
            .with_context(|| format!("failed to parse describe_voices response (status {status})"))
    }

    /// Synthesize speech. The body format follows `request.output_format`;
    /// non-success statuses are returned as-is.
    pub async fn synthesize_speech(
        &self,
        headers: &HeaderMap,
        request: &SynthesizeRequest,
    ) -> Result<SpeechResponse> {
        let url = self.synthesize_speech_url(request)?;
        debug!(
            voice_id = %request.voice_id,
            text_type = %request.text_type,
            output_format = %request.output_format,
            "synthesize_speech"
        );

        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .context("failed to send synthesize_speech request")?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let data = response
            .bytes()
            .await
            .context("failed to read synthesize_speech response")?;

        debug!(%status, bytes = data.len(), "synthesize_speech response");

        Ok(SpeechResponse {
            status,
            content_type,
            data,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::tts::{Engine, OutputFormat, SampleRate, TextType, authorization_headers},
        reqwest::StatusCode,
        secrecy::Secret,
    };

    #[test]
    fn test_invalid_base_url() {
        let err = PollyClient::new("not a url").unwrap_err();
        assert!(err.to_string().contains("invalid base URL"));
    }

    #[test]
    fn test_describe_voices_default_url() {
        let client = PollyClient::new("http://localhost:8080").unwrap();
        let url = client
            .describe_voices_url(&DescribeVoicesRequest::default())
            .unwrap();
        assert_eq!(url.path(), "/describe_voices");
        assert_eq!(
            url.query(),
            Some("Engine=standard&LanguageCode=&IncludeAdditionalLanguageCodes=true")
        );
    }

    #[test]
    fn test_paths_resolve_against_origin() {
        let client = PollyClient::new("https://bot.example.com/tts/index.html").unwrap();
        let url = client
            .describe_voices_url(&DescribeVoicesRequest::default())
            .unwrap();
        assert_eq!(
            url.as_str().split('?').next(),
            Some("https://bot.example.com/describe_voices")
        );
    }

    #[test]
    fn test_synthesize_url_defaults() {
        let client = PollyClient::new("http://localhost:8080").unwrap();
        let url = client
            .synthesize_speech_url(&SynthesizeRequest::new("Hello world", "Joanna"))
            .unwrap();
        assert_eq!(url.path(), "/synthesize_speech");
        assert_eq!(
            url.query(),
            Some(
                "Text=Hello+world&VoiceId=Joanna&TextType=text&Engine=standard&LanguageCode=&OutputFormat=mp3&SampleRate=24000"
            )
        );
    }

    #[test]
    fn test_synthesize_url_normalizes_ssml() {
        let client = PollyClient::new("http://localhost:8080").unwrap();
        let url = client
            .synthesize_speech_url(&SynthesizeRequest::ssml("<news>Breaking</news>", "Joanna"))
            .unwrap();
        let text = url
            .query_pairs()
            .find(|(k, _)| k == "Text")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(
            text,
            r#"<speak><amazon:domain name="news">Breaking</amazon:domain></speak>"#
        );
    }

    // ── Integration Tests with Mock Server ─────────────────────────────────

    mod integration {
        use {
            super::*,
            wiremock::{
                Mock, MockServer, ResponseTemplate,
                matchers::{header, method, path, query_param},
            },
        };

        fn auth() -> HeaderMap {
            authorization_headers(&Secret::new("Bearer viewer-token".into())).unwrap()
        }

        #[tokio::test]
        async fn test_describe_voices_success() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/describe_voices"))
                .and(query_param("Engine", "neural"))
                .and(query_param("LanguageCode", "en-US"))
                .and(query_param("IncludeAdditionalLanguageCodes", "false"))
                .and(header("authorization", "Bearer viewer-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                    {
                        "Gender": "Female",
                        "Id": "Joanna",
                        "LanguageCode": "en-US",
                        "LanguageName": "US English",
                        "Name": "Joanna",
                        "SupportedEngines": ["neural", "standard"]
                    },
                    {
                        "Gender": "Male",
                        "Id": "Kevin",
                        "LanguageCode": "en-US",
                        "LanguageName": "US English",
                        "Name": "Kevin",
                        "AdditionalLanguageCodes": [],
                        "SupportedEngines": ["neural"]
                    }
                ])))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = PollyClient::new(&mock_server.uri()).unwrap();
            let request = DescribeVoicesRequest {
                engine: Engine::Neural,
                language_code: Some("en-US".into()),
                include_additional_language_codes: false,
            };

            let voices = client.describe_voices(&auth(), &request).await.unwrap();
            assert_eq!(voices.len(), 2);
            assert_eq!(voices[0].id, "Joanna");
            assert!(voices[1].supports_engine(Engine::Neural));
            assert!(!voices[1].supports_engine(Engine::Standard));
        }

        #[tokio::test]
        async fn test_describe_voices_error_body_surfaces_as_decode_error() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/describe_voices"))
                .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
                .mount(&mock_server)
                .await;

            let client = PollyClient::new(&mock_server.uri()).unwrap();
            let err = client
                .describe_voices(&HeaderMap::new(), &DescribeVoicesRequest::default())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("status 401"));
        }

        #[tokio::test]
        async fn test_synthesize_speech_returns_audio() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/synthesize_speech"))
                .and(query_param("Text", "Hello"))
                .and(query_param("VoiceId", "Amy"))
                .and(query_param("TextType", "text"))
                .and(query_param("OutputFormat", "ogg_vorbis"))
                .and(query_param("SampleRate", "22050"))
                .and(header("authorization", "Bearer viewer-token"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "audio/ogg")
                        .set_body_bytes(b"OggS fake audio".to_vec()),
                )
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = PollyClient::new(&mock_server.uri()).unwrap();
            let mut request = SynthesizeRequest::new("Hello", "Amy");
            request.output_format = OutputFormat::OggVorbis;
            request.sample_rate = SampleRate::Hz22050;

            let response = client.synthesize_speech(&auth(), &request).await.unwrap();
            assert!(response.is_success());
            assert_eq!(response.content_type.as_deref(), Some("audio/ogg"));
            assert_eq!(&response.data[..], b"OggS fake audio");
        }

        #[tokio::test]
        async fn test_synthesize_speech_sends_normalized_ssml() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/synthesize_speech"))
                .and(query_param(
                    "Text",
                    "<speak><prosody volume=loud>x</prosody></speak>",
                ))
                .and(query_param("TextType", "ssml"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3".to_vec()))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = PollyClient::new(&mock_server.uri()).unwrap();
            let request = SynthesizeRequest::ssml("<volume=loud>x</volume>", "Joanna");
            assert_eq!(request.text_type, TextType::Ssml);

            let response = client.synthesize_speech(&auth(), &request).await.unwrap();
            assert!(response.is_success());
        }

        #[tokio::test]
        async fn test_synthesize_speech_does_not_inspect_status() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/synthesize_speech"))
                .respond_with(
                    ResponseTemplate::new(402).set_body_string("user requires sub tier 3000"),
                )
                .mount(&mock_server)
                .await;

            let client = PollyClient::new(&mock_server.uri()).unwrap();
            let mut request = SynthesizeRequest::new("Hello", "Kevin");
            request.engine = Engine::Neural;

            let response = client.synthesize_speech(&auth(), &request).await.unwrap();
            assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
            assert!(!response.is_success());
            assert!(response.error_for_status().is_err());
        }
    }
}
