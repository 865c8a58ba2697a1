//! `voices` and `speak` commands.

use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    clap::Args,
    reqwest::header::HeaderMap,
    tracing::{info, warn},
    twitch_polly_config::AppConfig,
    twitch_polly_voice::{
        DescribeVoicesRequest, Engine, OutputFormat, PollyClient, SampleRate, SynthesisDefaults,
        SynthesizeRequest, TextType, Voice,
    },
};

#[derive(Args)]
pub struct VoicesArgs {
    /// Only voices supporting this engine (standard, neural).
    #[arg(long)]
    pub engine: Option<Engine>,
    /// Only voices for this language (e.g. en-US).
    #[arg(long)]
    pub language_code: Option<String>,
    /// Leave out bilingual voices whose second language matches.
    #[arg(long)]
    pub no_additional_language_codes: bool,
    /// Print the raw voice list as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SpeakArgs {
    /// Text to speak; `-` reads stdin.
    pub text: String,
    /// Voice ID (e.g. Joanna). Falls back to `polly.defaults.voice_id`.
    #[arg(long)]
    pub voice: Option<String>,
    /// Treat the text as SSML and normalize it before sending.
    #[arg(long)]
    pub ssml: bool,
    #[arg(long)]
    pub engine: Option<Engine>,
    /// Language for bilingual voices (e.g. hi-IN).
    #[arg(long)]
    pub language_code: Option<String>,
    /// Output format (json, mp3, ogg_vorbis, pcm).
    #[arg(long)]
    pub format: Option<OutputFormat>,
    /// Sample rate in Hz (8000, 16000, 22050, 24000).
    #[arg(long)]
    pub sample_rate: Option<SampleRate>,
    /// Output file; defaults to `speech.<ext>`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_voices(
    client: &PollyClient,
    headers: &HeaderMap,
    config: &AppConfig,
    args: &VoicesArgs,
) -> Result<()> {
    let request = voices_request(args, &config.polly.defaults);
    let voices = client.describe_voices(headers, &request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&voices)?);
    } else if voices.is_empty() {
        println!("No voices found.");
    } else {
        print!("{}", format_voice_table(&voices));
    }
    Ok(())
}

pub async fn handle_speak(
    client: &PollyClient,
    headers: &HeaderMap,
    config: &AppConfig,
    args: &SpeakArgs,
) -> Result<()> {
    let text = crate::read_text_arg(args.text.clone())?;
    let request = speak_request(args, text, &config.polly.defaults)?;

    if !request.output_format.supports_sample_rate(request.sample_rate) {
        warn!(
            output_format = %request.output_format,
            sample_rate = %request.sample_rate,
            "sample rate is not valid for this format; the proxy may reject it"
        );
    }

    let response = client
        .synthesize_speech(headers, &request)
        .await?
        .error_for_status()?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(request.output_format));
    tokio::fs::write(&output, &response.data)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        path = %output.display(),
        bytes = response.data.len(),
        content_type = response.content_type.as_deref().unwrap_or("unknown"),
        "speech written"
    );
    println!("{}", output.display());
    Ok(())
}

fn voices_request(args: &VoicesArgs, defaults: &SynthesisDefaults) -> DescribeVoicesRequest {
    DescribeVoicesRequest {
        engine: args.engine.unwrap_or(defaults.engine),
        language_code: args
            .language_code
            .clone()
            .or_else(|| defaults.language_code.clone()),
        include_additional_language_codes: !args.no_additional_language_codes
            && defaults.include_additional_language_codes,
    }
}

fn speak_request(
    args: &SpeakArgs,
    text: String,
    defaults: &SynthesisDefaults,
) -> Result<SynthesizeRequest> {
    let voice_id = args
        .voice
        .clone()
        .or_else(|| defaults.voice_id.clone())
        .context("no voice given; pass --voice or set polly.defaults.voice_id")?;

    let mut request = SynthesizeRequest::from_defaults(text, voice_id, defaults);
    if args.ssml {
        request.text_type = TextType::Ssml;
    }
    if let Some(engine) = args.engine {
        request.engine = engine;
    }
    if let Some(ref language_code) = args.language_code {
        request.language_code = Some(language_code.clone());
    }
    if let Some(format) = args.format {
        request.output_format = format;
    }
    if let Some(rate) = args.sample_rate {
        request.sample_rate = rate;
    }
    Ok(request)
}

fn default_output_path(format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("speech.{}", format.extension()))
}

fn format_voice_table(voices: &[Voice]) -> String {
    const HEADERS: [&str; 5] = ["ID", "NAME", "LANGUAGE", "GENDER", "ENGINES"];

    let rows: Vec<[String; 5]> = voices
        .iter()
        .map(|v| {
            let language = if v.additional_language_codes.is_empty() {
                v.language_code.clone()
            } else {
                format!(
                    "{} (+{})",
                    v.language_code,
                    v.additional_language_codes.join(", +")
                )
            };
            [
                v.id.clone(),
                v.name.clone(),
                language,
                v.gender.clone(),
                v.supported_engines.join(","),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 5]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    };

    push_row(HEADERS);
    for row in &rows {
        push_row(row.each_ref().map(String::as_str));
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn speak_args() -> SpeakArgs {
        SpeakArgs {
            text: "Hello".into(),
            voice: None,
            ssml: false,
            engine: None,
            language_code: None,
            format: None,
            sample_rate: None,
            output: None,
        }
    }

    fn voice(id: &str, lang: &str, extra: &[&str]) -> Voice {
        Voice {
            gender: "Female".into(),
            id: id.into(),
            language_code: lang.into(),
            language_name: String::new(),
            name: id.into(),
            additional_language_codes: extra.iter().map(|s| (*s).to_string()).collect(),
            supported_engines: vec!["neural".into(), "standard".into()],
        }
    }

    #[test]
    fn voices_request_uses_defaults() {
        let args = VoicesArgs {
            engine: None,
            language_code: None,
            no_additional_language_codes: false,
            json: false,
        };
        let request = voices_request(&args, &SynthesisDefaults::default());
        assert_eq!(request, DescribeVoicesRequest::default());
    }

    #[test]
    fn voices_request_flags_win() {
        let args = VoicesArgs {
            engine: Some(Engine::Neural),
            language_code: Some("de-DE".into()),
            no_additional_language_codes: true,
            json: false,
        };
        let defaults = SynthesisDefaults {
            language_code: Some("en-US".into()),
            ..Default::default()
        };
        let request = voices_request(&args, &defaults);
        assert_eq!(request.engine, Engine::Neural);
        assert_eq!(request.language_code.as_deref(), Some("de-DE"));
        assert!(!request.include_additional_language_codes);
    }

    #[test]
    fn speak_requires_a_voice() {
        let err = speak_request(&speak_args(), "Hi".into(), &SynthesisDefaults::default())
            .unwrap_err();
        assert!(err.to_string().contains("--voice"));
    }

    #[test]
    fn speak_falls_back_to_config_defaults() {
        let defaults = SynthesisDefaults {
            voice_id: Some("Brian".into()),
            engine: Engine::Neural,
            output_format: OutputFormat::OggVorbis,
            sample_rate: SampleRate::Hz22050,
            ..Default::default()
        };
        let request = speak_request(&speak_args(), "Hi".into(), &defaults).unwrap();
        assert_eq!(request.voice_id, "Brian");
        assert_eq!(request.engine, Engine::Neural);
        assert_eq!(request.output_format, OutputFormat::OggVorbis);
        assert_eq!(request.sample_rate, SampleRate::Hz22050);
        assert_eq!(request.text_type, TextType::Text);
    }

    #[test]
    fn speak_flags_override_defaults() {
        let args = SpeakArgs {
            voice: Some("Aditi".into()),
            ssml: true,
            language_code: Some("hi-IN".into()),
            format: Some(OutputFormat::Pcm),
            sample_rate: Some(SampleRate::Hz16000),
            ..speak_args()
        };
        let defaults = SynthesisDefaults {
            voice_id: Some("Brian".into()),
            ..Default::default()
        };
        let request = speak_request(&args, "<speak>Hi</speak>".into(), &defaults).unwrap();
        assert_eq!(request.voice_id, "Aditi");
        assert_eq!(request.text_type, TextType::Ssml);
        assert_eq!(request.language_code.as_deref(), Some("hi-IN"));
        assert_eq!(request.output_format, OutputFormat::Pcm);
        assert_eq!(request.sample_rate, SampleRate::Hz16000);
    }

    #[test]
    fn default_output_follows_format() {
        assert_eq!(default_output_path(OutputFormat::Mp3), PathBuf::from("speech.mp3"));
        assert_eq!(default_output_path(OutputFormat::Pcm), PathBuf::from("speech.pcm"));
    }

    #[test]
    fn voice_table_aligns_columns() {
        let table = format_voice_table(&[
            voice("Joanna", "en-US", &[]),
            voice("Aditi", "en-IN", &["hi-IN"]),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID      NAME"));
        assert!(lines[1].starts_with("Joanna  Joanna  en-US"));
        assert!(lines[2].contains("en-IN (+hi-IN)"));
        assert!(lines[2].ends_with("neural,standard"));
    }
}
