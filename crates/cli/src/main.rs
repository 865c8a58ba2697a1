mod config_commands;
mod voice_commands;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    reqwest::header::HeaderMap,
    secrecy::Secret,
    tracing::{debug, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    twitch_polly_config::AppConfig,
    twitch_polly_voice::{PollyClient, authorization_headers},
};

#[derive(Parser)]
#[command(name = "twitch-polly", about = "Polly text-to-speech proxy client", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, env = "TWITCH_POLLY_CONFIG")]
    config: Option<PathBuf>,

    /// Proxy base URL (overrides config value).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Value sent in the `authorization` header (overrides config value).
    #[arg(long, global = true, env = "TWITCH_POLLY_AUTHORIZATION", hide_env_values = true)]
    authorization: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the voices the proxy offers.
    Voices(voice_commands::VoicesArgs),
    /// Synthesize speech into an audio file.
    Speak(voice_commands::SpeakArgs),
    /// Print the Polly SSML a text would be sent as, without synthesizing.
    Normalize {
        /// SSML or loose markup; `-` reads stdin.
        text: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Effective config: file, then `TWITCH_POLLY_*` env vars, then flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match cli.config {
        Some(ref path) => twitch_polly_config::load_config(path)?,
        None => twitch_polly_config::discover_and_load(),
    };
    twitch_polly_config::apply_env_overrides(&mut config);
    apply_flag_overrides(&mut config, cli.base_url.clone(), cli.authorization.clone());
    Ok(config)
}

fn apply_flag_overrides(
    config: &mut AppConfig,
    base_url: Option<String>,
    authorization: Option<String>,
) {
    if let Some(base_url) = base_url {
        config.polly.base_url = base_url;
    }
    if let Some(token) = authorization.filter(|t| !t.is_empty()) {
        config.polly.authorization = Some(Secret::new(token));
    }
}

/// Headers forwarded to the proxy. Empty when no token is configured.
fn request_headers(config: &AppConfig) -> anyhow::Result<HeaderMap> {
    match config.polly.authorization {
        Some(ref token) => authorization_headers(token),
        None => {
            warn!("no authorization configured; the proxy will likely reject the request");
            Ok(HeaderMap::new())
        },
    }
}

fn client(config: &AppConfig) -> anyhow::Result<PollyClient> {
    let client = PollyClient::from_config(&config.polly)?;
    debug!(base_url = %client.base_url(), "using proxy");
    Ok(client)
}

/// Returns `text`, or all of stdin when `text` is `-`.
fn read_text_arg(text: String) -> anyhow::Result<String> {
    if text != "-" {
        return Ok(text);
    }
    let input = std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "twitch-polly starting");

    match cli.command {
        Commands::Voices(ref args) => {
            let config = resolve_config(&cli)?;
            let headers = request_headers(&config)?;
            voice_commands::handle_voices(&client(&config)?, &headers, &config, args).await
        },
        Commands::Speak(ref args) => {
            let config = resolve_config(&cli)?;
            let headers = request_headers(&config)?;
            voice_commands::handle_speak(&client(&config)?, &headers, &config, args).await
        },
        Commands::Normalize { ref text } => {
            let text = read_text_arg(text.clone())?;
            println!("{}", twitch_polly_voice::ssml::normalize(&text));
            Ok(())
        },
        Commands::Config { ref action } => {
            config_commands::handle_config(action, cli.config.as_deref(), || resolve_config(&cli))
        },
    }
}
