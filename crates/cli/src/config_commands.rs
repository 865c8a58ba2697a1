use std::path::{Path, PathBuf};

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    secrecy::Secret,
    twitch_polly_config::{AppConfig, Severity, validate},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration with the token redacted.
    Show,
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config(
    action: &ConfigAction,
    config_path: Option<&Path>,
    resolve: impl FnOnce() -> Result<AppConfig>,
) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config_path, *verbose),
        ConfigAction::Show => {
            print!("{}", render_redacted(&resolve()?)?);
            Ok(())
        },
        ConfigAction::Init { force } => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(default_init_path);
            init(&path, *force)?;
            println!("Wrote {}", path.display());
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const REDACTED: &str = "********";

fn check(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(config_path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        bail!("configuration is invalid");
    }
    Ok(())
}

fn render_redacted(config: &AppConfig) -> Result<String> {
    let mut shown = config.clone();
    if shown.polly.authorization.is_some() {
        shown.polly.authorization = Some(Secret::new(REDACTED.into()));
    }
    Ok(toml::to_string_pretty(&shown)?)
}

/// The discovered config file, or `~/.config/twitch-polly/twitch-polly.toml`.
fn default_init_path() -> PathBuf {
    twitch_polly_config::find_or_default_config_path()
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    twitch_polly_config::save_config_to(&AppConfig::default(), path)
}
