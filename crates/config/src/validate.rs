//! Configuration validation.
//!
//! Reports syntax and type errors, unknown or misspelled fields, and
//! settings the proxy is known to reject.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{env_subst::substitute_env, loader::parse_config_value, schema::AppConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "url",
    /// "audio", "auth", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "polly.defaults.sample_rate"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let defaults = Struct(HashMap::from([
        ("voice_id", Leaf),
        ("engine", Leaf),
        ("language_code", Leaf),
        ("text_type", Leaf),
        ("output_format", Leaf),
        ("sample_rate", Leaf),
        ("include_additional_language_codes", Leaf),
    ]));

    Struct(HashMap::from([(
        "polly",
        Struct(HashMap::from([
            ("base_url", Leaf),
            ("authorization", Leaf),
            ("defaults", defaults),
        ])),
    )]))
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => {
                check_unknown_fields(child_value, child_schema, &path, diagnostics);
            },
            None => {
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            },
        }
    }
}

/// Levenshtein edit distance, counted in characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(c, d)| (d, c))
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(actual_path) {
        Ok(content) => validate_str(&substitute_env(&content), actual_path),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = config_path;
    result
}

/// Validate config text without touching the file system. The format is
/// taken from the extension of `path`.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax
    let value = match parse_config_value(raw, path) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    // 3. Types, then semantics on the parsed config
    match serde_json::from_value::<AppConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_semantics(config: &AppConfig, diagnostics: &mut Vec<Diagnostic>) {
    let polly = &config.polly;

    match url::Url::parse(&polly.base_url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "url",
            path: "polly.base_url".into(),
            message: format!("unsupported scheme \"{}\"; use http or https", url.scheme()),
        }),
        Ok(url) if url.scheme() == "http" && !is_loopback(&url) => diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "url",
            path: "polly.base_url".into(),
            message: "authorization headers will be sent over plain http".into(),
        }),
        Ok(_) => {},
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "url",
            path: "polly.base_url".into(),
            message: format!("invalid URL \"{}\": {e}", polly.base_url),
        }),
    }

    let defaults = &polly.defaults;
    if !defaults
        .output_format
        .supports_sample_rate(defaults.sample_rate)
    {
        let supported: Vec<&str> = defaults
            .output_format
            .supported_sample_rates()
            .iter()
            .map(|r| r.as_str())
            .collect();
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "audio",
            path: "polly.defaults.sample_rate".into(),
            message: format!(
                "sample rate {} is not valid for {} (expected one of: {})",
                defaults.sample_rate,
                defaults.output_format,
                supported.join(", ")
            ),
        });
    }

    if polly.authorization.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "auth",
            path: "polly.authorization".into(),
            message: format!(
                "no authorization configured; pass --authorization or set {}",
                crate::loader::ENV_AUTHORIZATION
            ),
        });
    }

    if defaults.voice_id.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "audio",
            path: "polly.defaults.voice_id".into(),
            message: "no default voice; `speak` will require --voice".into(),
        });
    }
}

fn is_loopback(url: &url::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(d)) => d == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn toml(raw: &str) -> ValidationResult {
        validate_str(raw, Path::new("twitch-polly.toml"))
    }

    fn find<'a>(result: &'a ValidationResult, category: &str) -> Option<&'a Diagnostic> {
        result.diagnostics.iter().find(|d| d.category == category)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("voice", "voice"), 0);
        assert_eq!(levenshtein("engine", "engin"), 1);
        assert_eq!(levenshtein("größe", "grösse"), 2);
    }

    #[test]
    fn suggest_closest_key() {
        let keys = ["voice_id", "engine", "sample_rate"];
        assert_eq!(suggest("voiceid", &keys, 3), Some("voice_id"));
        assert_eq!(suggest("samplerate", &keys, 3), Some("sample_rate"));
        assert_eq!(suggest("completely_unrelated", &keys, 3), None);
    }

    #[test]
    fn clean_config_has_no_errors() {
        let result = toml(
            r#"
            [polly]
            base_url = "https://tts.example.com"
            authorization = "Bearer abc"

            [polly.defaults]
            voice_id = "Joanna"
            "#,
        );
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 0);
        assert_eq!(result.count(Severity::Info), 0);
    }

    #[test]
    fn syntax_error_stops_validation() {
        let result = toml("[polly\nbase_url = ");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn unknown_field_with_suggestion() {
        let result = toml("[polly.defaults]\nvoiceid = \"Joanna\"\n");
        let d = find(&result, "unknown-field").unwrap();
        assert_eq!(d.path, "polly.defaults.voiceid");
        assert!(d.message.contains("did you mean \"voice_id\""));
    }

    #[test]
    fn type_error_for_bad_enum() {
        let result = toml("[polly.defaults]\nengine = \"turbo\"\n");
        let d = find(&result, "type-error").unwrap();
        assert!(d.message.contains("turbo"));
    }

    #[test]
    fn type_error_for_bad_sample_rate() {
        let result = toml("[polly.defaults]\nsample_rate = 44100\n");
        assert!(find(&result, "type-error").is_some());
    }

    #[test]
    fn invalid_base_url() {
        let result = toml("[polly]\nbase_url = \"not a url\"\n");
        let d = find(&result, "url").unwrap();
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn non_http_scheme_is_error() {
        let result = toml("[polly]\nbase_url = \"ftp://tts.example.com\"\n");
        let d = find(&result, "url").unwrap();
        assert_eq!(d.severity, Severity::Error);
        assert!(d.message.contains("ftp"));
    }

    #[test]
    fn plain_http_to_remote_host_warns() {
        let result = toml("[polly]\nbase_url = \"http://tts.example.com\"\n");
        let d = find(&result, "url").unwrap();
        assert_eq!(d.severity, Severity::Warning);

        let local = toml("[polly]\nbase_url = \"http://127.0.0.1:8080\"\n");
        assert!(find(&local, "url").is_none());
    }

    #[test]
    fn pcm_sample_rate_mismatch_warns() {
        let result = toml("[polly.defaults]\noutput_format = \"pcm\"\nsample_rate = \"24000\"\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.path == "polly.defaults.sample_rate")
            .unwrap();
        assert_eq!(d.severity, Severity::Warning);
        assert!(d.message.contains("8000, 16000"));
    }

    #[test]
    fn missing_auth_and_voice_are_info() {
        let result = toml("");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Info), 2);
        assert!(find(&result, "auth").is_some());
    }

    #[test]
    fn validates_json_files() {
        let result = validate_str(
            r#"{"polly": {"base_url": "https://x.example.com", "bogus": 1}}"#,
            Path::new("twitch-polly.json"),
        );
        let d = find(&result, "unknown-field").unwrap();
        assert_eq!(d.path, "polly.bogus");
    }

    #[test]
    fn validate_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twitch-polly.toml");
        std::fs::write(&path, "[polly]\nbase_url = \"https://x.example.com\"\n").unwrap();

        let result = validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(!result.has_errors());
    }

    #[test]
    fn validate_missing_file_is_error() {
        let result = validate(Some(Path::new("/nonexistent/twitch-polly.toml")));
        assert!(result.has_errors());
        assert!(result.config_path.is_some());
    }
}
