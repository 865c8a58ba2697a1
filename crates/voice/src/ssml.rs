//! SSML normalization for Polly.
//!
//! Callers may send loosely written markup: a missing `<speak>` root, and a
//! generic tag vocabulary such as `<volume=loud>` or `<whispered>`. Before
//! synthesis the text is wrapped in a root element and the generic tags are
//! rewritten into Polly's dialect (`<prosody volume=loud>`,
//! `<amazon:effect name=whispered>`).
//!
//! The rewrite is an ordered list of textual substitutions, not a tree
//! transform. Malformed input can produce malformed output and nothing is
//! validated afterwards.

use std::{borrow::Cow, sync::LazyLock};

use {regex::Regex, tracing::debug};

const OPEN_SPEAK: &str = "<speak>";
const CLOSE_SPEAK: &str = "</speak>";

static OPEN_SPEAK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^\s*<\s*speak(?:\s[^>]*)?>"));
static CLOSE_SPEAK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)<\s*/\s*speak\s*>\s*$"));

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(build_rules);

/// Patterns are string literals checked by the tests below.
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid SSML rewrite pattern")
}

/// One substitution in the rewrite table.
///
/// `pattern` finds candidates; the optional context patterns are tested
/// against the text before (`$`-anchored) and after (`^`-anchored) each
/// candidate and stand in for lookaround assertions.
pub struct Rule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
    preceded_by: Option<Regex>,
    not_preceded_by: Option<Regex>,
    followed_by: Option<Regex>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("replacement", &self.replacement)
            .finish_non_exhaustive()
    }
}

impl Rule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            replacement,
            preceded_by: None,
            not_preceded_by: None,
            followed_by: None,
        }
    }

    fn preceded_by(mut self, pattern: &str) -> Self {
        self.preceded_by = Some(compile(pattern));
        self
    }

    fn not_preceded_by(mut self, pattern: &str) -> Self {
        self.not_preceded_by = Some(compile(pattern));
        self
    }

    fn followed_by(mut self, pattern: &str) -> Self {
        self.followed_by = Some(compile(pattern));
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn has_context(&self) -> bool {
        self.preceded_by.is_some() || self.not_preceded_by.is_some() || self.followed_by.is_some()
    }

    fn accepts(&self, before: &str, after: &str) -> bool {
        self.preceded_by.as_ref().is_none_or(|re| re.is_match(before))
            && self
                .not_preceded_by
                .as_ref()
                .is_none_or(|re| !re.is_match(before))
            && self.followed_by.as_ref().is_none_or(|re| re.is_match(after))
    }

    /// Apply this rule to every non-overlapping match, scanning left to
    /// right over the input as given.
    #[must_use]
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !self.has_context() {
            return self.pattern.replace_all(text, self.replacement);
        }

        let mut out = String::new();
        let mut copied = 0;
        let mut pos = 0;

        while pos <= text.len() {
            let Some(caps) = self.pattern.captures_at(text, pos) else {
                break;
            };
            let Some(m) = caps.get(0) else {
                break;
            };

            if self.accepts(&text[..m.start()], &text[m.end()..]) {
                out.push_str(&text[copied..m.start()]);
                caps.expand(self.replacement, &mut out);
                copied = m.end();
                pos = if m.is_empty() {
                    next_char_boundary(text, m.end())
                } else {
                    m.end()
                };
            } else {
                pos = next_char_boundary(text, m.start());
            }
        }

        if copied == 0 && out.is_empty() {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[copied..]);
        Cow::Owned(out)
    }
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| pos + c.len_utf8())
}

// Context shared by the rules that only act inside a tag: the nearest
// angle bracket before the keyword is `<`, and a `>` follows before any `<`.
const INSIDE_TAG_BEFORE: &str = r"<(?:[^<>]*[^\w<>-])?$";
const INSIDE_TAG_AFTER: &str = r"^(?:[^\w<>-][^<>]*)?>";

fn build_rules() -> Vec<Rule> {
    vec![
        Rule::new("lang", r"(?i)<\s*lang\s*=", "<lang xml:lang="),
        Rule::new(
            "prosody-open",
            r"(?i)<\s*(volume|rate|pitch|max-duration)\s*=",
            "<prosody ${1}=",
        ),
        Rule::new(
            "prosody-close",
            r"(?i)<\s*/\s*(?:volume|rate|pitch|max-duration)\s*>",
            "</prosody>",
        ),
        Rule::new(
            "say-as-open",
            r"(?i)<\s*(?:interpret-as|say-as)\s*=",
            "<say-as interpret-as=",
        ),
        Rule::new("say-as-close", r"(?i)<\s*/\s*interpret-as\s*>", "</say-as>"),
        Rule::new("sub-open", r"(?i)<\s*(?:alias|sub)\s*=", "<sub alias="),
        Rule::new("sub-close", r"(?i)<\s*/\s*alias\s*>", "</sub>"),
        Rule::new("w-role", r"(?i)<\s*role\s*=", "<w role="),
        Rule::new("news-open", r"(?i)<\s*news\s*>", r#"<domain name="news">"#),
        Rule::new("news-close", r"(?i)<\s*/\s*news\s*>", "</domain>"),
        Rule::new("effect-tag", r"(?i)(drc|whispered)", "effect=${1}")
            .preceded_by(r"<\s*$")
            .followed_by(r"^\s*>"),
        Rule::new("effect-name", r"(?i)<\s*effect\s*=", "<effect name="),
        Rule::new("phonation-soft", r"(?i)soft", r#"effect phonation="soft""#)
            .preceded_by(r"<\s*$")
            .followed_by(r"^\s*>"),
        Rule::new(
            "vocal-tract-length",
            r"(?i)vocal-tract-length",
            "effect vocal-tract-length",
        )
        .preceded_by(r"<\s*$")
        .followed_by(r"^\s*="),
        // Word roles and senses appear as attribute values: `role="VB"`.
        Rule::new(
            "namespace-role-value",
            r"(?i)(VBD|VB|DT|IN|JJ|NN|DEFAULT|SENSE_1)",
            "amazon:${1}",
        )
        .preceded_by(r#"<[^<>]*=\s*"?\s*$"#)
        .followed_by(INSIDE_TAG_AFTER),
        Rule::new(
            "namespace-extension",
            r"(?i)(max-duration|breath|auto-breaths|domain|effect)",
            "amazon:${1}",
        )
        .preceded_by(INSIDE_TAG_BEFORE)
        .not_preceded_by(r"(?i)amazon:$")
        .followed_by(INSIDE_TAG_AFTER),
    ]
}

/// The rewrite table, in application order.
#[must_use]
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Wrap `text` in `<speak>`/`</speak>` unless it already starts and ends
/// with the root tags. Only the start and end of the text are checked.
#[must_use]
pub fn ensure_speak_envelope(text: &str) -> Cow<'_, str> {
    let has_open = OPEN_SPEAK_RE.is_match(text);
    let has_close = CLOSE_SPEAK_RE.is_match(text);

    match (has_open, has_close) {
        (true, true) => Cow::Borrowed(text),
        (true, false) => Cow::Owned(format!("{text}{CLOSE_SPEAK}")),
        (false, true) => Cow::Owned(format!("{OPEN_SPEAK}{text}")),
        (false, false) => Cow::Owned(format!("{OPEN_SPEAK}{text}{CLOSE_SPEAK}")),
    }
}

/// Run every rule of the table over `text`, in order.
#[must_use]
pub fn rewrite_vocabulary(text: &str) -> String {
    rules()
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned())
}

/// Repair the root envelope and rewrite the tag vocabulary.
#[must_use]
pub fn normalize(text: &str) -> String {
    debug!(text, "normalizing ssml");
    let wrapped = ensure_speak_envelope(text);
    let normalized = rewrite_vocabulary(&wrapped);
    debug!(ssml = %normalized, "normalized ssml");
    normalized
}
