//! Email body cleanup.
//!
//! Removes markup, signatures, legal disclaimers and quoted replies so that
//! only the author's own text is sent to the summarizer.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::CleaningSettings;

/// Long lines mentioning confidentiality are treated as disclaimers.
const LONG_DISCLAIMER_CHARS: usize = 500;

const SIGNATURE_PATTERNS: &[&str] = &[
    r"--+\s*$",
    r"_{5,}",
    r"(?i)sent from my .*",
    r"(?i)get outlook for .*",
];

const DISCLAIMER_PATTERNS: &[&str] = &[
    r"(?is)this email.*?confidential",
    r"(?i)confidentiality notice",
    r"(?is)disclaimer.*?email",
    r"(?i)the information contained in this",
];

/// Lines that start the quoted part of a reply.
const QUOTE_START_PATTERNS: &[&str] = &[r"^On .* wrote:", r"-----Original Message-----"];

struct Patterns {
    html_tag: Regex,
    signature: Vec<Regex>,
    disclaimer: Vec<Regex>,
    quoted_line: Regex,
    quote_start: Vec<Regex>,
    inline_header: Regex,
    spaces: Regex,
    blank_lines: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            html_tag: Regex::new(r"<[^>]+>")?,
            signature: compile_all(SIGNATURE_PATTERNS)?,
            disclaimer: compile_all(DISCLAIMER_PATTERNS)?,
            quoted_line: Regex::new(r"^\s*>")?,
            quote_start: compile_all(QUOTE_START_PATTERNS)?,
            inline_header: Regex::new(r"\n(?:On .* wrote:|From:.*?Sent:)")?,
            spaces: Regex::new(r" +")?,
            blank_lines: Regex::new(r"\n{3,}")?,
        })
    }
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| match Patterns::compile() {
            Ok(patterns) => Some(patterns),
            Err(err) => {
                tracing::error!("Invalid content cleaner pattern: {}", err);
                None
            }
        })
        .as_ref()
}

fn any_match(patterns: &[Regex], line: &str) -> bool {
    patterns.iter().any(|re| re.is_match(line))
}

/// Cleans email bodies according to [`CleaningSettings`].
#[derive(Debug, Clone, Default)]
pub struct ContentCleaner {
    settings: CleaningSettings,
}

impl ContentCleaner {
    /// Creates a cleaner with the given settings.
    pub fn new(settings: CleaningSettings) -> Self {
        Self { settings }
    }

    /// Cleans a message body.
    pub fn clean(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let Some(p) = patterns() else {
            return text.trim().to_string();
        };

        let text = strip_html(p, text);
        let mut lines: Vec<&str> = text.split('\n').collect();

        if self.settings.remove_signatures {
            lines = lines
                .into_iter()
                .take_while(|line| !any_match(&p.signature, line))
                .collect();
        }
        if self.settings.remove_disclaimers {
            lines.retain(|line| !is_disclaimer(p, line));
        }
        if self.settings.remove_quoted_text {
            lines = lines
                .into_iter()
                .filter(|line| !p.quoted_line.is_match(line))
                .take_while(|line| !any_match(&p.quote_start, line))
                .collect();
        }

        let joined = lines.join("\n");
        let collapsed = p.spaces.replace_all(&joined, " ");
        p.blank_lines.replace_all(&collapsed, "\n\n").trim().to_string()
    }

    /// Cleans a body and cuts it at the first inline reply attribution or
    /// forwarded header.
    pub fn extract_main_content(&self, text: &str) -> String {
        let cleaned = self.clean(text);
        match patterns() {
            Some(p) => p
                .inline_header
                .splitn(&cleaned, 2)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
            None => cleaned,
        }
    }
}

fn strip_html(p: &Patterns, text: &str) -> String {
    p.html_tag
        .replace_all(text, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn is_disclaimer(p: &Patterns, line: &str) -> bool {
    any_match(&p.disclaimer, line)
        || (line.chars().count() > LONG_DISCLAIMER_CHARS
            && line.to_lowercase().contains("confidential"))
}
