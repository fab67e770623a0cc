//! Subject line normalization.
//!
//! Reply and forward markers and bracketed list tags are stripped so that all
//! messages of one exchange map to the same key.

/// Reply/forward markers recognised at the start of a subject.
const REPLY_MARKERS: [&str; 4] = ["re:", "fw:", "fwd:", "aw:"];

/// Normalizes a subject line for grouping.
///
/// Lowercases, strips any number of leading `re:`/`fw:`/`fwd:`/`aw:` markers
/// and `[...]` tags, collapses whitespace runs and trims. Total and
/// idempotent.
pub fn normalize_subject(subject: &str) -> String {
    let lowered = subject.to_lowercase();
    let mut rest = lowered.trim_start();

    while let Some(stripped) = strip_marker(rest) {
        rest = stripped.trim_start();
    }

    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_marker(subject: &str) -> Option<&str> {
    if let Some(rest) = REPLY_MARKERS
        .iter()
        .find_map(|marker| subject.strip_prefix(marker))
    {
        return Some(rest);
    }

    if subject.starts_with('[') {
        return subject.find(']').map(|end| &subject[end + 1..]);
    }

    None
}
