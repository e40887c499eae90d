//! Hyperlink removal ahead of text statistics.

use regex::Regex;
use std::sync::OnceLock;

// Scheme links, www. hosts, bare domains on common TLDs and email addresses.
fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b[a-z][a-z0-9+.\-]*://\S+
            | \bwww\.\S+
            | \b[\w.+\-]+@[a-z0-9\-]+(?:\.[a-z0-9\-]+)+\b
            | \b(?:[a-z0-9\-]+\.)+(?:com|org|net|edu|gov|io|co|us|uk|ca|de|me|ly|app|dev|ai)\b(?:/\S*)?
            ",
        )
        .expect("link pattern is valid")
    })
}

/// Remove anything that looks like a hyperlink.
pub fn strip_urls(text: &str) -> String {
    link_re().replace_all(text, "").into_owned()
}
