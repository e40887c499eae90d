//! A contacts source backed by a vCard export (`.vcf`).
//!
//! Only the properties the name index needs are read: `N`, `FN`, `TEL`
//! and `EMAIL`. Folded lines (continuations starting with a space or tab)
//! are unfolded first; property groups (`item1.TEL`) and parameters
//! (`TEL;TYPE=CELL`) are ignored.

use super::{AccessStatus, ContactCard, ContactsSource};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct VCardSource {
    path: PathBuf,
}

impl VCardSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContactsSource for VCardSource {
    /// A missing export is treated as denied access rather than an error.
    fn request_access(&self) -> Result<AccessStatus> {
        if self.path.is_file() {
            Ok(AccessStatus::Granted)
        } else {
            tracing::debug!(path = %self.path.display(), "vCard export not found");
            Ok(AccessStatus::Denied)
        }
    }

    fn enumerate(&self) -> Result<Vec<ContactCard>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Contacts(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(parse_vcards(&content))
    }
}

/// Join folded continuation lines onto the line they continue.
fn unfold(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in content.lines() {
        let continuation = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t'));
        if let (Some(rest), Some(prev)) = (continuation, lines.last_mut()) {
            prev.push_str(rest);
            continue;
        }
        lines.push(line.to_string());
    }
    lines
}

fn unescape(value: &str) -> String {
    value
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\n", " ")
        .replace("\\N", " ")
        .replace("\\\\", "\\")
}

/// Split `item1.TEL;TYPE=CELL:+1 555` into (`TEL`, `+1 555`).
fn split_property(line: &str) -> Option<(String, &str)> {
    let (head, value) = line.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head);
    let name = name.rsplit('.').next().unwrap_or(name);
    Some((name.trim().to_ascii_uppercase(), value))
}

/// Parse every `BEGIN:VCARD` .. `END:VCARD` block in `content`.
pub fn parse_vcards(content: &str) -> Vec<ContactCard> {
    let mut cards = Vec::new();
    let mut current: Option<ContactCard> = None;
    let mut formatted_name: Option<String> = None;

    for line in unfold(content) {
        let Some((name, value)) = split_property(&line) else {
            continue;
        };
        match name.as_str() {
            "BEGIN" if value.trim().eq_ignore_ascii_case("VCARD") => {
                current = Some(ContactCard::default());
                formatted_name = None;
            }
            "END" if value.trim().eq_ignore_ascii_case("VCARD") => {
                if let Some(mut card) = current.take() {
                    if card.given_name.is_empty() && card.family_name.is_empty() {
                        if let Some(full) = formatted_name.take() {
                            card.given_name = full;
                        }
                    }
                    cards.push(card);
                }
            }
            _ => {
                let Some(card) = current.as_mut() else {
                    continue;
                };
                match name.as_str() {
                    "N" => {
                        // Family;Given;Additional;Prefix;Suffix
                        let mut parts = value.split(';');
                        card.family_name = unescape(parts.next().unwrap_or("")).trim().to_string();
                        card.given_name = unescape(parts.next().unwrap_or("")).trim().to_string();
                    }
                    "FN" => formatted_name = Some(unescape(value).trim().to_string()),
                    "TEL" => card.phone_numbers.push(value.trim().to_string()),
                    "EMAIL" => card.emails.push(value.trim().to_string()),
                    _ => {}
                }
            }
        }
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "BEGIN:VCARD\r\n\
VERSION:3.0\r\n\
N:Liddell;Alice;;;\r\n\
FN:Alice Liddell\r\n\
item1.TEL;type=CELL;type=pref:+1 (555) 123-4567\r\n\
EMAIL;type=INTERNET:alice@\r\n wonder.land\r\n\
END:VCARD\r\n\
BEGIN:VCARD\r\n\
VERSION:3.0\r\n\
FN:The Hatter\r\n\
TEL:555-0100\r\n\
END:VCARD\r\n";

    #[test]
    fn test_parse_sample() {
        let cards = parse_vcards(SAMPLE);
        assert_eq!(cards.len(), 2);

        assert_eq!(cards[0].given_name, "Alice");
        assert_eq!(cards[0].family_name, "Liddell");
        assert_eq!(cards[0].phone_numbers, vec!["+1 (555) 123-4567"]);
        assert_eq!(cards[0].emails, vec!["alice@wonder.land"]);

        // No N property: FN becomes the display name
        assert_eq!(cards[1].display_name(), "The Hatter");
    }

    #[test]
    fn test_properties_outside_cards_are_ignored() {
        let cards = parse_vcards("TEL:555\nBEGIN:VCARD\nN:Doe;Jane\nEND:VCARD\n");
        assert_eq!(cards.len(), 1);
        assert!(cards[0].phone_numbers.is_empty());
        assert_eq!(cards[0].display_name(), "Jane Doe");
    }

    #[test]
    fn test_escaped_values() {
        let cards = parse_vcards("BEGIN:VCARD\nN:O\\,Brien;Pat\nEND:VCARD\n");
        assert_eq!(cards[0].family_name, "O,Brien");
    }

    #[test]
    fn test_source_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contacts.vcf");
        std::fs::write(&path, SAMPLE).unwrap();

        let source = VCardSource::new(&path);
        assert_eq!(source.request_access().unwrap(), AccessStatus::Granted);
        assert_eq!(source.enumerate().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_denied() {
        let dir = TempDir::new().unwrap();
        let source = VCardSource::new(dir.path().join("missing.vcf"));
        assert_eq!(source.request_access().unwrap(), AccessStatus::Denied);
        assert!(matches!(source.enumerate(), Err(Error::Contacts(_))));
    }
}
