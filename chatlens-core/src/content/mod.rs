//! Message body extraction
//!
//! A message row carries its body in one of three ways:
//! - a plain `text` column
//! - an `attributedBody` blob holding an archived attributed string, either
//!   as a keyed archive ([`keyed`]) or the legacy typedstream ([`typedstream`])
//! - nothing at all, for attachment-only messages
//!
//! [`extract`] resolves a row to usable prose (links removed) or says why
//! there is none.

pub mod keyed;
pub mod typedstream;
pub mod urls;

use crate::db::MessageBodyRow;
use crate::error::{Error, Result};

pub use urls::strip_urls;

/// Outcome of resolving a row's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    /// Prose with links already stripped
    Text(String),
    /// Attachment with no text; excluded from scoring
    AttachmentOnly,
    /// No usable content
    Empty,
}

/// Decode an archived attributed string, trying the keyed format first and
/// the legacy typedstream second.
pub fn decode_attributed_body(data: &[u8]) -> Result<String> {
    match keyed::decode(data) {
        Ok(text) => Ok(text),
        Err(keyed_err) => typedstream::decode(data).map_err(|legacy_err| {
            Error::RowDecode(format!(
                "attributed body matched neither decoder ({}; {})",
                keyed_err, legacy_err
            ))
        }),
    }
}

/// Resolve a row to its scoreable content.
///
/// Plain text wins when non-empty; otherwise the blob is decoded; otherwise
/// the row is attachment-only or empty. A blob that fails both decoders is a
/// [`Error::RowDecode`].
pub fn extract(row: &MessageBodyRow) -> Result<BodyContent> {
    let text = match (&row.text, &row.attributed_body) {
        (Some(text), _) if !text.is_empty() => text.clone(),
        (_, Some(blob)) => decode_attributed_body(blob)?,
        _ if row.has_attachments => return Ok(BodyContent::AttachmentOnly),
        _ => return Ok(BodyContent::Empty),
    };

    if text.is_empty() {
        return Ok(BodyContent::Empty);
    }

    Ok(BodyContent::Text(strip_urls(&text)))
}
