//! Contacts: turning raw handles into display names.
//!
//! The contacts store itself is an external collaborator behind
//! [`ContactsSource`]. From it we build a [`NameIndex`] of normalized
//! handle -> display name once, and [`HandleResolver`] answers lookups
//! against whatever index is current, including none at all.

pub mod resolver;
pub mod vcard;

pub use resolver::{
    default_matchers, normalize_handle, AddCountryCode, ExactMatch, HandleMatcher,
    HandleResolver, NameIndex, Resolution, StripCountryCode, SuffixMatch,
};
pub use vcard::VCardSource;

use crate::error::Result;

/// One contact as enumerated from a contacts source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactCard {
    pub given_name: String,
    pub family_name: String,
    pub phone_numbers: Vec<String>,
    pub emails: Vec<String>,
}

impl ContactCard {
    /// `"{given} {family}"` with surrounding whitespace trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}

/// Outcome of asking a source for permission to read contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Granted,
    Denied,
}

/// A permission-gated contacts store.
///
/// Implementations may block; [`HandleResolver::spawn_index_build`] runs
/// them off the async executor.
pub trait ContactsSource: Send + Sync {
    /// Ask for access. A denial is not an error.
    fn request_access(&self) -> Result<AccessStatus>;

    /// Enumerate every contact. Only called after access was granted.
    fn enumerate(&self) -> Result<Vec<ContactCard>>;
}

/// In-memory contacts, always accessible.
#[derive(Debug, Clone, Default)]
pub struct StaticContacts {
    cards: Vec<ContactCard>,
}

impl StaticContacts {
    pub fn new(cards: Vec<ContactCard>) -> Self {
        Self { cards }
    }
}

impl ContactsSource for StaticContacts {
    fn request_access(&self) -> Result<AccessStatus> {
        Ok(AccessStatus::Granted)
    }

    fn enumerate(&self) -> Result<Vec<ContactCard>> {
        Ok(self.cards.clone())
    }
}
