//! Handle -> display name resolution.
//!
//! Lookup normalizes the raw handle and then tries an ordered chain of
//! matchers, first hit wins:
//!
//! 1. [`ExactMatch`]
//! 2. [`StripCountryCode`]: drop a leading `1` from keys longer than 10
//! 3. [`AddCountryCode`]: prefix `1` to 10-digit keys
//! 4. [`SuffixMatch`]: last 7 characters, smallest matching index key wins
//!
//! When nothing matches, the raw handle comes back unchanged.

use super::{AccessStatus, ContactCard, ContactsSource};
use crate::error::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Normalize a raw handle: emails are lowercased, anything else keeps only digits.
pub fn normalize_handle(raw: &str) -> String {
    if raw.contains('@') {
        raw.to_lowercase()
    } else {
        raw.chars().filter(char::is_ascii_digit).collect()
    }
}

// ============================================
// NameIndex
// ============================================

/// Normalized handle -> display name.
///
/// Backed by a `BTreeMap`, so iteration (and therefore suffix matching) is
/// in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    names: BTreeMap<String, String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from enumerated contacts. Phone keys keep only digits, email
    /// keys are lowercased; empty keys and nameless cards are skipped. Later
    /// cards overwrite earlier ones on the same key.
    pub fn from_contacts<'a, I>(cards: I) -> Self
    where
        I: IntoIterator<Item = &'a ContactCard>,
    {
        let mut index = Self::new();
        for card in cards {
            let name = card.display_name();
            if name.is_empty() {
                continue;
            }
            for phone in &card.phone_numbers {
                let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
                if !digits.is_empty() {
                    index.names.insert(digits, name.clone());
                }
            }
            for email in &card.emails {
                let email = email.trim().to_lowercase();
                if !email.is_empty() {
                    index.names.insert(email, name.clone());
                }
            }
        }
        index
    }

    /// Insert an already-normalized key.
    pub fn insert(&mut self, key: impl Into<String>, name: impl Into<String>) {
        self.names.insert(key.into(), name.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameIndex {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================
// Matchers
// ============================================

/// One step of the fallback chain. `key` is already normalized.
pub trait HandleMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn find<'a>(&self, key: &str, index: &'a NameIndex) -> Option<&'a str>;
}

/// The normalized key as-is.
pub struct ExactMatch;

impl HandleMatcher for ExactMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find<'a>(&self, key: &str, index: &'a NameIndex) -> Option<&'a str> {
        index.get(key)
    }
}

/// Drop a leading US country code from keys longer than 10 characters.
pub struct StripCountryCode;

impl HandleMatcher for StripCountryCode {
    fn name(&self) -> &'static str {
        "strip_country_code"
    }

    fn find<'a>(&self, key: &str, index: &'a NameIndex) -> Option<&'a str> {
        if key.chars().count() > 10 {
            key.strip_prefix('1').and_then(|rest| index.get(rest))
        } else {
            None
        }
    }
}

/// Prefix a US country code to exactly 10-character keys.
pub struct AddCountryCode;

impl HandleMatcher for AddCountryCode {
    fn name(&self) -> &'static str {
        "add_country_code"
    }

    fn find<'a>(&self, key: &str, index: &'a NameIndex) -> Option<&'a str> {
        if key.chars().count() == 10 {
            index.get(&format!("1{}", key))
        } else {
            None
        }
    }
}

/// Match on the trailing characters of the key.
///
/// When several index keys share the suffix, the lexicographically smallest
/// key wins. An empty key never matches.
pub struct SuffixMatch {
    pub len: usize,
}

impl Default for SuffixMatch {
    fn default() -> Self {
        Self { len: 7 }
    }
}

impl HandleMatcher for SuffixMatch {
    fn name(&self) -> &'static str {
        "suffix"
    }

    fn find<'a>(&self, key: &str, index: &'a NameIndex) -> Option<&'a str> {
        if key.is_empty() || self.len == 0 {
            return None;
        }
        let start = key
            .char_indices()
            .rev()
            .nth(self.len - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let suffix = &key[start..];
        index
            .iter()
            .find(|(candidate, _)| candidate.ends_with(suffix))
            .map(|(_, name)| name)
    }
}

/// The standard fallback chain, in order.
pub fn default_matchers() -> Vec<Box<dyn HandleMatcher>> {
    vec![
        Box::new(ExactMatch),
        Box::new(StripCountryCode),
        Box::new(AddCountryCode),
        Box::new(SuffixMatch::default()),
    ]
}

// ============================================
// Resolver
// ============================================

/// Result of resolving one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Display name, or the raw handle when unmatched
    pub display_name: String,
    /// Name of the matcher that hit, `None` when unmatched
    pub matched_by: Option<&'static str>,
}

struct ResolverState {
    index: RwLock<Arc<NameIndex>>,
    ready: AtomicBool,
    /// Distinct normalized keys that missed against the current index
    unmatched: Mutex<BTreeSet<String>>,
    matchers: Vec<Box<dyn HandleMatcher>>,
}

/// Read-side name lookup over a swappable [`NameIndex`].
///
/// Cheap to clone; clones share the index. Before an index is installed
/// every handle resolves to itself.
#[derive(Clone)]
pub struct HandleResolver {
    state: Arc<ResolverState>,
}

impl Default for HandleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleResolver {
    /// A resolver with an empty index and the default matcher chain.
    pub fn new() -> Self {
        Self::with_matchers(default_matchers())
    }

    pub fn with_matchers(matchers: Vec<Box<dyn HandleMatcher>>) -> Self {
        Self {
            state: Arc::new(ResolverState {
                index: RwLock::new(Arc::new(NameIndex::new())),
                ready: AtomicBool::new(false),
                unmatched: Mutex::new(BTreeSet::new()),
                matchers,
            }),
        }
    }

    /// A resolver with `index` already installed.
    pub fn with_index(index: NameIndex) -> Self {
        let resolver = Self::new();
        resolver.replace_index(index);
        resolver
    }

    /// Swap in a new index wholesale.
    pub fn replace_index(&self, index: NameIndex) {
        let index = Arc::new(index);
        *self
            .state
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = index;
        self.unmatched().clear();
        self.state.ready.store(true, Ordering::Release);
    }

    /// The currently installed index.
    pub fn index(&self) -> Arc<NameIndex> {
        self.state
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an index build has completed at least once.
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Acquire)
    }

    /// How many distinct handles have fallen through every matcher since
    /// the current index was installed. Repeat lookups count once.
    pub fn unmatched_count(&self) -> usize {
        self.unmatched().len()
    }

    fn unmatched(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.state
            .unmatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve with details on which matcher hit.
    pub fn resolve_match(&self, raw: &str) -> Resolution {
        let key = normalize_handle(raw);
        let index = self.index();

        for matcher in &self.state.matchers {
            if let Some(name) = matcher.find(&key, &index) {
                return Resolution {
                    display_name: name.to_string(),
                    matched_by: Some(matcher.name()),
                };
            }
        }

        if self.unmatched().insert(key.clone()) {
            tracing::debug!(handle = %raw, key = %key, ready = self.is_ready(), "Unmatched handle");
        }
        Resolution {
            display_name: raw.to_string(),
            matched_by: None,
        }
    }

    /// Display name for a raw handle, or the handle itself.
    pub fn resolve(&self, raw: &str) -> String {
        self.resolve_match(raw).display_name
    }

    /// Build the index from `source` and install it.
    ///
    /// Returns the number of keys indexed. A denied request leaves the
    /// current index untouched and returns 0.
    pub fn build_index(&self, source: &dyn ContactsSource) -> Result<usize> {
        match source.request_access()? {
            AccessStatus::Granted => {}
            AccessStatus::Denied => {
                tracing::info!("Contacts access denied; names will show as raw handles");
                return Ok(0);
            }
        }

        let cards = source.enumerate()?;
        let index = NameIndex::from_contacts(&cards);
        let keys = index.len();
        self.replace_index(index);

        tracing::info!(contacts = cards.len(), keys, "Built contacts name index");
        Ok(keys)
    }

    /// Build the index on a blocking task. Lookups keep working (with raw
    /// handles) until it lands; failures are logged and leave the index as is.
    pub fn spawn_index_build(
        &self,
        source: Arc<dyn ContactsSource>,
    ) -> tokio::task::JoinHandle<Result<usize>> {
        let resolver = self.clone();
        tokio::task::spawn_blocking(move || {
            let result = resolver.build_index(source.as_ref());
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Contacts index build failed");
            }
            result
        })
    }
}
