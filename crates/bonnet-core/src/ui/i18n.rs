// src/ui/i18n.rs
//! Localized strings and the process-wide language index.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static LANGUAGE: AtomicUsize = AtomicUsize::new(0);

/// Index of the language every [`LocalizedStr`] currently resolves to.
pub fn current_language() -> usize {
    LANGUAGE.load(Ordering::Relaxed)
}

pub fn set_language(index: usize) {
    LANGUAGE.store(index, Ordering::Relaxed);
}

/// Advance to the next of `count` languages, wrapping. Returns the new index.
pub fn cycle_language(count: usize) -> usize {
    let count = count.max(1);
    let mut next = 0;
    // fetch_update only fails when the closure returns None
    let _ = LANGUAGE.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        next = (current + 1) % count;
        Some(next)
    });
    next
}

/// One string per language. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LocalizedStr {
    variants: Arc<[String]>,
}

impl LocalizedStr {
    /// Build from per-language variants, language 0 first.
    ///
    /// An empty list resolves to the empty string in every language.
    pub fn new<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve for a specific language, falling back to language 0.
    pub fn resolve(&self, language: usize) -> &str {
        self.variants
            .get(language)
            .or_else(|| self.variants.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Resolve for the current process-wide language.
    pub fn current(&self) -> &str {
        self.resolve(current_language())
    }

    pub fn language_count(&self) -> usize {
        self.variants.len()
    }
}

impl From<&str> for LocalizedStr {
    fn from(s: &str) -> Self {
        Self::new([s])
    }
}

impl From<String> for LocalizedStr {
    fn from(s: String) -> Self {
        Self::new([s])
    }
}

impl fmt::Debug for LocalizedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.variants.iter()).finish()
    }
}

impl fmt::Display for LocalizedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.current())
    }
}
