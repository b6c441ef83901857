// Bad-word registry - the shared set of normalized offensive terms.
//
// Reads go through an in-memory snapshot so the lexical fast path never
// touches the database. Writers are serialized on their own mutex and hold
// it across the store call; the snapshot lock is only taken to swap in the
// new set, so readers keep using the previous snapshot meanwhile.

use super::moderation_models::{normalize_term, validate_term, TermRejection};
use super::moderation_store::{ModerationStore, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid term: {0}")]
    InvalidTerm(TermRejection),
}

pub struct BadWordRegistry<S: ModerationStore> {
    store: Arc<S>,
    terms: RwLock<Arc<BTreeSet<String>>>,
    writer: Mutex<()>,
}

impl<S: ModerationStore> BadWordRegistry<S> {
    /// Create an empty registry. Call [`load`](Self::load) to pull existing terms.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            terms: RwLock::new(Arc::new(BTreeSet::new())),
            writer: Mutex::new(()),
        }
    }

    /// Replace the snapshot with whatever the store currently holds.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let stored: BTreeSet<String> = self
            .store
            .list_bad_words()
            .await?
            .iter()
            .map(|term| normalize_term(term))
            .filter(|term| !term.is_empty())
            .collect();

        let count = stored.len();
        let _writer = self.writer.lock().await;
        self.publish(stored).await;
        Ok(count)
    }

    /// Add a term. Returns `false` if it was already registered.
    pub async fn add(&self, term: &str) -> Result<bool, RegistryError> {
        let term = validate_term(term).map_err(RegistryError::InvalidTerm)?;

        let _writer = self.writer.lock().await;
        let current = self.snapshot().await;
        if current.contains(&term) {
            return Ok(false);
        }

        let inserted = self.store.add_bad_word(&term).await?;
        let mut next = (*current).clone();
        next.insert(term);
        self.publish(next).await;
        Ok(inserted)
    }

    /// Remove a term. Returns `false` if it was not registered.
    pub async fn remove(&self, term: &str) -> Result<bool, StoreError> {
        let term = normalize_term(term);
        if term.is_empty() {
            return Ok(false);
        }

        let _writer = self.writer.lock().await;
        let removed = self.store.remove_bad_word(&term).await?;
        let mut next = (*self.snapshot().await).clone();
        next.remove(&term);
        self.publish(next).await;
        Ok(removed)
    }

    // Callers hold `writer`, so no other write can slip in between the
    // snapshot they cloned and this swap.
    async fn publish(&self, terms: BTreeSet<String>) {
        *self.terms.write().await = Arc::new(terms);
    }

    /// Current snapshot. Only waits for a pointer swap, never for the store.
    pub async fn snapshot(&self) -> Arc<BTreeSet<String>> {
        Arc::clone(&*self.terms.read().await)
    }

    /// All terms in sorted order.
    pub async fn list(&self) -> Vec<String> {
        self.snapshot().await.iter().cloned().collect()
    }

    #[cfg(test)]
    pub async fn contains(&self, term: &str) -> bool {
        self.snapshot().await.contains(&normalize_term(term))
    }

    /// First registered term found in `text`, if any.
    pub async fn find_in(&self, text: &str) -> Option<String> {
        let terms = self.snapshot().await;
        find_term(text, terms.iter()).map(str::to_string)
    }

    #[cfg(test)]
    pub async fn any_contained_in(&self, text: &str) -> bool {
        self.find_in(text).await.is_some()
    }
}

/// Case-insensitive scan of `text` for any of `terms` at word boundaries.
pub fn find_term<'a, I>(text: &str, terms: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let haystack = text.to_lowercase();
    terms
        .into_iter()
        .find(|term| contains_at_boundary(&haystack, term))
        .map(String::as_str)
}

fn contains_at_boundary(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    // Advance one char at a time so overlapping occurrences are all tried
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        if !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        {
            return true;
        }

        match haystack[start..].chars().next() {
            Some(c) => from = start + c.len_utf8(),
            None => break,
        }
    }
    false
}
