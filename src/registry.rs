//! State accumulated by one traversal run.
//!
//! [`FieldRegistry`] holds the discovered [`TranslationEntry`] candidates in
//! discovery order, enforces the run-wide field cap, and caches resolved
//! entries so a link reached twice is fetched once. [`ActivePath`] is the
//! cycle guard: ids are pushed on entry and popped by [`PathGuard`] on drop,
//! so an early return can never leave a stale id behind.

use crate::classifier::Classifier;
use crate::content::model::Entry;
use crate::translation::TranslationEntry;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// Result of offering a candidate to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// The (entry, field) pair was registered earlier; the first one is kept
    AlreadyPresent,
    CapReached,
}

#[derive(Debug)]
pub struct FieldRegistry {
    entries: Vec<TranslationEntry>,
    index: HashMap<(String, String), usize>,
    resolved: HashMap<String, Entry>,
    max_fields: usize,
    cap_reported: bool,
}

impl FieldRegistry {
    pub fn new(max_fields: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            resolved: HashMap::new(),
            max_fields,
            cap_reported: false,
        }
    }

    pub fn register(&mut self, candidate: TranslationEntry) -> Registration {
        let key = (candidate.entry_id.clone(), candidate.field_name.clone());
        if self.index.contains_key(&key) {
            return Registration::AlreadyPresent;
        }

        if self.is_full() {
            if !self.cap_reported {
                warn!(
                    max_fields = self.max_fields,
                    "max fields limit reached, skipping further fields"
                );
                self.cap_reported = true;
            }
            return Registration::CapReached;
        }

        self.index.insert(key, self.entries.len());
        self.entries.push(candidate);
        Registration::Added
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_fields
    }

    pub fn cache_entry(&mut self, entry: Entry) {
        self.resolved.insert(entry.id().to_string(), entry);
    }

    pub fn resolved_entry(&self, entry_id: &str) -> Option<&Entry> {
        self.resolved.get(entry_id)
    }

    pub(crate) fn resolved_mut(&mut self) -> &mut HashMap<String, Entry> {
        &mut self.resolved
    }

    pub fn get(&self, entry_id: &str, field_name: &str) -> Option<&TranslationEntry> {
        self.index
            .get(&(entry_id.to_string(), field_name.to_string()))
            .map(|&i| &self.entries[i])
    }

    /// Every registered candidate, in discovery order
    pub fn all(&self) -> &[TranslationEntry] {
        &self.entries
    }

    /// Candidates that still need translating, in discovery order
    pub fn translatable(&self, classifier: &Classifier) -> Vec<TranslationEntry> {
        self.entries
            .iter()
            .filter(|e| e.should_translate(classifier))
            .cloned()
            .collect()
    }

    /// Distinct entry ids, in the order their first field was registered
    pub fn entry_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.entry_id.as_str()) {
                ids.push(&entry.entry_id);
            }
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<TranslationEntry> {
        self.entries
    }
}

/// Entry ids on the current recursion path
#[derive(Debug, Default)]
pub struct ActivePath {
    ids: Vec<String>,
}

impl ActivePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.ids.iter().any(|id| id == entry_id)
    }

    pub fn depth(&self) -> usize {
        self.ids.len()
    }

    pub fn enter(&mut self, entry_id: &str) -> PathGuard<'_> {
        self.ids.push(entry_id.to_string());
        PathGuard { path: self }
    }
}

/// Keeps one id on the active path until dropped
#[derive(Debug)]
pub struct PathGuard<'a> {
    path: &'a mut ActivePath,
}

impl Deref for PathGuard<'_> {
    type Target = ActivePath;

    fn deref(&self) -> &ActivePath {
        &*self.path
    }
}

impl DerefMut for PathGuard<'_> {
    fn deref_mut(&mut self) -> &mut ActivePath {
        &mut *self.path
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.path.ids.pop();
    }
}
