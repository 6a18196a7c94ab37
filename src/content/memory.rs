//! In-memory content store.
//!
//! Backs the test suite and lets a run be rehearsed without touching a real
//! space. Updates can be made to fail per entry to exercise rollback paths.

use crate::content::client::ContentClient;
use crate::content::model::{ContentType, Entry};
use crate::error::{ContentError, ContentResult, ValidationIssue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Failure to inject on `update_entry`
#[derive(Debug, Clone)]
pub enum UpdateFailure {
    Api(String),
    Validation(Vec<ValidationIssue>),
}

#[derive(Debug, Default)]
struct Store {
    entries: Vec<Entry>,
    content_types: HashMap<String, ContentType>,
    failing_updates: HashMap<String, UpdateFailure>,
    calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryClient {
    store: Mutex<Store>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let client = Self::new();
        for entry in entries {
            client.insert_entry(entry);
        }
        client
    }

    /// Insert or replace an entry
    pub fn insert_entry(&self, entry: Entry) {
        let mut store = self.lock();
        match store.entries.iter_mut().find(|e| e.id() == entry.id()) {
            Some(existing) => *existing = entry,
            None => store.entries.push(entry),
        }
    }

    pub fn insert_content_type(&self, content_type: ContentType) {
        self.lock()
            .content_types
            .insert(content_type.sys.id.clone(), content_type);
    }

    pub fn fail_updates_for(&self, entry_id: &str, failure: UpdateFailure) {
        self.lock()
            .failing_updates
            .insert(entry_id.to_string(), failure);
    }

    /// Stored copy of an entry, bypassing the call log
    pub fn stored(&self, id: &str) -> Option<Entry> {
        self.lock().entries.iter().find(|e| e.id() == id).cloned()
    }

    /// Calls made so far, formatted as `method:argument`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // The store has no invariants spanning calls, so poisoning is ignored.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ContentClient for MemoryClient {
    async fn get_entry(&self, id: &str) -> ContentResult<Option<Entry>> {
        let mut store = self.lock();
        store.calls.push(format!("get_entry:{}", id));
        Ok(store.entries.iter().find(|e| e.id() == id).cloned())
    }

    async fn get_entries(&self, content_type: &str) -> ContentResult<Vec<Entry>> {
        let mut store = self.lock();
        store.calls.push(format!("get_entries:{}", content_type));
        Ok(store
            .entries
            .iter()
            .filter(|e| e.content_type_id() == Some(content_type))
            .cloned()
            .collect())
    }

    async fn get_content_type(&self, id: &str) -> ContentResult<ContentType> {
        let mut store = self.lock();
        store.calls.push(format!("get_content_type:{}", id));
        store
            .content_types
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::ContentTypeNotFound(id.to_string()))
    }

    async fn update_entry(&self, entry: &Entry) -> ContentResult<Entry> {
        let mut store = self.lock();
        store.calls.push(format!("update_entry:{}", entry.id()));

        if let Some(failure) = store.failing_updates.get(entry.id()) {
            return Err(match failure.clone() {
                UpdateFailure::Api(message) => ContentError::Api {
                    status: 500,
                    message,
                },
                UpdateFailure::Validation(issues) => ContentError::Validation(issues),
            });
        }

        let mut saved = entry.clone();
        saved.sys.version = Some(saved.sys.version.unwrap_or(0) + 1);
        match store.entries.iter_mut().find(|e| e.id() == entry.id()) {
            Some(existing) => *existing = saved.clone(),
            None => store.entries.push(saved.clone()),
        }
        Ok(saved)
    }
}
