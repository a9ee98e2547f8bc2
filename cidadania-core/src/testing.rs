//! Test doubles shared by the unit tests of this crate.

use crate::error::{CoreError, Result};
use crate::notify::{Notification, Notifier};
use crate::store::{Collection, ContentStore, MemoryStore, StoreQuery};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Notifier that remembers everything it was asked to show
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Store whose reads always fail
pub struct FailingStore;

#[async_trait]
impl ContentStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn select(&self, query: &StoreQuery) -> Result<Vec<Value>> {
        Err(CoreError::StoreRequestFailed {
            collection: query.collection.to_string(),
            status: 503,
            message: "unavailable".into(),
        })
    }

    async fn insert(&self, collection: Collection, _row: Value) -> Result<()> {
        Err(CoreError::StoreRequestFailed {
            collection: collection.to_string(),
            status: 503,
            message: "unavailable".into(),
        })
    }
}

/// Store that holds every read until the test releases a permit
pub struct GatedStore {
    inner: MemoryStore,
    gate: Semaphore,
    started: AtomicUsize,
}

impl GatedStore {
    pub fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
        })
    }

    /// Let one pending read complete
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for GatedStore {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn select(&self, query: &StoreQuery) -> Result<Vec<Value>> {
        // Snapshot before waiting so each read sees the rows present when it was issued
        let rows = self.inner.select(query).await;
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.unwrap();
        permit.forget();
        rows
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<()> {
        self.inner.insert(collection, row).await
    }
}

/// Memory store that can be switched into a failing mode
pub struct SwitchableStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl SwitchableStore {
    pub fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn rows(&self, collection: Collection) -> Vec<Value> {
        self.inner.rows(collection).await
    }
}

#[async_trait]
impl ContentStore for SwitchableStore {
    fn name(&self) -> &'static str {
        "switchable"
    }

    async fn select(&self, query: &StoreQuery) -> Result<Vec<Value>> {
        if self.failing.load(Ordering::SeqCst) {
            return FailingStore.select(query).await;
        }
        self.inner.select(query).await
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return FailingStore.insert(collection, row).await;
        }
        self.inner.insert(collection, row).await
    }
}

pub fn news_row(id: i64, created: &str, category: &str, published: bool) -> Value {
    json!({
        "id": id,
        "title": format!("Notícia {id}"),
        "content": "Conteúdo",
        "category": category,
        "image_url": null,
        "author": "Redação",
        "published": published,
        "created_at": format!("{created}T12:00:00+00:00"),
        "updated_at": format!("{created}T12:00:00+00:00"),
        "user_id": "00000000-0000-0000-0000-000000000001"
    })
}

pub fn program_row(id: i64, day: &str, start: &str, end: &str, active: bool) -> Value {
    json!({
        "id": id,
        "title": format!("Programa {id}"),
        "description": null,
        "host": "João Silva",
        "host_photo": null,
        "day_of_week": day,
        "start_time": start,
        "end_time": end,
        "active": active,
        "created_at": "2024-01-01T00:00:00+00:00",
        "updated_at": "2024-01-01T00:00:00+00:00"
    })
}
