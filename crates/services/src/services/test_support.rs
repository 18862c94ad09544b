//! Shared doubles for service tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use db::models::content_record::{ContentRecord, ContentSection};
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tokio::sync::Notify;
use uuid::Uuid;

use super::{
    content::{ContentError, ContentStore, SqliteContentStore},
    storage::{ObjectStore, StorageError},
};

/// In-memory SQLite pool with the schema applied. One connection, so that
/// `:memory:` databases are shared across queries.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::MIGRATOR.run(&pool).await.unwrap();
    pool
}

/// In-memory object store with failure injection and an optional gate that
/// parks `put` calls until released (for in-flight-save tests).
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    gate: Mutex<Option<PutGate>>,
}

#[derive(Clone)]
pub struct PutGate {
    /// Signalled by the store when a `put` call has started.
    pub entered: Arc<Notify>,
    /// Signalled by the test to let the parked `put` proceed.
    pub release: Arc<Notify>,
}

impl MemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, bucket: &str, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), name.to_string()))
    }

    pub fn names(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn insert(&self, bucket: &str, name: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), name.to_string()), bytes.to_vec());
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_puts(&self, on: bool) {
        self.fail_puts.store(on, Ordering::SeqCst);
    }

    pub fn gate_puts(&self) -> PutGate {
        let gate = PutGate {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected put failure".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert(bucket, name, bytes);
        Ok(())
    }

    async fn remove(&self, bucket: &str, names: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap();
        for name in names {
            objects.remove(&(bucket.to_string(), name.clone()));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("/storage/{bucket}/{name}")
    }
}

/// Wraps the real SQLite store, failing writes on demand.
pub struct FlakyContentStore {
    inner: SqliteContentStore,
    fail_writes: AtomicBool,
}

impl FlakyContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteContentStore::new(pool),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), ContentError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ContentError::Unavailable("injected write failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentStore for FlakyContentStore {
    async fn fetch_current(
        &self,
        section: ContentSection,
    ) -> Result<Option<ContentRecord>, ContentError> {
        self.inner.fetch_current(section).await
    }

    async fn update_payload(
        &self,
        id: Uuid,
        payload: &Value,
    ) -> Result<ContentRecord, ContentError> {
        self.check_writes()?;
        self.inner.update_payload(id, payload).await
    }

    async fn upsert_payload(
        &self,
        section: ContentSection,
        payload: &Value,
    ) -> Result<ContentRecord, ContentError> {
        self.check_writes()?;
        self.inner.upsert_payload(section, payload).await
    }
}
