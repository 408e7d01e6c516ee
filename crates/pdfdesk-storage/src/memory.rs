//! In-memory Object Store
//!
//! For development and tests. URLs point back at the server's `/files`
//! route, which reads the bytes out of this store. The store holds at most
//! `max_objects` objects and evicts the oldest write first.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::{ObjectStore, StoredData, StoredObject};

/// Objects kept before the oldest is evicted
pub const DEFAULT_MAX_OBJECTS: usize = 256;

#[derive(Default)]
struct Objects {
    entries: HashMap<String, StoredData>,

    /// Keys in write order, oldest first
    order: VecDeque<String>,
}

pub struct MemoryObjectStore {
    base_url: String,
    max_objects: usize,
    objects: RwLock<Objects>,
}

impl MemoryObjectStore {
    /// `base_url` is the public server URL, e.g. `http://localhost:3000`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_capacity(base_url, DEFAULT_MAX_OBJECTS)
    }

    /// Keep at most `max_objects` objects (at least one)
    pub fn with_capacity(base_url: impl Into<String>, max_objects: usize) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_objects: max_objects.max(1),
            objects: RwLock::new(Objects::default()),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/files/{key}", self.base_url)
    }

    pub const fn max_objects(&self) -> usize {
        self.max_objects
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        let size = data.len();
        let entry = StoredData {
            data,
            content_type: content_type.to_string(),
        };

        let mut objects = self.objects.write().await;
        if objects.entries.insert(key.to_string(), entry).is_some() {
            objects.order.retain(|existing| existing != key);
        }
        objects.order.push_back(key.to_string());

        while objects.entries.len() > self.max_objects {
            let Some(oldest) = objects.order.pop_front() else {
                break;
            };
            objects.entries.remove(&oldest);
            tracing::debug!(key = %oldest, "Evicted object from memory");
        }
        drop(objects);

        tracing::debug!(key = %key, size, "Stored object in memory");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.url_for(key),
            size,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<StoredData>> {
        Ok(self.objects.read().await.entries.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        if objects.entries.remove(key).is_some() {
            objects.order.retain(|existing| existing != key);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
