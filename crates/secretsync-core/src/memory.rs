//! In-memory adapters
//!
//! Deterministic stand-ins for the blob store and the cluster, with call
//! counters and failure injection. Used by the engine tests and by callers who
//! want to exercise a sync without infrastructure.

use crate::error::{SourceError, StoreError};
use crate::key::{namespace_prefix, BlobKey};
use crate::record::ResourceRecord;
use crate::source::ResourceSource;
use crate::store::BlobStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Blob store backed by a map of full keys
#[derive(Debug)]
pub struct MemoryBlobStore {
    root: String,
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    /// Keys that show up in listings but cannot be fetched
    phantoms: RwLock<HashSet<String>>,
    /// Per-key failures for get/put
    key_failures: RwLock<HashMap<String, StoreError>>,
    /// Failure for every operation
    outage: RwLock<Option<StoreError>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into().trim_end_matches('/').to_string(),
            blobs: RwLock::new(BTreeMap::new()),
            phantoms: RwLock::new(HashSet::new()),
            key_failures: RwLock::new(HashMap::new()),
            outage: RwLock::new(None),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    fn key(&self, namespace: &str, name: &str) -> String {
        BlobKey::new(&self.root, namespace, name).to_string()
    }

    /// Seed a blob without counting it as a put
    pub async fn insert(&self, namespace: &str, name: &str, bytes: impl Into<Vec<u8>>) {
        let key = self.key(namespace, name);
        self.blobs.write().await.insert(key, bytes.into());
    }

    /// Seed an object under an arbitrary key
    pub async fn insert_raw(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().await.insert(key.into(), bytes.into());
    }

    /// List a key that is gone by the time it is fetched
    pub async fn insert_phantom(&self, namespace: &str, name: &str) {
        let key = self.key(namespace, name);
        self.phantoms.write().await.insert(key);
    }

    /// Make get/put of one record fail
    pub async fn fail_key(&self, namespace: &str, name: &str, error: StoreError) {
        let key = self.key(namespace, name);
        self.key_failures.write().await.insert(key, error);
    }

    /// Make every operation fail
    pub async fn fail_all(&self, error: StoreError) {
        *self.outage.write().await = Some(error);
    }

    /// Current content of a blob
    pub async fn blob(&self, namespace: &str, name: &str) -> Option<Vec<u8>> {
        let key = self.key(namespace, name);
        self.blobs.read().await.get(&key).cloned()
    }

    /// All stored keys
    pub async fn keys(&self) -> Vec<String> {
        self.blobs.read().await.keys().cloned().collect()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    async fn check(&self, key: Option<&str>) -> Result<(), StoreError> {
        if let Some(err) = self.outage.read().await.clone() {
            return Err(err);
        }
        if let Some(key) = key {
            if let Some(err) = self.key_failures.read().await.get(key) {
                return Err(err.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, StoreError> {
        let key = self.key(namespace, name);
        self.check(Some(&key)).await?;
        Ok(self.blobs.read().await.contains_key(&key))
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let key = self.key(namespace, name);
        self.check(Some(&key)).await?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.blobs.read().await.get(&key).cloned())
    }

    async fn put(&self, namespace: &str, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let key = self.key(namespace, name);
        self.check(Some(&key)).await?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.blobs.write().await.insert(key, bytes);
        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        self.check(None).await?;
        let prefix = namespace_prefix(&self.root, namespace);
        let mut keys: Vec<String> = self
            .blobs
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        keys.extend(
            self.phantoms
                .read()
                .await
                .iter()
                .filter(|k| k.starts_with(&prefix))
                .cloned(),
        );
        keys.sort();
        Ok(keys)
    }

    fn backup_root(&self) -> &str {
        &self.root
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Cluster stand-in holding secrets in a map
#[derive(Debug, Default)]
pub struct MemoryResourceSource {
    secrets: RwLock<BTreeMap<(String, String), ResourceRecord>>,
    /// Secrets that `get` reports as missing although they exist
    hidden: RwLock<HashSet<(String, String)>>,
    /// Secrets that disappear right before `replace`
    vanish_on_replace: RwLock<HashSet<(String, String)>>,
    outage: RwLock<Option<SourceError>>,
    creates: AtomicUsize,
    replaces: AtomicUsize,
}

impl MemoryResourceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret
    pub async fn insert(&self, record: ResourceRecord) {
        let id = (record.namespace.clone(), record.name.clone());
        self.secrets.write().await.insert(id, record);
    }

    /// Remove a secret
    pub async fn remove(&self, namespace: &str, name: &str) -> Option<ResourceRecord> {
        self.secrets
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()))
    }

    /// Current state of a secret, bypassing any injected behaviour
    pub async fn secret(&self, namespace: &str, name: &str) -> Option<ResourceRecord> {
        self.secrets
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Make `get` miss a secret that exists, so `create` races into it
    pub async fn hide_from_get(&self, namespace: &str, name: &str) {
        self.hidden
            .write()
            .await
            .insert((namespace.to_string(), name.to_string()));
    }

    /// Delete a secret just before it is replaced
    pub async fn vanish_on_replace(&self, namespace: &str, name: &str) {
        self.vanish_on_replace
            .write()
            .await
            .insert((namespace.to_string(), name.to_string()));
    }

    /// Make every operation fail
    pub async fn fail_all(&self, error: SourceError) {
        *self.outage.write().await = Some(error);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn replace_count(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    async fn check(&self) -> Result<(), SourceError> {
        match self.outage.read().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ResourceSource for MemoryResourceSource {
    async fn list(&self, namespace: &str) -> Result<Vec<ResourceRecord>, SourceError> {
        self.check().await?;
        Ok(self
            .secrets
            .read()
            .await
            .values()
            .filter(|r| r.namespace == namespace && !r.is_service_account_token())
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ResourceRecord>, SourceError> {
        self.check().await?;
        let id = (namespace.to_string(), name.to_string());
        if self.hidden.read().await.contains(&id) {
            return Ok(None);
        }
        Ok(self.secrets.read().await.get(&id).cloned())
    }

    async fn create(&self, namespace: &str, record: &ResourceRecord) -> Result<(), SourceError> {
        self.check().await?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let id = (namespace.to_string(), record.name.clone());
        let mut secrets = self.secrets.write().await;
        if secrets.contains_key(&id) {
            return Err(SourceError::already_exists(namespace, &record.name));
        }
        let mut stored = record.clone();
        stored.namespace = namespace.to_string();
        secrets.insert(id, stored);
        Ok(())
    }

    async fn replace(&self, namespace: &str, record: &ResourceRecord) -> Result<(), SourceError> {
        self.check().await?;
        self.replaces.fetch_add(1, Ordering::SeqCst);
        let id = (namespace.to_string(), record.name.clone());
        let mut secrets = self.secrets.write().await;
        if self.vanish_on_replace.write().await.remove(&id) {
            secrets.remove(&id);
        }
        if !secrets.contains_key(&id) {
            return Err(SourceError::not_found(namespace, &record.name));
        }
        let mut stored = record.clone();
        stored.namespace = namespace.to_string();
        secrets.insert(id, stored);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
