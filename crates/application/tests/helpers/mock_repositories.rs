#![allow(dead_code)]

use async_trait::async_trait;
use nsresolv_application::ports::{HostResolverSource, ResolvConfStore};
use nsresolv_application::services::content_hash;
use nsresolv_domain::{DomainError, ResolverSnapshot, SourceIdentity};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory `resolv.conf` plus sidecar hash.
#[derive(Clone)]
pub struct MemoryResolvConfStore {
    path: PathBuf,
    content: Arc<Mutex<Option<Vec<u8>>>>,
    hash: Arc<Mutex<Option<String>>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryResolvConfStore {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            content: Arc::new(Mutex::new(None)),
            hash: Arc::new(Mutex::new(None)),
            writes: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(Mutex::new(false)),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.content
            .lock()
            .unwrap()
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Simulates a user editing the file inside the container.
    pub fn edit(&self, content: &str) {
        *self.content.lock().unwrap() = Some(content.as_bytes().to_vec());
    }

    pub fn delete(&self) {
        *self.content.lock().unwrap() = None;
    }

    pub fn preset_hash(&self, hash: &str) {
        *self.hash.lock().unwrap() = Some(hash.to_string());
    }

    pub fn recorded_hash(&self) -> Option<String> {
        self.hash.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ResolvConfStore for MemoryResolvConfStore {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError> {
        Ok(self.content.lock().unwrap().clone())
    }

    async fn write(&self, content: &[u8]) -> Result<(), DomainError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(DomainError::Write {
                path: self.path.display().to_string(),
                reason: "read-only file system".to_string(),
            });
        }
        *self.content.lock().unwrap() = Some(content.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_recorded_hash(&self) -> Result<Option<String>, DomainError> {
        Ok(self.hash.lock().unwrap().clone())
    }

    async fn record_hash(&self, hash: &str) -> Result<(), DomainError> {
        *self.hash.lock().unwrap() = Some(hash.to_string());
        Ok(())
    }
}

/// Host resolver file held in memory; `None` content means the file is absent.
#[derive(Clone)]
pub struct MockHostResolverSource {
    path: PathBuf,
    content: Arc<Mutex<Option<String>>>,
    failure: Arc<Mutex<Option<DomainError>>>,
    captures: Arc<AtomicUsize>,
}

impl MockHostResolverSource {
    pub fn new(path: &str, content: Option<&str>) -> Self {
        Self {
            path: PathBuf::from(path),
            content: Arc::new(Mutex::new(content.map(str::to_string))),
            failure: Arc::new(Mutex::new(None)),
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_content(&self, content: Option<&str>) {
        *self.content.lock().unwrap() = content.map(str::to_string);
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(DomainError::Read {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolverSource for MockHostResolverSource {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn capture(&self) -> Result<ResolverSnapshot, DomainError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.failure.lock().unwrap().clone() {
            return Err(e);
        }
        let content = self.content.lock().unwrap().clone();
        Ok(match content {
            Some(content) => ResolverSnapshot::parse(
                &content,
                SourceIdentity::present(&self.path, None, content_hash(content.as_bytes())),
            ),
            None => ResolverSnapshot::empty(SourceIdentity::missing(&self.path)),
        })
    }
}
