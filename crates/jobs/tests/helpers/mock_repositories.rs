#![allow(dead_code)]

use async_trait::async_trait;
use nsresolv_application::ports::{HostResolverSource, ResolvConfStore};
use nsresolv_application::services::content_hash;
use nsresolv_application::use_cases::{
    ActiveNamespaces, NamespaceDns, WatchHostResolverUseCase,
};
use nsresolv_domain::{DnsOverrides, DomainError, ResolverSnapshot, SourceIdentity};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockHostResolverSource {
    path: PathBuf,
    content: Arc<Mutex<Option<String>>>,
    captures: Arc<AtomicUsize>,
}

impl MockHostResolverSource {
    pub fn new(content: &str) -> Self {
        Self {
            path: PathBuf::from("/etc/resolv.conf"),
            content: Arc::new(Mutex::new(Some(content.to_string()))),
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_content(&self, content: &str) {
        *self.content.lock().unwrap() = Some(content.to_string());
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

#[derive(Clone, Default)]
pub struct MemoryResolvConfStore {
    path: PathBuf,
    content: Arc<Mutex<Option<Vec<u8>>>>,
    hash: Arc<Mutex<Option<String>>>,
}

impl MemoryResolvConfStore {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/run/c1/resolv.conf"),
            ..Self::default()
        }
    }

    pub fn content(&self) -> String {
        self.content
            .lock()
            .unwrap()
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
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
        *self.content.lock().unwrap() = Some(content.to_vec());
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

/// Watcher over `host` with one namespace `c1` already synced.
pub async fn watcher_with_namespace(
    host: &str,
) -> (
    Arc<WatchHostResolverUseCase>,
    MockHostResolverSource,
    MemoryResolvConfStore,
) {
    let source = MockHostResolverSource::new(host);
    let namespaces = Arc::new(ActiveNamespaces::new());
    let watcher = Arc::new(WatchHostResolverUseCase::new(
        Arc::new(source.clone()),
        Arc::clone(&namespaces),
    ));
    watcher.initialize().await;

    let store = MemoryResolvConfStore::new();
    let snapshot = watcher.current_snapshot().await;
    let namespace = Arc::new(NamespaceDns::new(
        "c1",
        DnsOverrides::none(),
        vec!["127.0.0.11".parse().unwrap()],
        &snapshot,
        Arc::new(store.clone()),
    ));
    namespace.sync().await.unwrap();
    namespaces.insert(namespace).unwrap();

    (watcher, source, store)
}
