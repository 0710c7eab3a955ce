use crate::ports::HostResolverSource;
use crate::use_cases::namespaces::{ActiveNamespaces, NamespaceDns};
use crate::use_cases::resolv_conf::SyncOutcome;
use futures::future::join_all;
use nsresolv_domain::{DomainError, ResolverSnapshot, SourceIdentity};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Unchanged,
    Refreshed {
        namespaces: usize,
        written: usize,
        locked: usize,
        failed: usize,
    },
    ReadFailed,
}

/// Detects host resolver changes and pushes them into every active namespace.
pub struct WatchHostResolverUseCase {
    source: Arc<dyn HostResolverSource>,
    namespaces: Arc<ActiveNamespaces>,
    current: RwLock<Arc<ResolverSnapshot>>,
    last_error: Mutex<Option<DomainError>>,
}

impl WatchHostResolverUseCase {
    /// Starts from an empty snapshot; call [`initialize`](Self::initialize)
    /// before creating namespaces.
    pub fn new(source: Arc<dyn HostResolverSource>, namespaces: Arc<ActiveNamespaces>) -> Self {
        let empty = ResolverSnapshot::empty(SourceIdentity::missing(source.path()));
        Self {
            source,
            namespaces,
            current: RwLock::new(Arc::new(empty)),
            last_error: Mutex::new(None),
        }
    }

    /// First capture. An unreadable host file is not fatal: the empty
    /// snapshot stays in place and the error is remembered, so the first
    /// readable poll counts as a change.
    pub async fn initialize(&self) -> Arc<ResolverSnapshot> {
        match self.source.capture().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                info!(
                    path = %snapshot.path().display(),
                    exists = snapshot.has_host_file(),
                    nameservers = snapshot.nameservers().len(),
                    "Host resolver captured"
                );
                *self.current.write().await = Arc::clone(&snapshot);
                snapshot
            }
            Err(e) => {
                warn!(
                    path = %self.source.path().display(),
                    error = %e,
                    "Host resolver unreadable at startup, using empty snapshot"
                );
                *self.last_error.lock().await = Some(e);
                self.current_snapshot().await
            }
        }
    }

    pub async fn current_snapshot(&self) -> Arc<ResolverSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Adds a namespace built from an earlier snapshot. The policy is
    /// re-resolved against the current snapshot after the insert, since a
    /// concurrent [`check`](Self::check) may have listed namespaces first.
    pub async fn register(&self, namespace: Arc<NamespaceDns>) -> Result<(), DomainError> {
        self.namespaces.insert(Arc::clone(&namespace))?;
        namespace.apply_snapshot(&*self.current_snapshot().await);
        Ok(())
    }

    pub async fn check(&self) -> WatchOutcome {
        let snapshot = match self.source.capture().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let mut last = self.last_error.lock().await;
                if last.as_ref() != Some(&e) {
                    warn!(
                        path = %self.source.path().display(),
                        error = %e,
                        "Host resolver unreadable, keeping previous snapshot"
                    );
                    *last = Some(e);
                }
                return WatchOutcome::ReadFailed;
            }
        };

        if self.last_error.lock().await.take().is_some() {
            info!(path = %self.source.path().display(), "Host resolver readable again");
        }

        {
            let current = self.current.read().await;
            if current.identity().same_content(snapshot.identity()) {
                debug!(path = %snapshot.path().display(), "Host resolver unchanged");
                return WatchOutcome::Unchanged;
            }
        }

        info!(
            path = %snapshot.path().display(),
            exists = snapshot.has_host_file(),
            nameservers = snapshot.nameservers().len(),
            "Host resolver changed"
        );

        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Arc::clone(&snapshot);

        self.refresh_all(&snapshot).await
    }

    async fn refresh_all(&self, snapshot: &ResolverSnapshot) -> WatchOutcome {
        let namespaces = self.namespaces.list();
        let results = join_all(
            namespaces
                .iter()
                .map(|namespace| refresh_namespace(namespace, snapshot)),
        )
        .await;

        let mut written = 0;
        let mut locked = 0;
        let mut failed = 0;
        for result in results {
            match result {
                Ok(SyncOutcome::Written) => written += 1,
                Ok(SyncOutcome::Locked) => locked += 1,
                Ok(SyncOutcome::Unchanged) => {}
                Err(_) => failed += 1,
            }
        }

        WatchOutcome::Refreshed {
            namespaces: namespaces.len(),
            written,
            locked,
            failed,
        }
    }
}

async fn refresh_namespace(
    namespace: &NamespaceDns,
    snapshot: &ResolverSnapshot,
) -> Result<SyncOutcome, DomainError> {
    namespace.apply_snapshot(snapshot);
    namespace.sync().await.inspect_err(|e| {
        error!(namespace = %namespace.id(), error = %e, "Failed to refresh resolv.conf");
    })
}
