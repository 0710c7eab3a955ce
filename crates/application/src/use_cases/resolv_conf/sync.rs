use crate::ports::ResolvConfStore;
use crate::services::content_hash;
use nsresolv_domain::{DomainError, EffectivePolicy, ResolvConf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Written,
    /// Rendered content matches the last write; nothing to do.
    Unchanged,
    /// The file was edited by someone else and is left alone.
    Locked,
}

impl SyncOutcome {
    pub fn written(&self) -> bool {
        matches!(self, Self::Written)
    }

    /// For callers that treat an externally edited file as an error.
    pub fn into_result(self, path: &str) -> Result<Self, DomainError> {
        match self {
            Self::Locked => Err(DomainError::LockConflict {
                path: path.to_string(),
            }),
            other => Ok(other),
        }
    }
}

#[derive(Debug, Default)]
struct WriterState {
    loaded: bool,
    last_hash: Option<String>,
    locked: bool,
}

/// Keeps one generated `resolv.conf` in line with the namespace policy.
///
/// The lock is sticky: once the on-disk content stops matching the last hash
/// this writer produced, no policy change overwrites it again. Removing the
/// file lifts the lock. All syncs for one file go through the same mutex so
/// the recorded hash always describes the last completed write.
pub struct SyncResolvConfUseCase {
    store: Arc<dyn ResolvConfStore>,
    state: Mutex<WriterState>,
}

impl SyncResolvConfUseCase {
    pub fn new(store: Arc<dyn ResolvConfStore>) -> Self {
        Self {
            store,
            state: Mutex::new(WriterState::default()),
        }
    }

    pub async fn sync(&self, policy: &EffectivePolicy) -> Result<SyncOutcome, DomainError> {
        let rendered = ResolvConf::render(policy);
        self.sync_content(rendered.as_bytes()).await
    }

    pub async fn is_locked(&self) -> bool {
        self.state.lock().await.locked
    }

    async fn sync_content(&self, content: &[u8]) -> Result<SyncOutcome, DomainError> {
        let path = self.store.path().display().to_string();
        let mut state = self.state.lock().await;

        if !state.loaded {
            state.last_hash = match self.store.read_recorded_hash().await {
                Ok(hash) => hash,
                Err(e) => {
                    warn!(path = %path, error = %e, "Ignoring unreadable recorded hash");
                    None
                }
            };
            state.loaded = true;
        }

        let on_disk = self.store.read().await?;
        let new_hash = content_hash(content);

        match on_disk {
            None => {
                if state.locked {
                    info!(path = %path, "Edited resolv.conf was removed, regenerating");
                    state.locked = false;
                }
            }
            Some(_) if state.locked => {
                debug!(path = %path, "resolv.conf locked by external edit");
                return Ok(SyncOutcome::Locked);
            }
            Some(current) => {
                if let Some(last) = state.last_hash.as_deref() {
                    if content_hash(&current) != last {
                        state.locked = true;
                        warn!(
                            path = %path,
                            "resolv.conf was modified externally, no further updates"
                        );
                        return Ok(SyncOutcome::Locked);
                    }
                    if new_hash == last {
                        return Ok(SyncOutcome::Unchanged);
                    }
                }
            }
        }

        self.store.write(content).await?;
        state.last_hash = Some(new_hash.clone());

        if let Err(e) = self.store.record_hash(&new_hash).await {
            warn!(path = %path, error = %e, "Failed to persist resolv.conf hash");
        }

        info!(path = %path, bytes = content.len(), "resolv.conf written");
        Ok(SyncOutcome::Written)
    }
}
