use async_trait::async_trait;
use nsresolv_application::ports::HostResolverSource;
use nsresolv_application::services::content_hash;
use nsresolv_domain::{DomainError, ResolverSnapshot, SourceIdentity};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Reads the host resolver file (usually `/etc/resolv.conf`).
pub struct HostResolvConfReader {
    path: PathBuf,
}

impl HostResolvConfReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for HostResolvConfReader {
    fn default() -> Self {
        Self::new("/etc/resolv.conf")
    }
}

#[async_trait]
impl HostResolverSource for HostResolvConfReader {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn capture(&self) -> Result<ResolverSnapshot, DomainError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Host resolver file not present");
                return Ok(ResolverSnapshot::empty(SourceIdentity::missing(&self.path)));
            }
            Err(e) => {
                return Err(DomainError::Read {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let modified = fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok());
        let identity = SourceIdentity::present(&self.path, modified, content_hash(&bytes));

        Ok(ResolverSnapshot::parse(
            &String::from_utf8_lossy(&bytes),
            identity,
        ))
    }
}
