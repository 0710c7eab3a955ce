use async_trait::async_trait;
use nsresolv_domain::DomainError;
use std::path::Path;

/// Storage for one generated `resolv.conf` and the hash of the last version
/// the engine wrote to it.
#[async_trait]
pub trait ResolvConfStore: Send + Sync {
    fn path(&self) -> &Path;

    /// Current content, `None` when the file does not exist.
    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError>;

    async fn write(&self, content: &[u8]) -> Result<(), DomainError>;

    async fn read_recorded_hash(&self) -> Result<Option<String>, DomainError>;

    async fn record_hash(&self, hash: &str) -> Result<(), DomainError>;
}
