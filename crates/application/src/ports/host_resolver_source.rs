use async_trait::async_trait;
use nsresolv_domain::{DomainError, ResolverSnapshot};
use std::path::Path;

/// Captures the host resolver configuration.
///
/// A missing file is an empty snapshot, not an error. Any other read failure
/// is `DomainError::Read`.
#[async_trait]
pub trait HostResolverSource: Send + Sync {
    fn path(&self) -> &Path;

    async fn capture(&self) -> Result<ResolverSnapshot, DomainError>;
}
