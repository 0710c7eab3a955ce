use async_trait::async_trait;
use std::net::IpAddr;

/// Container and service names known inside one namespace, owned by the
/// network driver.
#[async_trait]
pub trait NameRegistry: Send + Sync {
    /// Addresses for `name` (no trailing dot, any case). `None` when the
    /// name is not registered; `Some(vec![])` is a known name without
    /// addresses.
    async fn lookup_name(&self, name: &str) -> Option<Vec<IpAddr>>;

    /// Reverse lookup for PTR answers.
    async fn lookup_addr(&self, addr: IpAddr) -> Option<String>;
}
