use crate::ports::ResolvConfStore;
use crate::use_cases::resolv_conf::{SyncOutcome, SyncResolvConfUseCase};
use arc_swap::ArcSwap;
use nsresolv_domain::{DnsOverrides, DomainError, EffectivePolicy, PolicyResolver, ResolverSnapshot};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// DNS state of one container namespace: its inputs, the current effective
/// policy and the writer for its `resolv.conf`.
///
/// The policy handle is shared with the namespace's proxy, which loads it on
/// every forwarded query.
pub struct NamespaceDns {
    id: String,
    overrides: DnsOverrides,
    proxy_addresses: Vec<IpAddr>,
    policy: Arc<ArcSwap<EffectivePolicy>>,
    writer: SyncResolvConfUseCase,
}

impl NamespaceDns {
    pub fn new(
        id: impl Into<String>,
        overrides: DnsOverrides,
        proxy_addresses: Vec<IpAddr>,
        snapshot: &ResolverSnapshot,
        store: Arc<dyn ResolvConfStore>,
    ) -> Self {
        let policy = PolicyResolver::resolve(snapshot, &overrides, &proxy_addresses);
        Self {
            id: id.into(),
            overrides,
            proxy_addresses,
            policy: Arc::new(ArcSwap::from_pointee(policy)),
            writer: SyncResolvConfUseCase::new(store),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn overrides(&self) -> &DnsOverrides {
        &self.overrides
    }

    pub fn proxy_addresses(&self) -> &[IpAddr] {
        &self.proxy_addresses
    }

    pub fn policy_handle(&self) -> Arc<ArcSwap<EffectivePolicy>> {
        Arc::clone(&self.policy)
    }

    pub fn current_policy(&self) -> Arc<EffectivePolicy> {
        self.policy.load_full()
    }

    /// Recomputes the policy from `snapshot` and publishes it. Returns whether
    /// the policy changed.
    pub fn apply_snapshot(&self, snapshot: &ResolverSnapshot) -> bool {
        let next = PolicyResolver::resolve(snapshot, &self.overrides, &self.proxy_addresses);
        if *self.policy.load_full() == next {
            debug!(namespace = %self.id, "Policy unchanged");
            return false;
        }

        info!(
            namespace = %self.id,
            ext_servers = next.ext_servers.len(),
            host_loopback = next.relies_on_host_loopback(),
            "Publishing new DNS policy"
        );
        self.policy.store(Arc::new(next));
        true
    }

    pub async fn sync(&self) -> Result<SyncOutcome, DomainError> {
        let policy = self.policy.load_full();
        self.writer.sync(&policy).await
    }

    pub async fn is_locked(&self) -> bool {
        self.writer.is_locked().await
    }
}
