//! Wiring of the per-namespace pieces: policy, `resolv.conf` writer and
//! embedded proxy, all fed by one host resolver watcher.

use crate::dns::proxy::{DnsProxy, QueryHandler};
use crate::system::{FsResolvConfStore, HostResolvConfReader};
use dashmap::DashMap;
use nsresolv_application::ports::{HostResolverSource, NameRegistry};
use nsresolv_application::use_cases::{
    ActiveNamespaces, NamespaceDns, SyncOutcome, WatchHostResolverUseCase, WatchOutcome,
};
use nsresolv_domain::{DnsOverrides, DomainError, EngineConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What the container lifecycle manager supplies for a new namespace.
#[derive(Debug, Clone)]
pub struct NamespaceSpec {
    pub id: String,
    /// Host-side path of the file bind-mounted as the container's
    /// `/etc/resolv.conf`.
    pub resolv_conf_path: PathBuf,
    /// Internal proxy addresses from the network driver, e.g. `127.0.0.11`.
    pub proxy_addresses: Vec<IpAddr>,
    pub overrides: DnsOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedNamespace {
    pub id: String,
    pub listen_addrs: Vec<SocketAddr>,
    pub sync: SyncOutcome,
}

pub struct DnsEngine {
    config: EngineConfig,
    watcher: Arc<WatchHostResolverUseCase>,
    namespaces: Arc<ActiveNamespaces>,
    proxies: DashMap<String, Arc<DnsProxy>>,
}

impl DnsEngine {
    /// Engine reading the host resolver file named in `config`.
    pub async fn start(config: EngineConfig) -> Result<Self, DomainError> {
        let source = Arc::new(HostResolvConfReader::new(&config.host.resolv_conf_path));
        Self::with_source(config, source).await
    }

    pub async fn with_source(
        config: EngineConfig,
        source: Arc<dyn HostResolverSource>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let namespaces = Arc::new(ActiveNamespaces::new());
        let watcher = Arc::new(WatchHostResolverUseCase::new(
            source,
            Arc::clone(&namespaces),
        ));
        watcher.initialize().await;

        Ok(Self {
            config,
            watcher,
            namespaces,
            proxies: DashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared with the polling job.
    pub fn watcher(&self) -> Arc<WatchHostResolverUseCase> {
        Arc::clone(&self.watcher)
    }

    pub fn namespace(&self, id: &str) -> Option<Arc<NamespaceDns>> {
        self.namespaces.get(id)
    }

    pub fn proxy(&self, id: &str) -> Option<Arc<DnsProxy>> {
        self.proxies.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Binds the namespace's proxy and writes its `resolv.conf` once. Any
    /// failure leaves nothing behind.
    pub async fn create_namespace(
        &self,
        spec: NamespaceSpec,
        registry: Arc<dyn NameRegistry>,
    ) -> Result<CreatedNamespace, DomainError> {
        let snapshot = self.watcher.current_snapshot().await;
        let namespace = Arc::new(NamespaceDns::new(
            spec.id.clone(),
            spec.overrides,
            spec.proxy_addresses.clone(),
            &snapshot,
            Arc::new(FsResolvConfStore::new(&spec.resolv_conf_path)),
        ));
        self.watcher.register(Arc::clone(&namespace)).await?;

        let handler = Arc::new(QueryHandler::new(
            spec.id.clone(),
            namespace.policy_handle(),
            registry,
            &self.config.proxy,
        ));
        let proxy = Arc::new(DnsProxy::new(
            spec.id.clone(),
            spec.proxy_addresses,
            handler,
            self.config.proxy.clone(),
        ));

        let listen_addrs = match proxy.start().await {
            Ok(addrs) => addrs,
            Err(e) => {
                let _ = self.namespaces.remove(&spec.id);
                return Err(e);
            }
        };

        let sync = match namespace.sync().await {
            Ok(outcome) => outcome,
            Err(e) => {
                proxy.stop().await;
                let _ = self.namespaces.remove(&spec.id);
                return Err(e);
            }
        };

        let policy = namespace.current_policy();
        if policy.relies_on_host_loopback() {
            info!(
                namespace = %spec.id,
                servers = ?policy.ext_servers.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "Host has only loopback nameservers, forwarding from the host side"
            );
        } else if policy.ext_servers.is_empty() {
            warn!(namespace = %spec.id, "No external DNS servers; external names will fail");
        }

        self.proxies.insert(spec.id.clone(), proxy);
        info!(namespace = %spec.id, addrs = ?listen_addrs, sync = ?sync, "Namespace DNS ready");

        Ok(CreatedNamespace {
            id: spec.id,
            listen_addrs,
            sync,
        })
    }

    /// Stops the proxy; the generated file is left for the lifecycle manager.
    pub async fn remove_namespace(&self, id: &str) -> Result<(), DomainError> {
        self.namespaces.remove(id)?;
        if let Some((_, proxy)) = self.proxies.remove(id) {
            proxy.stop().await;
        }
        info!(namespace = %id, "Namespace DNS removed");
        Ok(())
    }

    /// One watcher pass; the polling job calls the same use case.
    pub async fn check_host(&self) -> WatchOutcome {
        self.watcher.check().await
    }

    pub async fn shutdown(&self) {
        let proxies: Vec<Arc<DnsProxy>> = self
            .proxies
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        futures::future::join_all(proxies.iter().map(|proxy| proxy.stop())).await;
        info!(namespaces = proxies.len(), "DNS engine shut down");
    }
}
