use async_trait::async_trait;
use dashmap::DashMap;
use nsresolv_application::ports::NameRegistry;
use std::net::IpAddr;
use tracing::debug;

/// Reference `NameRegistry` for embedding and tests. Network drivers with
/// their own endpoint database implement the port directly.
#[derive(Default)]
pub struct InMemoryNameRegistry {
    names: DashMap<String, Vec<IpAddr>>,
    addrs: DashMap<IpAddr, String>,
}

/// Lower-case, no trailing dot.
fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

impl InMemoryNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with `addrs`, replacing earlier addresses. Each
    /// address answers PTR queries with `name`.
    pub fn register(&self, name: &str, addrs: Vec<IpAddr>) {
        let key = normalize(name);
        if let Some(previous) = self.names.insert(key.clone(), addrs.clone()) {
            for stale in previous {
                self.addrs.remove_if(&stale, |_, owner| *owner == key);
            }
        }
        for addr in &addrs {
            self.addrs.insert(*addr, key.clone());
        }
        debug!(name = %key, addresses = addrs.len(), "Name registered");
    }

    pub fn unregister(&self, name: &str) -> bool {
        let key = normalize(name);
        match self.names.remove(&key) {
            Some((_, addrs)) => {
                for addr in addrs {
                    self.addrs.remove_if(&addr, |_, owner| *owner == key);
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[async_trait]
impl NameRegistry for InMemoryNameRegistry {
    async fn lookup_name(&self, name: &str) -> Option<Vec<IpAddr>> {
        self.names
            .get(&normalize(name))
            .map(|entry| entry.value().clone())
    }

    async fn lookup_addr(&self, addr: IpAddr) -> Option<String> {
        self.addrs.get(&addr).map(|entry| entry.value().clone())
    }
}
