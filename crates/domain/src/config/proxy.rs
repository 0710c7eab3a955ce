use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Port the embedded proxy binds inside each namespace.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_upstream_port")]
    pub upstream_port: u16,

    /// Per-server budget before moving to the next external server.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// TTL on authoritative answers for container and service names.
    #[serde(default = "default_local_ttl")]
    pub local_ttl: u32,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    #[serde(default = "default_tcp_idle_timeout_ms")]
    pub tcp_idle_timeout_ms: u64,
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }

    pub fn tcp_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.tcp_idle_timeout_ms)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            upstream_port: default_upstream_port(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            local_ttl: default_local_ttl(),
            cache_max_entries: default_cache_max_entries(),
            drain_grace_ms: default_drain_grace_ms(),
            tcp_idle_timeout_ms: default_tcp_idle_timeout_ms(),
        }
    }
}

fn default_listen_port() -> u16 {
    53
}
fn default_upstream_port() -> u16 {
    53
}
fn default_upstream_timeout_ms() -> u64 {
    2000
}
fn default_local_ttl() -> u32 {
    600
}
fn default_cache_max_entries() -> usize {
    1024
}
fn default_drain_grace_ms() -> u64 {
    2000
}
fn default_tcp_idle_timeout_ms() -> u64 {
    5000
}
