//! Effective per-namespace DNS policy.
//!
//! A container namespace cannot route to the host's loopback interface, so
//! host nameservers are split into addresses the container could use and
//! addresses only the engine itself (running on the host side) can reach.

use crate::resolver_snapshot::{merge_option, ndots_value, ResolverOption, ResolverSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::{debug, warn};

pub const DEFAULT_NDOTS: u32 = 0;

/// Per-network or per-container DNS settings supplied by the container
/// configuration layer. `None` means "not overridden".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DnsOverrides {
    #[serde(default)]
    pub nameservers: Option<Vec<String>>,
    #[serde(default)]
    pub search: Option<Vec<String>>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

impl DnsOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_nameservers<I, S>(mut self, nameservers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nameservers = Some(nameservers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_search<I, S>(mut self, search: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some(search.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Keys that are set, in fixed `nameservers`, `search`, `options` order.
    pub fn applied_keys(&self) -> Vec<OverrideKey> {
        let mut keys = Vec::new();
        if self.nameservers.is_some() {
            keys.push(OverrideKey::Nameservers);
        }
        if self.search.is_some() {
            keys.push(OverrideKey::Search);
        }
        if self.options.is_some() {
            keys.push(OverrideKey::Options);
        }
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideKey {
    Nameservers,
    Search,
    Options,
}

impl OverrideKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nameservers => "nameservers",
            Self::Search => "search",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSource {
    Host,
    Override,
    Internal,
}

impl OptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Override => "override",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyOption {
    Nameservers,
    Search,
    Ndots,
}

/// Which input decided each policy option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance(BTreeMap<PolicyOption, OptionSource>);

impl Provenance {
    pub fn record(&mut self, option: PolicyOption, source: OptionSource) {
        self.0.insert(option, source);
    }

    pub fn source_of(&self, option: PolicyOption) -> OptionSource {
        self.0.get(&option).copied().unwrap_or(OptionSource::Internal)
    }
}

/// An upstream nameserver the proxy forwards to.
///
/// `host_loopback` servers are only reachable from the host's own network
/// namespace: the proxy dials them from its host-side sockets and the
/// container never sees them as a nameserver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtServer {
    pub addr: IpAddr,
    pub host_loopback: bool,
}

impl ExtServer {
    pub fn routable(addr: IpAddr) -> Self {
        Self {
            addr,
            host_loopback: false,
        }
    }

    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            host_loopback: true,
        }
    }
}

impl fmt::Display for ExtServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host_loopback {
            write!(f, "host({})", self.addr)
        } else {
            write!(f, "{}", self.addr)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePolicy {
    /// Addresses the embedded proxy listens on inside the namespace.
    pub proxy_addresses: Vec<IpAddr>,
    pub ext_servers: Vec<ExtServer>,
    /// Loopback nameservers seen on the host but left out because routable
    /// ones exist.
    pub excluded_loopback: Vec<IpAddr>,
    pub search: Vec<String>,
    pub ndots: u32,
    /// Resolver options other than ndots, in order.
    pub options: Vec<ResolverOption>,
    pub provenance: Provenance,
    pub overrides: Vec<OverrideKey>,
    /// Host resolver file the policy was derived from, when one existed.
    pub host_file: Option<PathBuf>,
}

impl EffectivePolicy {
    pub fn forward_targets(&self, port: u16) -> Vec<SocketAddr> {
        self.ext_servers
            .iter()
            .map(|server| SocketAddr::new(server.addr, port))
            .collect()
    }

    /// True when every upstream is only reachable through host loopback.
    pub fn relies_on_host_loopback(&self) -> bool {
        !self.ext_servers.is_empty() && self.ext_servers.iter().all(|s| s.host_loopback)
    }

    pub fn ndots_source(&self) -> OptionSource {
        self.provenance.source_of(PolicyOption::Ndots)
    }
}

pub fn is_host_loopback(addr: &IpAddr) -> bool {
    addr.to_canonical().is_loopback()
}

pub struct PolicyResolver;

impl PolicyResolver {
    pub fn resolve(
        snapshot: &ResolverSnapshot,
        overrides: &DnsOverrides,
        proxy_addresses: &[IpAddr],
    ) -> EffectivePolicy {
        let mut provenance = Provenance::default();

        let (candidates, ns_source) = match &overrides.nameservers {
            Some(raw) => (parse_override_nameservers(raw), OptionSource::Override),
            None if !snapshot.nameservers().is_empty() => {
                (snapshot.nameservers().to_vec(), OptionSource::Host)
            }
            None => (Vec::new(), OptionSource::Internal),
        };
        provenance.record(PolicyOption::Nameservers, ns_source);

        let (usable, loopback) = partition_nameservers(&candidates);
        let (ext_servers, excluded_loopback) = if usable.is_empty() {
            if !loopback.is_empty() {
                debug!(
                    servers = ?loopback,
                    "Only loopback nameservers available, forwarding from host side"
                );
            }
            (loopback.into_iter().map(ExtServer::host).collect(), Vec::new())
        } else {
            (usable.into_iter().map(ExtServer::routable).collect(), loopback)
        };

        let (search, search_source) = match &overrides.search {
            Some(domains) => (normalize_search_override(domains), OptionSource::Override),
            None if !snapshot.search().is_empty() => {
                (snapshot.search().to_vec(), OptionSource::Host)
            }
            None => (Vec::new(), OptionSource::Internal),
        };
        provenance.record(PolicyOption::Search, search_source);

        let override_options = overrides.options.as_ref().map(|raw| {
            let mut parsed = Vec::new();
            for token in raw.iter().flat_map(|entry| entry.split_whitespace()) {
                merge_option(&mut parsed, ResolverOption::parse(token));
            }
            parsed
        });

        let (ndots, ndots_source) = match override_options.as_deref().and_then(ndots_value) {
            Some(value) => (value, OptionSource::Override),
            None => match snapshot.ndots() {
                Some(value) => (value, OptionSource::Host),
                None => (DEFAULT_NDOTS, OptionSource::Internal),
            },
        };
        provenance.record(PolicyOption::Ndots, ndots_source);

        let options = override_options
            .as_deref()
            .unwrap_or(snapshot.options())
            .iter()
            .filter(|opt| !opt.is_ndots())
            .cloned()
            .collect();

        EffectivePolicy {
            proxy_addresses: proxy_addresses.to_vec(),
            ext_servers,
            excluded_loopback,
            search,
            ndots,
            options,
            provenance,
            overrides: overrides.applied_keys(),
            host_file: snapshot
                .has_host_file()
                .then(|| snapshot.path().to_path_buf()),
        }
    }
}

fn parse_override_nameservers(raw: &[String]) -> Vec<IpAddr> {
    raw.iter()
        .filter_map(|entry| match entry.trim().parse::<IpAddr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                warn!(nameserver = %entry, "Skipping malformed nameserver override");
                None
            }
        })
        .collect()
}

/// Splits into (usable, loopback-only), de-duplicated, first occurrence wins.
fn partition_nameservers(addrs: &[IpAddr]) -> (Vec<IpAddr>, Vec<IpAddr>) {
    let mut seen = Vec::with_capacity(addrs.len());
    let mut usable = Vec::new();
    let mut loopback = Vec::new();

    for addr in addrs {
        if seen.contains(addr) {
            continue;
        }
        seen.push(*addr);
        if is_host_loopback(addr) {
            loopback.push(*addr);
        } else {
            usable.push(*addr);
        }
    }

    (usable, loopback)
}

/// A lone `.` clears the search list.
fn normalize_search_override(domains: &[String]) -> Vec<String> {
    if domains.len() == 1 && domains[0].trim() == "." {
        return Vec::new();
    }
    domains
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}
