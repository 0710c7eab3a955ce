#![allow(dead_code)]
use nsresolv_domain::{
    DnsOverrides, EffectivePolicy, PolicyResolver, ResolverSnapshot, SourceIdentity,
};
use std::net::IpAddr;

pub const HOST_PATH: &str = "/etc/resolv.conf";

pub struct SnapshotBuilder {
    lines: Vec<String>,
    exists: bool,
    path: String,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            exists: true,
            path: HOST_PATH.to_string(),
        }
    }

    pub fn missing() -> Self {
        Self {
            exists: false,
            ..Self::new()
        }
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn nameserver(mut self, addr: &str) -> Self {
        self.lines.push(format!("nameserver {addr}"));
        self
    }

    pub fn search(mut self, domains: &str) -> Self {
        self.lines.push(format!("search {domains}"));
        self
    }

    pub fn options(mut self, options: &str) -> Self {
        self.lines.push(format!("options {options}"));
        self
    }

    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(self) -> ResolverSnapshot {
        if !self.exists {
            return ResolverSnapshot::empty(SourceIdentity::missing(self.path));
        }
        let content = self.lines.join("\n") + "\n";
        ResolverSnapshot::parse(
            &content,
            SourceIdentity::present(self.path, None, format!("len-{}", content.len())),
        )
    }
}

pub fn proxy_v4() -> Vec<IpAddr> {
    vec!["127.0.0.11".parse().unwrap()]
}

pub fn resolve(snapshot: &ResolverSnapshot, overrides: &DnsOverrides) -> EffectivePolicy {
    PolicyResolver::resolve(snapshot, overrides, &proxy_v4())
}

pub fn ip(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}
