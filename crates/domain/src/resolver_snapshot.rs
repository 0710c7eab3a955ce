//! Host resolver configuration, captured once and never mutated.
//!
//! The parser follows the line-oriented `resolv.conf(5)` format. Each line is
//! handled on its own: a malformed line is skipped with a warning and the rest
//! of the file still applies.

use crate::errors::DomainError;
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Where a snapshot came from and what the file looked like at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    pub path: PathBuf,
    pub exists: bool,
    pub modified: Option<SystemTime>,
    /// Hex SHA-256 of the raw file content.
    pub content_hash: Option<String>,
}

impl SourceIdentity {
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exists: false,
            modified: None,
            content_hash: None,
        }
    }

    pub fn present(
        path: impl Into<PathBuf>,
        modified: Option<SystemTime>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            exists: true,
            modified,
            content_hash: Some(content_hash.into()),
        }
    }

    /// Modification time is informative only; content decides.
    pub fn same_content(&self, other: &SourceIdentity) -> bool {
        self.exists == other.exists && self.content_hash == other.content_hash
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOption {
    pub name: String,
    pub value: Option<String>,
}

impl ResolverOption {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Parses `key` or `key:value`. An empty value is the same as no value.
    pub fn parse(token: &str) -> Self {
        match token.split_once(':') {
            Some((name, value)) if !value.is_empty() => Self::new(name, Some(value.to_string())),
            Some((name, _)) => Self::new(name, None),
            None => Self::new(token, None),
        }
    }

    pub fn is_ndots(&self) -> bool {
        self.name == "ndots"
    }
}

impl fmt::Display for ResolverOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Returns the ndots value carried by `options`, if any is usable.
pub(crate) fn ndots_value(options: &[ResolverOption]) -> Option<u32> {
    options
        .iter()
        .filter(|opt| opt.is_ndots())
        .filter_map(|opt| opt.value.as_deref())
        .filter_map(|value| value.parse::<u32>().ok())
        .last()
}

/// Inserts `option`, replacing an earlier option with the same name in place.
pub(crate) fn merge_option(options: &mut Vec<ResolverOption>, option: ResolverOption) {
    match options.iter_mut().find(|existing| existing.name == option.name) {
        Some(existing) => *existing = option,
        None => options.push(option),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSnapshot {
    nameservers: Vec<IpAddr>,
    search: Vec<String>,
    options: Vec<ResolverOption>,
    identity: SourceIdentity,
}

#[derive(Debug)]
enum Directive {
    Nameserver(IpAddr),
    Search(Vec<String>),
    Options(Vec<ResolverOption>),
}

impl ResolverSnapshot {
    /// Snapshot for a host without a resolver file.
    pub fn empty(identity: SourceIdentity) -> Self {
        Self {
            nameservers: Vec::new(),
            search: Vec::new(),
            options: Vec::new(),
            identity,
        }
    }

    pub fn parse(content: &str, identity: SourceIdentity) -> Self {
        let mut snapshot = Self::empty(identity);
        let mut skipped = 0usize;

        for (idx, line) in content.lines().enumerate() {
            match parse_line(idx + 1, line) {
                Ok(Some(Directive::Nameserver(addr))) => snapshot.nameservers.push(addr),
                Ok(Some(Directive::Search(domains))) => snapshot.search = domains,
                Ok(Some(Directive::Options(options))) => {
                    for option in options {
                        merge_option(&mut snapshot.options, option);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    warn!(path = %snapshot.identity.path.display(), error = %e, "Ignoring resolver line");
                }
            }
        }

        debug!(
            path = %snapshot.identity.path.display(),
            nameservers = snapshot.nameservers.len(),
            search = snapshot.search.len(),
            options = snapshot.options.len(),
            skipped,
            "Resolver snapshot parsed"
        );

        snapshot
    }

    pub fn nameservers(&self) -> &[IpAddr] {
        &self.nameservers
    }

    pub fn search(&self) -> &[String] {
        &self.search
    }

    pub fn options(&self) -> &[ResolverOption] {
        &self.options
    }

    pub fn ndots(&self) -> Option<u32> {
        ndots_value(&self.options)
    }

    pub fn identity(&self) -> &SourceIdentity {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        &self.identity.path
    }

    pub fn has_host_file(&self) -> bool {
        self.identity.exists
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<Option<Directive>, DomainError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let Some(keyword) = fields.next() else {
        return Ok(None);
    };

    let skip = |reason: String| DomainError::ParseSkip {
        line: line_no,
        reason,
    };

    match keyword {
        "nameserver" => {
            let raw = fields
                .next()
                .ok_or_else(|| skip("nameserver without an address".to_string()))?;
            let addr = raw
                .parse::<IpAddr>()
                .map_err(|_| skip(format!("invalid nameserver address '{raw}'")))?;
            Ok(Some(Directive::Nameserver(addr)))
        }
        "search" | "domain" => {
            let domains: Vec<String> = fields.map(str::to_string).collect();
            if domains.is_empty() {
                return Err(skip(format!("{keyword} without a domain")));
            }
            if keyword == "domain" {
                return Ok(Some(Directive::Search(domains.into_iter().take(1).collect())));
            }
            Ok(Some(Directive::Search(domains)))
        }
        "options" => Ok(Some(Directive::Options(
            fields.map(ResolverOption::parse).collect(),
        ))),
        other => {
            debug!(line = line_no, directive = other, "Unknown resolver directive ignored");
            Ok(None)
        }
    }
}
