//! Rendering of the container-visible `resolv.conf`.

use crate::dns_policy::EffectivePolicy;
use std::fmt::Write;

pub const GENERATOR: &str = "nsresolv";

pub struct ResolvConf;

impl ResolvConf {
    /// Renders the file the container sees.
    ///
    /// ```text
    /// # Generated by nsresolv.
    /// # This file can be edited; nsresolv will not make further changes once it
    /// # has been modified.
    ///
    /// nameserver 127.0.0.11
    /// options ndots:0
    ///
    /// # Based on host file: '/etc/resolv.conf' (internal resolver)
    /// # ExtServers: [host(127.0.0.53)]
    /// # Overrides: []
    /// # Option ndots from: internal
    /// ```
    pub fn render(policy: &EffectivePolicy) -> String {
        let mut out = String::with_capacity(512);

        let _ = writeln!(out, "# Generated by {GENERATOR}.");
        let _ = writeln!(
            out,
            "# This file can be edited; {GENERATOR} will not make further changes once it"
        );
        out.push_str("# has been modified.\n\n");

        for addr in &policy.proxy_addresses {
            let _ = writeln!(out, "nameserver {addr}");
        }

        if !policy.search.is_empty() {
            let _ = writeln!(out, "search {}", policy.search.join(" "));
        }

        let _ = write!(out, "options ndots:{}", policy.ndots);
        for option in &policy.options {
            let _ = write!(out, " {option}");
        }
        out.push_str("\n\n");

        if let Some(path) = &policy.host_file {
            let _ = writeln!(
                out,
                "# Based on host file: '{}' (internal resolver)",
                path.display()
            );
        }
        let _ = writeln!(out, "# ExtServers: [{}]", join_display(&policy.ext_servers));
        let _ = writeln!(out, "# Overrides: [{}]", join_display(&policy.overrides));
        let _ = writeln!(out, "# Option ndots from: {}", policy.ndots_source());

        out
    }
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
