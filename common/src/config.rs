// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Configuration
//!
//! Three layers, applied in order:
//!
//! 1. Built-in defaults ([`InferenceConfig::default`], [`ScanConfig::default`]).
//! 2. An optional TOML file ([`FileConfig`]) with `[inference]` and `[scan]` tables.
//! 3. Command line flags, applied last by the CLI.
//!
//! Every engine call receives its configuration explicitly; nothing in here is global.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::cidr::Cidr;
use crate::warn;

/// Presentation options for the terminal front end.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Skips the startup banner.
    pub no_banner: bool,

    /// Keeps the run from sending reverse DNS queries.
    pub no_dns: bool,

    /// Controls the visual density of the terminal output.
    ///
    /// # Levels
    /// * **0** (Default): Full UI with colors, trees and summaries.
    /// * **1**: No banner or headers, summaries only.
    /// * **2**: Raw mode. Only the data itself is printed.
    pub quiet: u8,
}

/// How addresses of one family are grouped and subdivided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyPolicy {
    /// Length of the network every address is first grouped under.
    pub base_prefix: u8,

    /// Mask lengths tried when looking for subdivisions of a base network.
    /// They are searched from most to least specific whatever the order here.
    pub subdivision_prefixes: Vec<u8>,
}

impl FamilyPolicy {
    pub fn ipv4() -> Self {
        Self {
            base_prefix: 24,
            subdivision_prefixes: vec![30, 29],
        }
    }

    pub fn ipv6() -> Self {
        Self {
            base_prefix: 64,
            subdivision_prefixes: vec![126, 125],
        }
    }

    /// Candidate mask lengths below `base`, most specific first.
    pub fn candidate_prefixes(&self, base: u8, max: u8) -> Vec<u8> {
        let mut candidates: Vec<u8> = self
            .subdivision_prefixes
            .iter()
            .copied()
            .filter(|len| *len > base && *len <= max)
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        candidates.dedup();
        candidates
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    pub ipv4: FamilyPolicy,
    pub ipv6: FamilyPolicy,

    /// Networks that are never subdivided and never get children.
    pub flat_networks: Vec<Cidr>,

    /// Explicit top-level prefixes.
    pub prefixes: Vec<Cidr>,

    /// Derives a prefix for top-level networks no explicit prefix covers.
    ///
    /// * IPv4 inside `10.0.0.0/8` → the `/8`
    /// * any other IPv4 → the enclosing `/16`
    /// * IPv6 → the enclosing `/48`
    pub derive_prefixes: bool,

    /// Members a candidate subnet needs to be accepted. Never below 2.
    pub min_members: usize,

    /// Drops loopback addresses before grouping.
    pub exclude_loopback: bool,

    /// Declared networks of these lengths are ignored during reconciliation.
    pub ignored_declared_prefixes: Vec<u8>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            ipv4: FamilyPolicy::ipv4(),
            ipv6: FamilyPolicy::ipv6(),
            flat_networks: Vec::new(),
            prefixes: Vec::new(),
            derive_prefixes: true,
            min_members: 2,
            exclude_loopback: true,
            ignored_declared_prefixes: Vec::new(),
        }
    }
}

impl InferenceConfig {
    pub fn policy_for(&self, ip: &IpAddr) -> &FamilyPolicy {
        match ip {
            IpAddr::V4(_) => &self.ipv4,
            IpAddr::V6(_) => &self.ipv6,
        }
    }

    /// The minimum member count actually enforced.
    pub fn effective_min_members(&self) -> usize {
        if self.min_members < 2 {
            warn!(
                "min_members = {} would accept single-address subnets, using 2",
                self.min_members
            );
        }
        self.min_members.max(2)
    }

    pub fn is_flat(&self, cidr: &Cidr) -> bool {
        self.flat_networks.contains(cidr)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ipv4.base_prefix > 32 {
            return Err(ConfigError::BasePrefix {
                base: self.ipv4.base_prefix,
                family: "IPv4",
            });
        }
        if self.ipv6.base_prefix > 128 {
            return Err(ConfigError::BasePrefix {
                base: self.ipv6.base_prefix,
                family: "IPv6",
            });
        }
        Ok(())
    }
}

/// How the scanner decides that an address is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// One ICMP echo through the system `ping` binary.
    #[default]
    Ping,
    /// An unprivileged TCP connect; a refused connection still proves life.
    Tcp,
}

impl FromStr for ProbeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ping" | "icmp" => Ok(ProbeMethod::Ping),
            "tcp" => Ok(ProbeMethod::Tcp),
            other => Err(format!("unknown probe method '{other}' (expected ping or tcp)")),
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::Ping => f.write_str("ping"),
            ProbeMethod::Tcp => f.write_str("tcp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on probes in flight.
    pub concurrency: usize,

    /// Time a single probe (and a single reverse lookup) may take.
    pub probe_timeout: Duration,

    /// Largest target list that may be scanned without confirmation.
    pub max_addresses: u64,

    /// Set when the operator explicitly accepted a scan above `max_addresses`.
    pub confirmed: bool,

    pub resolve_names: bool,
    pub probe: ProbeMethod,
    pub tcp_ports: Vec<u16>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            probe_timeout: Duration::from_secs(1),
            max_addresses: 65_536,
            confirmed: false,
            resolve_names: true,
            probe: ProbeMethod::Ping,
            tcp_ports: vec![22, 80, 443],
        }
    }
}

/// On-disk configuration. Every key is optional.
///
/// ```toml
/// [inference]
/// base_prefix_v4 = 24
/// subdivision_prefixes_v4 = [30, 29]
/// flat_networks = ["192.168.0.0/24", "10.0.0.0/24"]
///
/// [scan]
/// concurrency = 100
/// timeout_ms = 500
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub inference: InferenceSection,
    pub scan: ScanSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceSection {
    pub base_prefix_v4: Option<u8>,
    pub subdivision_prefixes_v4: Option<Vec<u8>>,
    pub base_prefix_v6: Option<u8>,
    pub subdivision_prefixes_v6: Option<Vec<u8>>,
    pub flat_networks: Vec<Cidr>,
    pub prefixes: Vec<Cidr>,
    pub derive_prefixes: Option<bool>,
    pub min_members: Option<usize>,
    pub exclude_loopback: Option<bool>,
    pub ignored_declared_prefixes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_addresses: Option<u64>,
    pub probe: Option<ProbeMethod>,
    pub tcp_ports: Option<Vec<u16>>,
    pub resolve_names: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: origin.to_string(),
            source,
        })
    }

    /// Overlays the file values on top of `inference` and `scan`.
    pub fn apply(&self, inference: &mut InferenceConfig, scan: &mut ScanConfig) {
        let file = &self.inference;
        if let Some(base) = file.base_prefix_v4 {
            inference.ipv4.base_prefix = base;
        }
        if let Some(prefixes) = &file.subdivision_prefixes_v4 {
            inference.ipv4.subdivision_prefixes = prefixes.clone();
        }
        if let Some(base) = file.base_prefix_v6 {
            inference.ipv6.base_prefix = base;
        }
        if let Some(prefixes) = &file.subdivision_prefixes_v6 {
            inference.ipv6.subdivision_prefixes = prefixes.clone();
        }
        inference.flat_networks.extend(file.flat_networks.iter().copied());
        inference.prefixes.extend(file.prefixes.iter().copied());
        if let Some(derive) = file.derive_prefixes {
            inference.derive_prefixes = derive;
        }
        if let Some(min) = file.min_members {
            inference.min_members = min;
        }
        if let Some(exclude) = file.exclude_loopback {
            inference.exclude_loopback = exclude;
        }
        inference
            .ignored_declared_prefixes
            .extend(file.ignored_declared_prefixes.iter().copied());

        let file = &self.scan;
        if let Some(concurrency) = file.concurrency {
            scan.concurrency = concurrency;
        }
        if let Some(ms) = file.timeout_ms {
            scan.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = file.max_addresses {
            scan.max_addresses = max;
        }
        if let Some(probe) = file.probe {
            scan.probe = probe;
        }
        if let Some(ports) = &file.tcp_ports {
            scan.tcp_ports = ports.clone();
        }
        if let Some(resolve) = file.resolve_names {
            scan.resolve_names = resolve;
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_search_30_then_29() {
        let policy = FamilyPolicy::ipv4();
        assert_eq!(policy.candidate_prefixes(24, 32), vec![30, 29]);
    }

    #[test]
    fn candidates_are_sorted_and_bounded() {
        let policy = FamilyPolicy {
            base_prefix: 24,
            subdivision_prefixes: vec![28, 31, 24, 22, 33, 31],
        };
        assert_eq!(policy.candidate_prefixes(24, 32), vec![31, 28]);
    }

    #[test]
    fn min_members_never_drops_below_two() {
        let cfg = InferenceConfig {
            min_members: 1,
            ..InferenceConfig::default()
        };
        assert_eq!(cfg.effective_min_members(), 2);
    }

    #[test]
    fn file_overrides_only_given_keys() {
        let file = FileConfig::parse(
            r#"
            [inference]
            flat_networks = ["192.168.0.0/24"]
            subdivision_prefixes_v4 = [30]

            [scan]
            concurrency = 8
            timeout_ms = 250
            probe = "tcp"
            "#,
            "inline",
        )
        .unwrap();

        let mut inference = InferenceConfig::default();
        let mut scan = ScanConfig::default();
        file.apply(&mut inference, &mut scan);

        assert_eq!(inference.ipv4.base_prefix, 24);
        assert_eq!(inference.ipv4.subdivision_prefixes, vec![30]);
        assert!(inference.is_flat(&"192.168.0.0/24".parse().unwrap()));
        assert_eq!(scan.concurrency, 8);
        assert_eq!(scan.probe_timeout, Duration::from_millis(250));
        assert_eq!(scan.probe, ProbeMethod::Tcp);
        assert_eq!(scan.max_addresses, 65_536);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = FileConfig::parse("[inference]\nbase_mask = 24\n", "inline");
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn invalid_cidr_in_file_is_rejected() {
        let result = FileConfig::parse("[inference]\nflat_networks = [\"10.0.0.0/40\"]\n", "inline");
        assert!(result.is_err());
    }
}
