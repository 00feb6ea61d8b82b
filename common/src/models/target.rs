// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Scan Targets
//!
//! Defines the address space a scan is allowed to touch.
//!
//! Targets come from the command line (hosts, `a.b.c.d-e` ranges, CIDRs) or from
//! the networks the inference input already knows about. IPv4 space is kept as
//! sorted, merged ranges so overlapping inputs are only probed once; the total
//! size is what the scanner checks against its safety limit.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, bail, ensure};

use crate::models::cidr::Cidr;
use crate::{info, success};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        if u32::from(start) <= u32::from(end) {
            Self {
                start_addr: start,
                end_addr: end,
            }
        } else {
            info!(verbosity = 1, "{start} > {end}. Reversing order.");
            Self {
                start_addr: end,
                end_addr: start,
            }
        }
    }

    /// Usable hosts of a network block as a range.
    pub fn from_cidr(cidr: &Cidr) -> Option<Self> {
        let IpAddr::V4(network) = cidr.network() else {
            return None;
        };
        let start = u32::from(network);
        let last = start.saturating_add((cidr.total_addresses() - 1) as u32);
        let (first, last) = if cidr.prefix_len() <= 30 {
            (start + 1, last - 1)
        } else {
            (start, last)
        };
        Some(Self::new(Ipv4Addr::from(first), Ipv4Addr::from(last)))
    }

    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(|ip| IpAddr::V4(Ipv4Addr::from(ip)))
    }

    pub fn contains(&self, ip: &Ipv4Addr) -> bool {
        let ip_u32 = u32::from(*ip);
        ip_u32 >= u32::from(self.start_addr) && ip_u32 <= u32::from(self.end_addr)
    }

    pub fn len(&self) -> u64 {
        u64::from(u32::from(self.end_addr)) - u64::from(u32::from(self.start_addr)) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.start_addr > self.end_addr
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanTargets {
    ranges: Vec<Ipv4Range>,
    v6_networks: Vec<Cidr>,
    singles: BTreeSet<IpAddr>,
}

impl ScanTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single(&mut self, ip: IpAddr) {
        if !self.singles.insert(ip) {
            info!(verbosity = 2, "{ip} already in target list");
        }
    }

    pub fn add_range(&mut self, range: Ipv4Range) {
        info!(
            verbosity = 2,
            "Adding {} - {} to target list (Size: {})",
            range.start_addr,
            range.end_addr,
            range.len()
        );
        self.ranges.push(range);
    }

    pub fn add_network(&mut self, cidr: Cidr) {
        match Ipv4Range::from_cidr(&cidr) {
            Some(range) => self.add_range(range),
            None => {
                info!(verbosity = 2, "Adding {cidr} to target list");
                self.v6_networks.push(cidr);
            }
        }
    }

    /// Merges overlapping IPv4 ranges and folds IPv4 singles into them.
    pub fn compact(&mut self) {
        let mut v4_singles: Vec<Ipv4Addr> = Vec::new();
        self.singles.retain(|ip| match ip {
            IpAddr::V4(addr) => {
                v4_singles.push(*addr);
                false
            }
            IpAddr::V6(_) => true,
        });
        self.ranges
            .extend(v4_singles.into_iter().map(|ip| Ipv4Range::new(ip, ip)));

        self.ranges.sort_by_key(|r| r.start_addr);

        let mut merged: Vec<Ipv4Range> = Vec::with_capacity(self.ranges.len());
        for next in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(current)
                    if u32::from(next.start_addr)
                        <= u32::from(current.end_addr).saturating_add(1) =>
                {
                    if next.end_addr > current.end_addr {
                        current.end_addr = next.end_addr;
                    }
                }
                _ => merged.push(next),
            }
        }
        self.ranges = merged;

        self.v6_networks.sort();
        self.v6_networks.dedup();
        let networks = self.v6_networks.clone();
        self.v6_networks
            .retain(|net| !networks.iter().any(|other| other.strictly_contains(net)));
        self.singles
            .retain(|ip| !networks.iter().any(|net| net.contains_addr(ip)));
    }

    /// Total number of addresses a scan over these targets would probe.
    pub fn len(&self) -> u128 {
        let ranges: u128 = self.ranges.iter().map(|r| u128::from(r.len())).sum();
        let networks: u128 = self
            .v6_networks
            .iter()
            .fold(0u128, |acc, net| acc.saturating_add(net.total_addresses()));
        ranges
            .saturating_add(networks)
            .saturating_add(self.singles.len() as u128)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.v6_networks.is_empty() && self.singles.is_empty()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        if self.singles.contains(ip) {
            return true;
        }
        match ip {
            IpAddr::V4(v4) => self.ranges.iter().any(|r| r.contains(v4)),
            IpAddr::V6(_) => self.v6_networks.iter().any(|net| net.contains_addr(ip)),
        }
    }

    /// Walks every target address. Call [`ScanTargets::compact`] first to avoid duplicates.
    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + '_ {
        let ranges = self.ranges.iter().flat_map(|range| range.iter());
        let networks = self.v6_networks.iter().flat_map(|net| net.hosts());
        ranges.chain(networks).chain(self.singles.iter().copied())
    }
}

/// Converts command line arguments into a compacted target list.
///
/// Handles:
/// * Comma-separated strings ("10.0.0.1, 10.0.0.2")
/// * Single hosts, IPv4 and IPv6
/// * Ranges ("10.0.0.1-10.0.0.9", "10.0.0.1-9")
/// * CIDR blocks ("10.0.0.0/24"), expanded to usable hosts
pub fn to_targets<S: AsRef<str>>(inputs: &[S]) -> anyhow::Result<ScanTargets> {
    let mut targets = ScanTargets::new();

    for part in inputs
        .iter()
        .flat_map(|input| input.as_ref().split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
    {
        parse_single_into(part, &mut targets)?;
    }

    ensure!(!targets.is_empty(), "No valid targets found");
    targets.compact();

    let len = targets.len();
    let unit = if len == 1 { " has been" } else { "es have been" };
    success!("{len} target address{unit} parsed successfully");

    Ok(targets)
}

fn parse_single_into(s: &str, targets: &mut ScanTargets) -> anyhow::Result<()> {
    if let Ok(ip) = s.parse::<IpAddr>() {
        info!(verbosity = 2, "Parsed '{s}' as a single host: {ip}");
        targets.add_single(ip);
        return Ok(());
    }

    if s.contains('/') {
        let cidr: Cidr = s.parse().with_context(|| format!("Invalid CIDR '{s}'"))?;
        targets.add_network(cidr);
        return Ok(());
    }

    if let Some(range) = parse_ip_range(s)? {
        targets.add_range(range);
        return Ok(());
    }

    bail!("Unrecognized target '{s}'")
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> anyhow::Result<Option<Ipv4Range>> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr: Ipv4Addr = start_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid start IP in range '{start_str}'"))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr)?;

    Ok(Some(Ipv4Range::new(start_addr, end_addr)))
}

fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr) -> anyhow::Result<Ipv4Addr> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(str::parse::<u8>)
        .collect::<Result<_, _>>()
        .with_context(|| format!("Invalid end range '{end_str}'"))?;

    ensure!(
        (1..=4).contains(&partial_octets.len()),
        "End range has the wrong number of octets: {end_str}"
    );

    // Overlays the partial octets onto the tail of the start address
    let mut end_octets = start_addr.octets();
    end_octets[4 - partial_octets.len()..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
