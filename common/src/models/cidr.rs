// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # CIDR Blocks
//!
//! [`Cidr`] is the address-block type every other part of the workspace talks in.
//! It wraps [`IpNetwork`] but always stores the *network* address, so
//! `10.0.0.7/24` and `10.0.0.0/24` are the same value, compare equal and
//! hash the same.
//!
//! Ordering is `(family, network address, prefix length)`, which puts a
//! supernet directly before the subnets that start at the same address.

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use pnet::ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::error::CidrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cidr(IpNetwork);

impl Cidr {
    /// Builds the block of length `prefix_len` that contains `addr`.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, CidrError> {
        let raw = IpNetwork::new(addr, prefix_len).map_err(|_| CidrError::PrefixLength {
            prefix_len,
            max: max_prefix_len(&addr),
        })?;
        let normalized = IpNetwork::new(raw.network(), prefix_len).map_err(|_| {
            CidrError::PrefixLength {
                prefix_len,
                max: max_prefix_len(&addr),
            }
        })?;
        Ok(Self(normalized))
    }

    /// The single-address block (/32 or /128) for `addr`.
    pub fn host(addr: IpAddr) -> Self {
        Self(IpNetwork::from(addr))
    }

    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix()
    }

    pub fn max_prefix_len(&self) -> u8 {
        max_prefix_len(&self.network())
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub fn is_host(&self) -> bool {
        self.prefix_len() == self.max_prefix_len()
    }

    pub fn is_default_route(&self) -> bool {
        self.prefix_len() == 0
    }

    pub fn contains_addr(&self, addr: &IpAddr) -> bool {
        self.is_ipv4() == addr.is_ipv4() && self.0.contains(*addr)
    }

    /// `true` when `other` lies entirely inside `self` (equal blocks included).
    pub fn contains(&self, other: &Cidr) -> bool {
        self.prefix_len() <= other.prefix_len() && self.contains_addr(&other.network())
    }

    /// `true` when `other` lies inside `self` and is not `self`.
    pub fn strictly_contains(&self, other: &Cidr) -> bool {
        self.prefix_len() < other.prefix_len() && self.contains_addr(&other.network())
    }

    /// CIDR blocks either nest or are disjoint, so overlap is containment either way.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The enclosing block `prefix_len` bits long. Fails when that is longer than `self`.
    pub fn supernet(&self, prefix_len: u8) -> Result<Cidr, CidrError> {
        if prefix_len > self.prefix_len() {
            return Err(CidrError::PrefixLength {
                prefix_len,
                max: self.prefix_len(),
            });
        }
        Cidr::new(self.network(), prefix_len)
    }

    /// Number of addresses in the block, saturating at `u128::MAX` for `::/0`.
    pub fn total_addresses(&self) -> u128 {
        let host_bits = u32::from(self.max_prefix_len() - self.prefix_len());
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }

    /// Addresses that can be assigned to hosts.
    ///
    /// IPv4 blocks of /30 and wider lose their network and broadcast
    /// addresses. Point-to-point /31, host /32 and every IPv6 block
    /// count in full.
    pub fn usable_addresses(&self) -> u128 {
        let total = self.total_addresses();
        if self.is_ipv4() && self.prefix_len() <= 30 {
            total - 2
        } else {
            total
        }
    }

    /// Walks the usable host addresses of the block in ascending order.
    pub fn hosts(&self) -> Box<dyn Iterator<Item = IpAddr> + Send> {
        match self.network() {
            IpAddr::V4(net) => {
                let start = u32::from(net);
                let last = start.saturating_add((self.total_addresses() - 1) as u32);
                let (first, last) = if self.prefix_len() <= 30 {
                    (start + 1, last - 1)
                } else {
                    (start, last)
                };
                Box::new((first..=last).map(|ip| IpAddr::V4(Ipv4Addr::from(ip))))
            }
            IpAddr::V6(net) => {
                let start = u128::from(net);
                let last = start.saturating_add(self.total_addresses().saturating_sub(1));
                Box::new((start..=last).map(|ip| IpAddr::V6(Ipv6Addr::from(ip))))
            }
        }
    }

    pub fn is_loopback(&self) -> bool {
        match self.network() {
            IpAddr::V4(v4) => v4.is_loopback(),
            IpAddr::V6(v6) => v6.is_loopback(),
        }
    }

    pub fn is_link_local(&self) -> bool {
        match self.network() {
            IpAddr::V4(v4) => v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_unicast_link_local(),
        }
    }
}

pub fn max_prefix_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl Ord for Cidr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.network()
            .cmp(&other.network())
            .then(self.prefix_len().cmp(&other.prefix_len()))
    }
}

impl PartialOrd for Cidr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len())
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    /// Accepts `addr/len` or a bare address (treated as a host block).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_str, len_str) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };

        let addr: IpAddr = addr_str
            .parse()
            .map_err(|_| CidrError::Address(addr_str.to_string()))?;

        match len_str {
            Some(len) => {
                let prefix_len: u8 = len
                    .parse()
                    .map_err(|_| CidrError::Syntax(s.to_string()))?;
                Cidr::new(addr, prefix_len)
            }
            None => Ok(Cidr::host(addr)),
        }
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

impl TryFrom<String> for Cidr {
    type Error = CidrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
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
