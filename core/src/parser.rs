// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Routing Table Parser
//!
//! Reads `show ip route` (Cisco IOS) and `show route` (JunOS) output.
//!
//! Each vendor module only turns text into raw routes. This module then sorts
//! them: host routes (/32, /128) become [`Address`]es, everything else becomes a
//! [`DeclaredNetwork`]. Default, loopback and link-local routes say nothing about
//! the address plan and are dropped.
//!
//! A bad line never aborts a file. It is kept as a [`MalformedLineError`] and the
//! parser moves on.

mod cisco;
mod juniper;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use arbor_common::error::{MalformedLineError, ParseError};
use arbor_common::models::address::{
    Address, DeclaredNetwork, NetworkHint, Origin, RouteProvenance,
};
use arbor_common::models::cidr::Cidr;
use arbor_common::{debug, info, success, warn};

/// Lines inspected for a vendor marker.
const DETECTION_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Cisco,
    Juniper,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Cisco => f.write_str("Cisco"),
            Vendor::Juniper => f.write_str("Juniper"),
        }
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cisco" | "ios" => Ok(Vendor::Cisco),
            "juniper" | "junos" => Ok(Vendor::Juniper),
            other => Err(format!("unknown vendor '{other}' (expected cisco or juniper)")),
        }
    }
}

/// One route as a vendor module saw it.
#[derive(Debug, Clone)]
pub(crate) struct RawRoute {
    pub cidr: Cidr,
    /// Directly connected network (Cisco `C`, JunOS `Direct`).
    pub connected: bool,
    pub provenance: RouteProvenance,
}

#[derive(Debug, Default)]
pub(crate) struct RawTable {
    pub routes: Vec<RawRoute>,
    pub malformed: Vec<MalformedLineError>,
}

impl RawTable {
    pub fn reject(&mut self, line_no: usize, line: &str, reason: impl Into<String>) {
        self.malformed.push(MalformedLineError {
            line_no,
            line: line.trim().to_string(),
            reason: reason.into(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct RoutingTable {
    pub source: String,
    pub vendor: Vendor,
    pub networks: Vec<DeclaredNetwork>,
    /// Host routes, re-tagged as observed addresses.
    pub hosts: Vec<Address>,
    pub malformed: Vec<MalformedLineError>,
}

/// Guesses the vendor from the first non-empty lines of `text`.
pub fn detect(text: &str) -> Option<Vendor> {
    for line in text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(DETECTION_WINDOW)
    {
        let lower = line.to_ascii_lowercase();
        if lower.contains("show ip route")
            || lower.starts_with("codes:")
            || lower.starts_with("gateway of last resort")
        {
            return Some(Vendor::Cisco);
        }
        if lower.contains("show route")
            || lower.starts_with("inet.0:")
            || lower.starts_with("inet6.0:")
        {
            return Some(Vendor::Juniper);
        }
    }
    None
}

/// Parses one routing table.
///
/// `vendor` skips detection when given. `source` only labels log lines and errors.
pub fn parse(text: &str, source: &str, vendor: Option<Vendor>) -> Result<RoutingTable, ParseError> {
    let vendor = match vendor.or_else(|| detect(text)) {
        Some(vendor) => vendor,
        None => {
            return Err(ParseError::UnrecognizedFormat {
                source_name: source.to_string(),
            });
        }
    };
    info!(verbosity = 1, "Reading {source} as {vendor} output");

    let raw = match vendor {
        Vendor::Cisco => cisco::parse(text),
        Vendor::Juniper => juniper::parse(text),
    };

    let mut networks: BTreeMap<Cidr, DeclaredNetwork> = BTreeMap::new();
    let mut hosts: BTreeSet<IpAddr> = BTreeSet::new();

    for route in raw.routes {
        let cidr = route.cidr;
        if cidr.is_default_route() || cidr.is_loopback() || cidr.is_link_local() {
            debug!("{source}: dropping {cidr}");
            continue;
        }
        if cidr.is_host() {
            hosts.insert(cidr.network());
            continue;
        }

        let hint = hint_for(&route);
        networks.entry(cidr).or_insert_with(|| {
            DeclaredNetwork::new(cidr, Origin::RoutingTable)
                .with_hint(hint)
                .with_provenance(route.provenance)
        });
    }

    for bad in &raw.malformed {
        warn!("{source}: {bad}");
    }
    success!(
        "{vendor} {source}: {} networks, {} host routes",
        networks.len(),
        hosts.len()
    );

    Ok(RoutingTable {
        source: source.to_string(),
        vendor,
        networks: networks.into_values().collect(),
        hosts: hosts
            .into_iter()
            .map(|ip| Address::new(ip, Origin::RoutingTable))
            .collect(),
        malformed: raw.malformed,
    })
}

fn hint_for(route: &RawRoute) -> Option<NetworkHint> {
    if let Some(interface) = route.provenance.interface.as_deref() {
        let name = interface.to_ascii_lowercase();
        if name.starts_with("loopback") || name.starts_with("lo0") {
            return Some(NetworkHint::Loopback);
        }
        if name.starts_with("management")
            || name.starts_with("mgmt")
            || ["fxp0", "em0", "me0"].iter().any(|m| name.starts_with(m))
        {
            return Some(NetworkHint::Management);
        }
    }

    let host_bits = route.cidr.max_prefix_len() - route.cidr.prefix_len();
    if route.connected && (1..=2).contains(&host_bits) {
        return Some(NetworkHint::Backbone);
    }
    None
}

/// Interface names start with a letter and carry a slot or unit number.
pub(crate) fn looks_like_interface(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit())
        && !token.eq_ignore_ascii_case("via")
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

    const CISCO: &str = "\
router# show ip route
Codes: L - local, C - connected, S - static, R - RIP, M - mobile, B - BGP
       D - EIGRP, EX - EIGRP external, O - OSPF, IA - OSPF inter area

Gateway of last resort is 10.0.0.2 to network 0.0.0.0

S*    0.0.0.0/0 [1/0] via 10.0.0.2
      10.0.0.0/8 is variably subnetted, 5 subnets, 3 masks
C        10.0.0.0/30 is directly connected, GigabitEthernet0/0
L        10.0.0.1/32 is directly connected, GigabitEthernet0/0
C        10.9.9.0/24 is directly connected, Management0/0
O IA     10.1.0.0/24 [110/2] via 10.0.0.2, 00:01:02, GigabitEthernet0/0
                     [110/2] via 10.0.0.6, 00:01:02, GigabitEthernet0/1
C        10.255.0.1/32 is directly connected, Loopback0
      172.16.0.0/24 is subnetted, 2 subnets
O        172.16.1.0 [110/20] via 10.0.0.2, 00:00:12, GigabitEthernet0/0
O        172.16.2.0 [110/20] via 10.0.0.2, 00:00:12, GigabitEthernet0/0
C        127.0.0.0/8 is directly connected, Null0
D EX     192.168.5.0/33 [170/2816] via 10.0.0.2, 00:00:40, GigabitEthernet0/0
";

    const JUNIPER: &str = "\
user@mx> show route

inet.0: 6 destinations, 6 routes (6 active, 0 holddown, 0 hidden)
+ = Active Route, - = Last Active, * = Both

0.0.0.0/0          *[Static/5] 1w0d 00:00:10
                    > to 10.0.0.1 via ge-0/0/0.0
10.0.0.0/31        *[Direct/0] 1w0d
                    > via ge-0/0/0.0
10.0.0.1/32        *[Local/0] 1w0d
                      Local via ge-0/0/0.0
10.20.0.0/24       *[OSPF/10] 00:10:00, metric 2
                    > to 10.0.0.0 via ge-0/0/0.0
172.30.0.0/24      *[Direct/0] 2d 01:00:00
                    > via fxp0.0

inet6.0: 2 destinations, 2 routes (2 active, 0 holddown, 0 hidden)

2001:db8:10::/64   *[Direct/0] 1w0d
                    > via ge-0/0/1.0
fe80::/64          *[Direct/0] 1w0d
                    > via ge-0/0/1.0
";

    fn cidrs(table: &RoutingTable) -> Vec<String> {
        table.networks.iter().map(|n| n.cidr.to_string()).collect()
    }

    fn network<'a>(table: &'a RoutingTable, cidr: &str) -> &'a DeclaredNetwork {
        let cidr: Cidr = cidr.parse().unwrap();
        table.networks.iter().find(|n| n.cidr == cidr).unwrap()
    }

    #[test]
    fn detects_vendors() {
        assert_eq!(detect(CISCO), Some(Vendor::Cisco));
        assert_eq!(detect(JUNIPER), Some(Vendor::Juniper));
        assert_eq!(detect("hello\nworld\n"), None);
    }

    #[test]
    fn unrecognized_text_is_an_error() {
        let result = parse("nothing to see", "notes.txt", None);
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnrecognizedFormat {
                source_name: "notes.txt".into()
            }
        );
    }

    #[test]
    fn cisco_networks_and_hosts() {
        let table = parse(CISCO, "core1.txt", None).unwrap();

        assert_eq!(table.vendor, Vendor::Cisco);
        assert_eq!(
            cidrs(&table),
            vec![
                "10.0.0.0/30",
                "10.1.0.0/24",
                "10.9.9.0/24",
                "172.16.1.0/24",
                "172.16.2.0/24"
            ]
        );
        let hosts: Vec<String> = table.hosts.iter().map(|h| h.ip.to_string()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.255.0.1"]);
        assert!(table.hosts.iter().all(|h| h.origin == Origin::RoutingTable));
    }

    #[test]
    fn cisco_provenance_and_hints() {
        let table = parse(CISCO, "core1.txt", None).unwrap();

        let ospf = network(&table, "10.1.0.0/24");
        let provenance = ospf.provenance.as_ref().unwrap();
        assert_eq!(provenance.protocol.as_deref(), Some("ospf-ia"));
        assert_eq!(provenance.next_hop, Some("10.0.0.2".parse().unwrap()));
        assert_eq!(provenance.interface.as_deref(), Some("GigabitEthernet0/0"));

        assert_eq!(network(&table, "10.0.0.0/30").hint, Some(NetworkHint::Backbone));
        assert_eq!(network(&table, "10.9.9.0/24").hint, Some(NetworkHint::Management));
        assert_eq!(network(&table, "10.1.0.0/24").hint, None);
    }

    #[test]
    fn cisco_bad_prefix_is_reported_not_fatal() {
        let table = parse(CISCO, "core1.txt", None).unwrap();
        assert_eq!(table.malformed.len(), 1);
        assert!(table.malformed[0].line.contains("192.168.5.0/33"));
    }

    #[test]
    fn juniper_both_families() {
        let table = parse(JUNIPER, "mx1.txt", None).unwrap();

        assert_eq!(table.vendor, Vendor::Juniper);
        assert_eq!(
            cidrs(&table),
            vec!["10.0.0.0/31", "10.20.0.0/24", "172.30.0.0/24", "2001:db8:10::/64"]
        );
        assert_eq!(table.hosts.len(), 1);
        assert!(table.malformed.is_empty());

        let link = network(&table, "10.0.0.0/31");
        assert_eq!(link.hint, Some(NetworkHint::Backbone));
        assert_eq!(
            link.provenance.as_ref().unwrap().interface.as_deref(),
            Some("ge-0/0/0.0")
        );
        assert_eq!(network(&table, "172.30.0.0/24").hint, Some(NetworkHint::Management));

        let ospf = network(&table, "10.20.0.0/24").provenance.clone().unwrap();
        assert_eq!(ospf.protocol.as_deref(), Some("ospf"));
        assert_eq!(ospf.next_hop, Some("10.0.0.0".parse().unwrap()));
    }

    #[test]
    fn vendor_hint_skips_detection() {
        let body = "10.5.0.0/24 *[Static/5] 1d\n    > to 10.0.0.1 via ge-0/0/2.0\n";
        let table = parse(body, "snippet", Some(Vendor::Juniper)).unwrap();
        assert_eq!(cidrs(&table), vec!["10.5.0.0/24"]);
    }

    #[test]
    fn vendor_names_parse() {
        assert_eq!("JunOS".parse::<Vendor>(), Ok(Vendor::Juniper));
        assert_eq!("ios".parse::<Vendor>(), Ok(Vendor::Cisco));
        assert!("arista".parse::<Vendor>().is_err());
    }
}
