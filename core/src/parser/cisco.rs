// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Cisco IOS `show ip route`.
//!
//! ```text
//!       10.0.0.0/8 is variably subnetted, 4 subnets, 3 masks
//! C        10.0.0.0/30 is directly connected, GigabitEthernet0/0
//! O IA     10.1.0.0/24 [110/2] via 10.0.0.2, 00:01:02, GigabitEthernet0/0
//!                      [110/2] via 10.0.0.6, 00:01:02, GigabitEthernet0/1
//!       172.16.0.0/24 is subnetted, 2 subnets
//! O        172.16.1.0 [110/20] via 10.0.0.2, 00:00:12, GigabitEthernet0/0
//! ```
//!
//! Classful headers are not routes. A header with a single mask supplies the
//! length for the entries below it that omit one. Equal-cost continuation
//! lines add nothing new and are ignored.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;

use arbor_common::models::address::RouteProvenance;
use arbor_common::models::cidr::Cidr;
use regex::Regex;

use super::{RawRoute, RawTable, looks_like_interface};

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<addr>\d{1,3}(?:\.\d{1,3}){3})(?:/(?P<len>\d{1,3}))?\s+is\s+(?P<variably>variably\s+)?subnetted")
        .expect("header pattern is valid")
});

static ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<code>[A-Za-z*+%#@]{1,2}\*?(?:\s+(?:IA|E1|E2|N1|N2|L1|L2|EX|ia|su)\b)?)\s+(?P<addr>\d{1,3}(?:\.\d{1,3}){3})(?:/(?P<len>\d{1,3}))?(?P<rest>.*)$")
        .expect("route pattern is valid")
});

static NEXT_HOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bvia\s+(?P<hop>\d{1,3}(?:\.\d{1,3}){3})").expect("next hop pattern is valid")
});

pub(crate) fn parse(text: &str) -> RawTable {
    let mut table = RawTable::default();
    // Mask announced by the last non-variable classful header
    let mut header_mask: Option<u8> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if let Some(caps) = HEADER.captures(line) {
            header_mask = match (caps.name("variably"), caps.name("len")) {
                (None, Some(len)) => len.as_str().parse().ok(),
                _ => None,
            };
            continue;
        }

        let Some(caps) = ROUTE.captures(line) else {
            continue;
        };

        let addr_str = &caps["addr"];
        let Ok(addr) = addr_str.parse::<Ipv4Addr>() else {
            table.reject(line_no, line, format!("invalid address {addr_str}"));
            continue;
        };

        let prefix_len = match caps.name("len") {
            Some(len) => match len.as_str().parse::<u8>() {
                Ok(len) => len,
                Err(_) => {
                    table.reject(line_no, line, "invalid prefix length");
                    continue;
                }
            },
            None => match header_mask {
                Some(mask) => mask,
                None => {
                    table.reject(line_no, line, "no prefix length and no subnetted header");
                    continue;
                }
            },
        };

        let cidr = match Cidr::new(IpAddr::V4(addr), prefix_len) {
            Ok(cidr) => cidr,
            Err(e) => {
                table.reject(line_no, line, e.to_string());
                continue;
            }
        };

        let code = caps["code"].trim();
        let rest = caps.name("rest").map_or("", |m| m.as_str());
        table.routes.push(RawRoute {
            cidr,
            connected: code == "C",
            provenance: RouteProvenance {
                protocol: Some(protocol_name(code)),
                next_hop: NEXT_HOP
                    .captures(rest)
                    .and_then(|c| c["hop"].parse::<IpAddr>().ok()),
                interface: trailing_interface(rest),
            },
        });
    }

    table
}

/// `O IA` → `ospf-ia`, `S*` → `static`.
fn protocol_name(code: &str) -> String {
    let mut parts = code.split_whitespace();
    let head = parts.next().unwrap_or_default().trim_end_matches('*');
    let base = match head {
        "C" => "connected",
        "L" => "local",
        "S" => "static",
        "R" => "rip",
        "B" => "bgp",
        "D" => "eigrp",
        "O" => "ospf",
        "i" => "isis",
        "M" => "mobile",
        "o" => "odr",
        _ => {
            return code
                .split_whitespace()
                .map(|part| part.trim_end_matches('*').to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join("-");
        }
    };
    match parts.next() {
        Some(suffix) => format!("{base}-{}", suffix.to_ascii_lowercase()),
        None => base.to_string(),
    }
}

fn trailing_interface(rest: &str) -> Option<String> {
    let last = rest.rsplit(',').next()?.trim();
    looks_like_interface(last).then(|| last.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
