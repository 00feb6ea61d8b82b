// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! JunOS `show route`, `inet.0` and `inet6.0` alike.
//!
//! ```text
//! 10.20.0.0/24       *[OSPF/10] 00:10:00, metric 2
//!                     > to 10.0.0.2 via ge-0/0/0.0
//! 10.0.0.1/32        *[Local/0] 1w0d
//!                       Local via ge-0/0/0.0
//! ```
//!
//! The indented lines under an entry belong to it. The first next hop wins.

use std::net::IpAddr;
use std::sync::LazyLock;

use arbor_common::models::address::RouteProvenance;
use arbor_common::models::cidr::Cidr;
use regex::Regex;

use super::{RawRoute, RawTable, looks_like_interface};

static ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<net>[0-9A-Fa-f:.]*[0-9A-Fa-f:]/\d{1,3})(?:\s+(?P<rest>.*))?$")
        .expect("route pattern is valid")
});

static PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?P<proto>[A-Za-z-]+)/\d+\]").expect("protocol pattern is valid"));

static NEXT_HOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bto\s+(?P<hop>[0-9A-Fa-f:.]+)\s+)?\bvia\s+(?P<intf>\S+)")
        .expect("next hop pattern is valid")
});

pub(crate) fn parse(text: &str) -> RawTable {
    let mut table = RawTable::default();
    let mut current: Option<RawRoute> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = ROUTE.captures(line) {
            table.routes.extend(current.take());

            let net = &caps["net"];
            let cidr = match net.parse::<Cidr>() {
                Ok(cidr) => cidr,
                Err(e) => {
                    table.reject(line_no, line, e.to_string());
                    continue;
                }
            };
            let mut route = RawRoute {
                cidr,
                connected: false,
                provenance: RouteProvenance::default(),
            };
            if let Some(rest) = caps.name("rest") {
                annotate(&mut route, rest.as_str());
            }
            current = Some(route);
            continue;
        }

        // Table headers and legends end the running entry
        if !raw_line.starts_with(char::is_whitespace) {
            table.routes.extend(current.take());
            continue;
        }

        if let Some(route) = current.as_mut() {
            annotate(route, line);
        }
    }

    table.routes.extend(current);
    table
}

fn annotate(route: &mut RawRoute, text: &str) {
    let provenance = &mut route.provenance;

    if provenance.protocol.is_none()
        && let Some(caps) = PROTOCOL.captures(text)
    {
        let proto = caps["proto"].to_ascii_lowercase();
        route.connected = proto == "direct";
        provenance.protocol = Some(proto);
    }

    if provenance.interface.is_none()
        && let Some(caps) = NEXT_HOP.captures(text)
    {
        let intf = &caps["intf"];
        if looks_like_interface(intf) {
            provenance.interface = Some(intf.to_string());
            provenance.next_hop = caps
                .name("hop")
                .and_then(|hop| hop.as_str().parse::<IpAddr>().ok());
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
