// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

mod pipeline;
mod properties;
mod scanning;

#[cfg(test)]
pub mod utils {
    use std::net::IpAddr;

    use arbor_common::models::address::{Address, Origin};
    use arbor_common::models::cidr::Cidr;
    use arbor_core::tree::SubnetTree;

    pub fn cidr(s: &str) -> Cidr {
        s.parse().unwrap()
    }

    pub fn addresses(ips: &[&str], origin: Origin) -> Vec<Address> {
        ips.iter()
            .map(|ip| Address::new(ip.parse::<IpAddr>().unwrap(), origin))
            .collect()
    }

    /// CIDRs of the tree in storage (depth-first) order.
    pub fn cidrs(tree: &SubnetTree) -> Vec<String> {
        tree.nodes().iter().map(|n| n.cidr.to_string()).collect()
    }
}
