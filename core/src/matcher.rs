// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Longest Prefix Match
//!
//! Binds addresses to the most specific subnet containing them.
//!
//! The lookup starts at the prefix containing the address and walks down,
//! taking the one child that contains it at every level. Sibling subnets
//! never overlap, so the walk never has to choose.

use std::net::IpAddr;

use arbor_common::debug;
use arbor_common::error::NoContainingSubnetError;
use arbor_common::models::address::Address;
use arbor_common::models::cidr::Cidr;
use serde::Serialize;

use crate::tree::{NodeId, SubnetTree};

#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub bound: usize,
    pub unmatched: Vec<NoContainingSubnetError>,
}

/// Where a declared network ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// A node with exactly this CIDR exists.
    Exact(Cidr),
    /// The most specific node containing it.
    Within(Cidr),
    Unresolved,
}

/// Most specific node containing `ip`.
pub fn locate(tree: &SubnetTree, ip: &IpAddr) -> Option<NodeId> {
    descend(tree, |cidr| cidr.contains_addr(ip))
}

/// Most specific node containing all of `network`.
pub fn locate_network(tree: &SubnetTree, network: &Cidr) -> Option<NodeId> {
    descend(tree, |cidr| cidr.contains(network))
}

pub fn resolve_network(tree: &SubnetTree, network: &Cidr) -> Resolution {
    match locate_network(tree, network) {
        Some(id) if tree.node(id).cidr == *network => Resolution::Exact(*network),
        Some(id) => Resolution::Within(tree.node(id).cidr),
        None => Resolution::Unresolved,
    }
}

fn descend(tree: &SubnetTree, contains: impl Fn(&Cidr) -> bool) -> Option<NodeId> {
    let prefix = tree
        .prefixes()
        .iter()
        .filter(|p| contains(&p.cidr))
        .min_by_key(|p| p.cidr.prefix_len())?;

    let mut current = *prefix.roots.iter().find(|id| contains(&tree.node(**id).cidr))?;
    while let Some(next) = tree
        .node(current)
        .children
        .iter()
        .find(|id| contains(&tree.node(**id).cidr))
    {
        current = *next;
    }
    Some(current)
}

/// Replaces all bindings of `tree` with `addresses` and recomputes utilization.
///
/// Addresses no node contains are collected, never fatal.
pub fn bind(tree: &mut SubnetTree, addresses: &[Address]) -> MatchReport {
    tree.clear_bindings();
    let mut report = MatchReport::default();

    for address in addresses {
        match locate(tree, &address.ip) {
            Some(id) => {
                tree.node_mut(id).addresses.push(address.clone());
                report.bound += 1;
            }
            None => {
                debug!("No subnet contains {}", address.ip);
                report.unmatched.push(NoContainingSubnetError {
                    address: address.ip,
                });
            }
        }
    }

    for id in tree.ids() {
        let node = tree.node_mut(id);
        node.addresses.sort_by_key(|a| a.ip);
        node.utilization = utilization(&node.cidr, node.addresses.len());
    }

    report
}

pub fn utilization(cidr: &Cidr, bound: usize) -> f64 {
    let usable = cidr.usable_addresses();
    if usable == 0 {
        return 0.0;
    }
    bound as f64 / usable as f64
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
