// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Snapshot
//!
//! The complete, serializable result of one population run. This is what gets
//! handed to whatever persists the hierarchy; it refers to subnets by CIDR so it
//! stands on its own without the arena.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use arbor_common::error::{NoContainingSubnetError, UnassignedSupernetError};
use arbor_common::models::address::{Address, NetworkHint, Origin};
use arbor_common::models::cidr::Cidr;
use serde::Serialize;

use crate::inference::SkippedNetwork;
use crate::matcher::Resolution;
use crate::sources::LineIssue;
use crate::tree::{NodeKind, Role, SubnetTree};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefixView {
    pub cidr: Cidr,
    pub derived: bool,
    pub roots: Vec<Cidr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubnetView {
    pub cidr: Cidr,
    pub kind: NodeKind,
    pub role: Role,
    pub prefix: Cidr,
    pub parent: Option<Cidr>,
    pub depth: usize,
    pub children: Vec<Cidr>,
    pub hint: Option<NetworkHint>,
    pub origins: BTreeSet<Origin>,
    pub addresses: Vec<Address>,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub address: IpAddr,
    pub subnet: Cidr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredResolution {
    pub cidr: Cidr,
    pub origin: Origin,
    pub hint: Option<NetworkHint>,
    pub resolution: Resolution,
}

/// An input that could not be used at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceIssue {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Issues {
    pub unassigned: Vec<UnassignedSupernetError>,
    pub unmatched: Vec<NoContainingSubnetError>,
    pub skipped: Vec<SkippedNetwork>,
    pub malformed: Vec<LineIssue>,
    pub sources: Vec<SourceIssue>,
}

impl Issues {
    pub fn len(&self) -> usize {
        self.unassigned.len()
            + self.unmatched.len()
            + self.skipped.len()
            + self.malformed.len()
            + self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub addresses: usize,
    pub bound: usize,
    pub prefixes: usize,
    pub subnets: usize,
    pub declared: usize,
    pub excluded_loopback: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub summary: Summary,
    pub prefixes: Vec<PrefixView>,
    pub subnets: Vec<SubnetView>,
    pub bindings: Vec<Binding>,
    pub declared: Vec<DeclaredResolution>,
    /// Subnet count per prefix length.
    pub breakdown: BTreeMap<u8, usize>,
    pub issues: Issues,
}

impl Snapshot {
    /// Flattens a bound tree into its serializable form.
    pub fn capture(
        tree: &SubnetTree,
        declared: Vec<DeclaredResolution>,
        issues: Issues,
        addresses: usize,
        excluded_loopback: usize,
    ) -> Self {
        let prefixes: Vec<PrefixView> = tree
            .prefixes()
            .iter()
            .map(|p| PrefixView {
                cidr: p.cidr,
                derived: p.derived,
                roots: p.roots.iter().map(|id| tree.node(*id).cidr).collect(),
            })
            .collect();

        let mut bindings = Vec::new();
        let subnets: Vec<SubnetView> = tree
            .ids()
            .map(|id| {
                let node = tree.node(id);
                bindings.extend(node.addresses.iter().map(|a| Binding {
                    address: a.ip,
                    subnet: node.cidr,
                }));
                SubnetView {
                    cidr: node.cidr,
                    kind: node.kind,
                    role: node.role(),
                    prefix: tree.prefixes()[node.prefix].cidr,
                    parent: node.parent.map(|p| tree.node(p).cidr),
                    depth: tree.depth(id),
                    children: node.children.iter().map(|c| tree.node(*c).cidr).collect(),
                    hint: node.hint,
                    origins: node.origins.clone(),
                    addresses: node.addresses.clone(),
                    utilization: node.utilization,
                }
            })
            .collect();
        bindings.sort_by_key(|b| b.address);

        let summary = Summary {
            addresses,
            bound: bindings.len(),
            prefixes: prefixes.len(),
            subnets: subnets.len(),
            declared: declared.len(),
            excluded_loopback,
        };

        Self {
            summary,
            prefixes,
            subnets,
            bindings,
            declared,
            breakdown: tree.breakdown(),
            issues,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
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
