// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Observed Addresses and Declared Networks
//!
//! These are the two things a source can tell us:
//! * an [`Address`] that was seen somewhere (inventory, scan, host route), and
//! * a [`DeclaredNetwork`] that a router says exists.
//!
//! Both are produced once per run by an adapter and never mutated afterwards.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::models::cidr::Cidr;

/// Where a piece of data came from.
///
/// The declaration order is also the precedence when two sources report
/// the same address: inventory wins over scan, scan over routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Inventory,
    Scan,
    RoutingTable,
    /// Carried over from the tree of an earlier run.
    Previous,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Origin::Inventory => "inventory",
            Origin::Scan => "scan",
            Origin::RoutingTable => "routing-table",
            Origin::Previous => "previous",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub ip: IpAddr,
    pub origin: Origin,
    pub name: Option<String>,
}

impl Address {
    pub fn new(ip: IpAddr, origin: Origin) -> Self {
        Self {
            ip,
            origin,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = Some(name);
        }
        self
    }
}

/// What a router's interface tells us about a network it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkHint {
    Loopback,
    Management,
    Backbone,
}

/// Route details kept for the operator. Inference never looks at them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteProvenance {
    pub protocol: Option<String>,
    pub next_hop: Option<IpAddr>,
    pub interface: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredNetwork {
    pub cidr: Cidr,
    pub origin: Origin,
    pub hint: Option<NetworkHint>,
    pub provenance: Option<RouteProvenance>,
}

impl DeclaredNetwork {
    pub fn new(cidr: Cidr, origin: Origin) -> Self {
        Self {
            cidr,
            origin,
            hint: None,
            provenance: None,
        }
    }

    pub fn with_hint(mut self, hint: Option<NetworkHint>) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_provenance(mut self, provenance: RouteProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }
}
