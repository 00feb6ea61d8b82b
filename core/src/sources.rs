// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Address Sources
//!
//! Adapters that turn each kind of input into the same [`SourceBatch`]:
//!
//! - [`InventorySource`]: JSON device exports.
//! - [`ScanSource`]: responders of a network scan.
//! - [`RoutingSource`]: a parsed routing table.
//!
//! [`merge`] then folds all batches into one [`MergedInput`], resolving
//! duplicates by origin precedence (inventory, then scan, then routing table).

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arbor_common::error::MalformedLineError;
use arbor_common::models::address::{Address, DeclaredNetwork, Origin};
use arbor_common::models::cidr::Cidr;
use arbor_common::{debug, error, info, success, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::parser::RoutingTable;
use crate::scanner::{NameResolver, ScanHit};

/// Everything one source contributed to a run.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub source: String,
    pub addresses: Vec<Address>,
    pub networks: Vec<DeclaredNetwork>,
    pub malformed: Vec<MalformedLineError>,
}

pub trait AddressSource {
    fn name(&self) -> &str;
    fn collect(&self) -> anyhow::Result<SourceBatch>;
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Accepted inventory layouts.
///
/// ```json
/// { "devices": [ { "ip_address": "10.0.0.1", "hostname": "core1" } ] }
/// ```
/// or a map from host identifier to an address or a record:
/// ```json
/// { "core1": "10.0.0.1", "edge1": { "ip": "10.0.0.2", "name": "edge-1" } }
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InventoryDocument {
    Export { devices: Vec<DeviceRecord> },
    Map(BTreeMap<String, HostEntry>),
}

#[derive(Debug, Deserialize)]
struct DeviceRecord {
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HostEntry {
    Address(String),
    Record {
        #[serde(alias = "ip_address")]
        ip: String,
        #[serde(default, alias = "hostname")]
        name: Option<String>,
    },
}

pub struct InventorySource {
    label: String,
    text: String,
}

impl InventorySource {
    pub fn from_json(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory '{}'", path.display()))?;
        Ok(Self::from_json(path.display().to_string(), text))
    }
}

impl AddressSource for InventorySource {
    fn name(&self) -> &str {
        &self.label
    }

    fn collect(&self) -> anyhow::Result<SourceBatch> {
        let doc: InventoryDocument = serde_json::from_str(&self.text)
            .with_context(|| format!("'{}' is not a recognized inventory document", self.label))?;

        let records: Vec<(Option<String>, Option<String>)> = match doc {
            InventoryDocument::Export { devices } => devices
                .into_iter()
                .map(|d| (d.ip_address, d.hostname.or(d.name)))
                .collect(),
            InventoryDocument::Map(hosts) => hosts
                .into_iter()
                .map(|(key, entry)| match entry {
                    HostEntry::Address(ip) => (Some(ip), Some(key)),
                    HostEntry::Record { ip, name } => (Some(ip), name.or(Some(key))),
                })
                .collect(),
        };

        let mut batch = SourceBatch {
            source: self.label.clone(),
            ..SourceBatch::default()
        };
        for (ip, name) in records {
            let Some(raw) = ip.filter(|ip| !ip.trim().is_empty()) else {
                continue;
            };
            match raw.trim().parse::<IpAddr>() {
                Ok(ip) => {
                    let address = Address::new(ip, Origin::Inventory);
                    batch.addresses.push(match name {
                        Some(name) => address.with_name(name),
                        None => address,
                    });
                }
                Err(_) => warn!("{}: skipping invalid address '{raw}'", self.label),
            }
        }

        success!(
            "Loaded {} addresses from {}",
            batch.addresses.len(),
            self.label
        );
        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Scan & routing table
// ---------------------------------------------------------------------------

pub struct ScanSource {
    hits: Vec<ScanHit>,
}

impl ScanSource {
    pub fn new(hits: Vec<ScanHit>) -> Self {
        Self { hits }
    }
}

impl AddressSource for ScanSource {
    fn name(&self) -> &str {
        "scan"
    }

    fn collect(&self) -> anyhow::Result<SourceBatch> {
        let addresses = self
            .hits
            .iter()
            .map(|hit| {
                let address = Address::new(hit.ip, Origin::Scan);
                match &hit.name {
                    Some(name) => address.with_name(name.clone()),
                    None => address,
                }
            })
            .collect();
        Ok(SourceBatch {
            source: self.name().to_string(),
            addresses,
            ..SourceBatch::default()
        })
    }
}

pub struct RoutingSource {
    table: RoutingTable,
}

impl RoutingSource {
    pub fn new(table: RoutingTable) -> Self {
        Self { table }
    }

    /// Names every host route by reverse lookup, each bounded by `limit`.
    /// Hosts without a record are named `host-<ip>`.
    pub async fn resolve_names(&mut self, resolver: Arc<dyn NameResolver>, limit: Duration) {
        let mut lookups = JoinSet::new();
        for host in self.table.hosts.iter().filter(|h| h.name.is_none()) {
            let ip = host.ip;
            let resolver = Arc::clone(&resolver);
            lookups.spawn(async move {
                let name = timeout(limit, resolver.reverse(ip)).await.ok().flatten();
                (ip, name)
            });
        }

        let mut names: BTreeMap<IpAddr, String> = BTreeMap::new();
        while let Some(finished) = lookups.join_next().await {
            match finished {
                Ok((ip, Some(name))) => {
                    names.insert(ip, name);
                }
                Ok((ip, None)) => debug!("No name for host route {ip}"),
                Err(e) => error!("Lookup task failed: {e}"),
            }
        }

        for host in self.table.hosts.iter_mut().filter(|h| h.name.is_none()) {
            let name = names
                .remove(&host.ip)
                .unwrap_or_else(|| format!("host-{}", host.ip));
            host.name = Some(name);
        }
    }
}

impl AddressSource for RoutingSource {
    fn name(&self) -> &str {
        &self.table.source
    }

    fn collect(&self) -> anyhow::Result<SourceBatch> {
        Ok(SourceBatch {
            source: self.table.source.clone(),
            addresses: self.table.hosts.clone(),
            networks: self.table.networks.clone(),
            malformed: self.table.malformed.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineIssue {
    pub source: String,
    #[serde(flatten)]
    pub error: MalformedLineError,
}

#[derive(Debug, Clone, Default)]
pub struct MergedInput {
    /// One entry per IP, sorted.
    pub addresses: Vec<Address>,
    /// One entry per CIDR, sorted.
    pub networks: Vec<DeclaredNetwork>,
    pub malformed: Vec<LineIssue>,
}

/// Folds batches into one input. A duplicate address keeps the strongest
/// origin and picks up a name from any batch that has one.
pub fn merge(batches: Vec<SourceBatch>) -> MergedInput {
    let mut addresses: BTreeMap<IpAddr, Address> = BTreeMap::new();
    let mut networks: BTreeMap<Cidr, DeclaredNetwork> = BTreeMap::new();
    let mut malformed = Vec::new();

    for batch in batches {
        info!(
            verbosity = 1,
            "Merging {}: {} addresses, {} networks",
            batch.source,
            batch.addresses.len(),
            batch.networks.len()
        );

        for address in batch.addresses {
            match addresses.get_mut(&address.ip) {
                Some(existing) => {
                    let name = existing.name.take().or(address.name.clone());
                    if address.origin < existing.origin {
                        *existing = address;
                    }
                    if existing.name.is_none() {
                        existing.name = name;
                    }
                }
                None => {
                    addresses.insert(address.ip, address);
                }
            }
        }

        for network in batch.networks {
            match networks.get_mut(&network.cidr) {
                Some(existing) => {
                    if existing.hint.is_none() {
                        existing.hint = network.hint;
                    }
                    if existing.provenance.is_none() {
                        existing.provenance = network.provenance;
                    }
                }
                None => {
                    networks.insert(network.cidr, network);
                }
            }
        }

        malformed.extend(batch.malformed.into_iter().map(|error| LineIssue {
            source: batch.source.clone(),
            error,
        }));
    }

    MergedInput {
        addresses: addresses.into_values().collect(),
        networks: networks.into_values().collect(),
        malformed,
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
