// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Subnet Inference
//!
//! Turns a flat list of addresses and declared networks into a [`SubnetTree`].
//!
//! ### Pipeline
//! 1. **Partition**: every address goes under its flat network, else its base network.
//! 2. **Subdivide**: each base is searched for denser subnets, most specific mask first.
//! 3. **Reconcile**: declared networks (and the nodes of a previous run) are merged
//!    into the forest at their containment position.
//! 4. **Attach**: top-level networks hang off the coarsest prefix containing them.
//! 5. **Validate**: the finished tree is checked before it is handed out.
//!
//! Only structural conflicts abort. Everything else (uncovered networks,
//! declarations that cannot be placed) ends up in the [`Inference`] report.

mod forest;
mod partition;
mod prefixes;
mod subdivide;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use arbor_common::config::InferenceConfig;
use arbor_common::error::{InferenceError, UnassignedSupernetError};
use arbor_common::models::address::{Address, DeclaredNetwork, Origin};
use arbor_common::models::cidr::Cidr;
use arbor_common::{debug, info, success, warn};
use serde::Serialize;

use crate::tree::{NodeKind, NodeSpec, SubnetTree};

use forest::{Forest, Placement};
pub use prefixes::derive_prefix;

/// Why a declared network did not make it into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Strictly inside this flat network.
    InsideFlat(Cidr),
    /// Its prefix length is listed in `ignored_declared_prefixes`.
    IgnoredLength,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsideFlat(flat) => write!(f, "inside flat network {flat}"),
            SkipReason::IgnoredLength => f.write_str("prefix length is ignored"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNetwork {
    pub cidr: Cidr,
    pub origin: Origin,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct Inference {
    pub tree: SubnetTree,
    /// Top-level networks with no prefix. Left out of the tree.
    pub unassigned: Vec<UnassignedSupernetError>,
    pub skipped: Vec<SkippedNetwork>,
    pub excluded_loopback: usize,
}

/// Builds the subnet tree for one run.
///
/// `previous` is the tree of an earlier run. Its nodes are kept (the tree only
/// grows) and feeding a run its own output back gives the same tree again.
pub fn infer(
    addresses: &[Address],
    declared: &[DeclaredNetwork],
    cfg: &InferenceConfig,
    previous: Option<&SubnetTree>,
) -> Result<Inference, InferenceError> {
    let min_members = cfg.effective_min_members();
    let parts = partition::partition(addresses, cfg)?;
    info!(
        verbosity = 1,
        "Grouped addresses into {} base and {} flat networks",
        parts.bases.len(),
        parts.flats.len()
    );

    let mut forest = Forest::new();
    let mut skipped = Vec::new();

    for (flat, members) in &parts.flats {
        let spec = leaf(*flat, NodeKind::Flat, members.values().copied().collect());
        if let Placement::InsideFlat(outer) = forest.insert(spec)? {
            return Err(InferenceError::OverlapConflict {
                first: outer,
                second: *flat,
            });
        }
    }

    let mut subdivisions = 0usize;
    for (base, members) in &parts.bases {
        forest.insert(leaf(*base, NodeKind::Base, members.values().copied().collect()))?;

        let max = base.max_prefix_len();
        let masks = cfg
            .policy_for(&base.network())
            .candidate_prefixes(base.prefix_len(), max);
        for candidate in subdivide::subdivide(base, members, &masks, min_members) {
            forest.insert(leaf(candidate.cidr, NodeKind::Subdivision, candidate.origins()))?;
            subdivisions += 1;
        }
    }
    debug!("Accepted {subdivisions} subdivisions");

    let mut declared: Vec<&DeclaredNetwork> = declared.iter().collect();
    declared.sort_by_key(|d| (d.cidr, d.origin));
    for network in declared {
        if cfg
            .ignored_declared_prefixes
            .contains(&network.cidr.prefix_len())
        {
            skipped.push(SkippedNetwork {
                cidr: network.cidr,
                origin: network.origin,
                reason: SkipReason::IgnoredLength,
            });
            continue;
        }

        let kind = if cfg.is_flat(&network.cidr) {
            NodeKind::Flat
        } else {
            NodeKind::Declared
        };
        let spec = NodeSpec {
            cidr: network.cidr,
            kind,
            origins: BTreeSet::from([network.origin]),
            hint: network.hint,
            provenance: network.provenance.clone(),
            children: Vec::new(),
        };
        place(&mut forest, spec, network.origin, cfg, &mut skipped)?;
    }

    let mut known: BTreeMap<Cidr, bool> = cfg.prefixes.iter().map(|p| (*p, false)).collect();
    if let Some(previous) = previous {
        carry_over(previous, &mut forest, cfg, &mut skipped, &mut known)?;
    }

    let plan = prefixes::attach(forest.into_roots(), &known, cfg.derive_prefixes);
    let tree = SubnetTree::assemble(plan.assigned);
    tree.validate()?;

    for skip in &skipped {
        warn!("Skipped {} from {}: {}", skip.cidr, skip.origin, skip.reason);
    }
    success!(
        "Inferred {} subnets under {} prefixes",
        tree.len(),
        tree.prefixes().len()
    );

    Ok(Inference {
        tree,
        unassigned: plan.unassigned,
        skipped,
        excluded_loopback: parts.excluded_loopback,
    })
}

fn leaf(cidr: Cidr, kind: NodeKind, origins: BTreeSet<Origin>) -> NodeSpec {
    NodeSpec {
        cidr,
        kind,
        origins,
        hint: None,
        provenance: None,
        children: Vec::new(),
    }
}

/// Inserts a declared node unless a flat network (configured, populated or not) covers it.
fn place(
    forest: &mut Forest,
    spec: NodeSpec,
    origin: Origin,
    cfg: &InferenceConfig,
    skipped: &mut Vec<SkippedNetwork>,
) -> Result<(), InferenceError> {
    let cidr = spec.cidr;
    let covering_flat = cfg
        .flat_networks
        .iter()
        .find(|flat| flat.strictly_contains(&cidr))
        .copied();

    let placement = match covering_flat {
        Some(flat) => Placement::InsideFlat(flat),
        None => forest.insert(spec)?,
    };

    if let Placement::InsideFlat(flat) = placement {
        skipped.push(SkippedNetwork {
            cidr,
            origin,
            reason: SkipReason::InsideFlat(flat),
        });
    }
    Ok(())
}

/// Re-inserts the nodes and prefixes of an earlier tree.
fn carry_over(
    previous: &SubnetTree,
    forest: &mut Forest,
    cfg: &InferenceConfig,
    skipped: &mut Vec<SkippedNetwork>,
    known: &mut BTreeMap<Cidr, bool>,
) -> Result<(), InferenceError> {
    for prefix in previous.prefixes() {
        known
            .entry(prefix.cidr)
            .and_modify(|derived| *derived &= prefix.derived)
            .or_insert(prefix.derived);
    }

    for node in previous.nodes() {
        // Flatness always follows the current configuration.
        let kind = match (node.kind, cfg.is_flat(&node.cidr)) {
            (_, true) => NodeKind::Flat,
            (NodeKind::Flat, false) => NodeKind::Declared,
            (kind, false) => kind,
        };
        let spec = NodeSpec {
            cidr: node.cidr,
            kind,
            origins: node.origins.clone(),
            hint: node.hint,
            provenance: node.provenance.clone(),
            children: Vec::new(),
        };
        place(forest, spec, Origin::Previous, cfg, skipped)?;
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
