// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Subnet Tree
//!
//! Arena-backed hierarchy of prefixes → subnets → addresses.
//!
//! Nodes live in one `Vec` and point at each other through [`NodeId`]s. The arena
//! is always stored in canonical depth-first order (prefixes sorted by CIDR, then
//! each subtree with its children sorted by CIDR), so two trees built from the
//! same input compare equal and iterating `nodes()` walks the hierarchy top-down.
//!
//! The tree itself is passive: the inference engine builds it and the matcher
//! binds addresses into it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use arbor_common::error::InferenceError;
use arbor_common::models::address::{Address, NetworkHint, Origin, RouteProvenance};
use arbor_common::models::cidr::Cidr;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// How a node came into existence.
///
/// Ordered by authority: when two sources produce the same CIDR the
/// node keeps the greater kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Grouping block every address falls into first.
    Base,
    /// Accepted candidate carved out of a base network.
    Subdivision,
    /// Stated by a source (routing table, previous run).
    Declared,
    /// Configured as never to be subdivided.
    Flat,
}

impl NodeKind {
    /// Locked nodes are taken as given and never replaced by inferred ones.
    pub fn is_locked(self) -> bool {
        matches!(self, NodeKind::Declared | NodeKind::Flat)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Base => "base",
            NodeKind::Subdivision => "subdivision",
            NodeKind::Declared => "declared",
            NodeKind::Flat => "flat",
        };
        f.write_str(label)
    }
}

/// Position of a node relative to its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Hangs directly off a prefix.
    Parent,
    /// Nested inside another subnet.
    Child,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubnetNode {
    pub cidr: Cidr,
    pub kind: NodeKind,
    /// Index into [`SubnetTree::prefixes`] of the prefix this node descends from.
    pub prefix: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Addresses for which this node is the most specific container.
    pub addresses: Vec<Address>,
    /// Bound addresses over usable addresses, in `0.0..=1.0` for sane input.
    pub utilization: f64,
    pub origins: BTreeSet<Origin>,
    pub hint: Option<NetworkHint>,
    pub provenance: Option<RouteProvenance>,
}

impl SubnetNode {
    pub fn role(&self) -> Role {
        match self.parent {
            None => Role::Parent,
            Some(_) => Role::Child,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.kind == NodeKind::Flat
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefix {
    pub cidr: Cidr,
    pub roots: Vec<NodeId>,
    /// `true` when the prefix came from the derivation rule rather than configuration.
    pub derived: bool,
}

/// Builder-side description of one node, before it gets an arena slot.
#[derive(Debug, Clone)]
pub(crate) struct NodeSpec {
    pub cidr: Cidr,
    pub kind: NodeKind,
    pub origins: BTreeSet<Origin>,
    pub hint: Option<NetworkHint>,
    pub provenance: Option<RouteProvenance>,
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubnetTree {
    prefixes: Vec<Prefix>,
    nodes: Vec<SubnetNode>,
    #[serde(skip)]
    index: BTreeMap<Cidr, NodeId>,
}

impl SubnetTree {
    /// Lays out `(prefix, derived, roots)` triples in canonical order.
    pub(crate) fn assemble(mut prefixes: Vec<(Cidr, bool, Vec<NodeSpec>)>) -> Self {
        prefixes.sort_by_key(|(cidr, _, _)| *cidr);

        let mut tree = SubnetTree::default();
        for (prefix_idx, (cidr, derived, mut roots)) in prefixes.into_iter().enumerate() {
            roots.sort_by_key(|spec| spec.cidr);
            let mut root_ids = Vec::with_capacity(roots.len());
            for root in roots {
                root_ids.push(tree.push_subtree(root, prefix_idx, None));
            }
            tree.prefixes.push(Prefix {
                cidr,
                roots: root_ids,
                derived,
            });
        }
        tree
    }

    fn push_subtree(&mut self, spec: NodeSpec, prefix: usize, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let NodeSpec {
            cidr,
            kind,
            origins,
            hint,
            provenance,
            mut children,
        } = spec;

        self.nodes.push(SubnetNode {
            cidr,
            kind,
            prefix,
            parent,
            children: Vec::new(),
            addresses: Vec::new(),
            utilization: 0.0,
            origins,
            hint,
            provenance,
        });
        self.index.insert(cidr, id);

        children.sort_by_key(|child| child.cidr);
        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.push_subtree(child, prefix, Some(id)))
            .collect();
        self.nodes[id.0].children = child_ids;
        id
    }

    pub fn prefixes(&self) -> &[Prefix] {
        &self.prefixes
    }

    /// Every node in canonical depth-first order.
    pub fn nodes(&self) -> &[SubnetNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &SubnetNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SubnetNode {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&SubnetNode> {
        self.nodes.get(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn find(&self, cidr: &Cidr) -> Option<NodeId> {
        self.index.get(cidr).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of ancestors between `id` and its prefix.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.node(id).parent;
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.node(parent).parent;
        }
        depth
    }

    /// Subnet count per prefix length.
    pub fn breakdown(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.cidr.prefix_len()).or_insert(0) += 1;
        }
        counts
    }

    pub fn bound_addresses(&self) -> usize {
        self.nodes.iter().map(|node| node.addresses.len()).sum()
    }

    pub(crate) fn clear_bindings(&mut self) {
        for node in &mut self.nodes {
            node.addresses.clear();
            node.utilization = 0.0;
        }
    }

    /// Rebuilds the builder description of a subtree, bindings excluded.
    pub(crate) fn spec_of(&self, id: NodeId) -> NodeSpec {
        let node = self.node(id);
        NodeSpec {
            cidr: node.cidr,
            kind: node.kind,
            origins: node.origins.clone(),
            hint: node.hint,
            provenance: node.provenance.clone(),
            children: node.children.iter().map(|c| self.spec_of(*c)).collect(),
        }
    }

    /// Checks the structural invariants.
    ///
    /// * prefixes are pairwise disjoint and contain their roots
    /// * every node lies strictly inside its parent
    /// * siblings never overlap
    /// * flat nodes are leaves
    pub fn validate(&self) -> Result<(), InferenceError> {
        let mut prefix_cidrs: Vec<Cidr> = self.prefixes.iter().map(|p| p.cidr).collect();
        prefix_cidrs.sort();
        check_disjoint(&prefix_cidrs)?;

        for prefix in &self.prefixes {
            let roots: Vec<Cidr> = prefix.roots.iter().map(|id| self.node(*id).cidr).collect();
            for root in &roots {
                if !prefix.cidr.contains(root) {
                    return Err(conflict(prefix.cidr, *root));
                }
            }
            check_disjoint(&roots)?;
        }

        for node in &self.nodes {
            if node.is_flat()
                && let Some(child) = node.children.first()
            {
                return Err(conflict(node.cidr, self.node(*child).cidr));
            }

            let children: Vec<Cidr> = node.children.iter().map(|id| self.node(*id).cidr).collect();
            for child in &children {
                if !node.cidr.strictly_contains(child) {
                    return Err(conflict(node.cidr, *child));
                }
            }
            check_disjoint(&children)?;
        }
        Ok(())
    }
}

fn conflict(first: Cidr, second: Cidr) -> InferenceError {
    InferenceError::OverlapConflict { first, second }
}

/// Expects `sorted` in ascending order. Overlap between nested blocks always
/// shows up between neighbours.
fn check_disjoint(sorted: &[Cidr]) -> Result<(), InferenceError> {
    for pair in sorted.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(conflict(pair[0], pair[1]));
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(cidr: &str, kind: NodeKind, children: Vec<NodeSpec>) -> NodeSpec {
        NodeSpec {
            cidr: cidr.parse().unwrap(),
            kind,
            origins: BTreeSet::new(),
            hint: None,
            provenance: None,
            children,
        }
    }

    fn sample() -> SubnetTree {
        SubnetTree::assemble(vec![(
            "10.0.0.0/8".parse().unwrap(),
            true,
            vec![
                spec("10.0.1.0/24", NodeKind::Base, vec![]),
                spec(
                    "10.0.0.0/24",
                    NodeKind::Base,
                    vec![
                        spec("10.0.0.8/30", NodeKind::Subdivision, vec![]),
                        spec("10.0.0.0/30", NodeKind::Subdivision, vec![]),
                    ],
                ),
            ],
        )])
    }

    #[test]
    fn assemble_lays_out_depth_first_in_order() {
        let tree = sample();
        let order: Vec<String> = tree.nodes().iter().map(|n| n.cidr.to_string()).collect();
        assert_eq!(
            order,
            vec!["10.0.0.0/24", "10.0.0.0/30", "10.0.0.8/30", "10.0.1.0/24"]
        );
        assert_eq!(tree.prefixes()[0].roots, vec![NodeId(0), NodeId(3)]);
        assert_eq!(tree.node(NodeId(2)).parent, Some(NodeId(0)));
        assert_eq!(tree.depth(NodeId(2)), 1);
        assert_eq!(tree.node(NodeId(0)).role(), Role::Parent);
        assert_eq!(tree.node(NodeId(1)).role(), Role::Child);
    }

    #[test]
    fn sample_tree_is_valid() {
        let tree = sample();
        assert!(tree.validate().is_ok());
        assert_eq!(tree.breakdown().get(&30), Some(&2));
        assert_eq!(tree.find(&"10.0.0.8/30".parse().unwrap()), Some(NodeId(2)));
    }

    #[test]
    fn flat_with_children_fails_validation() {
        let tree = SubnetTree::assemble(vec![(
            "192.168.0.0/16".parse().unwrap(),
            true,
            vec![spec(
                "192.168.0.0/24",
                NodeKind::Flat,
                vec![spec("192.168.0.0/30", NodeKind::Subdivision, vec![])],
            )],
        )]);
        assert!(matches!(
            tree.validate(),
            Err(InferenceError::OverlapConflict { .. })
        ));
    }

    #[test]
    fn overlapping_siblings_fail_validation() {
        let tree = SubnetTree::assemble(vec![(
            "10.0.0.0/8".parse().unwrap(),
            false,
            vec![
                spec("10.0.0.0/24", NodeKind::Base, vec![]),
                spec("10.0.0.0/30", NodeKind::Declared, vec![]),
            ],
        )]);
        let Err(InferenceError::OverlapConflict { first, second }) = tree.validate() else {
            panic!("expected a conflict");
        };
        assert_eq!(first.to_string(), "10.0.0.0/24");
        assert_eq!(second.to_string(), "10.0.0.0/30");
    }

    #[test]
    fn spec_of_round_trips_structure() {
        let tree = sample();
        let rebuilt = SubnetTree::assemble(vec![(
            tree.prefixes()[0].cidr,
            true,
            tree.prefixes()[0]
                .roots
                .iter()
                .map(|id| tree.spec_of(*id))
                .collect(),
        )]);
        assert_eq!(rebuilt, tree);
    }
}
