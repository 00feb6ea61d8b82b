// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Mutable containment forest used while the tree is being built.
//!
//! Insertion keeps two invariants: children lie strictly inside their parent
//! and siblings are disjoint. Since CIDR blocks either nest or are disjoint,
//! placing a block is a walk down to its deepest container followed by
//! adopting the siblings it covers.

use std::collections::HashMap;

use arbor_common::error::InferenceError;
use arbor_common::models::cidr::Cidr;

use crate::tree::{NodeKind, NodeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Inserted,
    /// A node with the same CIDR existed and absorbed the metadata.
    Merged,
    /// Refused because the block sits strictly inside this flat network.
    InsideFlat(Cidr),
}

#[derive(Debug)]
struct Draft {
    spec: NodeSpec,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct Forest {
    drafts: Vec<Draft>,
    roots: Vec<usize>,
    index: HashMap<Cidr, usize>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `spec` (its `children` are ignored) into the forest.
    pub fn insert(&mut self, mut spec: NodeSpec) -> Result<Placement, InferenceError> {
        spec.children.clear();

        if let Some(&existing) = self.index.get(&spec.cidr) {
            self.merge(existing, spec);
            return Ok(Placement::Merged);
        }

        let parent = self.deepest_container(&spec.cidr);
        if let Some(p) = parent
            && self.drafts[p].spec.kind == NodeKind::Flat
        {
            return Ok(Placement::InsideFlat(self.drafts[p].spec.cidr));
        }

        let siblings = match parent {
            Some(p) => &self.drafts[p].children,
            None => &self.roots,
        };
        let (adopted, kept): (Vec<usize>, Vec<usize>) = siblings
            .iter()
            .partition(|&&s| spec.cidr.strictly_contains(&self.drafts[s].spec.cidr));

        if spec.kind == NodeKind::Flat
            && let Some(&child) = adopted.first()
        {
            return Err(InferenceError::OverlapConflict {
                first: spec.cidr,
                second: self.drafts[child].spec.cidr,
            });
        }

        let id = self.drafts.len();
        self.index.insert(spec.cidr, id);
        self.drafts.push(Draft {
            spec,
            children: adopted,
        });

        let mut siblings = kept;
        siblings.push(id);
        siblings.sort_by_key(|s| self.drafts[*s].spec.cidr);
        match parent {
            Some(p) => self.drafts[p].children = siblings,
            None => self.roots = siblings,
        }
        Ok(Placement::Inserted)
    }

    fn deepest_container(&self, cidr: &Cidr) -> Option<usize> {
        let mut parent: Option<usize> = None;
        loop {
            let siblings = match parent {
                Some(p) => &self.drafts[p].children,
                None => &self.roots,
            };
            match siblings
                .iter()
                .find(|&&s| self.drafts[s].spec.cidr.strictly_contains(cidr))
            {
                Some(&next) => parent = Some(next),
                None => return parent,
            }
        }
    }

    fn merge(&mut self, id: usize, incoming: NodeSpec) {
        let spec = &mut self.drafts[id].spec;
        spec.origins.extend(incoming.origins);
        spec.kind = spec.kind.max(incoming.kind);
        if spec.hint.is_none() {
            spec.hint = incoming.hint;
        }
        if spec.provenance.is_none() {
            spec.provenance = incoming.provenance;
        }
    }

    /// Tears the forest down into root specs with nested children.
    pub fn into_roots(mut self) -> Vec<NodeSpec> {
        let roots = std::mem::take(&mut self.roots);
        roots.into_iter().map(|r| self.take_spec(r)).collect()
    }

    fn take_spec(&mut self, id: usize) -> NodeSpec {
        let children = std::mem::take(&mut self.drafts[id].children);
        let nested: Vec<NodeSpec> = children.into_iter().map(|c| self.take_spec(c)).collect();
        let mut spec = self.drafts[id].spec.clone();
        spec.children = nested;
        spec
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

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_common::models::address::{NetworkHint, Origin};
    use std::collections::BTreeSet;

    fn spec(cidr: &str, kind: NodeKind) -> NodeSpec {
        NodeSpec {
            cidr: cidr.parse().unwrap(),
            kind,
            origins: BTreeSet::new(),
            hint: None,
            provenance: None,
            children: Vec::new(),
        }
    }

    fn shape(spec: &NodeSpec) -> String {
        if spec.children.is_empty() {
            return spec.cidr.to_string();
        }
        let inner: Vec<String> = spec.children.iter().map(shape).collect();
        format!("{}[{}]", spec.cidr, inner.join(","))
    }

    fn shapes(forest: Forest) -> Vec<String> {
        forest.into_roots().iter().map(shape).collect()
    }

    #[test]
    fn coarser_insert_adopts_contained_roots() {
        let mut forest = Forest::new();
        forest.insert(spec("10.0.0.8/30", NodeKind::Subdivision)).unwrap();
        forest.insert(spec("10.0.1.0/24", NodeKind::Base)).unwrap();
        forest.insert(spec("10.0.0.0/30", NodeKind::Subdivision)).unwrap();
        forest.insert(spec("10.0.0.0/24", NodeKind::Base)).unwrap();

        assert_eq!(
            shapes(forest),
            vec!["10.0.0.0/24[10.0.0.0/30,10.0.0.8/30]", "10.0.1.0/24"]
        );
    }

    #[test]
    fn finer_insert_descends_to_deepest_container() {
        let mut forest = Forest::new();
        forest.insert(spec("10.0.0.0/16", NodeKind::Declared)).unwrap();
        forest.insert(spec("10.0.5.0/24", NodeKind::Base)).unwrap();
        forest.insert(spec("10.0.5.4/30", NodeKind::Subdivision)).unwrap();

        assert_eq!(
            shapes(forest),
            vec!["10.0.0.0/16[10.0.5.0/24[10.0.5.4/30]]"]
        );
    }

    #[test]
    fn exact_match_merges_metadata() {
        let mut forest = Forest::new();
        forest.insert(spec("10.0.0.0/24", NodeKind::Base)).unwrap();

        let mut declared = spec("10.0.0.0/24", NodeKind::Declared);
        declared.origins.insert(Origin::RoutingTable);
        declared.hint = Some(NetworkHint::Management);
        assert_eq!(forest.insert(declared).unwrap(), Placement::Merged);

        let roots = forest.into_roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].kind, NodeKind::Declared);
        assert_eq!(roots[0].hint, Some(NetworkHint::Management));
        assert!(roots[0].origins.contains(&Origin::RoutingTable));
    }

    #[test]
    fn nothing_goes_inside_a_flat_network() {
        let mut forest = Forest::new();
        forest.insert(spec("192.168.0.0/24", NodeKind::Flat)).unwrap();
        let placed = forest.insert(spec("192.168.0.0/30", NodeKind::Declared)).unwrap();
        assert_eq!(placed, Placement::InsideFlat("192.168.0.0/24".parse().unwrap()));
        assert_eq!(shapes(forest), vec!["192.168.0.0/24"]);
    }

    #[test]
    fn flat_may_not_adopt_children() {
        let mut forest = Forest::new();
        forest.insert(spec("192.168.0.4/30", NodeKind::Declared)).unwrap();
        assert!(matches!(
            forest.insert(spec("192.168.0.0/24", NodeKind::Flat)),
            Err(InferenceError::OverlapConflict { .. })
        ));
    }
}
