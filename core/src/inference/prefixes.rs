// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use arbor_common::error::UnassignedSupernetError;
use arbor_common::models::cidr::Cidr;
use arbor_common::{debug, warn};

use crate::tree::NodeSpec;

#[derive(Debug, Default)]
pub(crate) struct PrefixPlan {
    /// `(prefix, derived, roots)`, ready for [`crate::tree::SubnetTree::assemble`].
    pub assigned: Vec<(Cidr, bool, Vec<NodeSpec>)>,
    pub unassigned: Vec<UnassignedSupernetError>,
}

/// The prefix a top-level network gets when configuration names none.
///
/// IPv4 inside `10.0.0.0/8` → that `/8`, any other IPv4 → the enclosing `/16`,
/// IPv6 → the enclosing `/48`. `None` when the network is coarser than that.
pub fn derive_prefix(cidr: &Cidr) -> Option<Cidr> {
    let ten: Cidr = Cidr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 8).ok()?;
    let len = match cidr.network() {
        IpAddr::V4(_) if ten.contains(cidr) => 8,
        IpAddr::V4(_) => 16,
        IpAddr::V6(_) => 48,
    };
    cidr.supernet(len).ok()
}

/// Hangs every root under the coarsest prefix containing it.
///
/// `known` maps prefix → derived flag. Whenever a derived prefix ends up
/// covering another prefix, the covered one is folded into it so the final
/// prefixes never overlap.
pub(crate) fn attach(
    roots: Vec<NodeSpec>,
    known: &BTreeMap<Cidr, bool>,
    derive: bool,
) -> PrefixPlan {
    let mut groups: BTreeMap<Cidr, (bool, Vec<NodeSpec>)> = BTreeMap::new();
    let mut plan = PrefixPlan::default();

    for root in roots {
        let configured = known
            .iter()
            .filter(|(prefix, _)| prefix.contains(&root.cidr))
            .min_by_key(|(prefix, _)| prefix.prefix_len())
            .map(|(prefix, derived)| (*prefix, *derived));

        let chosen = configured.or_else(|| {
            if !derive {
                return None;
            }
            derive_prefix(&root.cidr).map(|prefix| (prefix, true))
        });

        match chosen {
            Some((prefix, derived)) => {
                debug!("{} attached to prefix {prefix}", root.cidr);
                let group = groups.entry(prefix).or_insert((derived, Vec::new()));
                group.0 &= derived;
                group.1.push(root);
            }
            None => {
                warn!("{} is not inside any known prefix", root.cidr);
                plan.unassigned.push(UnassignedSupernetError { cidr: root.cidr });
            }
        }
    }

    let mut by_size: Vec<Cidr> = groups.keys().copied().collect();
    by_size.sort_by_key(|prefix| prefix.prefix_len());
    for inner in by_size {
        let Some(outer) = groups
            .keys()
            .find(|outer| outer.strictly_contains(&inner))
            .copied()
        else {
            continue;
        };
        if let Some((_, roots)) = groups.remove(&inner)
            && let Some(target) = groups.get_mut(&outer)
        {
            debug!("Folding prefix {inner} into {outer}");
            target.1.extend(roots);
        }
    }

    plan.assigned = groups
        .into_iter()
        .map(|(prefix, (derived, roots))| (prefix, derived, roots))
        .collect();
    plan
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
    use crate::tree::NodeKind;
    use std::collections::BTreeSet;

    fn cidr(s: &str) -> Cidr {
        s.parse().unwrap()
    }

    fn root(s: &str) -> NodeSpec {
        NodeSpec {
            cidr: cidr(s),
            kind: NodeKind::Base,
            origins: BTreeSet::new(),
            hint: None,
            provenance: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn derivation_follows_address_space() {
        assert_eq!(derive_prefix(&cidr("10.20.30.0/24")), Some(cidr("10.0.0.0/8")));
        assert_eq!(derive_prefix(&cidr("192.168.13.0/24")), Some(cidr("192.168.0.0/16")));
        assert_eq!(derive_prefix(&cidr("2001:db8:1:2::/64")), Some(cidr("2001:db8:1::/48")));
        assert_eq!(derive_prefix(&cidr("172.0.0.0/12")), None);
    }

    #[test]
    fn coarsest_configured_prefix_wins() {
        let known = BTreeMap::from([(cidr("10.0.0.0/8"), false), (cidr("10.1.0.0/16"), false)]);
        let plan = attach(vec![root("10.1.2.0/24")], &known, true);
        assert_eq!(plan.assigned.len(), 1);
        assert_eq!(plan.assigned[0].0, cidr("10.0.0.0/8"));
        assert!(!plan.assigned[0].1);
    }

    #[test]
    fn uncovered_roots_are_reported_without_derivation() {
        let plan = attach(vec![root("192.168.1.0/24")], &BTreeMap::new(), false);
        assert!(plan.assigned.is_empty());
        assert_eq!(plan.unassigned[0].cidr, cidr("192.168.1.0/24"));
    }

    #[test]
    fn derived_prefix_absorbs_covered_configured_prefix() {
        let known = BTreeMap::from([(cidr("192.168.0.0/20"), false)]);
        let plan = attach(
            vec![root("192.168.1.0/24"), root("192.168.100.0/24")],
            &known,
            true,
        );
        assert_eq!(plan.assigned.len(), 1);
        let (prefix, derived, roots) = &plan.assigned[0];
        assert_eq!(*prefix, cidr("192.168.0.0/16"));
        assert!(*derived);
        assert_eq!(roots.len(), 2);
    }
}
