// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

#![cfg(test)]
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use arbor_common::config::InferenceConfig;
use arbor_common::models::address::{Address, DeclaredNetwork, Origin};
use arbor_common::models::cidr::Cidr;
use arbor_core::inference::infer;
use arbor_core::matcher::{bind, locate};
use arbor_core::tree::{NodeKind, SubnetTree};
use proptest::prelude::*;

use crate::utils::cidr;

fn arb_ipv4() -> impl Strategy<Value = IpAddr> {
    (0u8..3, 0u8..4, any::<u8>())
        .prop_map(|(b, c, d)| IpAddr::V4(Ipv4Addr::new(10, b, c, d)))
}

fn arb_ipv6() -> impl Strategy<Value = IpAddr> {
    (0u16..2, 0u16..8)
        .prop_map(|(net, host)| IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, net, 0, 0, 0, host)))
}

fn arb_addresses() -> impl Strategy<Value = Vec<Address>> {
    prop::collection::vec(prop_oneof![4 => arb_ipv4(), 1 => arb_ipv6()], 0..48).prop_map(|ips| {
        ips.into_iter()
            .map(|ip| Address::new(ip, Origin::Scan))
            .collect()
    })
}

fn arb_declared() -> impl Strategy<Value = Vec<DeclaredNetwork>> {
    prop::collection::vec((0u8..3, 0u8..4, 22u8..=30), 0..6).prop_map(|nets| {
        nets.into_iter()
            .filter_map(|(b, c, len)| {
                Cidr::new(IpAddr::V4(Ipv4Addr::new(10, b, c, 0)), len).ok()
            })
            .map(|cidr| DeclaredNetwork::new(cidr, Origin::RoutingTable))
            .collect()
    })
}

fn config(with_flat: bool) -> InferenceConfig {
    InferenceConfig {
        flat_networks: if with_flat {
            vec![cidr("10.1.0.0/23")]
        } else {
            Vec::new()
        },
        ..InferenceConfig::default()
    }
}

fn assert_well_formed(tree: &SubnetTree) {
    for id in tree.ids() {
        let node = tree.node(id);

        if let Some(parent) = node.parent {
            let parent = tree.node(parent);
            assert!(
                parent.cidr.strictly_contains(&node.cidr),
                "{} is not inside its parent {}",
                node.cidr,
                parent.cidr
            );
        } else {
            let prefix = &tree.prefixes()[node.prefix];
            assert!(prefix.cidr.contains(&node.cidr));
        }

        if node.kind == NodeKind::Flat {
            assert!(node.children.is_empty(), "flat {} has children", node.cidr);
        }

        for (i, a) in node.children.iter().enumerate() {
            for b in &node.children[i + 1..] {
                let (a, b) = (tree.node(*a).cidr, tree.node(*b).cidr);
                assert!(!a.overlaps(&b), "siblings {a} and {b} overlap");
            }
        }
    }

    let prefixes = tree.prefixes();
    for (i, a) in prefixes.iter().enumerate() {
        for b in &prefixes[i + 1..] {
            assert!(!a.cidr.overlaps(&b.cidr));
        }
    }
    assert!(tree.validate().is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tree_is_well_formed(
        input in arb_addresses(),
        declared in arb_declared(),
        with_flat in any::<bool>(),
    ) {
        let out = infer(&input, &declared, &config(with_flat), None).unwrap();
        assert_well_formed(&out.tree);
    }

    #[test]
    fn prop_binding_is_longest_match(input in arb_addresses(), with_flat in any::<bool>()) {
        let mut tree = infer(&input, &[], &config(with_flat), None).unwrap().tree;
        let report = bind(&mut tree, &input);

        let distinct: BTreeSet<IpAddr> = input.iter().map(|a| a.ip).collect();
        prop_assert_eq!(report.bound, distinct.len());
        prop_assert!(report.unmatched.is_empty());

        for id in tree.ids() {
            let node = tree.node(id);
            for address in &node.addresses {
                prop_assert!(node.cidr.contains_addr(&address.ip));
                for child in &node.children {
                    prop_assert!(!tree.node(*child).cidr.contains_addr(&address.ip));
                }
                prop_assert_eq!(locate(&tree, &address.ip), Some(id));
            }
        }
    }

    #[test]
    fn prop_inference_is_deterministic(input in arb_addresses(), declared in arb_declared()) {
        let cfg = config(false);
        let first = infer(&input, &declared, &cfg, None).unwrap();

        let mut reversed = input.clone();
        reversed.reverse();
        let second = infer(&reversed, &declared, &cfg, None).unwrap();
        prop_assert_eq!(first.tree, second.tree);
    }

    #[test]
    fn prop_rerun_on_previous_tree_is_identical(
        input in arb_addresses(),
        declared in arb_declared(),
        with_flat in any::<bool>(),
    ) {
        let cfg = config(with_flat);
        let first = infer(&input, &declared, &cfg, None).unwrap();
        let second = infer(&input, &declared, &cfg, Some(&first.tree)).unwrap();
        prop_assert_eq!(&first.tree, &second.tree);
    }

    #[test]
    fn prop_previous_nodes_are_kept(
        before in arb_addresses(),
        after in arb_addresses(),
    ) {
        let cfg = config(false);
        let first = infer(&before, &[], &cfg, None).unwrap();
        let second = infer(&after, &[], &cfg, Some(&first.tree)).unwrap();

        assert_well_formed(&second.tree);
        for node in first.tree.nodes() {
            prop_assert!(second.tree.find(&node.cidr).is_some(), "{} was dropped", node.cidr);
        }
    }
}
