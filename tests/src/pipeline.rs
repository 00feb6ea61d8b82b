// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

#![cfg(test)]
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use arbor_common::config::{FileConfig, InferenceConfig, ScanConfig};
use arbor_common::models::address::{DeclaredNetwork, NetworkHint, Origin};
use arbor_core::inference::SkipReason;
use arbor_core::matcher::Resolution;
use arbor_core::parser;
use arbor_core::population::{Outcome, Population};
use arbor_core::scanner::NoResolver;
use arbor_core::snapshot::SubnetView;
use arbor_core::sources::{InventorySource, RoutingSource, SourceBatch};
use arbor_core::tree::{NodeKind, Role};

use crate::utils::{addresses, cidr, cidrs};

const CORE_ROUTER: &str = "\
core1# show ip route
Codes: L - local, C - connected, S - static, O - OSPF, IA - OSPF inter area

Gateway of last resort is 10.0.0.2 to network 0.0.0.0

S*    0.0.0.0/0 [1/0] via 10.0.0.2
      10.0.0.0/8 is variably subnetted, 4 subnets, 3 masks
C        10.0.0.0/30 is directly connected, GigabitEthernet0/0
L        10.0.0.1/32 is directly connected, GigabitEthernet0/0
O IA     10.20.0.0/24 [110/2] via 10.0.0.2, 00:01:02, GigabitEthernet0/0
C        10.255.0.1/32 is directly connected, Loopback0
";

const EDGE_ROUTER: &str = "\
admin@edge1> show route

inet.0: 3 destinations, 3 routes (3 active, 0 holddown, 0 hidden)

10.0.0.0/30        *[Direct/0] 1w0d
                    > via ge-0/0/0.0
10.0.0.2/32        *[Local/0] 1w0d
                      Local via ge-0/0/0.0
172.30.0.0/24      *[Direct/0] 2d 01:00:00
                    > via fxp0.0
";

const INVENTORY: &str = r#"{"devices": [
    {"ip_address": "10.0.0.1", "hostname": "core1"},
    {"ip_address": "10.0.0.2", "hostname": "edge1"},
    {"ip_address": "10.20.0.5", "hostname": "app1"},
    {"ip_address": "10.20.0.6", "hostname": "app2"},
    {"ip_address": "10.20.0.77", "hostname": "db1"},
    {"ip_address": "172.30.0.10", "hostname": "oob1"}
]}"#;

fn scan_batch(ips: &[&str]) -> SourceBatch {
    SourceBatch {
        source: "scan".into(),
        addresses: addresses(ips, Origin::Scan),
        ..SourceBatch::default()
    }
}

fn run(cfg: &InferenceConfig, ips: &[&str]) -> Outcome {
    let mut population = Population::new(cfg);
    population.add_batch(scan_batch(ips));
    population.run().unwrap()
}

fn subnet<'a>(outcome: &'a Outcome, network: &str) -> &'a SubnetView {
    let network = cidr(network);
    outcome
        .snapshot
        .subnets
        .iter()
        .find(|s| s.cidr == network)
        .unwrap()
}

fn bound_to(outcome: &Outcome, ip: &str) -> String {
    let ip: IpAddr = ip.parse().unwrap();
    outcome
        .snapshot
        .bindings
        .iter()
        .find(|b| b.address == ip)
        .map(|b| b.subnet.to_string())
        .unwrap()
}

#[test]
fn test_subdivision_example() {
    let outcome = run(
        &InferenceConfig::default(),
        &["10.0.0.1", "10.0.0.2", "10.0.0.9", "10.0.0.10"],
    );

    assert_eq!(
        cidrs(&outcome.tree),
        vec!["10.0.0.0/24", "10.0.0.0/30", "10.0.0.8/30"]
    );
    assert_eq!(bound_to(&outcome, "10.0.0.1"), "10.0.0.0/30");
    assert_eq!(bound_to(&outcome, "10.0.0.10"), "10.0.0.8/30");
    assert!(!outcome.snapshot.subnets.iter().any(|s| s.cidr.prefix_len() == 29));

    let base = subnet(&outcome, "10.0.0.0/24");
    assert_eq!(base.role, Role::Parent);
    assert_eq!(base.children.len(), 2);
}

#[test]
fn test_singletons_are_not_subdivided() {
    let outcome = run(&InferenceConfig::default(), &["10.0.0.1", "10.0.0.20"]);

    assert_eq!(cidrs(&outcome.tree), vec!["10.0.0.0/24"]);
    assert_eq!(bound_to(&outcome, "10.0.0.1"), "10.0.0.0/24");
    assert_eq!(bound_to(&outcome, "10.0.0.20"), "10.0.0.0/24");
}

#[test]
fn test_flat_network_has_no_children() {
    let cfg = InferenceConfig {
        flat_networks: vec![cidr("192.168.0.0/24")],
        ..InferenceConfig::default()
    };
    let ips: Vec<String> = (1..=41).map(|i| format!("192.168.0.{i}")).collect();
    let refs: Vec<&str> = ips.iter().map(String::as_str).collect();
    let outcome = run(&cfg, &refs);

    assert_eq!(cidrs(&outcome.tree), vec!["192.168.0.0/24"]);
    let flat = subnet(&outcome, "192.168.0.0/24");
    assert_eq!(flat.kind, NodeKind::Flat);
    assert!(flat.children.is_empty());
    assert_eq!(flat.addresses.len(), 41);
    assert!((flat.utilization - 0.1614).abs() < 1e-3);
}

#[test]
fn test_longest_match_example() {
    let outcome = run(
        &InferenceConfig::default(),
        &[
            "192.168.13.1",
            "192.168.13.2",
            "192.168.13.9",
            "192.168.13.10",
            "192.168.13.20",
        ],
    );

    assert_eq!(bound_to(&outcome, "192.168.13.1"), "192.168.13.0/30");
    assert_eq!(bound_to(&outcome, "192.168.13.20"), "192.168.13.0/24");

    let slash30 = subnet(&outcome, "192.168.13.0/30");
    assert!((slash30.utilization - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_host_routes_are_named_without_overriding_inventory() {
    let cfg = InferenceConfig::default();
    let mut core = RoutingSource::new(parser::parse(CORE_ROUTER, "core1.txt", None).unwrap());
    core.resolve_names(Arc::new(NoResolver), Duration::from_millis(200))
        .await;

    let mut population = Population::new(&cfg);
    population.add_source(&core);
    population.add_source(&InventorySource::from_json("librenms.json", INVENTORY));
    let outcome = population.run().unwrap();

    let name_of = |ip: &str| {
        let ip: IpAddr = ip.parse().unwrap();
        outcome
            .snapshot
            .subnets
            .iter()
            .flat_map(|s| s.addresses.iter())
            .find(|a| a.ip == ip)
            .and_then(|a| a.name.clone())
    };
    assert_eq!(name_of("10.255.0.1").as_deref(), Some("host-10.255.0.1"));
    assert_eq!(name_of("10.0.0.1").as_deref(), Some("core1"));
}

#[test]
fn test_every_source_together() {
    let core = parser::parse(CORE_ROUTER, "core1.txt", None).unwrap();
    let edge = parser::parse(EDGE_ROUTER, "edge1.txt", None).unwrap();
    let cfg = InferenceConfig::default();

    let mut population = Population::new(&cfg);
    population.add_source(&InventorySource::from_json("librenms.json", INVENTORY));
    population.add_source(&RoutingSource::new(core));
    population.add_source(&RoutingSource::new(edge));
    let outcome = population.run().unwrap();
    let snapshot = &outcome.snapshot;

    assert!(snapshot.issues.is_empty(), "{:?}", snapshot.issues);
    assert_eq!(
        cidrs(&outcome.tree),
        vec![
            "10.0.0.0/24",
            "10.0.0.0/30",
            "10.20.0.0/24",
            "10.20.0.4/30",
            "10.255.0.0/24",
            "172.30.0.0/24",
        ]
    );

    // Declared by both routers, observed by the inventory
    let link = subnet(&outcome, "10.0.0.0/30");
    assert_eq!(link.kind, NodeKind::Declared);
    assert_eq!(link.hint, Some(NetworkHint::Backbone));
    let names: Vec<_> = link.addresses.iter().map(|a| a.name.as_deref()).collect();
    assert_eq!(names, vec![Some("core1"), Some("edge1")]);

    let oob = subnet(&outcome, "172.30.0.0/24");
    assert_eq!(oob.hint, Some(NetworkHint::Management));
    assert_eq!(oob.prefix, cidr("172.30.0.0/16"));

    assert_eq!(bound_to(&outcome, "10.255.0.1"), "10.255.0.0/24");
    assert_eq!(snapshot.prefixes.len(), 2);
    assert_eq!(snapshot.summary.addresses, 7);
    assert_eq!(snapshot.summary.bound, 7);
    assert!(
        snapshot
            .declared
            .iter()
            .all(|d| matches!(d.resolution, Resolution::Exact(_)))
    );
}

#[test]
fn test_snapshot_json_shape() {
    let outcome = run(&InferenceConfig::default(), &["10.0.0.1", "10.0.0.2"]);
    let json: serde_json::Value =
        serde_json::from_str(&outcome.snapshot.to_json().unwrap()).unwrap();

    assert_eq!(json["summary"]["subnets"], 2);
    assert_eq!(json["prefixes"][0]["cidr"], "10.0.0.0/8");
    assert_eq!(json["prefixes"][0]["derived"], true);
    assert_eq!(json["subnets"][1]["parent"], "10.0.0.0/24");
    assert_eq!(json["bindings"][0]["address"], "10.0.0.1");
    assert!(json["issues"]["unmatched"].as_array().unwrap().is_empty());
}

#[test]
fn test_rerun_against_previous_tree() {
    let cfg = InferenceConfig::default();
    let ips = ["10.0.0.1", "10.0.0.2", "10.0.0.40", "10.3.0.1"];
    let first = run(&cfg, &ips);

    let mut population = Population::new(&cfg).with_previous(&first.tree);
    population.add_batch(scan_batch(&ips));
    let second = population.run().unwrap();

    assert_eq!(first.tree, second.tree);
    assert_eq!(first.snapshot, second.snapshot);
}

#[test]
fn test_previous_tree_only_grows() {
    let cfg = InferenceConfig::default();
    let first = run(&cfg, &["10.0.0.1", "10.0.0.2"]);

    let mut population = Population::new(&cfg).with_previous(&first.tree);
    population.add_batch(scan_batch(&["10.0.7.1"]));
    let second = population.run().unwrap();

    assert_eq!(
        cidrs(&second.tree),
        vec!["10.0.0.0/24", "10.0.0.0/30", "10.0.7.0/24"]
    );
    assert_eq!(second.snapshot.summary.bound, 1);
}

#[test]
fn test_declared_inside_flat_is_skipped() {
    let cfg = InferenceConfig {
        flat_networks: vec![cidr("192.168.0.0/24")],
        ..InferenceConfig::default()
    };
    let mut population = Population::new(&cfg);
    population.add_batch(scan_batch(&["192.168.0.1", "192.168.0.2"]));
    population.add_batch(SourceBatch {
        source: "r1".into(),
        networks: vec![DeclaredNetwork::new(
            cidr("192.168.0.0/30"),
            Origin::RoutingTable,
        )],
        ..SourceBatch::default()
    });
    let outcome = population.run().unwrap();

    assert_eq!(cidrs(&outcome.tree), vec!["192.168.0.0/24"]);
    let skipped = &outcome.snapshot.issues.skipped;
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].reason, SkipReason::InsideFlat(cidr("192.168.0.0/24")));
    assert_eq!(
        outcome.snapshot.declared[0].resolution,
        Resolution::Within(cidr("192.168.0.0/24"))
    );
}

#[test]
fn test_unassigned_roots_without_derivation() {
    let cfg = InferenceConfig {
        prefixes: vec![cidr("10.0.0.0/8")],
        derive_prefixes: false,
        ..InferenceConfig::default()
    };
    let outcome = run(&cfg, &["10.0.0.1", "172.16.0.1"]);
    let issues = &outcome.snapshot.issues;

    assert_eq!(cidrs(&outcome.tree), vec!["10.0.0.0/24"]);
    assert_eq!(issues.unassigned.len(), 1);
    assert_eq!(issues.unassigned[0].cidr, cidr("172.16.0.0/24"));
    assert_eq!(issues.unmatched.len(), 1);
    assert_eq!(issues.unmatched[0].address, "172.16.0.1".parse::<IpAddr>().unwrap());
}

#[test]
fn test_config_file_drives_the_run() {
    let file = FileConfig::parse(
        r#"
[inference]
base_prefix_v4 = 16
subdivision_prefixes_v4 = [24]
flat_networks = ["10.9.0.0/16"]

[scan]
concurrency = 8
"#,
        "arbor.toml",
    )
    .unwrap();
    let mut cfg = InferenceConfig::default();
    let mut scan = ScanConfig::default();
    file.apply(&mut cfg, &mut scan);

    let outcome = run(&cfg, &["10.1.1.1", "10.1.1.2", "10.1.2.1", "10.9.1.1", "10.9.1.2"]);

    assert_eq!(
        cidrs(&outcome.tree),
        vec!["10.1.0.0/16", "10.1.1.0/24", "10.9.0.0/16"]
    );
    assert_eq!(subnet(&outcome, "10.9.0.0/16").kind, NodeKind::Flat);
    assert_eq!(scan.concurrency, 8);
}

#[test]
fn test_unreadable_sources_do_not_stop_the_run() {
    let cfg = InferenceConfig::default();
    let mut population = Population::new(&cfg);
    population.add_source(&InventorySource::from_json("broken.json", "{ not json"));
    population.add_failure("notes.txt", "not a routing table");
    population.add_batch(scan_batch(&["10.0.0.1"]));

    let outcome = population.run().unwrap();
    assert_eq!(outcome.snapshot.summary.bound, 1);
    assert_eq!(outcome.snapshot.issues.sources.len(), 2);
}
