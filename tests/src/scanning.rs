// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

#![cfg(test)]
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use arbor_common::config::{InferenceConfig, ProbeMethod, ScanConfig};
use arbor_common::error::ScanError;
use arbor_common::models::target::to_targets;
use arbor_core::population::Population;
use arbor_core::scanner::{self, NoResolver, ScanProgress, prober_for};
use arbor_core::sources::ScanSource;
use tokio::net::TcpListener;

use crate::utils::cidrs;

async fn listener_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn tcp_config(port: u16) -> ScanConfig {
    ScanConfig {
        concurrency: 4,
        probe_timeout: Duration::from_millis(500),
        probe: ProbeMethod::Tcp,
        tcp_ports: vec![port],
        resolve_names: false,
        ..ScanConfig::default()
    }
}

#[tokio::test]
async fn test_tcp_scan_finds_loopback_listener() {
    let (_listener, port) = listener_port().await;
    let cfg = tcp_config(port);
    let targets = to_targets(&["127.0.0.1"]).unwrap();
    let progress = Arc::new(ScanProgress::new());

    let hits = scanner::scan(
        &targets,
        &cfg,
        prober_for(&cfg),
        Arc::new(NoResolver),
        progress.clone(),
    )
    .await
    .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(hits[0].name, None);
    assert_eq!(progress.total(), 1);
    assert_eq!(progress.probed(), 1);
}

// Every 127/8 address answers on Linux, with a refusal where nothing listens.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_scan_feeds_the_hierarchy() {
    let (_listener, port) = listener_port().await;
    let cfg = tcp_config(port);
    let targets = to_targets(&["127.0.0.1-3"]).unwrap();

    let hits = scanner::scan(
        &targets,
        &cfg,
        prober_for(&cfg),
        Arc::new(NoResolver),
        Arc::new(ScanProgress::new()),
    )
    .await
    .unwrap();
    assert_eq!(hits.len(), 3);

    let inference = InferenceConfig {
        exclude_loopback: false,
        ..InferenceConfig::default()
    };
    let mut population = Population::new(&inference);
    population.add_source(&ScanSource::new(hits));
    let outcome = population.run().unwrap();

    assert_eq!(cidrs(&outcome.tree), vec!["127.0.0.0/24", "127.0.0.0/30"]);
    assert_eq!(outcome.snapshot.prefixes[0].cidr.to_string(), "127.0.0.0/16");
    assert_eq!(outcome.snapshot.summary.bound, 3);
}

#[tokio::test]
async fn test_scan_limit_is_enforced_before_probing() {
    let cfg = ScanConfig {
        max_addresses: 16,
        ..tcp_config(9)
    };
    let targets = to_targets(&["10.255.0.0/24"]).unwrap();
    let progress = Arc::new(ScanProgress::new());

    let result = scanner::scan(
        &targets,
        &cfg,
        prober_for(&cfg),
        Arc::new(NoResolver),
        progress.clone(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ScanError::TargetLimitExceeded { requested: 254, limit: 16 })
    ));
    assert_eq!(progress.probed(), 0);
}
