// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Concurrent reachability scanning.
//!
//! A scan walks a [`ScanTargets`] list and probes every address through a
//! [`Prober`], with at most `concurrency` probes in flight. Responders are
//! optionally named through a [`NameResolver`] and streamed back over a channel.
//!
//! - **Bounded**: a semaphore permit is taken *before* each task is spawned.
//! - **Guarded**: oversized target lists are refused unless confirmed.
//! - **Best effort**: silence and failed lookups are absence, never errors.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arbor_common::config::{InferenceConfig, ScanConfig};
use arbor_common::error::ScanError;
use arbor_common::models::address::Origin;
use arbor_common::models::cidr::Cidr;
use arbor_common::models::target::ScanTargets;
use arbor_common::{debug, error, info, success, warn};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::timeout;

mod prober;
mod resolver;

pub use prober::{PingProber, Prober, TcpProber, prober_for};
pub use resolver::{DnsResolver, NameResolver, NoResolver};

use crate::sources::MergedInput;

/// Slack on top of the probe timeout for process start-up and teardown.
const PROBE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit {
    pub ip: IpAddr,
    pub name: Option<String>,
    pub rtt: Duration,
}

/// Live counters a front end can poll while a scan runs.
#[derive(Debug, Default)]
pub struct ScanProgress {
    total: AtomicU64,
    probed: AtomicU64,
    responded: AtomicU64,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn probed(&self) -> u64 {
        self.probed.load(Ordering::Relaxed)
    }

    pub fn responded(&self) -> u64 {
        self.responded.load(Ordering::Relaxed)
    }
}

/// Checks the safety limit without probing anything.
pub fn check_limit(targets: &ScanTargets, cfg: &ScanConfig) -> Result<u128, ScanError> {
    if cfg.concurrency == 0 {
        return Err(ScanError::InvalidConcurrency);
    }
    let requested = targets.len();
    let limit = u128::from(cfg.max_addresses);
    if requested > limit && !cfg.confirmed {
        return Err(ScanError::TargetLimitExceeded { requested, limit });
    }
    Ok(requested)
}

/// Probes every target and returns the responders in no particular order.
pub async fn scan(
    targets: &ScanTargets,
    cfg: &ScanConfig,
    prober: Arc<dyn Prober>,
    resolver: Arc<dyn NameResolver>,
    progress: Arc<ScanProgress>,
) -> Result<Vec<ScanHit>, ScanError> {
    let requested = check_limit(targets, cfg)?;
    progress
        .total
        .store(u64::try_from(requested).unwrap_or(u64::MAX), Ordering::Relaxed);
    info!(
        "Probing {requested} addresses, {} at a time",
        cfg.concurrency
    );

    let permits = Arc::new(Semaphore::new(cfg.concurrency));
    let (tx, mut rx) = mpsc::unbounded_channel::<ScanHit>();
    let mut tasks: JoinSet<()> = JoinSet::new();

    let probe_limit = cfg.probe_timeout + PROBE_GRACE;
    let lookup_limit = cfg.probe_timeout;
    let resolve = cfg.resolve_names;

    for ip in targets.iter() {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScanError::PoolClosed)?;

        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                error!("Probe task failed: {e}");
            }
        }

        let prober = Arc::clone(&prober);
        let resolver = Arc::clone(&resolver);
        let progress = Arc::clone(&progress);
        let tx = tx.clone();

        tasks.spawn(async move {
            let _permit = permit;
            let rtt = timeout(probe_limit, prober.probe(ip)).await.ok().flatten();
            progress.probed.fetch_add(1, Ordering::Relaxed);

            let Some(rtt) = rtt else {
                return;
            };
            progress.responded.fetch_add(1, Ordering::Relaxed);

            let name = if resolve {
                timeout(lookup_limit, resolver.reverse(ip))
                    .await
                    .ok()
                    .flatten()
            } else {
                None
            };
            debug!("{ip} answered in {rtt:?}");
            let _ = tx.send(ScanHit { ip, name, rtt });
        });
    }
    drop(tx);

    while let Some(finished) = tasks.join_next().await {
        if let Err(e) = finished {
            error!("Probe task failed: {e}");
        }
    }

    let mut hits = Vec::new();
    while let Some(hit) = rx.recv().await {
        hits.push(hit);
    }

    success!("{} of {requested} addresses responded", hits.len());
    Ok(hits)
}

/// What `scan_plan` decided to probe.
#[derive(Debug, Default)]
pub struct ScanPlan {
    pub targets: ScanTargets,
    /// Blocks left out because a single one exceeds the scan limit.
    pub skipped: Vec<Cidr>,
}

/// IPv4 networks worth scanning for a given input.
///
/// Every base network that already holds an address, plus every
/// routing-table network exactly as long as the base mask. Flat networks are
/// scanned like any other block. IPv6 bases are never planned, and a block
/// whose usable hosts alone exceed `max_addresses` is skipped unless the scan
/// was confirmed.
pub fn scan_plan(input: &MergedInput, cfg: &InferenceConfig, scan: &ScanConfig) -> ScanPlan {
    let mut bases: Vec<Cidr> = input
        .addresses
        .iter()
        .filter(|a| a.ip.is_ipv4())
        .filter(|a| !(cfg.exclude_loopback && a.ip.is_loopback()))
        .filter_map(|a| Cidr::new(a.ip, cfg.policy_for(&a.ip).base_prefix).ok())
        .collect();

    bases.extend(
        input
            .networks
            .iter()
            .filter(|n| n.origin == Origin::RoutingTable && n.cidr.is_ipv4())
            .filter(|n| n.cidr.prefix_len() == cfg.policy_for(&n.cidr.network()).base_prefix)
            .filter(|n| !n.cidr.is_loopback())
            .map(|n| n.cidr),
    );

    bases.sort();
    bases.dedup();

    let limit = u128::from(scan.max_addresses);
    let mut plan = ScanPlan::default();
    for base in bases {
        if base.usable_addresses() > limit && !scan.confirmed {
            warn!("Not scanning {base}, it alone exceeds the limit of {limit} addresses");
            plan.skipped.push(base);
        } else {
            plan.targets.add_network(base);
        }
    }
    plan.targets.compact();
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
