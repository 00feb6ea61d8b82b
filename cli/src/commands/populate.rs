// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! `arbor populate`: every source in, one hierarchy out.
//!
//! Inventories and routing tables are loaded first. With `--scan`, the base
//! networks they reveal are probed and the responders join the input. The
//! merged input then goes through inference and matching, and the snapshot is
//! printed and optionally written to disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use arbor_common::config::Config;
use arbor_common::{info, success, warn};
use arbor_core::matcher::Resolution;
use arbor_core::population::Population;
use arbor_core::scanner;
use arbor_core::sources::{
    AddressSource, InventorySource, RoutingSource, ScanSource, SourceBatch, merge,
};

use crate::aprint;
use crate::commands::parse::read_table;
use crate::commands::{CommandLine, PopulateArgs, scan};
use crate::terminal::print::Print;

pub async fn populate(args: &PopulateArgs, cmd: &CommandLine, cfg: &Config) -> anyhow::Result<()> {
    let (mut inference, mut scan_cfg) = cmd.settings()?;
    args.apply(&mut inference)?;
    args.scan_flags.apply(&mut scan_cfg);

    if args.inventory.is_empty() && args.routing_tables.is_empty() {
        warn!("No inventory or routing table given, the hierarchy can only come from a scan");
    }

    let start_time = Instant::now();
    let mut population = Population::new(&inference);
    let mut batches: Vec<SourceBatch> = Vec::new();

    for path in &args.inventory {
        match load_inventory(path) {
            Ok(batch) => batches.push(batch),
            Err(e) => population.add_failure(&path.display().to_string(), format!("{e:#}")),
        }
    }
    let resolver = scan::name_resolver(&scan_cfg, cfg);
    for path in &args.routing_tables {
        match read_table(path, args.vendor) {
            Ok(table) => {
                let mut source = RoutingSource::new(table);
                source
                    .resolve_names(Arc::clone(&resolver), scan_cfg.probe_timeout)
                    .await;
                batches.push(source.collect()?);
            }
            Err(e) => population.add_failure(&path.display().to_string(), format!("{e:#}")),
        }
    }

    if args.scan {
        let plan = scanner::scan_plan(&merge(batches.clone()), &inference, &scan_cfg);
        for skipped in &plan.skipped {
            population.add_failure(
                "scan",
                format!("{skipped} exceeds the scan limit, pass --yes to probe it"),
            );
        }
        if plan.targets.is_empty() {
            warn!("Nothing to scan, no IPv4 base network holds a known address");
        } else {
            Print::header("probing base networks");
            let hits = scan::probe(&plan.targets, &scan_cfg, cfg).await?;
            batches.push(ScanSource::new(hits).collect()?);
        }
    }

    for batch in batches {
        population.add_batch(batch);
    }
    let outcome = population.run()?;
    let snapshot = &outcome.snapshot;

    if let Some(path) = &args.output {
        write_snapshot(path, &snapshot.to_json()?)?;
    }

    if cfg.quiet > 1 {
        if args.output.is_none() {
            aprint!("{}", snapshot.to_json()?);
        }
        return Ok(());
    }

    if snapshot.subnets.is_empty() {
        info!("No subnets could be inferred from the input");
    } else {
        Print::header("subnet hierarchy");
        Print::hierarchy(snapshot);
        Print::breakdown(&snapshot.breakdown);
    }
    Print::issues(&snapshot.issues);
    Print::summary(&snapshot.summary, snapshot.issues.len(), start_time.elapsed());

    let unresolved = snapshot
        .declared
        .iter()
        .filter(|d| d.resolution == Resolution::Unresolved)
        .count();
    if unresolved > 0 {
        info!(verbosity = 1, "{unresolved} declared networks sit outside the hierarchy");
    }
    Ok(())
}

fn load_inventory(path: &Path) -> anyhow::Result<SourceBatch> {
    InventorySource::from_path(path)?.collect()
}

fn write_snapshot(path: &Path, json: &str) -> anyhow::Result<()> {
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to '{}'", path.display()))?;
    success!("Snapshot written to {}", path.display());
    Ok(())
}
