// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::Instant;

use arbor_common::config::{Config, ScanConfig};
use arbor_common::models::target::{self, ScanTargets};
use arbor_common::{error, warn};
use arbor_core::scanner::{
    self, DnsResolver, NameResolver, NoResolver, ScanHit, ScanProgress, prober_for,
};
use colored::*;
use tracing::info_span;

use crate::aprint;
use crate::commands::{CommandLine, ScanArgs};
use crate::terminal::colors;
use crate::terminal::print::{Print, divider, centerln};
use crate::terminal::spinner::SpinnerGuard;

pub async fn scan(args: &ScanArgs, cmd: &CommandLine, cfg: &Config) -> anyhow::Result<()> {
    let (_, mut scan_cfg) = cmd.settings()?;
    args.scan_flags.apply(&mut scan_cfg);

    let targets = target::to_targets(&args.targets)?;
    Print::header("probing targets");

    let start_time = Instant::now();
    let mut hits = probe(&targets, &scan_cfg, cfg).await?;
    hits.sort_by_key(|hit| hit.ip);

    if hits.is_empty() {
        error!("Scan completed: 0 addresses responded.");
        return Ok(());
    }

    Print::header("responders");
    for (idx, hit) in hits.iter().enumerate() {
        print_hit(idx, hit, cfg.quiet);
    }

    if cfg.quiet == 0 {
        let total = format!("{} of {}", hits.len(), targets.len()).bold().green();
        let time = format!("{:.2}s", start_time.elapsed().as_secs_f64()).bold().yellow();
        divider();
        centerln(&format!("Scan complete: {total} addresses answered in {time}"));
    }
    Ok(())
}

/// Runs the scanner behind a spinner. Shared with `populate --scan`.
pub async fn probe(
    targets: &ScanTargets,
    scan_cfg: &ScanConfig,
    cfg: &Config,
) -> anyhow::Result<Vec<ScanHit>> {
    let prober = prober_for(scan_cfg);
    let resolver = name_resolver(scan_cfg, cfg);
    let progress = Arc::new(ScanProgress::new());

    let _guard = run_spinner(Arc::clone(&progress));
    let hits = scanner::scan(targets, scan_cfg, prober, resolver, progress).await?;
    Ok(hits)
}

pub fn name_resolver(scan_cfg: &ScanConfig, cfg: &Config) -> Arc<dyn NameResolver> {
    if cfg.no_dns || !scan_cfg.resolve_names {
        return Arc::new(NoResolver);
    }
    match DnsResolver::from_system() {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            warn!("Reverse DNS disabled, no usable resolver configuration: {e}");
            Arc::new(NoResolver)
        }
    }
}

fn run_spinner(progress: Arc<ScanProgress>) -> SpinnerGuard {
    let span = info_span!("scan", indicatif.pb_show = true);
    let _enter = span.enter();

    SpinnerGuard::with_status(span.clone(), move || {
        let responded = progress.responded().to_string().green().bold();
        format!(
            "Probed {}/{} addresses, {} alive so far...",
            progress.probed(),
            progress.total(),
            responded
        )
        .color(colors::TEXT_DEFAULT)
        .italic()
    })
}

fn print_hit(idx: usize, hit: &ScanHit, quiet: u8) {
    if quiet > 1 {
        aprint!("{}", hit.ip);
        return;
    }
    let name = hit
        .name
        .as_deref()
        .map(|n| n.color(colors::HOSTNAME).to_string())
        .unwrap_or_default();
    aprint!(
        "{} {} {} {}",
        format!("[{}]", idx.to_string().color(colors::ACCENT)).color(colors::SEPARATOR),
        format!("{:<40}", hit.ip.to_string()).color(colors::PRIMARY),
        format!("⌛ {}ms", hit.rtt.as_millis()).color(colors::SECONDARY),
        name
    );
}
