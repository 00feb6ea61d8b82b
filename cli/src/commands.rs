// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Command Line Interface Definitions
//!
//! The schema for everything a user can type. Execution lives in the
//! submodules; flags, help text and their translation into configuration
//! live here.
//!
//! Settings are layered: built-in defaults, then the `--config` file, then
//! the flags of the running command. [`CommandLine::settings`] produces the
//! first two layers and each `apply` method adds the last one.

pub mod parse;
pub mod populate;
pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use arbor_common::config::{Config, FileConfig, InferenceConfig, ProbeMethod, ScanConfig};
use arbor_common::models::cidr::Cidr;
use arbor_common::{debug, info};
use arbor_core::parser::Vendor;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Infers a subnet hierarchy from inventories, routing tables and scans.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Keep logs and colors but hide the banner
    #[arg(long = "no-banner", global = true)]
    pub no_banner: bool,

    /// Skip reverse DNS lookups for scan responders
    #[arg(short = 'n', long = "no-dns", global = true)]
    pub no_dns: bool,

    /// Reduce UI visual density (-q: summaries only, -qq: raw output)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Increase logging detail (-v: grouping decisions, -vv: per-address)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// TOML file with [inference] and [scan] settings
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the subnet hierarchy from every given source
    #[command(alias = "p")]
    Populate(PopulateArgs),

    /// Read routing tables and list what they declare
    #[command(alias = "r")]
    Parse(ParseArgs),

    /// Probe targets and list the responders
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args)]
pub struct PopulateArgs {
    /// Inventory export (JSON)
    #[arg(short = 'i', long = "inventory", value_name = "FILE")]
    pub inventory: Vec<PathBuf>,

    /// Routing table text (`show ip route` / `show route`)
    #[arg(short = 'r', long = "routing-table", value_name = "FILE")]
    pub routing_tables: Vec<PathBuf>,

    /// Vendor of every routing table, instead of detecting it
    #[arg(long = "vendor", value_name = "VENDOR")]
    pub vendor: Option<Vendor>,

    /// Probe the populated base networks and add the responders
    #[arg(long = "scan")]
    pub scan: bool,

    #[command(flatten)]
    pub scan_flags: ScanFlags,

    /// Network that is never subdivided
    #[arg(long = "flat", value_name = "CIDR")]
    pub flat: Vec<Cidr>,

    /// Known prefix (top-level block)
    #[arg(long = "prefix", value_name = "CIDR")]
    pub prefix: Vec<Cidr>,

    /// IPv4 base network length
    #[arg(long = "base-mask", value_name = "N")]
    pub base_mask: Option<u8>,

    /// Where to write the snapshot JSON
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ParseArgs {
    #[arg(value_name = "FILE", num_args(1..), required = true)]
    pub files: Vec<PathBuf>,

    /// Vendor of every file, instead of detecting it
    #[arg(long = "vendor", value_name = "VENDOR")]
    pub vendor: Option<Vendor>,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Addresses, ranges (10.0.0.1-20) or networks (10.0.0.0/24)
    #[arg(value_name = "TARGETS", num_args(1..), required = true)]
    pub targets: Vec<String>,

    #[command(flatten)]
    pub scan_flags: ScanFlags,
}

/// Scanner flags shared by `populate --scan` and `scan`.
#[derive(Args)]
pub struct ScanFlags {
    /// Probes in flight at once
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Per-probe timeout in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Liveness check: ping or tcp
    #[arg(long = "probe", value_name = "METHOD")]
    pub probe: Option<ProbeMethod>,

    /// Go ahead with scans larger than the safety limit
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Defaults overlaid with the `--config` file, if any.
    pub fn settings(&self) -> anyhow::Result<(InferenceConfig, ScanConfig)> {
        let mut inference = InferenceConfig::default();
        let mut scan = ScanConfig::default();

        if let Some(path) = &self.config {
            let file = FileConfig::load(path)?;
            file.apply(&mut inference, &mut scan);
            info!("Loaded settings from {}", path.display());
        }
        if self.no_dns {
            scan.resolve_names = false;
        }
        Ok((inference, scan))
    }
}

impl ScanFlags {
    pub fn apply(&self, scan: &mut ScanConfig) {
        if let Some(workers) = self.workers {
            scan.concurrency = workers;
        }
        if let Some(ms) = self.timeout_ms {
            scan.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(probe) = self.probe {
            scan.probe = probe;
        }
        scan.confirmed |= self.yes;
        debug!(
            verbosity = 1,
            "Scan settings: {} workers, {:?} timeout, {} probe",
            scan.concurrency,
            scan.probe_timeout,
            scan.probe
        );
    }
}

impl PopulateArgs {
    pub fn apply(&self, inference: &mut InferenceConfig) -> anyhow::Result<()> {
        inference.flat_networks.extend(self.flat.iter().copied());
        inference.prefixes.extend(self.prefix.iter().copied());
        if let Some(base) = self.base_mask {
            inference.ipv4.base_prefix = base;
        }
        inference.validate().context("Invalid inference settings")
    }
}

impl From<&CommandLine> for Config {
    fn from(cmd: &CommandLine) -> Self {
        Self {
            no_banner: cmd.no_banner,
            no_dns: cmd.no_dns,
            quiet: cmd.quiet,
        }
    }
}
