// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::path::Path;

use anyhow::{Context, bail};
use arbor_common::config::Config;
use arbor_common::models::address::DeclaredNetwork;
use arbor_common::error;
use arbor_core::parser::{self, RoutingTable, Vendor};
use colored::*;

use crate::aprint;
use crate::commands::ParseArgs;
use crate::terminal::colors;
use crate::terminal::print::{Print, aligned_line, cidr_colored};

pub fn parse(args: &ParseArgs, cfg: &Config) -> anyhow::Result<()> {
    let mut failures = 0;

    for path in &args.files {
        match read_table(path, args.vendor) {
            Ok(table) => print_table(&table, cfg.quiet),
            Err(e) => {
                error!("{e:#}");
                failures += 1;
            }
        }
    }

    if failures == args.files.len() {
        bail!("none of the {failures} files could be read as a routing table");
    }
    Ok(())
}

/// Reads and parses one routing table file.
pub fn read_table(path: &Path, vendor: Option<Vendor>) -> anyhow::Result<RoutingTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read routing table '{}'", path.display()))?;
    let table = parser::parse(&text, &path.display().to_string(), vendor)?;
    Ok(table)
}

fn print_table(table: &RoutingTable, quiet: u8) {
    if quiet > 1 {
        for network in &table.networks {
            aprint!("{}", network.cidr);
        }
        for host in &table.hosts {
            aprint!("{}", host.ip);
        }
        return;
    }

    Print::header(&format!("{} ({})", table.source, table.vendor));
    for network in &table.networks {
        network_line(network);
    }
    if !table.hosts.is_empty() {
        let hosts: Vec<String> = table.hosts.iter().map(|h| h.ip.to_string()).collect();
        aligned_line("Host routes", hosts.join(", "));
    }
}

fn network_line(network: &DeclaredNetwork) {
    let mut details = Vec::new();
    if let Some(hint) = network.hint {
        details.push(format!("{hint:?}").to_lowercase().color(colors::SECONDARY).to_string());
    }
    if let Some(provenance) = &network.provenance {
        if let Some(protocol) = &provenance.protocol {
            details.push(protocol.color(colors::TEXT_DEFAULT).to_string());
        }
        if let Some(hop) = provenance.next_hop {
            details.push(format!("via {hop}").color(colors::SEPARATOR).to_string());
        }
        if let Some(interface) = &provenance.interface {
            details.push(interface.color(colors::PRIMARY).to_string());
        }
    }
    aprint!(
        " {} {} {}",
        "•".bright_black(),
        cidr_colored(&network.cidr),
        details.join(" ")
    );
}
