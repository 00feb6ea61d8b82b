// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Population
//!
//! One full run: merge the sources, infer the tree, bind every address and
//! capture the result as a [`Snapshot`].
//!
//! Sources that fail to load are recorded and skipped. Only a structural
//! conflict in the tree stops the run.

use arbor_common::config::InferenceConfig;
use arbor_common::error::InferenceError;
use arbor_common::{error, info};

use crate::inference::infer;
use crate::matcher::{bind, resolve_network};
use crate::snapshot::{DeclaredResolution, Issues, Snapshot, SourceIssue};
use crate::sources::{AddressSource, SourceBatch, merge};
use crate::tree::SubnetTree;

#[derive(Debug, Clone)]
pub struct Outcome {
    pub tree: SubnetTree,
    pub snapshot: Snapshot,
}

pub struct Population<'a> {
    cfg: &'a InferenceConfig,
    previous: Option<&'a SubnetTree>,
    batches: Vec<SourceBatch>,
    failures: Vec<SourceIssue>,
}

impl<'a> Population<'a> {
    pub fn new(cfg: &'a InferenceConfig) -> Self {
        Self {
            cfg,
            previous: None,
            batches: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Grows the tree of an earlier run instead of starting from nothing.
    pub fn with_previous(mut self, tree: &'a SubnetTree) -> Self {
        self.previous = Some(tree);
        self
    }

    pub fn add_batch(&mut self, batch: SourceBatch) {
        self.batches.push(batch);
    }

    /// Collects `source` now. A failure is recorded, not returned.
    pub fn add_source(&mut self, source: &dyn AddressSource) {
        match source.collect() {
            Ok(batch) => self.add_batch(batch),
            Err(e) => self.add_failure(source.name(), format!("{e:#}")),
        }
    }

    /// Records an input that never made it to a batch (unreadable file, unknown format).
    pub fn add_failure(&mut self, source: &str, message: impl Into<String>) {
        let message = message.into();
        error!("{source}: {message}");
        self.failures.push(SourceIssue {
            source: source.to_string(),
            message,
        });
    }

    pub fn run(self) -> Result<Outcome, InferenceError> {
        let merged = merge(self.batches);
        info!(
            "Merged input: {} addresses, {} declared networks",
            merged.addresses.len(),
            merged.networks.len()
        );

        let inference = infer(&merged.addresses, &merged.networks, self.cfg, self.previous)?;
        let mut tree = inference.tree;

        let bindable: Vec<_> = merged
            .addresses
            .iter()
            .filter(|a| !(self.cfg.exclude_loopback && a.ip.is_loopback()))
            .cloned()
            .collect();
        let report = bind(&mut tree, &bindable);

        let declared = merged
            .networks
            .iter()
            .map(|network| DeclaredResolution {
                cidr: network.cidr,
                origin: network.origin,
                hint: network.hint,
                resolution: resolve_network(&tree, &network.cidr),
            })
            .collect();

        let issues = Issues {
            unassigned: inference.unassigned,
            unmatched: report.unmatched,
            skipped: inference.skipped,
            malformed: merged.malformed,
            sources: self.failures,
        };

        let snapshot = Snapshot::capture(
            &tree,
            declared,
            issues,
            merged.addresses.len(),
            inference.excluded_loopback,
        );
        Ok(Outcome { tree, snapshot })
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
