// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use arbor_common::debug;
use arbor_common::models::address::Origin;
use arbor_common::models::cidr::Cidr;

use super::partition::Members;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub cidr: Cidr,
    pub members: Members,
}

impl Candidate {
    pub fn origins(&self) -> BTreeSet<Origin> {
        self.members.values().copied().collect()
    }
}

/// Looks for subdivisions of one base network.
///
/// `masks` must be sorted most specific first. Members consumed by a finer
/// subnet are invisible to coarser masks, and a coarser group that would
/// swallow an accepted subnet is dropped, keeping the result one level deep.
pub(crate) fn subdivide(
    base: &Cidr,
    members: &Members,
    masks: &[u8],
    min_members: usize,
) -> Vec<Candidate> {
    let mut accepted: Vec<Candidate> = Vec::new();
    let mut consumed: BTreeSet<IpAddr> = BTreeSet::new();

    for &mask in masks {
        let mut groups: BTreeMap<Cidr, Members> = BTreeMap::new();
        for (ip, origin) in members.iter().filter(|(ip, _)| !consumed.contains(*ip)) {
            let Ok(block) = Cidr::new(*ip, mask) else {
                continue;
            };
            groups.entry(block).or_default().insert(*ip, *origin);
        }

        for (cidr, group) in groups {
            if group.len() < min_members {
                continue;
            }
            if let Some(inner) = accepted.iter().find(|c| cidr.strictly_contains(&c.cidr)) {
                debug!(
                    "Rejecting {cidr} inside {base}, it would contain accepted {}",
                    inner.cidr
                );
                continue;
            }
            debug!("Accepting {cidr} inside {base} with {} members", group.len());
            consumed.extend(group.keys().copied());
            accepted.push(Candidate {
                cidr,
                members: group,
            });
        }
    }

    accepted.sort_by_key(|c| c.cidr);
    accepted
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
