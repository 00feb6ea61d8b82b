// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::net::IpAddr;

use arbor_common::config::InferenceConfig;
use arbor_common::error::InferenceError;
use arbor_common::models::address::{Address, Origin};
use arbor_common::models::cidr::{self, Cidr};
use arbor_common::{debug, warn};

/// Members of one group with the strongest origin each was reported by.
pub(crate) type Members = BTreeMap<IpAddr, Origin>;

#[derive(Debug, Default)]
pub(crate) struct Partition {
    pub flats: BTreeMap<Cidr, Members>,
    pub bases: BTreeMap<Cidr, Members>,
    pub excluded_loopback: usize,
}

/// Groups every address under its flat network, or failing that, its base network.
///
/// Only `cfg.flat_networks` count as flat. A declared network hinted as
/// loopback or management is still subdivided unless it is also configured.
pub(crate) fn partition(
    addresses: &[Address],
    cfg: &InferenceConfig,
) -> Result<Partition, InferenceError> {
    let flats = disjoint_flats(&cfg.flat_networks)?;
    let mut out = Partition::default();

    for address in addresses {
        let ip = address.ip;
        if cfg.exclude_loopback && ip.is_loopback() {
            debug!("Skipping loopback address {ip}");
            out.excluded_loopback += 1;
            continue;
        }

        let group = match flats.iter().find(|flat| flat.contains_addr(&ip)) {
            Some(flat) => out.flats.entry(*flat).or_default(),
            None => {
                let base_len = cfg.policy_for(&ip).base_prefix;
                let base = match Cidr::new(ip, base_len.min(cidr::max_prefix_len(&ip))) {
                    Ok(base) => base,
                    Err(e) => {
                        warn!("Cannot group {ip}: {e}");
                        continue;
                    }
                };
                out.bases.entry(base).or_default()
            }
        };

        group
            .entry(ip)
            .and_modify(|origin| *origin = (*origin).min(address.origin))
            .or_insert(address.origin);
    }

    Ok(out)
}

fn disjoint_flats(flats: &[Cidr]) -> Result<Vec<Cidr>, InferenceError> {
    let mut sorted = flats.to_vec();
    sorted.sort();
    sorted.dedup();
    for pair in sorted.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(InferenceError::OverlapConflict {
                first: pair[0],
                second: pair[1],
            });
        }
    }
    Ok(sorted)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
