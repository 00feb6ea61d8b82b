// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::net::IpAddr;

use arbor_common::debug;
use async_trait::async_trait;
use hickory_resolver::TokioResolver;

/// Reverse name lookup. Failures are `None`, never errors.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn reverse(&self, ip: IpAddr) -> Option<String>;
}

/// PTR lookups through the system's configured name servers.
pub struct DnsResolver {
    inner: TokioResolver,
}

impl DnsResolver {
    pub fn from_system() -> anyhow::Result<Self> {
        let inner = TokioResolver::builder_tokio()?.build();
        Ok(Self { inner })
    }
}

#[async_trait]
impl NameResolver for DnsResolver {
    async fn reverse(&self, ip: IpAddr) -> Option<String> {
        let lookup = match self.inner.reverse_lookup(ip).await {
            Ok(lookup) => lookup,
            Err(e) => {
                debug!("No PTR record for {ip}: {e}");
                return None;
            }
        };
        let name = lookup.iter().next()?.0.to_utf8();
        let name = name.trim_end_matches('.');
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// Used when name resolution is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

#[async_trait]
impl NameResolver for NoResolver {
    async fn reverse(&self, _ip: IpAddr) -> Option<String> {
        None
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
