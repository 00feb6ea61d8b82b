// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arbor_common::config::{ProbeMethod, ScanConfig};
use arbor_common::debug;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

/// Decides whether a single address is alive.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Round-trip time when the address answered, `None` otherwise.
    async fn probe(&self, ip: IpAddr) -> Option<Duration>;
}

/// Builds the prober selected in `cfg`.
pub fn prober_for(cfg: &ScanConfig) -> Arc<dyn Prober> {
    match cfg.probe {
        ProbeMethod::Ping => Arc::new(PingProber::new(cfg.probe_timeout)),
        ProbeMethod::Tcp => Arc::new(TcpProber::new(cfg.tcp_ports.clone(), cfg.probe_timeout)),
    }
}

/// One echo request through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProber {
    wait_secs: u64,
}

impl PingProber {
    /// `ping -W` takes whole seconds, so anything below one rounds up.
    pub fn new(probe_timeout: Duration) -> Self {
        let mut wait_secs = probe_timeout.as_secs();
        if probe_timeout.subsec_nanos() > 0 || wait_secs == 0 {
            wait_secs += 1;
        }
        Self { wait_secs }
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, ip: IpAddr) -> Option<Duration> {
        let mut cmd = Command::new("ping");
        if ip.is_ipv6() {
            cmd.arg("-6");
        }
        cmd.args(["-c", "1", "-W"])
            .arg(self.wait_secs.to_string())
            .arg(ip.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let start = Instant::now();
        match cmd.status().await {
            Ok(status) if status.success() => Some(start.elapsed()),
            Ok(_) => None,
            Err(e) => {
                debug!("Could not run ping for {ip}: {e}");
                None
            }
        }
    }
}

/// Unprivileged TCP handshake against a list of ports.
///
/// A refused connection still means a host answered. Unreachable errors and
/// timeouts mean nobody did.
#[derive(Debug, Clone)]
pub struct TcpProber {
    ports: Vec<u16>,
    port_timeout: Duration,
}

impl TcpProber {
    pub fn new(ports: Vec<u16>, probe_timeout: Duration) -> Self {
        let ports = if ports.is_empty() { vec![443] } else { ports };
        let per_port = probe_timeout / u32::try_from(ports.len()).unwrap_or(u32::MAX);
        Self {
            ports,
            port_timeout: per_port,
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, ip: IpAddr) -> Option<Duration> {
        for port in &self.ports {
            let socket_addr = SocketAddr::new(ip, *port);
            let start = Instant::now();
            match timeout(self.port_timeout, TcpStream::connect(socket_addr)).await {
                Ok(Ok(_)) => return Some(start.elapsed()),
                Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                    return Some(start.elapsed());
                }
                Ok(Err(e)) => debug!("{socket_addr}: {e}"),
                Err(_elapsed) => {}
            }
        }
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
