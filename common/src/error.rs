// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Error Kinds
//!
//! Two families live here:
//!
//! * **Fatal** errors ([`ParseError`], [`InferenceError`], [`ScanError`], ...)
//!   are returned through `Result` and stop the operation they belong to.
//! * **Per-item** errors ([`MalformedLineError`], [`UnassignedSupernetError`],
//!   [`NoContainingSubnetError`]) are collected into reports so an operator
//!   sees every problem of a run at once.

use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;

use crate::models::cidr::Cidr;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrError {
    #[error("'{0}' is not an IP address")]
    Address(String),

    #[error("prefix length /{prefix_len} exceeds the maximum of /{max}")]
    PrefixLength { prefix_len: u8, max: u8 },

    #[error("'{0}' is not in address/length notation")]
    Syntax(String),
}

/// Raised once per routing-table input; other inputs keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{source_name}' does not look like Cisco or Juniper routing table output")]
    UnrecognizedFormat { source_name: String },
}

/// A route-shaped line that could not be read. The line is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line_no}: {reason} ({line:?})")]
pub struct MalformedLineError {
    pub line_no: usize,
    pub line: String,
    pub reason: String,
}

/// A top-level network for which no prefix could be found.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{cidr} is not inside any known prefix")]
pub struct UnassignedSupernetError {
    pub cidr: Cidr,
}

/// An address the matcher could not place in any subnet.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("no subnet contains {address}")]
pub struct NoContainingSubnetError {
    pub address: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    /// Two nodes of the tree would overlap without nesting legally.
    /// The tree is unusable, so the run stops here.
    #[error("subnet {first} conflicts with {second}")]
    OverlapConflict { first: Cidr, second: Cidr },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error(
        "refusing to probe {requested} addresses (limit is {limit}); confirm the scan to go ahead"
    )]
    TargetLimitExceeded { requested: u128, limit: u128 },

    #[error("scan concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("probe pool closed unexpectedly")]
    PoolClosed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("base prefix /{base} is out of range for {family}")]
    BasePrefix { base: u8, family: &'static str },
}
