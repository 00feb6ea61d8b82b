// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Thin layer over `tracing` shared by every crate in the workspace.
//!
//! Each macro tags the event with a `status` field that the CLI formatter
//! turns into a symbol. Callers may add `verbosity = N` to hide an event
//! unless the user asked for at least `N` levels of `-v`.
//!
//! ```ignore
//! info!(verbosity = 1, "grouped {count} addresses under {base}");
//! warn!("line {no} skipped");
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __status_event {
    ($level:ident, $status:literal, $($arg:tt)+) => {
        tracing::$level!(status = $status, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__status_event!(info, "info", $($arg)+) };
}

/// Same level as [`info!`], rendered as a completed step.
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => { $crate::__status_event!(info, "success", $($arg)+) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__status_event!(debug, "debug", $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__status_event!(warn, "warn", $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__status_event!(error, "error", $($arg)+) };
}
