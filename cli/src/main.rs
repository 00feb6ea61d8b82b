// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Arbor CLI Entry Point
//!
//! Bootstraps the runtime and owns the process lifecycle:
//!
//! 1.  **Logging**: installs the `tracing` subscriber before anything else runs.
//! 2.  **Configuration**: maps the parsed flags onto [`Config`] and loads the
//!     optional TOML file for the command that needs it.
//! 3.  **Dispatch**: hands over to the matching module in `commands/`.
//! 4.  **Error boundary**: anything a command propagates is logged here and
//!     turned into a non-zero [`ExitCode`].

mod commands;
mod terminal;

use std::process::ExitCode;

use arbor_common::{config::Config, error};

use crate::{
    commands::{CommandLine, Commands, parse, populate, scan},
    terminal::{print::Print, spinner},
};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();
    spinner::init_logging(commands.verbosity);

    let cfg = Config::from(&commands);

    let _ = Print::init(&cfg);
    Print::banner();

    let result = match &commands.command {
        Commands::Populate(args) => populate::populate(args, &commands, &cfg).await,
        Commands::Parse(args) => parse::parse(args, &cfg),
        Commands::Scan(args) => scan::scan(args, &commands, &cfg).await,
    };

    let exit_code = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Critical failure: {e:#}");
            ExitCode::FAILURE
        }
    };

    Print::end_of_program();

    exit_code
}
