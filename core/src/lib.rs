// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

pub mod inference;
pub mod matcher;
pub mod parser;
pub mod population;
pub mod scanner;
pub mod snapshot;
pub mod sources;
pub mod tree;
