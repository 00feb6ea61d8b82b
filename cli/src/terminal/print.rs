// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::bail;
use arbor_common::config::Config;
use arbor_common::models::address::Address;
use arbor_common::models::cidr::Cidr;
use arbor_common::success;
use arbor_core::snapshot::{Issues, Snapshot, SubnetView, Summary};
use arbor_core::tree::NodeKind;
use colored::*;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;

/// Width the keys of [`aligned_line`] are padded to.
const KEY_WIDTH: usize = 12;

static PRINT: OnceLock<Print> = OnceLock::new();

#[macro_export]
macro_rules! aprint {
    () => {
        $crate::aprint!("");
    };
    ($($arg:tt)*) => {
        tracing::info!(
            target: "arbor::print",
            raw_msg = %format_args!($($arg)*)
        );
    };
}

pub struct Print {
    no_banner: bool,
    q_level: u8,
}

impl Print {
    fn new(cfg: &Config) -> Self {
        Self {
            no_banner: cfg.no_banner,
            q_level: cfg.quiet,
        }
    }

    pub fn init(cfg: &Config) -> anyhow::Result<()> {
        if PRINT.set(Self::new(cfg)).is_err() {
            bail!("terminal has already been initialized")
        }
        Ok(())
    }

    fn get() -> &'static Self {
        PRINT.get_or_init(|| Self::new(&Config::default()))
    }

    pub fn quiet() -> u8 {
        Self::get().q_level
    }

    pub fn banner() {
        let p = Self::get();
        if p.no_banner || p.q_level > 0 {
            return;
        }

        let text_content = format!("⟦ ARBOR v{} ⟧ ", env!("CARGO_PKG_VERSION"));
        let text_width = UnicodeWidthStr::width(text_content.as_str());
        let text: ColoredString = text_content.bright_green().bold();
        let sep: ColoredString = "═"
            .repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2)
            .bright_black();

        aprint!("{}{}{}", sep, text, sep);
    }

    pub fn header(msg: &str) {
        if Self::get().q_level > 0 {
            return;
        }

        let formatted = format!("⟦ {} ⟧", msg);
        let dash_count = TOTAL_WIDTH.saturating_sub(formatted.chars().count());
        let left = dash_count / 2;
        let right = dash_count - left;

        let line: ColoredString = format!(
            "{}{}{}",
            "─".repeat(left),
            formatted.to_uppercase().bright_green(),
            "─".repeat(right)
        )
        .bright_black();

        aprint!("{}", line);
    }

    /// The tree under every prefix, one block per prefix.
    pub fn hierarchy(snapshot: &Snapshot) {
        let p = Self::get();
        let by_cidr: HashMap<Cidr, &SubnetView> =
            snapshot.subnets.iter().map(|s| (s.cidr, s)).collect();

        for (idx, prefix) in snapshot.prefixes.iter().enumerate() {
            let origin = if prefix.derived { "derived" } else { "configured" };
            aprint!(
                "{} {} {}",
                format!("[{}]", idx.to_string().color(colors::ACCENT)).color(colors::SEPARATOR),
                cidr_colored(&prefix.cidr).bold(),
                format!("({origin})").color(colors::SEPARATOR)
            );

            for (i, root) in prefix.roots.iter().enumerate() {
                if let Some(view) = by_cidr.get(root) {
                    let last = i + 1 == prefix.roots.len();
                    subnet_branch(view, &by_cidr, "", last, p.q_level == 0);
                }
            }
            if idx + 1 != snapshot.prefixes.len() {
                aprint!();
            }
        }
    }

    pub fn breakdown(breakdown: &BTreeMap<u8, usize>) {
        if Self::get().q_level > 0 || breakdown.is_empty() {
            return;
        }
        Self::header("subnets per length");
        for (len, count) in breakdown {
            let label = if *count == 1 { "subnet" } else { "subnets" };
            aligned_line(&format!("/{len}"), format!("{count} {label}"));
        }
    }

    pub fn issues(issues: &Issues) {
        if issues.is_empty() || Self::get().q_level > 1 {
            return;
        }
        Self::header("issues");
        for unassigned in &issues.unassigned {
            print_status(unassigned.to_string());
        }
        for unmatched in &issues.unmatched {
            print_status(unmatched.to_string());
        }
        for skipped in &issues.skipped {
            print_status(format!("{} skipped: {}", skipped.cidr, skipped.reason));
        }
        for malformed in &issues.malformed {
            print_status(format!("{}: {}", malformed.source, malformed.error));
        }
        for source in &issues.sources {
            print_status(format!("{}: {}", source.source, source.message));
        }
    }

    pub fn summary(summary: &Summary, issues: usize, total_time: Duration) {
        let p = Self::get();
        let subnets = format!("{} subnets", summary.subnets).bold().green();
        let bound = format!("{}/{} addresses", summary.bound, summary.addresses).bold().green();
        let total_time = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
        let output = format!("Population complete: {subnets} holding {bound} in {total_time}")
            .color(colors::TEXT_DEFAULT);

        match p.q_level {
            0 => {
                divider();
                centerln(&output);
                if issues > 0 {
                    centerln(&format!("{issues} issues reported").yellow().to_string());
                }
            }
            _ => success!("{output}"),
        }
    }

    pub fn end_of_program() {
        if Self::get().q_level > 0 {
            return;
        }
        aprint!("{}", "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR));
    }
}

fn subnet_branch(
    view: &SubnetView,
    by_cidr: &HashMap<Cidr, &SubnetView>,
    indent: &str,
    last: bool,
    with_addresses: bool,
) {
    let branch = if last { "└─" } else { "├─" }.bright_black();
    let mut line = format!(
        "{indent}{branch} {} {}",
        cidr_colored(&view.cidr),
        kind_label(view.kind)
    );
    if let Some(hint) = view.hint {
        line.push_str(&format!(" {}", format!("{hint:?}").to_lowercase().color(colors::SECONDARY)));
    }
    if !view.addresses.is_empty() {
        line.push_str(&format!(
            " {}",
            format!(
                "{} addr, {:.1}%",
                view.addresses.len(),
                view.utilization * 100.0
            )
            .color(colors::SEPARATOR)
        ));
    }
    aprint!("{}", line);

    let child_indent = format!("{indent}{}", if last { "   " } else { "│  " });
    let visible = if with_addresses { view.addresses.len() } else { 0 };
    let total = view.children.len() + visible;

    for (i, address) in view.addresses.iter().take(visible).enumerate() {
        address_leaf(address, &child_indent, i + 1 == total);
    }
    for (i, child) in view.children.iter().enumerate() {
        if let Some(child_view) = by_cidr.get(child) {
            let last = visible + i + 1 == total;
            subnet_branch(child_view, by_cidr, &child_indent, last, with_addresses);
        }
    }
}

fn address_leaf(address: &Address, indent: &str, last: bool) {
    let branch = if last { "└╴" } else { "├╴" }.bright_black();
    let name = address
        .name
        .as_deref()
        .map(|n| format!(" {}", n.color(colors::HOSTNAME)))
        .unwrap_or_default();
    aprint!(
        "{indent}{branch} {}{name} {}",
        address.ip.to_string().color(colors::ADDRESS),
        format!("({})", address.origin).color(colors::SEPARATOR)
    );
}

pub fn cidr_colored(cidr: &Cidr) -> ColoredString {
    let color = if cidr.is_ipv4() {
        colors::IPV4_PREFIX
    } else {
        colors::IPV6_PREFIX
    };
    cidr.to_string().color(color)
}

fn kind_label(kind: NodeKind) -> ColoredString {
    let text = format!("[{kind}]");
    match kind {
        NodeKind::Flat => text.color(colors::FLAT),
        NodeKind::Declared => text.color(colors::DECLARED),
        NodeKind::Base | NodeKind::Subdivision => text.color(colors::SEPARATOR),
    }
}

pub fn divider() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).bright_black();
    aprint!("{}", sep);
}

pub fn aligned_line<V: Display>(key: &str, value: V) {
    let dots = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.len()));
    let colon = format!(
        "{}{}",
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    print_status(format!(
        "{}{} {}",
        key.color(colors::PRIMARY),
        colon,
        value.to_string().color(colors::TEXT_DEFAULT)
    ));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    aprint!(
        "{} {}",
        ">".color(colors::SEPARATOR),
        msg.as_ref().color(colors::TEXT_DEFAULT)
    );
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    aprint!("{}{}{}", space, msg, space);
}
