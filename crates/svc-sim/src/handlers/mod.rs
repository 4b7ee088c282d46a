//! Command handlers, one per CLI verb.
//!
//! Every handler validates its arguments completely before touching any
//! store, so a failed command leaves the simulator unchanged.

mod flashcopy;
mod host;
mod hyperswap;
mod remote;
mod system;
mod vdisk;

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::Command;
use crate::error::{Error, ErrorCode, Result};
use crate::format::{Filter, FormatOptions, ObjectView, Table, units_to_bytes};
use crate::inject::FaultTag;
use crate::simulator::Simulator;

/// Signature shared by every handler.
pub(crate) type Handler = fn(&mut Simulator, &Command, Option<FaultTag>) -> Result<String>;

/// Every verb the simulator understands.
pub(crate) fn all() -> impl Iterator<Item = (&'static str, Handler)> {
    system::HANDLERS
        .iter()
        .chain(vdisk::HANDLERS)
        .chain(host::HANDLERS)
        .chain(flashcopy::HANDLERS)
        .chain(remote::HANDLERS)
        .chain(hyperswap::HANDLERS)
        .copied()
}

static OBJECT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][\w._-]*$").unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// Whether `name` is acceptable for a new object.
pub(crate) fn is_valid_name(name: &str) -> bool {
    OBJECT_NAME.is_match(name)
}

/// Parse a numeric argument, reporting `code` when it is malformed.
pub(crate) fn parse_num<T: FromStr>(raw: &str, code: ErrorCode) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::Cli(code))
}

/// Parse a `yes`/`on`/`no`/`off` switch. Anything else is CMMVC5707E.
pub(crate) fn parse_switch(raw: &str) -> Result<bool> {
    match raw {
        "on" | "yes" => Ok(true),
        "off" | "no" => Ok(false),
        _ => Err(ErrorCode::Cmmvc5707e.into()),
    }
}

/// Convert a `-size`/`-unit` pair to bytes. A malformed size or unknown
/// unit is CMMVC5707E.
pub(crate) fn parse_capacity(size: &str, unit: &str) -> Result<u64> {
    units_to_bytes(size, unit).map_err(|_| Error::Cli(ErrorCode::Cmmvc5707e))
}

/// `Name, id [N], successfully created`.
pub(crate) fn created(kind: &str, id: u32) -> String {
    format!("{kind}, id [{id}], successfully created")
}

/// Apply the listing faults shared by several `ls` verbs. `header_index`
/// names the header cell dropped for `header_mismatch`.
pub(crate) fn apply_table_fault(table: &mut Table, fault: Option<FaultTag>, header_index: usize) {
    match fault {
        Some(FaultTag::HeaderMismatch) => table.drop_header_field(header_index),
        Some(FaultTag::RemoveField) => table.drop_column(0),
        Some(FaultTag::RemoveRows) => table.clear(),
        _ => {}
    }
}

/// Filter and render a listing.
pub(crate) fn render_table(cmd: &Command, mut table: Table) -> Result<String> {
    if let Some(filter) = Filter::from_command(cmd)? {
        table.retain(&filter);
    }
    Ok(table.render(&FormatOptions::from_command(cmd)))
}

/// Render an object view.
pub(crate) fn render_object(cmd: &Command, view: &ObjectView) -> String {
    view.render(&FormatOptions::from_command(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test_case("host1", true)]
    #[test_case("_h.o-s_t", true)]
    #[test_case("1host", false)]
    #[test_case("ho st", false)]
    #[test_case("", false)]
    fn name_rules(name: &str, valid: bool) {
        assert_eq!(is_valid_name(name), valid);
    }

    #[test]
    fn verbs_are_unique() {
        let mut seen = HashSet::new();
        for (verb, _) in all() {
            assert!(seen.insert(verb), "duplicate verb {verb}");
        }
        assert!(seen.contains("mkvdisk"));
        assert!(seen.contains("lsrcconsistgrp"));
        assert!(seen.contains("mkvolume"));
    }

    #[test]
    fn switch_values() {
        assert!(parse_switch("on").expect("on"));
        assert!(!parse_switch("no").expect("no"));
        assert!(matches!(parse_switch("maybe"), Err(Error::Cli(ErrorCode::Cmmvc5707e))));
    }

    #[test]
    fn capacity_errors_are_cli_errors() {
        assert_eq!(parse_capacity("2", "kb").expect("2kb"), 2048);
        assert!(matches!(parse_capacity("x", "gb"), Err(Error::Cli(ErrorCode::Cmmvc5707e))));
        assert!(matches!(parse_capacity("1", "zb"), Err(Error::Cli(ErrorCode::Cmmvc5707e))));
    }

    #[test]
    fn created_message() {
        assert_eq!(
            created("Virtual Disk", 3),
            "Virtual Disk, id [3], successfully created"
        );
    }
}
