//! CLI tokenizer.
//!
//! Turns a shell-style argument vector such as
//! `["svctask", "mkvdisk", "-name", "vol1", "-size", "1"]` into a
//! [`Command`]: the verb plus every recognized `-flag` and its value.

use std::collections::BTreeMap;

use crate::error::{Error, ErrorCode, Result};

/// Flags whose presence alone carries meaning.
const NO_VALUE_FLAGS: &[&str] = &[
    "access",
    "bytes",
    "compressed",
    "force",
    "global",
    "noauxchange",
    "noconsistgrp",
    "nofmtdisk",
    "nohdr",
    "nomasterchange",
    "prep",
    "removefcmaps",
    "removehostmappings",
    "removercrelationships",
    "restore",
    "start",
    "stop",
    "sync",
    "thin",
];

/// Flags that always consume the following token.
const ONE_VALUE_FLAGS: &[&str] = &[
    "aux",
    "auxchange",
    "backgroundcopyrate",
    "chapsecret",
    "cleanrate",
    "cluster",
    "clusterip",
    "consistgrp",
    "copies",
    "copy",
    "copyrate",
    "cycleperiodseconds",
    "cyclingmode",
    "delim",
    "easytier",
    "filtervalue",
    "grainsize",
    "hbawwpn",
    "host",
    "iogrp",
    "iscsiname",
    "linkbandwidthmbits",
    "master",
    "masterchange",
    "mdiskgrp",
    "name",
    "obj",
    "pool",
    "primary",
    "rsize",
    "scsi",
    "site",
    "size",
    "source",
    "target",
    "type",
    "unit",
    "vdisk",
    "warning",
    "wwpn",
];

/// Flags that take a value unless followed by another flag or the end.
const OPTIONAL_VALUE_FLAGS: &[&str] = &["autodelete", "autoexpand"];

/// Legacy prefixes that precede the verb.
const LEGACY_PREFIXES: &[&str] = &["svcinfo", "svctask"];

/// The value attached to a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// The flag was given without a value.
    Flag,
    /// The flag was given with a value.
    Value(String),
}

impl ArgValue {
    /// The value, if one was given.
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Flag => None,
            Self::Value(v) => Some(v),
        }
    }
}

/// A parsed CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    args: BTreeMap<String, ArgValue>,
    line: String,
}

impl Command {
    /// Parse an argument vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty vector, a flag that is
    /// not in any known set, or a one-value flag missing its value.
    pub fn parse<S: AsRef<str>>(argv: &[S]) -> Result<Self> {
        let tokens: Vec<&str> = argv.iter().map(|s| s.as_ref()).collect();
        let line = tokens.join(" ");

        let Some(&first) = tokens.first() else {
            return Err(Error::invalid_input("empty command"));
        };

        let mut args = BTreeMap::new();
        let (verb, rest) = if LEGACY_PREFIXES.contains(&first) {
            let Some(&second) = tokens.get(1) else {
                return Err(Error::invalid_input(format!("missing command after {first}")));
            };
            if second == "lsnode" {
                // `svcinfo lsnode -delim ! <node id>` asks for one node; the
                // shorter form lists canisters.
                if tokens.len() > 4 {
                    if let Some(last) = tokens.last() {
                        args.insert("node_id".to_string(), ArgValue::Value((*last).to_string()));
                    }
                    let body = &tokens[2..tokens.len() - 1];
                    ("lsnode", body)
                } else {
                    ("lsnodecanister", &tokens[2..])
                }
            } else {
                (second, &tokens[2..])
            }
        } else {
            (first, &tokens[1..])
        };

        let mut i = 0;
        while i < rest.len() {
            let token = strip_name_quotes(rest[i]);
            if let Some(flag) = token.strip_prefix('-') {
                if NO_VALUE_FLAGS.contains(&flag) {
                    args.insert(flag.to_string(), ArgValue::Flag);
                } else if ONE_VALUE_FLAGS.contains(&flag) {
                    let Some(value) = rest.get(i + 1) else {
                        return Err(Error::invalid_input(format!(
                            "argument {token} requires a value"
                        )));
                    };
                    args.insert(
                        flag.to_string(),
                        ArgValue::Value(strip_name_quotes(value).to_string()),
                    );
                    i += 1;
                } else if OPTIONAL_VALUE_FLAGS.contains(&flag) {
                    match rest.get(i + 1) {
                        Some(next) if !next.starts_with('-') => {
                            args.insert(flag.to_string(), ArgValue::Value((*next).to_string()));
                            i += 1;
                        }
                        _ => {
                            args.insert(flag.to_string(), ArgValue::Flag);
                        }
                    }
                } else {
                    return Err(Error::invalid_input(format!("unrecognized argument {token}")));
                }
            } else {
                args.insert("obj".to_string(), ArgValue::Value(token.to_string()));
            }
            i += 1;
        }

        Ok(Self {
            verb: verb.to_string(),
            args,
            line,
        })
    }

    /// The command verb, e.g. `mkvdisk`.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The original command line, tokens joined by spaces.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Whether the flag was given, with or without a value.
    #[must_use]
    pub fn has(&self, flag: &str) -> bool {
        self.args.contains_key(flag)
    }

    /// The raw value of a flag, if one was given.
    #[must_use]
    pub fn value(&self, flag: &str) -> Option<&str> {
        self.args.get(flag).and_then(ArgValue::as_value)
    }

    /// The flag value with surrounding quotes removed.
    #[must_use]
    pub fn unquoted(&self, flag: &str) -> Option<&str> {
        self.value(flag).map(unquote)
    }

    /// The flag value with quotes removed, or the given error code.
    pub fn require(&self, flag: &str, code: ErrorCode) -> Result<&str> {
        self.unquoted(flag).ok_or(Error::Cli(code))
    }

    /// The bare object token, or `CMMVC5701E` when absent.
    pub fn object(&self) -> Result<&str> {
        self.require("obj", ErrorCode::Cmmvc5701e)
    }

    /// The bare object token, if any.
    #[must_use]
    pub fn object_opt(&self) -> Option<&str> {
        self.unquoted("obj")
    }

    /// Iterate over the parsed flags.
    pub fn args(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Remove surrounding single or double quotes.
#[must_use]
pub fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '\'' || c == '"')
}

/// Strip quotes from tokens that look like quoted volume or snapshot names.
fn strip_name_quotes(token: &str) -> &str {
    if token.starts_with('"') && (token.contains("volume") || token.contains("snapshot")) {
        unquote(token)
    } else {
        token
    }
}
