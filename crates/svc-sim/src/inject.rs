//! One-shot fault injection.
//!
//! Tests arm a fault for a verb; the next execution of that verb consumes
//! it and behaves as the named failure mode.

use std::collections::HashMap;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::debug;

/// A fault a handler knows how to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FaultTag {
    /// Drop one header cell so rows are wider than the header.
    HeaderMismatch,
    /// Drop one column from header and rows alike.
    RemoveField,
    /// Report no compression support.
    NoCompression,
    /// Return a malformed object id.
    BadId,
    /// Drain `wait` steps until the state stops changing.
    SpeedUp,
    /// Report an empty preferred node.
    BlankPrefNode,
    /// Omit the preferred node field.
    NoPrefNode,
    /// Report the host as missing.
    MissingHost,
    /// Fail with an invalid-name error.
    BiggerTroubles,
    /// Fail the fast path of a host lookup.
    FailFastpath,
    /// Report no fabric logins.
    NoHosts,
    /// Return a listing with no rows at all.
    RemoveRows,
    /// Report no IP configuration.
    IpNoConfig,
    /// Fail the cache flush during prepare.
    FlushFailed,
}

/// Pending faults, keyed by verb.
#[derive(Debug, Default, Clone)]
pub struct ErrorInjector {
    pending: HashMap<String, FaultTag>,
}

impl ErrorInjector {
    /// Create an empty injector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `tag` for the next execution of `verb`, replacing any earlier one.
    pub fn arm(&mut self, verb: impl Into<String>, tag: FaultTag) {
        let verb = verb.into();
        debug!(verb = %verb, fault = %tag, "armed fault");
        self.pending.insert(verb, tag);
    }

    /// Take the pending fault for `verb`, if any.
    pub fn consume(&mut self, verb: &str) -> Option<FaultTag> {
        self.pending.remove(verb)
    }

    /// The pending fault for `verb`, without consuming it.
    #[must_use]
    pub fn peek(&self, verb: &str) -> Option<FaultTag> {
        self.pending.get(verb).copied()
    }

    /// Number of armed faults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
