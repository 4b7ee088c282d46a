//! Transition tables for copy and replication objects.
//!
//! Four families share one shape: a state, an [`Event`], and a table that
//! yields the next state or nothing. A missing entry is a reportable CLI
//! failure, never a panic. `wait` with no entry is accepted and changes
//! nothing; it is how listings poll objects that are not busy.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, ErrorCode, Result};

/// Something that happened to a copy object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    /// Object creation.
    Make,
    /// First member joined a group.
    Add,
    /// `prestartfcmap`.
    Prepare,
    /// Cache flush failed during prepare.
    FlushFailed,
    /// Time passed (a listing poll).
    Wait,
    /// Start copying.
    Start,
    /// Stop copying.
    Stop,
    /// Stop and grant write access to the secondary.
    StopAccess,
    /// Delete.
    Delete,
    /// Delete with `-force`.
    DeleteForce,
}

/// A state family with a transition table.
pub trait StateMachine: Copy + Eq + std::fmt::Debug + std::fmt::Display {
    /// Error reported for an event with no table entry.
    const INVALID: ErrorCode;

    /// The table lookup.
    fn next(self, event: Event) -> Option<Self>;

    /// Whether the state accepts no events at all.
    fn is_terminal(self) -> bool;
}

/// Apply `event` to `state`.
///
/// # Errors
///
/// Returns the family's `INVALID` code when the table has no entry, unless
/// the event is [`Event::Wait`], which leaves the state unchanged.
pub fn transition<S: StateMachine>(state: S, event: Event) -> Result<S> {
    match state.next(event) {
        Some(next) => Ok(next),
        None if event == Event::Wait => Ok(state),
        None => Err(Error::Cli(S::INVALID)),
    }
}

/// FlashCopy mapping states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FcMapState {
    /// Not yet created.
    Begin,
    /// Ready, or finished copying.
    IdleOrCopied,
    /// Flushing cache.
    Preparing,
    /// Deleted.
    End,
    /// Stopped.
    Stopped,
    /// Prepared, ready to start.
    Prepared,
    /// Copy in progress.
    Copying,
    /// Stopping.
    Stopping,
}

impl StateMachine for FcMapState {
    const INVALID: ErrorCode = ErrorCode::Cmmvc5903e;

    fn next(self, event: Event) -> Option<Self> {
        use Event as E;
        match (self, event) {
            (Self::Begin, E::Make) => Some(Self::IdleOrCopied),
            (Self::IdleOrCopied, E::Prepare) => Some(Self::Preparing),
            (Self::IdleOrCopied, E::Delete | E::DeleteForce) => Some(Self::End),
            (Self::Preparing, E::FlushFailed) => Some(Self::Stopped),
            (Self::Preparing, E::Wait) => Some(Self::Prepared),
            (Self::Stopped, E::Prepare) => Some(Self::Preparing),
            (Self::Stopped, E::DeleteForce) => Some(Self::End),
            (Self::Prepared, E::Stop) => Some(Self::Stopped),
            (Self::Prepared, E::Start) => Some(Self::Copying),
            (Self::Copying, E::Wait) => Some(Self::IdleOrCopied),
            (Self::Copying, E::Stop) => Some(Self::Stopping),
            (Self::Stopping, E::Wait) => Some(Self::Stopped),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// FlashCopy consistency group states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FcGroupState {
    /// Not yet created.
    Begin,
    /// No member mappings.
    Empty,
    /// Ready, or finished copying.
    IdleOrCopied,
    /// Flushing cache.
    Preparing,
    /// Deleted.
    End,
    /// Stopped.
    Stopped,
    /// Prepared, ready to start.
    Prepared,
    /// Copy in progress.
    Copying,
    /// Stopping.
    Stopping,
}

impl StateMachine for FcGroupState {
    const INVALID: ErrorCode = ErrorCode::Cmmvc5903e;

    fn next(self, event: Event) -> Option<Self> {
        use Event as E;
        match (self, event) {
            (Self::Begin, E::Make) => Some(Self::Empty),
            (Self::Empty, E::Add) => Some(Self::IdleOrCopied),
            (Self::IdleOrCopied, E::Prepare) => Some(Self::Preparing),
            (Self::IdleOrCopied, E::Delete | E::DeleteForce) => Some(Self::End),
            (Self::Preparing, E::FlushFailed) => Some(Self::Stopped),
            (Self::Preparing, E::Wait) => Some(Self::Prepared),
            (Self::Stopped, E::Prepare) => Some(Self::Preparing),
            (Self::Stopped, E::DeleteForce) => Some(Self::End),
            (Self::Prepared, E::Stop) => Some(Self::Stopped),
            (Self::Prepared, E::Start) => Some(Self::Copying),
            (Self::Prepared, E::Delete | E::DeleteForce) => Some(Self::End),
            (Self::Copying, E::Wait) => Some(Self::IdleOrCopied),
            (Self::Copying, E::Stop) => Some(Self::Stopping),
            (Self::Copying, E::Delete | E::DeleteForce) => Some(Self::End),
            (Self::Stopping, E::Wait) => Some(Self::Stopped),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// Remote-copy relationship states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RcState {
    /// Created, not copying, secondary inconsistent.
    InconsistentStopped,
    /// Initial copy running.
    InconsistentCopying,
    /// In sync.
    ConsistentSynchronized,
    /// Consistent, cycling through change volumes.
    ConsistentCopying,
    /// Stopped while consistent.
    ConsistentStopped,
    /// Both sides writable.
    Idling,
    /// Deleted.
    End,
}

impl RcState {
    /// Whether the secondary holds a usable image.
    #[must_use]
    pub const fn is_consistent(self) -> bool {
        matches!(
            self,
            Self::ConsistentSynchronized | Self::ConsistentCopying | Self::ConsistentStopped
        )
    }

    fn relationship_next(self, event: Event) -> Option<Self> {
        use Event as E;
        match (self, event) {
            (_, E::Delete | E::DeleteForce) if self != Self::End => Some(Self::End),
            (Self::InconsistentStopped, E::Start) => Some(Self::InconsistentCopying),
            (Self::InconsistentStopped, E::Stop) => Some(Self::InconsistentStopped),
            (Self::InconsistentCopying, E::Wait) => Some(Self::ConsistentSynchronized),
            (Self::InconsistentCopying, E::Start) => Some(Self::InconsistentCopying),
            (Self::InconsistentCopying, E::Stop) => Some(Self::InconsistentStopped),
            (Self::ConsistentSynchronized, E::Start) => Some(Self::ConsistentSynchronized),
            (Self::ConsistentSynchronized, E::Stop) => Some(Self::ConsistentStopped),
            (Self::ConsistentSynchronized, E::StopAccess) => Some(Self::Idling),
            (Self::ConsistentCopying, E::Start) => Some(Self::ConsistentCopying),
            (Self::ConsistentCopying, E::Stop) => Some(Self::ConsistentStopped),
            (Self::ConsistentCopying, E::StopAccess) => Some(Self::Idling),
            (Self::ConsistentStopped, E::Start) => Some(Self::ConsistentSynchronized),
            (Self::ConsistentStopped, E::Stop) => Some(Self::ConsistentStopped),
            (Self::ConsistentStopped, E::StopAccess) => Some(Self::Idling),
            (Self::Idling, E::Start) => Some(Self::InconsistentCopying),
            (Self::Idling, E::Stop) => Some(Self::InconsistentStopped),
            (Self::Idling, E::StopAccess) => Some(Self::Idling),
            _ => None,
        }
    }
}

impl StateMachine for RcState {
    const INVALID: ErrorCode = ErrorCode::Cmmvc5982e;

    fn next(self, event: Event) -> Option<Self> {
        self.relationship_next(event)
    }

    fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// Remote-copy consistency group states: the relationship states plus
/// `empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RcGroupState {
    /// No member relationships.
    Empty,
    /// Created, not copying.
    InconsistentStopped,
    /// Initial copy running.
    InconsistentCopying,
    /// In sync.
    ConsistentSynchronized,
    /// Consistent, cycling through change volumes.
    ConsistentCopying,
    /// Stopped while consistent.
    ConsistentStopped,
    /// Both sides writable.
    Idling,
    /// Deleted.
    End,
}

impl RcGroupState {
    /// The matching relationship state; `None` for `empty`.
    #[must_use]
    pub const fn as_relationship(self) -> Option<RcState> {
        Some(match self {
            Self::Empty => return None,
            Self::InconsistentStopped => RcState::InconsistentStopped,
            Self::InconsistentCopying => RcState::InconsistentCopying,
            Self::ConsistentSynchronized => RcState::ConsistentSynchronized,
            Self::ConsistentCopying => RcState::ConsistentCopying,
            Self::ConsistentStopped => RcState::ConsistentStopped,
            Self::Idling => RcState::Idling,
            Self::End => RcState::End,
        })
    }
}

impl From<RcState> for RcGroupState {
    fn from(state: RcState) -> Self {
        match state {
            RcState::InconsistentStopped => Self::InconsistentStopped,
            RcState::InconsistentCopying => Self::InconsistentCopying,
            RcState::ConsistentSynchronized => Self::ConsistentSynchronized,
            RcState::ConsistentCopying => Self::ConsistentCopying,
            RcState::ConsistentStopped => Self::ConsistentStopped,
            RcState::Idling => Self::Idling,
            RcState::End => Self::End,
        }
    }
}

impl StateMachine for RcGroupState {
    const INVALID: ErrorCode = ErrorCode::Cmmvc5982e;

    fn next(self, event: Event) -> Option<Self> {
        match (self, event) {
            (Self::Empty, Event::Add) => Some(Self::InconsistentStopped),
            (Self::Empty, Event::Delete | Event::DeleteForce) => Some(Self::End),
            _ => self
                .as_relationship()
                .and_then(|rc| rc.relationship_next(event))
                .map(Self::from),
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// Copy progress, in percent.
pub type Progress = u8;

/// Apply `event` to a FlashCopy mapping, advancing copy progress.
///
/// `wait` while copying moves progress 0 → 50 → 100, flipping to
/// `idle_or_copied` on the second step. With a copy rate of 0 nothing ever
/// moves.
pub fn fc_map_step(
    state: FcMapState,
    progress: Progress,
    copy_rate: u32,
    event: Event,
) -> Result<(FcMapState, Progress)> {
    if state == FcMapState::Copying && event == Event::Wait {
        return Ok(match (copy_rate, progress) {
            (0, _) => (state, progress),
            (_, 0) => (state, 50),
            _ => (FcMapState::IdleOrCopied, 100),
        });
    }
    let next = transition(state, event)?;
    let progress = if next == FcMapState::Copying && state != FcMapState::Copying {
        0
    } else {
        progress
    };
    Ok((next, progress))
}

/// Apply `event` to a remote-copy relationship, advancing sync progress.
///
/// `wait` while `inconsistent_copying` moves progress 0 → 50, then to 100
/// with the relationship consistent. Global mirror with change volumes
/// lands in `consistent_copying`; everything else in
/// `consistent_synchronized`.
pub fn rc_step(
    state: RcState,
    progress: Progress,
    change_volumes: bool,
    event: Event,
) -> Result<(RcState, Progress)> {
    if state == RcState::InconsistentCopying && event == Event::Wait {
        return Ok(match progress {
            0 => (state, 50),
            _ if change_volumes => (RcState::ConsistentCopying, 100),
            _ => (RcState::ConsistentSynchronized, 100),
        });
    }
    let next = transition(state, event)?;
    let progress = match next {
        RcState::InconsistentCopying if state != next => 0,
        s if s.is_consistent() => 100,
        _ => progress,
    };
    Ok((next, progress))
}
