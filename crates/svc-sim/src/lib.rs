//! # svc-sim
//!
//! In-memory simulator of the Storwize/SVC management command line.
//!
//! The simulator accepts the same argument lists a storage driver would send
//! over SSH and answers with the same text a live array prints, so driver
//! logic can be exercised without hardware:
//!
//! - [`Simulator`] - The simulated array and its command dispatcher
//! - [`CliResponse`] - Header-aware reader for the array's tabular output
//! - [`ErrorInjector`] - One-shot faults armed per command verb
//! - [`CommandLog`] - Harness-owned record of every executed command
//! - [`SimulatorConfig`] - Pools and system identities the array starts with

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod inject;
pub mod log;
pub mod response;
pub mod simulator;
pub mod state;
pub mod store;
pub mod types;

mod handlers;

pub use command::Command;
pub use config::{PoolConfig, SimulatorConfig, SystemIdentity};
pub use error::{Error, ErrorCode, Result};
pub use inject::{ErrorInjector, FaultTag};
pub use log::{CommandLog, LogEntry};
pub use response::{CliResponse, FieldValue, Record};
pub use simulator::{CommandOutput, Simulator};
pub use state::{Event, FcGroupState, FcMapState, RcGroupState, RcState};
pub use store::{Keyed, Store};
pub use types::{
    FcConsistGrp, FcMapping, Host, HostMapping, Partnership, RcConsistGrp, RcRelationship, Volume,
};
