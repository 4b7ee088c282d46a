//! # svc-shell
//!
//! Front ends for the Storwize/SVC simulator.
//!
//! - [`Session`] - One simulated array plus the `inject` meta-command
//! - [`Server`] - Newline-delimited JSON over TCP, one shared session
//! - [`Cli`] - The `svcsim` command line
//!
//! ```text
//! ┌──────────┐   request line    ┌──────────────┐
//! │  client  │──────────────────►│    Server    │──► Session ──► Simulator
//! └──────────┘◄──────────────────└──────────────┘
//!               JSON reply line
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod error;
pub mod server;
pub mod session;

pub use cli::{Cli, Commands, Format};
pub use error::{ShellError, ShellResult};
pub use server::Server;
pub use session::{Reply, RunSummary, Session};
