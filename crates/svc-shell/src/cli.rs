//! Command-line argument parsing with clap.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use svc_sim::SimulatorConfig;

use crate::error::ShellResult;

/// Default address for `serve`.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7070";

/// svcsim - drive a simulated Storwize/SVC array.
#[derive(Parser, Debug, Clone)]
#[command(name = "svcsim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON simulator configuration file.
    #[arg(short, long, env = "SVCSIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage pool name; repeat to replace the configured pools.
    #[arg(short, long = "pool", value_name = "NAME")]
    pub pools: Vec<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Build the simulator configuration from `--config` and `--pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the result is invalid.
    pub fn simulator_config(&self) -> ShellResult<SimulatorConfig> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::from_file(path)?,
            None => SimulatorConfig::default(),
        };
        if !self.pools.is_empty() {
            config = config.with_pools(self.pools.iter().cloned());
        }
        config.validate()?;
        Ok(config)
    }
}

/// How command results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Raw array output: stdout to stdout, stderr to stderr.
    #[default]
    Text,
    /// One JSON object per command.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one array command against a fresh simulator.
    Exec {
        /// The command, e.g. `svcinfo lssystem -delim !`.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Run every command in a file, one per line.
    Script {
        /// Script path.
        file: PathBuf,
    },

    /// Read commands from stdin until EOF or `exit`.
    Repl,

    /// Serve the line protocol over TCP.
    ///
    /// Each request line is one command; each reply is one JSON object.
    /// All connections share one simulator.
    Serve {
        /// Address to listen on.
        #[arg(short, long, default_value = DEFAULT_LISTEN)]
        listen: SocketAddr,
    },
}
