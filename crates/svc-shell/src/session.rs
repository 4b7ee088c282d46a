//! A simulator session: one array plus the shell's meta-commands.
//!
//! Besides array commands a session understands two extra line forms:
//!
//! - `inject <verb> <fault_tag>` arms a one-shot fault
//! - lines starting with `#` are comments
//!
//! Blank lines and comments produce no reply.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use svc_sim::{CommandOutput, Error, FaultTag, Simulator};
use tracing::{debug, info};

use crate::cli::Format;
use crate::error::ShellResult;

/// Exit code for lines the simulator could not interpret at all.
pub const EXIT_REJECTED: i32 = 2;

/// The outcome of one line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Array stdout.
    pub stdout: String,
    /// Array stderr; non-empty on failure.
    pub stderr: String,
    /// 0 on success, 1 for an array error, 2 for a rejected line.
    pub exit_code: i32,
}

impl Reply {
    /// A reply for a line that never reached a handler.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.into(),
            exit_code: EXIT_REJECTED,
        }
    }

    /// Whether the line succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Write the reply in the chosen format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<O: Write, E: Write>(&self, format: Format, out: &mut O, err: &mut E) -> ShellResult<()> {
        match format {
            Format::Json => {
                serde_json::to_writer(&mut *out, self)?;
                writeln!(out)?;
            }
            Format::Text => {
                if !self.stdout.is_empty() {
                    writeln!(out, "{}", self.stdout)?;
                }
                if !self.stderr.is_empty() {
                    writeln!(err, "{}", self.stderr)?;
                }
            }
        }
        Ok(())
    }
}

impl From<CommandOutput> for Reply {
    fn from(output: CommandOutput) -> Self {
        let exit_code = output.exit_code();
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
        }
    }
}

/// Summary of a batch of lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines that produced a reply.
    pub executed: usize,
    /// Replies with a non-zero exit code.
    pub failed: usize,
}

/// One simulated array and the meta-commands around it.
#[derive(Debug)]
pub struct Session {
    sim: Simulator,
}

impl Session {
    /// Wrap a simulator.
    #[must_use]
    pub const fn new(sim: Simulator) -> Self {
        Self { sim }
    }

    /// The underlying simulator.
    #[must_use]
    pub const fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Run an already-tokenized array command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown verb or malformed
    /// argument list.
    pub fn execute_argv<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<Reply, Error> {
        self.sim.execute_command(argv, false).map(Reply::from)
    }

    /// Run one line. Returns `None` for blank lines and comments.
    pub fn execute(&mut self, line: &str) -> Option<Reply> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() == Some(&"inject") {
            return Some(self.inject(&tokens[1..]));
        }
        let reply = match self.execute_argv(&tokens) {
            Ok(reply) => reply,
            Err(e) => Reply::rejected(e.to_string()),
        };
        debug!(line, exit_code = reply.exit_code, "session line");
        Some(reply)
    }

    fn inject(&mut self, args: &[&str]) -> Reply {
        let [verb, tag] = args else {
            return Reply::rejected("usage: inject <verb> <fault_tag>");
        };
        if !Simulator::supports(verb) {
            return Reply::rejected(format!("unknown command {verb}"));
        }
        let Ok(fault) = tag.parse::<FaultTag>() else {
            return Reply::rejected(format!("unknown fault tag {tag}"));
        };
        info!(verb, fault = %fault, "armed fault");
        self.sim.error_injection(*verb, fault);
        Reply::default()
    }

    /// Run lines from `input` until EOF or, when `stop_word` is given, a
    /// line equal to it.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading or writing fails.
    pub fn run_lines<R, O, E>(
        &mut self,
        input: R,
        format: Format,
        out: &mut O,
        err: &mut E,
        stop_word: Option<&str>,
    ) -> ShellResult<RunSummary>
    where
        R: BufRead,
        O: Write,
        E: Write,
    {
        let mut summary = RunSummary::default();
        for line in input.lines() {
            let line = line?;
            if stop_word.is_some_and(|word| line.trim() == word) {
                break;
            }
            let Some(reply) = self.execute(&line) else {
                continue;
            };
            summary.executed += 1;
            if !reply.is_success() {
                summary.failed += 1;
            }
            reply.write(format, out, err)?;
            out.flush()?;
        }
        Ok(summary)
    }
}
