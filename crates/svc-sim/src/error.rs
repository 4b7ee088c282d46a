//! Error types for the simulator.
//!
//! Array failures are modeled the way the real CLI reports them: a closed
//! catalogue of `CMMVCxxxxE` codes, each with a fixed message. Handlers
//! return [`Error::Cli`] for those; the dispatcher turns them into the
//! `(stdout, stderr)` pair a live array would print.

use std::fmt;

use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Catalogued array error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No object ID was specified.
    Cmmvc5701e,
    /// Required parameters are missing.
    Cmmvc5707e,
    /// Some parameters are mutually exclusive.
    Cmmvc5713e,
    /// The object does not exist or is not a suitable candidate.
    Cmmvc5753e,
    /// The object does not exist or the name breaks the naming rules.
    Cmmvc5754e,
    /// An object named in the command does not exist.
    Cmmvc5804e,
    /// The volume is mapped or part of a copy relationship.
    Cmmvc5840e,
    /// A port name is in a mapping.
    Cmmvc5871e,
    /// The host already has a mapping with this SCSI LUN.
    Cmmvc5879e,
    /// The FlashCopy mapping or group is in another state.
    Cmmvc5903e,
    /// Remote-copy master and auxiliary volumes differ in size.
    Cmmvc5912e,
    /// FlashCopy source and target differ in size.
    Cmmvc5924e,
    /// No direction has been defined.
    Cmmvc5963e,
    /// Not valid given the current relationship state.
    Cmmvc5982e,
    /// The object already exists.
    Cmmvc6035e,
    /// The object is not in a suitable state.
    Cmmvc6065e,
    /// The volume is already mapped to a host.
    Cmmvc6071e,
    /// FlashCopy source and target are the same volume.
    Cmmvc6303e,
    /// The copy specified does not exist.
    Cmmvc6353e,
    /// Source and target pools must be different.
    Cmmvc6430e,
    /// The name is not valid.
    Cmmvc6527e,
    /// The IQN or WWPN is already assigned or is not valid.
    Cmmvc6581e,
    /// The I/O group does not support compressed volumes.
    Cmmvc7050e,
}

impl ErrorCode {
    /// The code as printed by the array, e.g. `CMMVC5753E`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Cmmvc5701e => "CMMVC5701E",
            Self::Cmmvc5707e => "CMMVC5707E",
            Self::Cmmvc5713e => "CMMVC5713E",
            Self::Cmmvc5753e => "CMMVC5753E",
            Self::Cmmvc5754e => "CMMVC5754E",
            Self::Cmmvc5804e => "CMMVC5804E",
            Self::Cmmvc5840e => "CMMVC5840E",
            Self::Cmmvc5871e => "CMMVC5871E",
            Self::Cmmvc5879e => "CMMVC5879E",
            Self::Cmmvc5903e => "CMMVC5903E",
            Self::Cmmvc5912e => "CMMVC5912E",
            Self::Cmmvc5924e => "CMMVC5924E",
            Self::Cmmvc5963e => "CMMVC5963E",
            Self::Cmmvc5982e => "CMMVC5982E",
            Self::Cmmvc6035e => "CMMVC6035E",
            Self::Cmmvc6065e => "CMMVC6065E",
            Self::Cmmvc6071e => "CMMVC6071E",
            Self::Cmmvc6303e => "CMMVC6303E",
            Self::Cmmvc6353e => "CMMVC6353E",
            Self::Cmmvc6430e => "CMMVC6430E",
            Self::Cmmvc6527e => "CMMVC6527E",
            Self::Cmmvc6581e => "CMMVC6581E",
            Self::Cmmvc7050e => "CMMVC7050E",
        }
    }

    /// The canonical English message for this code.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Cmmvc5701e => "No object ID was specified.",
            Self::Cmmvc5707e => "Required parameters are missing.",
            Self::Cmmvc5713e => "Some parameters are mutually exclusive.",
            Self::Cmmvc5753e => {
                "The specified object does not exist or is not a suitable candidate."
            }
            Self::Cmmvc5754e => {
                "The specified object does not exist, or the name supplied does not meet the naming rules."
            }
            Self::Cmmvc5804e => {
                "The action failed because an object that was specified in the command does not exist."
            }
            Self::Cmmvc5840e => {
                "The virtual disk (VDisk) was not deleted because it is mapped to a host or because it is part of a FlashCopy or Remote Copy mapping, or is involved in an image mode migrate."
            }
            Self::Cmmvc5871e => {
                "The action failed because one or more of the configured port names is in a mapping."
            }
            Self::Cmmvc5879e => {
                "The VDisk-to-host mapping was not created because a VDisk is already mapped to this host with this SCSI LUN."
            }
            Self::Cmmvc5903e => {
                "The FlashCopy mapping was not changed because the mapping or consistency group is another state."
            }
            Self::Cmmvc5912e => {
                "The relationship was not created because the master and auxiliary VDisks are different sizes."
            }
            Self::Cmmvc5924e => {
                "The FlashCopy mapping was not created because the source and target virtual disks (VDisks) are different sizes."
            }
            Self::Cmmvc5963e => "No direction has been defined.",
            Self::Cmmvc5982e => {
                "The operation was not performed because it is not valid given the current relationship state."
            }
            Self::Cmmvc6035e => "The action failed as the object already exists.",
            Self::Cmmvc6065e => "The action failed as the object is not in a suitable state.",
            Self::Cmmvc6071e => {
                "The VDisk-to-host mapping was not created because the VDisk is already mapped to a host."
            }
            Self::Cmmvc6303e => "The create failed because the source and target VDisks are the same.",
            Self::Cmmvc6353e => "The command failed because the copy specified does not exist.",
            Self::Cmmvc6430e => {
                "The command failed because the target and source managed disk groups must be different."
            }
            Self::Cmmvc6527e => {
                "The name that you have entered is not valid. The name can contain letters, numbers, spaces, periods, dashes, and underscores. The name must begin with a letter or an underscore. The name must not begin or end with a space."
            }
            Self::Cmmvc6581e => {
                "The command has failed because the maximum number of allowed iSCSI qualified names (IQNs) has been reached, or the IQN is already assigned or is not valid."
            }
            Self::Cmmvc7050e => {
                "The command failed because at least one node in the I/O group does not support compressed VDisks."
            }
        }
    }

    /// The stderr text the array prints for this failure.
    #[must_use]
    pub fn stderr(&self) -> String {
        format!("{} {}", self.code(), self.message())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors that can occur while driving the simulator.
#[derive(Debug, Error)]
pub enum Error {
    /// A catalogued array failure.
    #[error("{}", .0.stderr())]
    Cli(ErrorCode),

    /// The argument list could not be interpreted.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected.
        reason: String,
    },

    /// The array returned output the response parser cannot read.
    #[error("bad or unexpected response from the storage volume backend API: {data}")]
    BackendApi {
        /// Description of the malformed output.
        data: String,
    },

    /// The command failed and the caller asked for exit-code checking.
    #[error(
        "unexpected error while running command.\nCommand: {cmd}\nExit code: {exit_code}\nStdout: {stdout:?}\nStderr: {stderr:?}"
    )]
    ProcessExecution {
        /// Exit code reported for the command.
        exit_code: i32,
        /// Captured stdout.
        stdout: String,
        /// Captured stderr.
        stderr: String,
        /// The command line as submitted.
        cmd: String,
    },

    /// Invalid simulator configuration.
    #[error("configuration error: {reason}")]
    Config {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// The catalogued code, if this is an array failure.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Cli(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Self::Cli(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ErrorCode::Cmmvc5840e, "CMMVC5840E" ; "busy volume")]
    #[test_case(ErrorCode::Cmmvc5903e, "CMMVC5903E" ; "flashcopy state")]
    #[test_case(ErrorCode::Cmmvc5982e, "CMMVC5982E" ; "relationship state")]
    #[test_case(ErrorCode::Cmmvc6035e, "CMMVC6035E" ; "already exists")]
    fn error_code_renders_code(code: ErrorCode, expected: &str) {
        assert_eq!(code.code(), expected);
        assert_eq!(code.to_string(), expected);
        assert!(code.stderr().starts_with(expected));
    }

    #[test]
    fn stderr_contains_message() {
        let text = ErrorCode::Cmmvc5753e.stderr();
        assert_eq!(
            text,
            "CMMVC5753E The specified object does not exist or is not a suitable candidate."
        );
    }

    #[test]
    fn cli_error_display_matches_stderr() {
        let err = Error::from(ErrorCode::Cmmvc6071e);
        assert_eq!(err.to_string(), ErrorCode::Cmmvc6071e.stderr());
        assert_eq!(err.code(), Some(ErrorCode::Cmmvc6071e));
    }

    #[test]
    fn invalid_input_has_no_code() {
        let err = Error::invalid_input("unrecognized argument -bogus");
        assert!(err.to_string().contains("-bogus"));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn process_execution_display_carries_command() {
        let err = Error::ProcessExecution {
            exit_code: 1,
            stdout: String::new(),
            stderr: ErrorCode::Cmmvc5840e.stderr(),
            cmd: "svctask rmvdisk v1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("svctask rmvdisk v1"));
        assert!(msg.contains("Exit code: 1"));
        assert!(msg.contains("CMMVC5840E"));
    }
}
