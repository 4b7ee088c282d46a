//! Error types for the shell.

use std::net::SocketAddr;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors that can occur while running the shell.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The simulator rejected a command or configuration.
    #[error(transparent)]
    Simulator(#[from] svc_sim::Error),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// A request line could not be framed.
    #[error("framing error: {0}")]
    Framing(#[from] LinesCodecError),

    /// Failed to serialize a reply.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for shell operations.
pub type ShellResult<T> = Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulator_errors_pass_through() {
        let err = ShellError::from(svc_sim::Error::invalid_input("bad"));
        assert_eq!(err.to_string(), "invalid input: bad");
    }

    #[test]
    fn bind_failure_names_address() {
        let addr: SocketAddr = "127.0.0.1:1".parse().expect("addr");
        let err = ShellError::BindFailed(addr, std::io::Error::other("in use"));
        assert_eq!(err.to_string(), "failed to bind to 127.0.0.1:1: in use");
    }
}
