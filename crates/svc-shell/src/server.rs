//! TCP line server.
//!
//! Every request line is one session line; every reply is one JSON object
//! on its own line. Blank lines and comments get an empty success reply so
//! requests and replies stay paired. All connections share one
//! [`Session`], locked for the duration of a single command, so commands
//! against the array are serialized.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use crate::error::{ShellError, ShellResult};
use crate::session::Session;

/// Longest request line accepted.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Serves one shared session to any number of TCP clients.
#[derive(Debug)]
pub struct Server {
    session: Arc<Mutex<Session>>,
    listener: TcpListener,
}

impl Server {
    /// Bind to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::BindFailed`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, session: Session) -> ShellResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ShellError::BindFailed(addr, e))?;
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            listener,
        })
    }

    /// The bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> ShellResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The shared session.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    /// Accept connections until the task is dropped.
    ///
    /// # Errors
    ///
    /// Only returns if the local address cannot be read.
    pub async fn serve(self) -> ShellResult<()> {
        info!(addr = %self.local_addr()?, "simulator listening");
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let session = Arc::clone(&self.session);
                    tokio::spawn(async move {
                        match handle_connection(stream, session).await {
                            Ok(()) => debug!(%peer, "connection closed"),
                            Err(e) => warn!(%peer, error = %e, "connection ended with error"),
                        }
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, session: Arc<Mutex<Session>>) -> ShellResult<()> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = framed.next().await {
        let line = line?;
        let reply = session.lock().execute(&line).unwrap_or_default();
        framed.send(serde_json::to_string(&reply)?).await?;
    }
    Ok(())
}
