//! Transport contracts an RPC runtime runs over.
//!
//! These mirror the listener, connection, and dialer shapes a connection
//! oriented RPC runtime expects from a custom transport. The adapter types
//! implement them: [`StreamListener`](crate::StreamListener) is a [`Listener`],
//! [`StreamConn`](crate::StreamConn) is a [`Connection`], and
//! [`StreamDialer`](crate::StreamDialer) is a [`Dialer`].

use crate::error::Error;
use async_trait::async_trait;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// A comparable, printable transport address.
pub trait Address: fmt::Display + fmt::Debug + Clone + Eq + Send + Sync {
    /// Name of the address family, e.g. `"tcp"`.
    fn network(&self) -> &str;
}

/// An established bidirectional byte-stream connection.
#[async_trait]
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {
    /// Address type of both ends.
    type Addr: Address;

    /// Address of this end.
    fn local_addr(&self) -> Self::Addr;

    /// Address of the remote end.
    fn remote_addr(&self) -> Self::Addr;

    /// Shut down the connection.
    async fn close(&mut self) -> io::Result<()>;
}

/// Server side source of inbound connections.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Connection type produced by [`accept`](Listener::accept).
    type Conn: Connection;
    /// Address type of the listener.
    type Addr: Address;

    /// Wait for the next inbound connection.
    ///
    /// # Errors
    ///
    /// [`Error::ListenerClosed`] once the listener is closed.
    async fn accept(&self) -> Result<Self::Conn, Error>;

    /// Stop accepting connections.
    fn close(&self) -> Result<(), Error>;

    /// The listener's own address.
    fn addr(&self) -> Self::Addr;
}

/// Client side custom dialer.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connection type produced by [`dial`](Dialer::dial).
    type Conn: Connection;

    /// Open a connection to `target`.
    async fn dial(&self, target: &str) -> Result<Self::Conn, Error>;
}
