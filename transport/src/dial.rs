//! Custom dialer over protocol streams.

use crate::conn::StreamConn;
use crate::error::Error;
use crate::host::Host;
use crate::protocol::GrpcProtocol;
use crate::runtime::Dialer;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Dials peers by the text form of their identity.
///
/// Plugs into an RPC client's custom-dialer hook: the target string is parsed
/// into the host's peer identity and a fresh protocol stream is opened to it.
/// Each dial yields a new stream, nothing is pooled or retried.
pub struct StreamDialer<H: Host> {
    protocol: GrpcProtocol<H>,
    cancel: CancellationToken,
}

impl<H: Host> Clone for StreamDialer<H> {
    fn clone(&self) -> Self {
        Self {
            protocol: self.protocol.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<H: Host> StreamDialer<H> {
    pub(crate) fn new(protocol: GrpcProtocol<H>) -> Self {
        Self {
            protocol,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort dials in flight, and refuse new ones, once `cancel` fires.
    ///
    /// Independent of the protocol attachment's own token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl<H> StreamDialer<H>
where
    H: Host,
    H::PeerId: FromStr,
    <H::PeerId as FromStr>::Err: fmt::Display,
{
    /// Parse `target` as a peer identity and dial it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTarget`] if `target` is not a peer identity, otherwise
    /// whatever [`GrpcProtocol::dial`] returns.
    pub async fn dial(&self, target: &str) -> Result<StreamConn<H::Stream>, Error> {
        let peer = target
            .parse::<H::PeerId>()
            .map_err(|e| Error::InvalidTarget(format!("{target}: {e}")))?;
        self.protocol.dial(&self.cancel, &peer).await
    }
}

impl<H: Host> fmt::Debug for StreamDialer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDialer")
            .field("protocol", &self.protocol)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl<H> Dialer for StreamDialer<H>
where
    H: Host,
    H::PeerId: FromStr,
    <H::PeerId as FromStr>::Err: fmt::Display,
{
    type Conn = StreamConn<H::Stream>;

    async fn dial(&self, target: &str) -> Result<Self::Conn, Error> {
        StreamDialer::dial(self, target).await
    }
}
