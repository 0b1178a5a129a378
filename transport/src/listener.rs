//! Accept loop over handler-delivered streams.

use crate::addr::PeerAddr;
use crate::conn::StreamConn;
use crate::error::Error;
use crate::handoff::Handoff;
use crate::host::PeerStream;
use crate::runtime::Listener;
use async_trait::async_trait;
use futures::stream::{self, Stream};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Listener that accepts streams delivered to a [`GrpcProtocol`](crate::GrpcProtocol).
///
/// No socket is bound. [`addr`](StreamListener::addr) reports the host's own
/// identity so the listener still has a meaningful address.
///
/// The listener is `Open` until the governing token is cancelled, either by
/// [`close`](StreamListener::close) or by whoever owns the token. The token is
/// shared with the protocol attachment and every other listener created from
/// it, so closing one listener closes them all.
pub struct StreamListener<S: PeerStream> {
    handoff: Arc<Handoff<S>>,
    cancel: CancellationToken,
    addr: PeerAddr<S::PeerId>,
}

impl<S: PeerStream> Clone for StreamListener<S> {
    fn clone(&self) -> Self {
        Self {
            handoff: self.handoff.clone(),
            cancel: self.cancel.clone(),
            addr: self.addr.clone(),
        }
    }
}

impl<S: PeerStream> StreamListener<S> {
    pub(crate) fn new(
        handoff: Arc<Handoff<S>>,
        cancel: CancellationToken,
        local_peer: S::PeerId,
    ) -> Self {
        Self {
            handoff,
            cancel,
            addr: PeerAddr::new(local_peer),
        }
    }

    /// Wait for the next inbound stream and wrap it as a connection.
    ///
    /// Concurrent calls are served one at a time and each stream reaches only
    /// one caller. Dropping the future before it completes does not lose a
    /// stream.
    ///
    /// # Errors
    ///
    /// [`Error::ListenerClosed`] as soon as the listener is closed, including
    /// when it already was before the call.
    pub async fn accept(&self) -> Result<StreamConn<S>, Error> {
        match self.handoff.take(&self.cancel).await {
            Some(stream) => {
                let conn = StreamConn::new(stream);
                debug!("Accepted {conn}");
                Ok(conn)
            }
            None => Err(Error::ListenerClosed),
        }
    }

    /// Close the listener.
    ///
    /// Cancels the governing token. Pending and future accepts return
    /// [`Error::ListenerClosed`] and inbound streams still waiting for a
    /// listener are dropped.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("Closing listener on {}", self.addr);
        }
        self.cancel.cancel();
    }

    /// Whether the listener has been closed.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The local host identity as an address.
    pub fn addr(&self) -> PeerAddr<S::PeerId> {
        self.addr.clone()
    }

    /// Turn the listener into a stream of accepted connections.
    ///
    /// The stream ends once the listener is closed, which is the shape RPC
    /// servers take as an incoming connection source.
    pub fn into_incoming(self) -> impl Stream<Item = Result<StreamConn<S>, Error>> + Send {
        stream::unfold(self, |listener| async move {
            let accepted = listener.accept().await;
            match accepted {
                Ok(conn) => Some((Ok(conn), listener)),
                Err(Error::ListenerClosed) => None,
                Err(e) => Some((Err(e), listener)),
            }
        })
    }
}

impl<S: PeerStream> fmt::Debug for StreamListener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamListener")
            .field("addr", &self.addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl<S: PeerStream> Listener for StreamListener<S> {
    type Conn = StreamConn<S>;
    type Addr = PeerAddr<S::PeerId>;

    async fn accept(&self) -> Result<Self::Conn, Error> {
        StreamListener::accept(self).await
    }

    fn close(&self) -> Result<(), Error> {
        StreamListener::close(self);
        Ok(())
    }

    fn addr(&self) -> Self::Addr {
        StreamListener::addr(self)
    }
}
