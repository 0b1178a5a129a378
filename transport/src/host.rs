//! Capabilities required from the peer-to-peer host.
//!
//! The adapter never talks to a concrete networking stack. It only needs a
//! [`Host`] that can register a [`StreamHandler`] under a protocol identifier
//! and open outbound streams, and a [`PeerStream`] that is a byte pipe aware of
//! both endpoint identities. The [`memory`](crate::memory) module provides an
//! in-process implementation.

use async_trait::async_trait;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Identifier of a participant in the peer-to-peer network.
///
/// The identity is opaque to this crate. It only has to be comparable, hashable,
/// and render a canonical text form through [`Display`](fmt::Display).
pub trait PeerIdentity:
    Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + Unpin + 'static
{
}

impl<T> PeerIdentity for T where
    T: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + Unpin + 'static
{
}

/// A bidirectional byte pipe multiplexed over one peer-to-peer connection.
///
/// Reads, writes, and shutdown come from [`AsyncRead`]/[`AsyncWrite`]. The
/// underlying connection has exactly one local and one remote identity for
/// the life of the stream.
pub trait PeerStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Identity type of the endpoints.
    type PeerId: PeerIdentity;

    /// Identity of this end of the underlying connection.
    fn local_peer(&self) -> Self::PeerId;

    /// Identity of the remote end of the underlying connection.
    fn remote_peer(&self) -> Self::PeerId;
}

/// Sink the host calls once per inbound stream opened under a protocol.
///
/// Hosts may invoke this concurrently from independent tasks.
#[async_trait]
pub trait StreamHandler<S>: Send + Sync {
    /// Take ownership of an inbound stream.
    async fn handle_stream(&self, stream: S);
}

/// The peer-to-peer host this crate attaches to.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// Identity type of peers on this network.
    type PeerId: PeerIdentity;
    /// Stream type produced by this host.
    type Stream: PeerStream<PeerId = Self::PeerId>;

    /// This host's own identity.
    fn id(&self) -> Self::PeerId;

    /// Install `handler` for streams opened by remote peers under `protocol`.
    ///
    /// Replaces any handler previously registered for the same protocol.
    fn set_stream_handler(&self, protocol: &str, handler: Arc<dyn StreamHandler<Self::Stream>>);

    /// Open an outbound stream to `peer` under `protocol`.
    ///
    /// # Errors
    ///
    /// Fails if the peer has no known address, is unreachable, or protocol
    /// negotiation fails.
    async fn new_stream(&self, peer: &Self::PeerId, protocol: &str) -> io::Result<Self::Stream>;
}
