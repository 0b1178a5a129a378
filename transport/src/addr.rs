//! Peer identity backed network addresses.

use crate::host::PeerIdentity;
use crate::runtime::Address;
use std::fmt;

/// Address family name reported by [`PeerAddr::network`].
///
/// Distinguishes peer-identity addresses from IP based ones in logs and
/// transport selection.
pub const NETWORK: &str = "libp2p";

/// A network address that is a peer identity rather than an IP and port.
///
/// The string form is the identity's canonical text encoding. Two addresses
/// are equal exactly when their identities are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr<P> {
    peer: P,
}

impl<P: PeerIdentity> PeerAddr<P> {
    /// Wrap a peer identity.
    pub fn new(peer: P) -> Self {
        Self { peer }
    }

    /// The wrapped peer identity.
    pub fn peer_id(&self) -> &P {
        &self.peer
    }

    /// Unwrap into the peer identity.
    pub fn into_peer_id(self) -> P {
        self.peer
    }

    /// The address family name, always [`NETWORK`].
    pub fn network(&self) -> &'static str {
        NETWORK
    }
}

impl<P: PeerIdentity> fmt::Display for PeerAddr<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.peer, f)
    }
}

impl<P: PeerIdentity> Address for PeerAddr<P> {
    fn network(&self) -> &str {
        NETWORK
    }
}

impl<P: PeerIdentity> From<P> for PeerAddr<P> {
    fn from(peer: P) -> Self {
        Self::new(peer)
    }
}
