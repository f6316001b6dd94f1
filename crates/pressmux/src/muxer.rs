//! Boundary traits for the stream multiplexer sitting above the
//! compression layer.
//!
//! The layer does not multiplex anything itself; it hands a wrapped
//! connection to whatever implements [`StreamMuxer`] and stays out of the
//! way. These traits pin down exactly what the layer needs from its
//! collaborators and nothing more.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Which end of the connection this endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The endpoint that initiated the connection.
    Dialer,
    /// The endpoint that accepted the connection.
    Listener,
}

/// A multiplexed session over one underlying connection.
#[async_trait]
pub trait MuxedConn: Send {
    /// The logical substream type.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin;

    /// Opens an outbound substream.
    async fn open_stream(&mut self) -> io::Result<Self::Stream>;

    /// Waits for the peer to open a substream.
    async fn accept_stream(&mut self) -> io::Result<Self::Stream>;

    /// Whether the session is fully closed.
    fn is_closed(&self) -> bool;

    /// Closes the session and the underlying connection.
    async fn close(&mut self) -> io::Result<()>;
}

/// Builds multiplexed sessions over raw connections.
#[async_trait]
pub trait StreamMuxer: Send + Sync {
    /// Session type produced by this muxer.
    type Muxed: MuxedConn;

    /// Opaque resource-accounting scope, passed through untouched.
    type Scope: Send + 'static;

    /// Error type for session setup.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds a session over `conn`.
    ///
    /// `side` tells the muxer which endpoint it is (most multiplexing
    /// protocols are asymmetric about stream identifiers); `scope` is the
    /// caller's accounting handle.
    async fn new_conn<C>(
        &self,
        conn: C,
        side: Side,
        scope: Self::Scope,
    ) -> Result<Self::Muxed, Self::Error>
    where
        C: AsyncRead + AsyncWrite + Send + Unpin + 'static;
}
