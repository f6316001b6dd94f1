//! Drop-in transport: compress the connection, then hand it to the muxer.

use crate::codec::CompressCodec;
use crate::config::CompressConfig;
use crate::conn::CompressedConn;
use crate::error::CompressError;
use crate::muxer::{Side, StreamMuxer};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Interposes a [`CompressedConn`] between every raw connection and an
/// inner multiplexer.
///
/// From the outside this is just another [`StreamMuxer`]: the side flag
/// and accounting scope pass through untouched, and the sessions it
/// produces are the inner muxer's own. Compression is invisible above
/// this point.
pub struct CompressedTransport<M> {
    muxer: M,
    codec: Arc<dyn CompressCodec>,
    config: CompressConfig,
}

impl<M> CompressedTransport<M> {
    /// Builds a transport from an inner muxer and a codec.
    pub fn new(muxer: M, codec: Arc<dyn CompressCodec>, config: CompressConfig) -> Self {
        Self {
            muxer,
            codec,
            config,
        }
    }

    /// The inner muxer.
    pub fn muxer(&self) -> &M {
        &self.muxer
    }
}

#[async_trait]
impl<M: StreamMuxer> StreamMuxer for CompressedTransport<M> {
    type Muxed = M::Muxed;
    type Scope = M::Scope;
    type Error = CompressError;

    async fn new_conn<C>(
        &self,
        conn: C,
        side: Side,
        scope: Self::Scope,
    ) -> Result<Self::Muxed, Self::Error>
    where
        C: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let wrapped = CompressedConn::wrap(conn, self.codec.as_ref(), self.config.clone())?;
        debug!("muxing compressed connection {} as {:?}", wrapped.id(), side);
        self.muxer
            .new_conn(wrapped, side, scope)
            .await
            .map_err(|err| CompressError::Mux(Box::new(err)))
    }
}
