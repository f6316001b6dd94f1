//! The pluggable compression seam.

use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed byte sink used at the codec boundary.
pub type ByteSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed byte source used at the codec boundary.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// A compression algorithm bound to a connection as an encoder/decoder
/// pair.
///
/// Both factories run once per connection, at wrap time. The returned
/// encoder owns the algorithm's write-side state: its `poll_flush` must
/// force everything buffered so far onto the sink in a form the peer's
/// decoder can consume without waiting for end of stream, and its
/// `poll_shutdown` must finalize the compressed stream before shutting the
/// sink down. The returned decoder owns the read-side state: it must serve
/// partial reads, surface corrupt input as an error rather than garbage,
/// and report clean end of stream as a zero-length read.
pub trait CompressCodec: Send + Sync {
    /// Binds the write-side state machine for one connection.
    fn new_encoder(&self, sink: ByteSink) -> io::Result<ByteSink>;

    /// Binds the read-side state machine for one connection.
    fn new_decoder(&self, source: ByteSource) -> io::Result<ByteSource>;
}

/// Pass-through codec: no compression, bytes flow unchanged.
///
/// Useful as a baseline and wherever the wrapper's accounting and flush
/// scheduling are wanted without a real algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl CompressCodec for IdentityCodec {
    fn new_encoder(&self, sink: ByteSink) -> io::Result<ByteSink> {
        Ok(sink)
    }

    fn new_decoder(&self, source: ByteSource) -> io::Result<ByteSource> {
        Ok(source)
    }
}
