//! Zstandard binding for the pressmux compression layer.
//!
//! [`ZstdCodec`] implements [`CompressCodec`] on top of streaming zstd:
//! each connection gets one encoder frame for its whole lifetime, flushes
//! end the current block so the peer can decode everything written so far,
//! and shutdown finalizes the frame. The [`transport`] helper wraps a muxer
//! with this codec and default settings in one call.

#![warn(missing_docs)]

use async_compression::tokio::bufread::ZstdDecoder;
use async_compression::tokio::write::ZstdEncoder;
use async_compression::Level;
use pressmux::{
    ByteSink, ByteSource, CompressCodec, CompressConfig, CompressedTransport, StreamMuxer,
};
use std::io;
use std::sync::Arc;
use tokio::io::BufReader;

/// Protocol identifier advertised when negotiating zstd-compressed
/// multiplexing with a peer.
pub const PROTOCOL_ID: &str = "/pressmux/zstd/1.0.0";

/// Zstandard codec for [`CompressedTransport`].
///
/// Defaults to the fastest compression level: the layer sits on the hot
/// path of every stream, so throughput wins over ratio.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: Level,
}

impl ZstdCodec {
    /// Codec at the fastest compression level.
    pub fn new() -> Self {
        Self {
            level: Level::Fastest,
        }
    }

    /// Codec at a specific numeric compression level.
    pub fn with_level(level: i32) -> Self {
        Self {
            level: Level::Precise(level),
        }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressCodec for ZstdCodec {
    fn new_encoder(&self, sink: ByteSink) -> io::Result<ByteSink> {
        Ok(Box::new(ZstdEncoder::with_quality(sink, self.level)))
    }

    fn new_decoder(&self, source: ByteSource) -> io::Result<ByteSource> {
        Ok(Box::new(ZstdDecoder::new(BufReader::new(source))))
    }
}

/// Wraps a muxer in a zstd-compressed transport with default settings.
pub fn transport<M: StreamMuxer>(muxer: M) -> CompressedTransport<M> {
    CompressedTransport::new(muxer, Arc::new(ZstdCodec::new()), CompressConfig::default())
}
