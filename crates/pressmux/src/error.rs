//! Error types for the compression layer.

use thiserror::Error;

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, CompressError>;

/// Main error type for compression-layer operations.
///
/// Errors on the data path itself (reads, writes, flushes) stay
/// `std::io::Error` because they travel through `AsyncRead`/`AsyncWrite`;
/// this enum covers connection setup and the multiplexer boundary.
#[derive(Error, Debug)]
pub enum CompressError {
    /// The codec failed to build an encoder over the write half.
    #[error("Encoder construction failed: {0}")]
    EncoderInit(#[source] std::io::Error),

    /// The codec failed to build a decoder over the read half.
    #[error("Decoder construction failed: {0}")]
    DecoderInit(#[source] std::io::Error),

    /// The inner multiplexer rejected the wrapped connection.
    #[error("Multiplexer error: {0}")]
    Mux(#[source] Box<dyn std::error::Error + Send + Sync>),
}
