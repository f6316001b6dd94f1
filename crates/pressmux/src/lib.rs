//! # Pressmux
//!
//! Transparent compression between a raw byte-stream connection and a
//! stream multiplexer.
//!
//! The layer intercepts all reads and writes on a connection, compresses
//! outbound bytes and decompresses inbound bytes with a pluggable codec,
//! and tracks compressed vs. uncompressed byte counts for observability.
//! Encoders buffer, so small writes would otherwise sit invisible to the
//! peer; a per-connection background task flushes the encoder one debounce
//! interval after the first write of a burst, amortizing framing overhead
//! across back-to-back small messages while keeping flush latency bounded.
//!
//! ## Architecture
//!
//! - **Counting I/O**: decorators over the raw halves measure exactly what
//!   crosses the wire
//! - **Codec seam**: one encoder/decoder pair bound per connection via
//!   [`CompressCodec`]
//! - **Connection wrapper**: [`CompressedConn`] with a mutex-guarded write
//!   path and the debounced flush scheduler
//! - **Muxer boundary**: [`StreamMuxer`]/[`MuxedConn`] traits and the
//!   [`CompressedTransport`] adapter that interposes compression under any
//!   multiplexer
//!
//! Algorithm bindings live in sibling crates; `pressmux-zstd` ships the
//! zstd codec.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod codec;
pub mod config;
pub mod conn;
pub mod error;
pub mod io;
pub mod metrics;
pub mod muxer;
pub mod transport;

// Re-export commonly used types
pub use codec::{ByteSink, ByteSource, CompressCodec, IdentityCodec};
pub use config::CompressConfig;
pub use conn::{CompressedConn, ConnectionId};
pub use error::{CompressError, Result};
pub use metrics::{CompressionMetrics, MetricsSnapshot};
pub use muxer::{MuxedConn, Side, StreamMuxer};
pub use transport::CompressedTransport;
