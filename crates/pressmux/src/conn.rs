//! The compressing connection wrapper and its flush scheduler.

use crate::codec::CompressCodec;
use crate::config::CompressConfig;
use crate::error::{CompressError, Result};
use crate::io::{CountingReader, CountingWriter};
use crate::metrics::CompressionMetrics;
use futures::future::BoxFuture;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::sync::{Mutex, Notify, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Identifier attached to a wrapped connection's log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Copy of an `io::Error` that can be replayed on later calls
/// (`io::Error` itself is not `Clone`).
#[derive(Debug)]
struct SavedError {
    kind: io::ErrorKind,
    message: String,
}

impl SavedError {
    fn of(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    fn to_io(&self) -> io::Error {
        io::Error::new(self.kind, self.message.clone())
    }
}

/// Write-side state shared between the wrapper and the flush task.
struct WriteState {
    encoder: Box<dyn AsyncWrite + Send + Unpin>,
    /// A flush is scheduled and not yet performed.
    armed: bool,
    /// First flush failure; set once, never cleared. Gates all later
    /// writes.
    flush_err: Option<SavedError>,
    /// Recorded shutdown outcome, replayed by repeat close calls.
    closed: Option<std::result::Result<(), SavedError>>,
}

/// Lock acquisition state for the write-path poll methods.
///
/// The write mutex must stay held while the encoder is mid-operation, so
/// the guard is owned and survives `Pending` returns.
enum Gate {
    Idle,
    Locking(BoxFuture<'static, OwnedMutexGuard<WriteState>>),
    Locked(OwnedMutexGuard<WriteState>),
}

/// A connection that transparently compresses writes and decompresses
/// reads.
///
/// Wraps any duplex byte stream. Outbound bytes pass through the codec's
/// encoder into the raw write half; inbound bytes come out of the codec's
/// decoder over the raw read half. Four counters track wire and
/// application byte totals for both directions.
///
/// Because encoders buffer, a small write may produce no wire bytes until
/// a flush. A per-connection background task flushes the encoder one
/// debounce interval after the first write of a burst, so back-to-back
/// small writes share one flush and framing overhead while flush latency
/// stays bounded. An explicit [`flush`](AsyncWriteExt::flush) forces the
/// same thing synchronously.
///
/// Shutdown finalizes the compressed stream, closes the raw write half,
/// and stops the flush task; repeat shutdowns replay the first outcome.
/// The read half stays usable until drop.
pub struct CompressedConn {
    id: ConnectionId,
    decoder: Box<dyn AsyncRead + Send + Unpin>,
    shared: Arc<Mutex<WriteState>>,
    kick: Arc<Notify>,
    flush_task: JoinHandle<()>,
    gate: Gate,
    metrics: CompressionMetrics,
}

impl CompressedConn {
    /// Interposes `codec` on `raw`.
    ///
    /// Splits the connection, binds the codec's encoder over the counted
    /// write half and its decoder over the counted read half, then starts
    /// the flush scheduler. If either factory fails, nothing is left
    /// running and `raw` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, as the flush scheduler is
    /// spawned onto it.
    pub fn wrap<C>(raw: C, codec: &dyn CompressCodec, config: CompressConfig) -> Result<Self>
    where
        C: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let id = ConnectionId::new();
        let metrics = CompressionMetrics::new();
        let (read_half, write_half) = tokio::io::split(raw);

        let encoder = codec
            .new_encoder(Box::new(CountingWriter::new(
                write_half,
                metrics.net_write_counter(),
            )))
            .map_err(CompressError::EncoderInit)?;
        let decoder = codec
            .new_decoder(Box::new(CountingReader::new(
                read_half,
                metrics.net_read_counter(),
            )))
            .map_err(CompressError::DecoderInit)?;

        let shared = Arc::new(Mutex::new(WriteState {
            encoder,
            armed: false,
            flush_err: None,
            closed: None,
        }));
        let kick = Arc::new(Notify::new());
        let flush_task = tokio::spawn(flush_loop(
            id,
            Arc::clone(&shared),
            Arc::clone(&kick),
            config.flush_interval,
        ));

        debug!(
            "wrapped connection {} (flush interval {:?})",
            id, config.flush_interval
        );

        Ok(Self {
            id,
            decoder,
            shared,
            kick,
            flush_task,
            gate: Gate::Idle,
            metrics,
        })
    }

    /// This connection's identifier, as attached to its log events.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// A handle to this connection's byte counters.
    ///
    /// The handle stays readable after the connection is closed or
    /// dropped.
    pub fn metrics(&self) -> CompressionMetrics {
        self.metrics.clone()
    }

    /// Drives the gate until the write mutex is held.
    fn poll_gate(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            match &mut self.gate {
                Gate::Locked(_) => return Poll::Ready(()),
                Gate::Idle => {
                    self.gate = Gate::Locking(Box::pin(Arc::clone(&self.shared).lock_owned()));
                }
                Gate::Locking(fut) => {
                    let guard = ready!(fut.as_mut().poll(cx));
                    self.gate = Gate::Locked(guard);
                }
            }
        }
    }
}

impl AsyncRead for CompressedConn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.decoder).poll_read(cx, buf))?;
        let n = buf.filled().len() - before;
        if n > 0 {
            this.metrics.add_uncomp_read(n as u64);
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for CompressedConn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_gate(cx));
        let Gate::Locked(guard) = &mut this.gate else {
            unreachable!()
        };
        let st = &mut **guard;

        if let Some(err) = &st.flush_err {
            let err = err.to_io();
            this.gate = Gate::Idle;
            return Poll::Ready(Err(err));
        }
        if st.closed.is_some() {
            this.gate = Gate::Idle;
            return Poll::Ready(Err(closed_error()));
        }

        // A pending encoder write keeps the lock, so the scheduler cannot
        // slip a flush into the middle of it.
        match ready!(Pin::new(&mut st.encoder).poll_write(cx, buf)) {
            Ok(n) => {
                this.metrics.add_uncomp_write(n as u64);
                if n > 0 && !st.armed {
                    st.armed = true;
                    this.kick.notify_one();
                }
                this.gate = Gate::Idle;
                Poll::Ready(Ok(n))
            }
            Err(err) => {
                this.gate = Gate::Idle;
                Poll::Ready(Err(err))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_gate(cx));
        let Gate::Locked(guard) = &mut this.gate else {
            unreachable!()
        };
        let st = &mut **guard;

        if let Some(err) = &st.flush_err {
            let err = err.to_io();
            this.gate = Gate::Idle;
            return Poll::Ready(Err(err));
        }
        if st.closed.is_some() {
            this.gate = Gate::Idle;
            return Poll::Ready(Ok(()));
        }

        match ready!(Pin::new(&mut st.encoder).poll_flush(cx)) {
            Ok(()) => {
                st.armed = false;
                this.gate = Gate::Idle;
                Poll::Ready(Ok(()))
            }
            Err(err) => {
                st.armed = false;
                st.flush_err = Some(SavedError::of(&err));
                warn!(
                    "flush failed on connection {}: {}; write path disabled",
                    this.id, err
                );
                this.gate = Gate::Idle;
                Poll::Ready(Err(err))
            }
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_gate(cx));
        let Gate::Locked(guard) = &mut this.gate else {
            unreachable!()
        };
        let st = &mut **guard;

        if let Some(prev) = &st.closed {
            let res = match prev {
                Ok(()) => Ok(()),
                Err(err) => Err(err.to_io()),
            };
            this.gate = Gate::Idle;
            return Poll::Ready(res);
        }

        // Stop the scheduler before finalizing so no flush can race the
        // stream trailer.
        this.flush_task.abort();

        let res = ready!(Pin::new(&mut st.encoder).poll_shutdown(cx));
        st.armed = false;
        st.closed = Some(match &res {
            Ok(()) => Ok(()),
            Err(err) => Err(SavedError::of(err)),
        });
        debug!("closed connection {} (ok={})", this.id, res.is_ok());
        this.gate = Gate::Idle;
        Poll::Ready(res)
    }
}

impl Drop for CompressedConn {
    fn drop(&mut self) {
        self.flush_task.abort();
    }
}

impl fmt::Debug for CompressedConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedConn")
            .field("id", &self.id)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "connection closed")
}

/// Background debounce task. Each burst's first write kicks it; one
/// interval later it flushes the encoder so buffered compressed output
/// reaches the wire without waiting for more traffic. A wake-up whose
/// burst was already drained by an explicit flush finds the armed flag
/// clear and does nothing.
async fn flush_loop(
    id: ConnectionId,
    shared: Arc<Mutex<WriteState>>,
    kick: Arc<Notify>,
    interval: Duration,
) {
    loop {
        kick.notified().await;
        tokio::time::sleep(interval).await;

        let mut st = shared.lock().await;
        if !st.armed {
            continue;
        }
        st.armed = false;
        if st.flush_err.is_some() || st.closed.is_some() {
            continue;
        }
        trace!("scheduled flush on connection {}", id);
        if let Err(err) = st.encoder.flush().await {
            warn!(
                "scheduled flush failed on connection {}: {}; write path disabled",
                id, err
            );
            if st.flush_err.is_none() {
                st.flush_err = Some(SavedError::of(&err));
            }
        }
    }
}
