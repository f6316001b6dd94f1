//! Common test utilities and helpers.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing_subscriber::EnvFilter;

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("pressmux=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

/// Test data generator for various sizes
pub fn generate_test_data(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut rng = rand::thread_rng();
    let mut data = vec![0u8; size];
    rng.fill_bytes(&mut data);
    data
}

/// Repetitive payload that any real codec shrinks
pub fn generate_compressible_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i / 64) % 251) as u8).collect()
}

/// Assert that an operation completes within a time limit
pub async fn assert_completes_within<F, T>(duration: Duration, future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .expect("operation did not complete within time limit")
}

/// Failure script for a [`ScriptedConn`].
#[derive(Default)]
pub struct Script {
    /// Every flush fails with this error.
    pub fail_flush: Option<(io::ErrorKind, &'static str)>,
    /// Every shutdown fails with this error.
    pub fail_shutdown: Option<(io::ErrorKind, &'static str)>,
}

#[derive(Default)]
struct ScriptState {
    written: Vec<u8>,
    flushes: usize,
    shutdowns: usize,
    script: Script,
}

/// Inspection handle for a [`ScriptedConn`].
#[derive(Clone)]
pub struct ScriptHandle(Arc<Mutex<ScriptState>>);

impl ScriptHandle {
    /// Bytes the connection has accepted so far.
    pub fn written(&self) -> Vec<u8> {
        self.0.lock().unwrap().written.clone()
    }

    /// Number of flushes the connection has seen.
    pub fn flushes(&self) -> usize {
        self.0.lock().unwrap().flushes
    }

    /// Number of shutdowns the connection has seen.
    pub fn shutdowns(&self) -> usize {
        self.0.lock().unwrap().shutdowns
    }
}

/// Write-side test double: records writes, counts flushes and shutdowns,
/// and fails them according to its script. Reads never complete.
pub struct ScriptedConn(Arc<Mutex<ScriptState>>);

/// Builds a scripted connection and its inspection handle.
pub fn scripted_conn(script: Script) -> (ScriptedConn, ScriptHandle) {
    let state = Arc::new(Mutex::new(ScriptState {
        script,
        ..ScriptState::default()
    }));
    (ScriptedConn(Arc::clone(&state)), ScriptHandle(state))
}

impl AsyncRead for ScriptedConn {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for ScriptedConn {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut st = self.0.lock().unwrap();
        st.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut st = self.0.lock().unwrap();
        st.flushes += 1;
        if let Some((kind, message)) = st.script.fail_flush {
            return Poll::Ready(Err(io::Error::new(kind, message)));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut st = self.0.lock().unwrap();
        st.shutdowns += 1;
        if let Some((kind, message)) = st.script.fail_shutdown {
            return Poll::Ready(Err(io::Error::new(kind, message)));
        }
        Poll::Ready(Ok(()))
    }
}
