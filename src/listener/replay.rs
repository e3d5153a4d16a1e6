//! Stream that replays already-consumed bytes
//!
//! Reading the ClientHello removes it from the socket. `ReplayStream` puts it
//! back: reads drain the captured prefix first and then continue on the live
//! stream, so the TLS server sees the connection exactly as the client sent it.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A stream whose first reads return a captured prefix
#[derive(Debug)]
pub struct ReplayStream<S> {
    prefix: Bytes,
    inner: S,
}

impl<S> ReplayStream<S> {
    /// Wrap `inner`, replaying `prefix` before any of its own data
    pub fn new(prefix: Bytes, inner: S) -> Self {
        Self { prefix, inner }
    }

    /// Bytes still waiting to be replayed
    pub fn pending(&self) -> &[u8] {
        &self.prefix
    }

    /// Underlying stream
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Underlying stream, mutably
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap into the unread prefix and the underlying stream
    pub fn into_parts(self) -> (Bytes, S) {
        (self.prefix, self.inner)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ReplayStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if !this.prefix.is_empty() {
            let n = this.prefix.len().min(buf.remaining());
            buf.put_slice(&this.prefix[..n]);
            this.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ReplayStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
