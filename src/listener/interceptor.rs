//! ClientHello interception
//!
//! The TLS implementation never exposes the raw ClientHello, so it is read
//! off the socket before the handshake starts, decoded, recorded in the
//! fingerprint table and then replayed to the TLS server unchanged.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use log::{debug, trace};
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_openssl::SslStream;

use crate::common::Result;
use crate::fingerprint::{parse_raw_client_hello, ConnKey, FingerprintTable, Registration};
use super::replay::ReplayStream;

/// TLS record header: content type (1), version (2), length (2)
const RECORD_HEADER_LEN: usize = 5;

/// Anything that hands out incoming byte streams
///
/// This is the seam the interceptor decorates; `tokio::net::TcpListener`
/// is the production implementation.
pub trait StreamListener: Send + Sync {
    /// Connection type produced by this listener
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next connection and its remote address
    #[allow(async_fn_in_trait)]
    async fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)>;
}

impl StreamListener for TcpListener {
    type Stream = tokio::net::TcpStream;

    async fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// A connection after interception
///
/// `stream` is ready for the TLS handshake (`SslStream::accept`) but the
/// handshake has not been performed yet.
pub struct Accepted<S> {
    /// TLS server stream over the replayed connection
    pub stream: SslStream<ReplayStream<S>>,
    /// Key of this connection in the fingerprint table
    pub conn: ConnKey,
    /// Whether a ClientHello was captured and recorded
    pub fingerprinted: bool,
    /// Keeps the table entry alive; dropped when the connection is done
    pub registration: Option<Registration>,
}

impl<S> std::fmt::Debug for Accepted<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accepted")
            .field("conn", &self.conn)
            .field("fingerprinted", &self.fingerprinted)
            .field("stream", &"<SslStream>")
            .finish()
    }
}

/// Reads and records the ClientHello of accepted connections
#[derive(Clone)]
pub struct HelloInterceptor {
    acceptor: Arc<SslAcceptor>,
    table: FingerprintTable,
    read_timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl HelloInterceptor {
    /// Create an interceptor
    ///
    /// # Parameters
    ///
    /// * `acceptor` - TLS server configuration used for the real handshake
    /// * `table` - Where captured ClientHellos are stored
    /// * `read_timeout` - Upper bound for reading the ClientHello
    pub fn new(acceptor: Arc<SslAcceptor>, table: FingerprintTable, read_timeout: Duration) -> Self {
        Self {
            acceptor,
            table,
            read_timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The table this interceptor writes to
    pub fn table(&self) -> &FingerprintTable {
        &self.table
    }

    /// Capture the ClientHello of `stream` and prepare it for the TLS handshake
    ///
    /// Failing to read the ClientHello (timeout, early close, short read) is
    /// not an error: the connection is passed on without a fingerprint and
    /// the handshake reports whatever is wrong with it.
    ///
    /// # Errors
    ///
    /// Only if OpenSSL cannot allocate the session object.
    pub async fn intercept<S>(&self, mut stream: S, peer: SocketAddr) -> Result<Accepted<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let conn = ConnKey::new(self.next_id.fetch_add(1, Ordering::Relaxed), peer);
        let mut captured = BytesMut::with_capacity(1024);

        let read = timeout(self.read_timeout, read_client_hello(&mut stream, &mut captured)).await;

        let registration = match read {
            Ok(Ok(body_len)) => {
                let body = &captured[RECORD_HEADER_LEN..RECORD_HEADER_LEN + body_len];
                let info = parse_raw_client_hello(body);
                trace!(
                    "{}: record type {:#04x}, {} suites, {} extensions",
                    conn,
                    captured[0],
                    info.cipher_suites.len(),
                    info.extensions.len()
                );
                Some(self.table.register(conn, info))
            }
            Ok(Err(e)) => {
                debug!("{}: could not read ClientHello: {}", conn, e);
                None
            }
            Err(_) => {
                debug!("{}: timed out reading ClientHello after {:?}", conn, self.read_timeout);
                None
            }
        };

        // Everything read so far goes back in front of the live stream,
        // including a partial header after a failed read.
        let replay = ReplayStream::new(captured.freeze(), stream);
        let ssl = Ssl::new(self.acceptor.context())?;
        let stream = SslStream::new(ssl, replay)?;

        Ok(Accepted {
            stream,
            conn,
            fingerprinted: registration.is_some(),
            registration,
        })
    }
}

/// Read one TLS record into `buf`, returning the payload length
///
/// `buf` may end up holding more than the record; the extra bytes belong to
/// the client's next records and are replayed as well.
async fn read_client_hello<S>(stream: &mut S, buf: &mut BytesMut) -> io::Result<usize>
where
    S: AsyncRead + Unpin,
{
    fill(stream, buf, RECORD_HEADER_LEN).await?;
    let body_len = u16::from_be_bytes([buf[3], buf[4]]) as usize;
    fill(stream, buf, RECORD_HEADER_LEN + body_len).await?;
    Ok(body_len)
}

/// Read until `buf` holds at least `want` bytes
async fn fill<S>(stream: &mut S, buf: &mut BytesMut, want: usize) -> io::Result<()>
where
    S: AsyncRead + Unpin,
{
    while buf.len() < want {
        buf.reserve(want - buf.len());
        if stream.read_buf(buf).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed after {} of {} bytes", buf.len(), want),
            ));
        }
    }
    Ok(())
}

/// A listener whose accepted connections have already been fingerprinted
pub struct HelloListener<L> {
    inner: L,
    interceptor: HelloInterceptor,
}

impl<L: StreamListener> HelloListener<L> {
    /// Wrap `inner`
    pub fn new(inner: L, interceptor: HelloInterceptor) -> Self {
        Self { inner, interceptor }
    }

    /// Accept the next connection and capture its ClientHello
    ///
    /// The ClientHello read happens inline, bounded by the read timeout.
    /// Callers that must keep accepting while it runs should accept on the
    /// inner listener and call [`HelloInterceptor::intercept`] from a task.
    pub async fn accept(&self) -> Result<Accepted<L::Stream>> {
        let (stream, peer) = self.inner.accept().await?;
        self.interceptor.intercept(stream, peer).await
    }

    /// The wrapped listener
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// The interceptor applied to each connection
    pub fn interceptor(&self) -> &HelloInterceptor {
        &self.interceptor
    }

    /// The table fingerprints are recorded in
    pub fn table(&self) -> &FingerprintTable {
        self.interceptor.table()
    }
}

impl HelloListener<TcpListener> {
    /// Local address of the wrapped TCP listener
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
