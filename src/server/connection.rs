//! Per-connection handling
//!
//! Completes the TLS handshake on an intercepted connection, then serves
//! HTTP/1.1 requests until the client closes or asks to close.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use bytes::BytesMut;
use http::{Method, StatusCode};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::common::{DetectorError, Result};
use crate::config::DetectorConfig;
use crate::listener::Accepted;
use crate::verdict::MitmAnnotator;

use super::handler::{plain_response, RequestHandler};
use super::framing::{
    body_framing, discard_body, encode_response, read_request, wants_keep_alive, BodyFraming,
};

/// Bounds applied to one connection after its ClientHello was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Largest accepted request head, in bytes
    pub max_request_head: usize,
    /// Time allowed for the TLS handshake
    pub handshake_timeout: Duration,
    /// Time allowed for each read or write once the session is up
    pub idle_timeout: Duration,
}

impl From<&DetectorConfig> for ConnectionLimits {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            max_request_head: config.max_request_head,
            handshake_timeout: config.handshake_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Run `fut`, failing with `TimedOut` once `limit` passes
async fn bounded<T, E, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<DetectorError>,
{
    timeout(limit, fut)
        .await
        .map_err(|_| {
            DetectorError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} timed out after {:?}", what, limit),
            ))
        })?
        .map_err(Into::into)
}

/// Serve one intercepted connection
///
/// The table entry for the connection is removed when this returns, which
/// at the latest happens once a handshake, read or write exceeds its limit.
pub async fn serve_connection<S>(
    accepted: Accepted<S>,
    annotator: &MitmAnnotator,
    handler: &dyn RequestHandler,
    limits: ConnectionLimits,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Accepted {
        mut stream,
        conn,
        fingerprinted,
        registration: _registration,
    } = accepted;

    bounded(limits.handshake_timeout, "TLS handshake", async {
        Pin::new(&mut stream).accept().await.map_err(|e| {
            debug!("{}: TLS handshake failed: {}", conn, e);
            DetectorError::TlsHandshake(e.to_string())
        })
    })
    .await?;
    debug!(
        "{}: TLS handshake complete ({}, fingerprinted: {})",
        conn,
        stream.ssl().version_str(),
        fingerprinted
    );

    let hello = annotator.table().get(&conn);
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        let read = bounded(
            limits.idle_timeout,
            "request read",
            read_request(&mut stream, &mut buf, limits.max_request_head),
        )
        .await;
        let request = match read {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(DetectorError::Http(reason)) => {
                info!("{}: bad request: {}", conn, reason);
                let response = plain_response(StatusCode::BAD_REQUEST, "bad request\n");
                let bytes = encode_response(&response, &Method::GET, false);
                bounded(limits.idle_timeout, "response write", stream.write_all(&bytes)).await?;
                break;
            }
            Err(e) => return Err(e),
        };

        let framing = match body_framing(&request) {
            Ok(framing) => framing,
            Err(DetectorError::Http(reason)) => {
                info!("{}: bad request: {}", conn, reason);
                let response = plain_response(StatusCode::BAD_REQUEST, "bad request\n");
                let bytes = encode_response(&response, request.method(), false);
                bounded(limits.idle_timeout, "response write", stream.write_all(&bytes)).await?;
                break;
            }
            Err(e) => return Err(e),
        };
        if let BodyFraming::Length(len) = framing {
            bounded(
                limits.idle_timeout,
                "request body",
                discard_body(&mut stream, &mut buf, len),
            )
            .await?;
        }

        let keep_alive = wants_keep_alive(&request) && framing != BodyFraming::Unframed;
        let ctx = annotator.annotate(&request, conn);
        let response = handler.handle(&request, &ctx, &hello);

        info!(
            "{} \"{} {} {:?}\" {} mitm={} browser={}",
            conn,
            request.method(),
            request.uri(),
            request.version(),
            response.status().as_u16(),
            ctx.mitm,
            ctx.browser
        );

        let bytes = encode_response(&response, request.method(), keep_alive);
        bounded(limits.idle_timeout, "response write", async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        })
        .await?;

        if !keep_alive {
            break;
        }
    }

    if let Err(e) = bounded(limits.idle_timeout, "TLS shutdown", stream.shutdown()).await {
        debug!("{}: TLS shutdown failed: {}", conn, e);
    }
    Ok(())
}
