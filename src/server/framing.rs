//! Minimal HTTP/1.x framing
//!
//! Just enough to read request heads off the decrypted stream and write
//! responses back; request bodies are skipped.

use bytes::{Buf, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{Method, Request, Response, Version};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::{DetectorError, Result};

const MAX_HEADERS: usize = 64;

/// Parse a complete request head from the start of `buf`
///
/// Returns the request and the number of bytes the head occupied, or
/// `None` if more data is needed.
pub fn parse_request_head(buf: &[u8]) -> Result<Option<(Request<()>, usize)>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(DetectorError::Http(format!("Malformed request head: {}", e))),
    };

    let version = match req.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };
    let mut builder = Request::builder()
        .method(req.method.unwrap_or("GET"))
        .uri(req.path.unwrap_or("/"))
        .version(version);
    for header in req.headers.iter() {
        builder = builder.header(header.name, header.value);
    }

    Ok(Some((builder.body(())?, len)))
}

/// Read the next request head from `stream`
///
/// `buf` carries bytes across calls (pipelined requests). Returns `None`
/// when the client closed the connection between requests.
pub async fn read_request<S>(
    stream: &mut S,
    buf: &mut BytesMut,
    max_head: usize,
) -> Result<Option<Request<()>>>
where
    S: AsyncRead + Unpin,
{
    loop {
        if !buf.is_empty() {
            if let Some((request, len)) = parse_request_head(buf)? {
                buf.advance(len);
                return Ok(Some(request));
            }
            if buf.len() > max_head {
                return Err(DetectorError::Http(format!(
                    "Request head exceeds {} bytes",
                    max_head
                )));
            }
        }

        if stream.read_buf(buf).await? == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(DetectorError::Io(std::io::ErrorKind::UnexpectedEof.into()))
            };
        }
    }
}

/// Body framing of a request, as far as this server cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body or an exact `Content-Length`
    Length(usize),
    /// Chunked or otherwise unknown length; the connection cannot be reused
    Unframed,
}

/// Determine how the request body is delimited
pub fn body_framing<B>(request: &Request<B>) -> Result<BodyFraming> {
    if request.headers().contains_key(TRANSFER_ENCODING) {
        return Ok(BodyFraming::Unframed);
    }

    match request.headers().get(CONTENT_LENGTH) {
        None => Ok(BodyFraming::Length(0)),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map(BodyFraming::Length)
            .ok_or_else(|| DetectorError::Http("Invalid Content-Length".to_string())),
    }
}

/// Skip `len` body bytes, consuming from `buf` first
pub async fn discard_body<S>(stream: &mut S, buf: &mut BytesMut, mut len: usize) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    loop {
        let n = len.min(buf.len());
        buf.advance(n);
        len -= n;
        if len == 0 {
            return Ok(());
        }
        if stream.read_buf(buf).await? == 0 {
            return Err(DetectorError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
    }
}

/// Whether the client asked to keep the connection open
pub fn wants_keep_alive<B>(request: &Request<B>) -> bool {
    let connection = request
        .headers()
        .get(CONNECTION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    match request.version() {
        Version::HTTP_10 => connection.contains("keep-alive"),
        _ => !connection.contains("close"),
    }
}

/// Serialize a response as HTTP/1.1
///
/// `Content-Length` and `Connection` are always written by this function;
/// values set by the handler are replaced.
pub fn encode_response(response: &Response<Vec<u8>>, method: &Method, keep_alive: bool) -> Vec<u8> {
    let status = response.status();
    let body = response.body();

    let mut out = Vec::with_capacity(256 + body.len());
    out.extend_from_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .as_bytes(),
    );
    for (name, value) in response.headers() {
        if name == CONTENT_LENGTH || name == CONNECTION {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(
        format!(
            "content-length: {}\r\nconnection: {}\r\n\r\n",
            body.len(),
            if keep_alive { "keep-alive" } else { "close" }
        )
        .as_bytes(),
    );
    if method != Method::HEAD {
        out.extend_from_slice(body);
    }
    out
}
