//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::pin::Pin;

use openssl::ssl::{Ssl, SslConnector, SslMethod, SslVerifyMode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;

pub const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const FIREFOX_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Build a complete TLS record carrying a ClientHello
pub fn client_hello_record(suites: &[u16], extensions: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x5a; 32]);
    body.push(0);
    put_u16(&mut body, (suites.len() * 2) as u16);
    for suite in suites {
        put_u16(&mut body, *suite);
    }
    body.extend_from_slice(&[1, 0]);

    let mut ext_block = Vec::new();
    for (ty, payload) in extensions {
        put_u16(&mut ext_block, *ty);
        put_u16(&mut ext_block, payload.len() as u16);
        ext_block.extend_from_slice(payload);
    }
    put_u16(&mut body, ext_block.len() as u16);
    body.extend_from_slice(&ext_block);

    let len = body.len();
    let mut handshake = vec![0x01, (len >> 16) as u8, (len >> 8) as u8, len as u8];
    handshake.extend_from_slice(&body);

    let mut record = vec![0x16, 0x03, 0x01];
    put_u16(&mut record, handshake.len() as u16);
    record.extend_from_slice(&handshake);
    record
}

/// Supported-groups extension payload
pub fn curves_payload(curves: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, (curves.len() * 2) as u16);
    for curve in curves {
        put_u16(&mut out, *curve);
    }
    out
}

/// A ClientHello shaped like a recent Chrome
pub fn chrome_like_record() -> Vec<u8> {
    client_hello_record(
        &[0x1301, 0x1302, 0xc02b, 0xc02f, 0xcca9, 0x002f],
        &[
            (0, Vec::new()),
            (23, Vec::new()),
            (65281, vec![0]),
            (10, curves_payload(&[29, 23, 24])),
            (11, vec![1, 0]),
            (35, Vec::new()),
            (16, Vec::new()),
            (5, Vec::new()),
            (13, Vec::new()),
        ],
    )
}

/// Open a TLS connection with OpenSSL, skipping certificate verification
pub async fn tls_connect(addr: SocketAddr) -> SslStream<TcpStream> {
    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    builder.set_verify(SslVerifyMode::NONE);
    let connector = builder.build();

    let ssl: Ssl = connector
        .configure()
        .unwrap()
        .verify_hostname(false)
        .into_ssl("localhost")
        .unwrap();

    let tcp = TcpStream::connect(addr).await.unwrap();
    let mut stream = SslStream::new(ssl, tcp).unwrap();
    Pin::new(&mut stream).connect().await.unwrap();
    stream
}

/// Capture the ClientHello record an OpenSSL client sends, without a server
pub async fn openssl_client_hello() -> Vec<u8> {
    let connector = SslConnector::builder(SslMethod::tls()).unwrap().build();
    let ssl = connector.configure().unwrap().into_ssl("localhost").unwrap();

    let (client, mut wire) = tokio::io::duplex(64 * 1024);
    let mut stream = SslStream::new(ssl, client).unwrap();
    let handshake = tokio::spawn(async move {
        let _ = Pin::new(&mut stream).connect().await;
    });

    let mut record = vec![0u8; 5];
    wire.read_exact(&mut record).await.unwrap();
    let len = u16::from_be_bytes([record[3], record[4]]) as usize;
    record.resize(5 + len, 0);
    wire.read_exact(&mut record[5..]).await.unwrap();

    handshake.abort();
    record
}

/// Send one request with `Connection: close` and return the whole response
pub async fn https_get(addr: SocketAddr, user_agent: &str) -> String {
    let mut stream = tls_connect(addr).await;
    let request = format!(
        "GET /check HTTP/1.1\r\nHost: localhost\r\nUser-Agent: {}\r\nConnection: close\r\n\r\n",
        user_agent
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    // Some peers skip close_notify; whatever arrived is enough.
    let _ = stream.read_to_end(&mut response).await;
    String::from_utf8(response).unwrap()
}

/// Split a response into head and body
pub fn split_response(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").unwrap()
}
