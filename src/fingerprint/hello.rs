//! Raw ClientHello decoding
//!
//! Parses the payload of the first TLS handshake record into a [`RawHelloInfo`].
//! The decoder is deliberately forgiving: a truncated or malformed message
//! yields whatever fields were read before the problem, never an error,
//! because there is nobody to report an error to while a connection is
//! still being accepted.

use log::trace;
use serde::Serialize;

/// Extension type: OCSP status request
pub const EXTENSION_OCSP_STATUS_REQUEST: u16 = 5;
/// Extension type: supported curves (a.k.a. supported groups)
pub const EXTENSION_SUPPORTED_CURVES: u16 = 10;
/// Extension type: supported EC point formats
pub const EXTENSION_SUPPORTED_POINTS: u16 = 11;
/// Extension type: heartbeat
pub const EXTENSION_HEARTBEAT: u16 = 15;
/// Extension type: padding
pub const EXTENSION_PADDING: u16 = 21;

/// TLS_EMPTY_RENEGOTIATION_INFO_SCSV
pub const SCSV_RENEGOTIATION: u16 = 0x00ff;

/// Handshake header (4) + client version (2) + random (32)
const SESSION_ID_OFFSET: usize = 38;
/// Smallest payload holding the fixed fields and every length prefix up to compression methods
const MIN_CLIENT_HELLO_LEN: usize = 42;
const MAX_SESSION_ID_LEN: usize = 32;

/// Data extracted from a ClientHello without any interpretation.
///
/// An empty field means the client sent none, or parsing stopped before
/// reaching it. The two cases are intentionally indistinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawHelloInfo {
    /// Cipher suites in the order the client offered them
    pub cipher_suites: Vec<u16>,
    /// Extension types in the order they appeared
    pub extensions: Vec<u16>,
    /// Compression methods
    pub compression_methods: Vec<u8>,
    /// Named curves from the supported-curves extension
    pub curves: Vec<u16>,
    /// Point formats from the point-formats extension
    pub points: Vec<u8>,
}

impl RawHelloInfo {
    /// Whether nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        self.cipher_suites.is_empty()
            && self.extensions.is_empty()
            && self.compression_methods.is_empty()
            && self.curves.is_empty()
            && self.points.is_empty()
    }
}

/// Parse a raw ClientHello message
///
/// `data` is the handshake record payload, i.e. everything after the 5-byte
/// TLS record header, starting with the handshake message type.
///
/// # Returns
///
/// The extracted fields; possibly partial, never an error.
pub fn parse_raw_client_hello(data: &[u8]) -> RawHelloInfo {
    let mut info = RawHelloInfo::default();
    if parse_into(data, &mut info).is_none() {
        trace!(
            "ClientHello parse stopped early ({} bytes, {} suites, {} extensions)",
            data.len(),
            info.cipher_suites.len(),
            info.extensions.len()
        );
    }
    info
}

/// Fill `info` field by field; `None` marks the point where a bound check failed.
fn parse_into(data: &[u8], info: &mut RawHelloInfo) -> Option<()> {
    if data.len() < MIN_CLIENT_HELLO_LEN {
        return None;
    }

    let session_id_len = data[SESSION_ID_OFFSET] as usize;
    if session_id_len > MAX_SESSION_ID_LEN {
        return None;
    }
    let data = data.get(SESSION_ID_OFFSET + 1 + session_id_len..)?;

    // Cipher suites are u16s, so the byte count must be even.
    let (cipher_suites_len, data) = take_u16(data)?;
    let cipher_suites_len = cipher_suites_len as usize;
    if cipher_suites_len % 2 == 1 {
        return None;
    }
    let (suites, data) = take(data, cipher_suites_len)?;
    info.cipher_suites = suites
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    let (compression_len, data) = take_u8(data)?;
    let (methods, data) = take(data, compression_len as usize)?;
    info.compression_methods = methods.to_vec();

    let (extensions_len, mut data) = take_u16(data)?;
    if extensions_len as usize != data.len() {
        return None;
    }

    while !data.is_empty() {
        let (extension, rest) = take_u16(data)?;
        let (length, rest) = take_u16(rest)?;
        let (payload, rest) = take(rest, length as usize)?;

        info.extensions.push(extension);

        match extension {
            // RFC 4492 section 5.1.1
            EXTENSION_SUPPORTED_CURVES => {
                let (list_len, list) = take_u16(payload)?;
                let list_len = list_len as usize;
                if list_len % 2 == 1 || list_len != list.len() {
                    return None;
                }
                info.curves = list
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
            }
            // RFC 4492 section 5.1.2
            EXTENSION_SUPPORTED_POINTS => {
                let (list_len, list) = take_u8(payload)?;
                if list_len as usize != list.len() {
                    return None;
                }
                info.points = list.to_vec();
            }
            _ => {}
        }

        data = rest;
    }

    Some(())
}

fn take(data: &[u8], n: usize) -> Option<(&[u8], &[u8])> {
    (data.len() >= n).then(|| data.split_at(n))
}

fn take_u8(data: &[u8]) -> Option<(u8, &[u8])> {
    let (&byte, rest) = data.split_first()?;
    Some((byte, rest))
}

fn take_u16(data: &[u8]) -> Option<(u16, &[u8])> {
    let (bytes, rest) = take(data, 2)?;
    Some((u16::from_be_bytes([bytes[0], bytes[1]]), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(out: &mut Vec<u8>, value: u16) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    fn build_hello(
        session_id: &[u8],
        suites: &[u16],
        compression: &[u8],
        extensions: &[(u16, Vec<u8>)],
    ) -> Vec<u8> {
        let mut body = vec![0x03, 0x03];
        body.extend_from_slice(&[0x11; 32]);
        body.push(session_id.len() as u8);
        body.extend_from_slice(session_id);
        put_u16(&mut body, (suites.len() * 2) as u16);
        for suite in suites {
            put_u16(&mut body, *suite);
        }
        body.push(compression.len() as u8);
        body.extend_from_slice(compression);

        let mut ext_block = Vec::new();
        for (ty, payload) in extensions {
            put_u16(&mut ext_block, *ty);
            put_u16(&mut ext_block, payload.len() as u16);
            ext_block.extend_from_slice(payload);
        }
        put_u16(&mut body, ext_block.len() as u16);
        body.extend_from_slice(&ext_block);

        let len = body.len();
        let mut msg = vec![0x01, (len >> 16) as u8, (len >> 8) as u8, len as u8];
        msg.extend_from_slice(&body);
        msg
    }

    fn curves_payload(curves: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        put_u16(&mut out, (curves.len() * 2) as u16);
        for curve in curves {
            put_u16(&mut out, *curve);
        }
        out
    }

    fn points_payload(points: &[u8]) -> Vec<u8> {
        let mut out = vec![points.len() as u8];
        out.extend_from_slice(points);
        out
    }

    #[test]
    fn test_short_buffers_yield_empty_record() {
        for len in 0..MIN_CLIENT_HELLO_LEN {
            let data = vec![0u8; len];
            assert!(parse_raw_client_hello(&data).is_empty(), "len {} should be empty", len);
        }
    }

    #[test]
    fn test_full_hello() {
        let data = build_hello(
            &[0xaa; 32],
            &[0xc02b, 0xc02f, 0x002f, 0xc02b],
            &[0],
            &[
                (0, vec![0, 0]),
                (EXTENSION_SUPPORTED_CURVES, curves_payload(&[29, 23, 24])),
                (EXTENSION_SUPPORTED_POINTS, points_payload(&[0])),
                (0xff01, vec![0]),
            ],
        );

        let info = parse_raw_client_hello(&data);
        assert_eq!(info.cipher_suites, vec![0xc02b, 0xc02f, 0x002f, 0xc02b]);
        assert_eq!(info.compression_methods, vec![0]);
        assert_eq!(info.extensions, vec![0, 10, 11, 0xff01]);
        assert_eq!(info.curves, vec![29, 23, 24]);
        assert_eq!(info.points, vec![0]);
    }

    #[test]
    fn test_oversized_session_id_is_rejected() {
        let mut data = build_hello(&[], &[0x002f], &[0], &[]);
        data[SESSION_ID_OFFSET] = 33;
        assert!(parse_raw_client_hello(&data).is_empty());
    }

    #[test]
    fn test_odd_cipher_suite_length_stops_parsing() {
        let mut data = build_hello(&[], &[0x002f, 0x0035], &[0], &[]);
        // Cipher suite length lives right after the empty session id.
        data[SESSION_ID_OFFSET + 2] = 3;
        let info = parse_raw_client_hello(&data);
        assert!(info.cipher_suites.is_empty());
        assert!(info.compression_methods.is_empty());
        assert!(info.extensions.is_empty());
    }

    #[test]
    fn test_extension_length_mismatch_keeps_earlier_fields() {
        let mut data = build_hello(&[], &[0x002f], &[0], &[(0, vec![])]);
        data.push(0xff);
        let info = parse_raw_client_hello(&data);
        assert_eq!(info.cipher_suites, vec![0x002f]);
        assert_eq!(info.compression_methods, vec![0]);
        assert!(info.extensions.is_empty());
    }

    #[test]
    fn test_bad_curves_payload_keeps_extension_type() {
        let data = build_hello(
            &[],
            &[0x002f],
            &[0],
            &[(23, vec![]), (EXTENSION_SUPPORTED_CURVES, vec![0, 4, 0, 29]), (11, points_payload(&[0]))],
        );
        let info = parse_raw_client_hello(&data);
        assert_eq!(info.extensions, vec![23, 10]);
        assert!(info.curves.is_empty());
        assert!(info.points.is_empty());
    }

    #[test]
    fn test_missing_extension_block() {
        let mut data = build_hello(&[], &[0x002f], &[0], &[]);
        // Drop the two-byte extensions length entirely.
        data.truncate(data.len() - 2);
        let info = parse_raw_client_hello(&data);
        assert_eq!(info.cipher_suites, vec![0x002f]);
        assert_eq!(info.compression_methods, vec![0]);
        assert!(info.extensions.is_empty());
    }
}
