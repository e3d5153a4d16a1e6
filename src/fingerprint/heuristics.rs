//! Browser TLS stack heuristics
//!
//! Each predicate answers "could this ClientHello have come from an
//! unmodified browser of that family?". The checks follow Durumeric,
//! Halderman et al., "The Security Impact of HTTPS Interception" (NDSS '17):
//! <https://jhalderm.com/pub/papers/interception-ndss17.pdf>

use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::hello::{
    RawHelloInfo, EXTENSION_HEARTBEAT, EXTENSION_OCSP_STATUS_REQUEST, EXTENSION_PADDING,
    EXTENSION_SUPPORTED_CURVES, EXTENSION_SUPPORTED_POINTS, SCSV_RENEGOTIATION,
};

/// Extension order sent by Firefox, after an optional leading padding extension
const FIREFOX_EXTENSIONS: [u16; 10] = [0, 23, 65281, 10, 11, 35, 16, 5, 65283, 13];

/// x25519, secp256r1, secp384r1, secp521r1
const FIREFOX_CURVES: [u16; 4] = [29, 23, 24, 25];

/// Relative cipher suite order used by Firefox. Users may disable suites but
/// cannot add or reorder them.
const FIREFOX_CIPHER_ORDER: [u16; 15] = [
    0xc02b, // TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    0xc02f, // TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
    0xcca9, // TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
    0xcca8, // TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
    0xc02c, // TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
    0xc030, // TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
    0xc00a, // TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA
    0xc009, // TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA
    0xc013, // TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA
    0xc014, // TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA
    0x0033, // TLS_DHE_RSA_WITH_AES_128_CBC_SHA
    0x0039, // TLS_DHE_RSA_WITH_AES_256_CBC_SHA
    0x002f, // TLS_RSA_WITH_AES_128_CBC_SHA
    0x0035, // TLS_RSA_WITH_AES_256_CBC_SHA
    0x000a, // TLS_RSA_WITH_3DES_EDE_CBC_SHA
];

/// Suites Chrome never offers but Safari or Firefox do (Chrome 56, Safari 10, Firefox 51).
static CHROME_CIPHER_EXCLUSIONS: Lazy<HashSet<u16>> = Lazy::new(|| {
    [
        0xc024, // TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384
        0xc023, // TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256
        0xc00a, // TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA
        0xc009, // TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA
        0xc028, // TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384
        0xc027, // TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256
        0x003d, // TLS_RSA_WITH_AES_256_CBC_SHA256
        0x003c, // TLS_RSA_WITH_AES_128_CBC_SHA256
        0x0033, // TLS_DHE_RSA_WITH_AES_128_CBC_SHA
        0x0039, // TLS_DHE_RSA_WITH_AES_256_CBC_SHA
    ]
    .into_iter()
    .collect()
});

/// secp521r1
const CURVE_P521: u16 = 25;

impl RawHelloInfo {
    /// Whether the client offered the heartbeat extension
    ///
    /// No modern browser does, so this alone is treated as a sign of interception.
    pub fn advertises_heartbeat_support(&self) -> bool {
        self.extensions.contains(&EXTENSION_HEARTBEAT)
    }

    /// Whether this looks like a handshake from a modern Firefox
    ///
    /// Extensions and curves must match exactly, in order. The cipher suite
    /// walk below never rejects: a suite missing from the reference order
    /// leaves the cursor past the last slot, where the exit condition cannot
    /// hold.
    pub fn looks_like_firefox(&self) -> bool {
        // Firefox sometimes leads with padding and sometimes omits it.
        let extensions = match self.extensions.split_first() {
            Some((&EXTENSION_PADDING, rest)) => rest,
            _ => &self.extensions[..],
        };
        if extensions != FIREFOX_EXTENSIONS {
            return false;
        }

        if self.curves != FIREFOX_CURVES {
            return false;
        }

        // Single forward cursor through the reference order.
        let mut cursor = 0;
        for suite in &self.cipher_suites {
            let mut found = false;
            while cursor < FIREFOX_CIPHER_ORDER.len() {
                if FIREFOX_CIPHER_ORDER[cursor] == *suite {
                    found = true;
                    break;
                }
                cursor += 1;
            }
            if cursor == FIREFOX_CIPHER_ORDER.len() - 1 && !found {
                return false;
            }
        }

        true
    }

    /// Whether this looks like a handshake from a modern Chrome
    ///
    /// Only rules out suites and curves Chrome is known not to offer; neither
    /// order nor completeness is checked.
    pub fn looks_like_chrome(&self) -> bool {
        if self
            .cipher_suites
            .iter()
            .any(|suite| CHROME_CIPHER_EXCLUSIONS.contains(suite))
        {
            return false;
        }

        !self.curves.contains(&CURVE_P521)
    }

    /// Whether this looks like a handshake from MS Edge (SChannel)
    ///
    /// SChannel is the only stack that sends the OCSP status request before
    /// both the supported-curves and the point-formats extensions.
    // TODO: Chrome also orders 5 before 10 and 11; tighten once a distinguishing
    // SChannel trait is found.
    pub fn looks_like_edge(&self) -> bool {
        // An absent extension sits at position 0, like a leading one.
        let position = |ty: u16| {
            self.extensions
                .iter()
                .rposition(|ext| *ext == ty)
                .unwrap_or(0)
        };

        let ocsp = position(EXTENSION_OCSP_STATUS_REQUEST);
        ocsp < position(EXTENSION_SUPPORTED_CURVES) && ocsp < position(EXTENSION_SUPPORTED_POINTS)
    }

    /// Whether this looks like a handshake from Safari (Secure Transport)
    ///
    /// Secure Transport puts TLS_EMPTY_RENEGOTIATION_INFO_SCSV first where
    /// other stacks put it last. Anything linked against Secure Transport
    /// on macOS (curl, for one) shares this trait.
    pub fn looks_like_safari(&self) -> bool {
        self.cipher_suites.first() == Some(&SCSV_RENEGOTIATION)
    }
}
