//! Interception verdicts
//!
//! Combines the browser a client claims to be (from `User-Agent`) with the
//! ClientHello it actually sent. A mismatch, or any heartbeat support, means
//! someone between the browser and us probably re-originated the TLS session.
//!
//! Note that Microsoft deliberately makes IE/Edge user agents resemble other
//! browsers, so verdicts for those clients are less accurate.

use std::fmt;

use http::header::USER_AGENT;
use http::Request;
use log::trace;
use serde::Serialize;

use crate::fingerprint::{ConnKey, FingerprintTable, RawHelloInfo};

/// Browser family declared by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    Firefox,
    Chrome,
    Edge,
    Safari,
    Unknown,
}

impl BrowserFamily {
    /// Classify a `User-Agent` value
    ///
    /// Real user agents name several browsers at once ("... Chrome/.. Safari/..
    /// Edge/.."), so the checks run in a fixed priority order: Edge, Chrome,
    /// Firefox, Safari.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("Edge") {
            Self::Edge
        } else if user_agent.contains("Chrome") {
            Self::Chrome
        } else if user_agent.contains("Firefox") {
            Self::Firefox
        } else if user_agent.contains("Safari") {
            Self::Safari
        } else {
            Self::Unknown
        }
    }

    /// Whether `info` is consistent with this family's TLS stack
    ///
    /// `None` for [`BrowserFamily::Unknown`], which has no reference fingerprint.
    pub fn matches(&self, info: &RawHelloInfo) -> Option<bool> {
        match self {
            Self::Firefox => Some(info.looks_like_firefox()),
            Self::Chrome => Some(info.looks_like_chrome()),
            Self::Edge => Some(info.looks_like_edge()),
            Self::Safari => Some(info.looks_like_safari()),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firefox => write!(f, "firefox"),
            Self::Chrome => write!(f, "chrome"),
            Self::Edge => write!(f, "edge"),
            Self::Safari => write!(f, "safari"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether a request's TLS connection is likely intercepted
///
/// `Unknown` means no verdict was computed. It must not be read as
/// "not intercepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MitmVerdict {
    #[default]
    Unknown,
    Unlikely,
    Likely,
}

impl MitmVerdict {
    /// Evaluate a ClientHello against the declared browser family
    pub fn evaluate(family: BrowserFamily, info: &RawHelloInfo) -> Self {
        match family.matches(info) {
            None => Self::Unknown,
            Some(matches) => {
                if info.advertises_heartbeat_support() || !matches {
                    Self::Likely
                } else {
                    Self::Unlikely
                }
            }
        }
    }

    /// `Some(true)` when likely intercepted, `None` when unknown
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Unlikely => Some(false),
            Self::Likely => Some(true),
        }
    }
}

impl From<Option<bool>> for MitmVerdict {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unknown,
            Some(false) => Self::Unlikely,
            Some(true) => Self::Likely,
        }
    }
}

impl fmt::Display for MitmVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Unlikely => write!(f, "unlikely"),
            Self::Likely => write!(f, "likely"),
        }
    }
}

/// Per-request values derived from the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Connection the request arrived on
    pub conn: ConnKey,
    /// Browser family claimed by the request
    pub browser: BrowserFamily,
    /// Interception verdict
    pub mitm: MitmVerdict,
}

/// Computes verdicts from the fingerprint table
#[derive(Debug, Clone)]
pub struct MitmAnnotator {
    table: FingerprintTable,
}

impl MitmAnnotator {
    /// Create an annotator reading from `table`
    pub fn new(table: FingerprintTable) -> Self {
        Self { table }
    }

    /// Table the verdicts are computed from
    pub fn table(&self) -> &FingerprintTable {
        &self.table
    }

    /// Verdict for a declared `User-Agent` on a given connection
    pub fn verdict_for(&self, user_agent: &str, conn: &ConnKey) -> MitmVerdict {
        let family = BrowserFamily::from_user_agent(user_agent);
        if family == BrowserFamily::Unknown {
            return MitmVerdict::Unknown;
        }
        MitmVerdict::evaluate(family, &self.table.get(conn))
    }

    /// Build the context for a request received on `conn`
    ///
    /// A missing or non-UTF-8 `User-Agent` yields an unknown verdict.
    pub fn annotate<B>(&self, request: &Request<B>, conn: ConnKey) -> RequestContext {
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let browser = BrowserFamily::from_user_agent(user_agent);
        let mitm = match browser {
            BrowserFamily::Unknown => MitmVerdict::Unknown,
            family => MitmVerdict::evaluate(family, &self.table.get(&conn)),
        };
        trace!("{}: browser={} mitm={}", conn, browser, mitm);

        RequestContext { conn, browser, mitm }
    }
}
