//! Request handlers
//!
//! A handler turns an annotated request into a response. The server takes
//! care of framing, so handlers only deal with `http` types.

use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Request, Response, StatusCode};
use log::error;
use serde::Serialize;

use crate::fingerprint::RawHelloInfo;
use crate::verdict::{BrowserFamily, MitmVerdict, RequestContext};

/// Produces a response for each request on an intercepted connection
pub trait RequestHandler: Send + Sync {
    /// Handle a request
    ///
    /// `hello` is the fingerprint recorded for the request's connection, or
    /// an empty record when none was captured.
    fn handle(
        &self,
        request: &Request<()>,
        ctx: &RequestContext,
        hello: &RawHelloInfo,
    ) -> Response<Vec<u8>>;
}

/// JSON body returned by [`VerdictReporter`]
#[derive(Debug, Serialize)]
struct VerdictReport<'a> {
    mitm: MitmVerdict,
    browser: BrowserFamily,
    connection: String,
    fingerprint: &'a RawHelloInfo,
}

/// Reports the verdict and the captured fingerprint as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictReporter;

impl RequestHandler for VerdictReporter {
    fn handle(
        &self,
        _request: &Request<()>,
        ctx: &RequestContext,
        hello: &RawHelloInfo,
    ) -> Response<Vec<u8>> {
        let report = VerdictReport {
            mitm: ctx.mitm,
            browser: ctx.browser,
            connection: ctx.conn.to_string(),
            fingerprint: hello,
        };

        match serde_json::to_vec_pretty(&report) {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(e) => {
                error!("{}: failed to serialize verdict: {}", ctx.conn, e);
                plain_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error\n")
            }
        }
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Vec<u8>> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Plain text response, also used by the server for protocol errors
pub(crate) fn plain_response(status: StatusCode, body: &str) -> Response<Vec<u8>> {
    let mut response = Response::new(body.as_bytes().to_vec());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
