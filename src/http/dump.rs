//! Request dumps for diagnostics.
//!
//! A dump is the request line plus headers in wire format. The body is never
//! included and credential headers are masked.

use axum::http::{HeaderMap, Method, Request, Uri, Version};
use axum::http::header::{AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION};

const REDACTED: &str = "[redacted]";

/// Request line and headers captured before the request is handed on.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

impl RequestHead {
    pub fn capture<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Render as `METHOD target VERSION\r\nName: value\r\n...\r\n`.
    pub fn dump(&self) -> String {
        let target = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut out = format!("{} {} {:?}\r\n", self.method, target, self.version);
        for (name, value) in &self.headers {
            let value = if is_sensitive(name) {
                REDACTED.into()
            } else {
                String::from_utf8_lossy(value.as_bytes())
            };
            out.push_str(name.as_str());
            out.push_str(": ");
            out.push_str(&value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

fn is_sensitive(name: &axum::http::HeaderName) -> bool {
    *name == AUTHORIZATION || *name == PROXY_AUTHORIZATION || *name == COOKIE
}
