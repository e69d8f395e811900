//! Request parsing and normalization.
//!
//! # Responsibilities
//! - Read the request head off the wire (httparse)
//! - Enforce the head size limit before anything else is read
//! - Normalize into a `RequestContext` (decoded path, canonical header names)
//! - Best-effort capture of the request body for telemetry
//!
//! # Design Decisions
//! - The context is a plain value: built once, read by the scorer, dropped with the request
//! - Header names are canonicalized so rules and logs see one spelling
//! - Duplicate headers collapse to the last value

use std::collections::BTreeMap;
use std::io::{self, BufRead, Read};
use std::net::SocketAddr;
use httparse::Status;
use percent_encoding::percent_decode_str;
use thiserror::Error;

const MAX_HEADERS: usize = 64;

/// Error type for reading a request head.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed before a complete request head")]
    Closed,
    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),
    #[error("malformed request head: {0}")]
    Malformed(#[from] httparse::Error),
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// The request line and headers as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Raw request target, still percent-encoded.
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

/// Read one request head, leaving any body bytes in `reader`.
pub fn read_head<R: BufRead>(reader: &mut R, max_bytes: usize) -> Result<RequestHead, RequestError> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);

    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Err(RequestError::Closed);
        }
        let previous = buf.len();
        let chunk = available.len();
        buf.extend_from_slice(available);

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut request = httparse::Request::new(&mut headers);
        match request.parse(&buf)? {
            Status::Complete(head_len) => {
                if head_len > max_bytes {
                    return Err(RequestError::TooLarge(max_bytes));
                }
                let head = RequestHead {
                    method: request.method.unwrap_or_default().to_string(),
                    target: request.path.unwrap_or("/").to_string(),
                    version: format!("HTTP/1.{}", request.version.unwrap_or(0)),
                    headers: request
                        .headers
                        .iter()
                        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                        .collect(),
                };
                reader.consume(head_len - previous);
                return Ok(head);
            }
            Status::Partial => {
                reader.consume(chunk);
                if buf.len() > max_bytes {
                    return Err(RequestError::TooLarge(max_bytes));
                }
            }
        }
    }
}

/// Read up to `declared` body bytes (capped at `max_bytes`), keeping whatever
/// arrived before an error.
pub fn read_body<R: Read>(reader: &mut R, declared: usize, max_bytes: usize) -> Vec<u8> {
    let limit = declared.min(max_bytes);
    let mut body = Vec::with_capacity(limit.min(64 * 1024));
    if limit == 0 {
        return body;
    }
    if let Err(e) = reader.take(limit as u64).read_to_end(&mut body) {
        tracing::debug!(error = %e, received = body.len(), "Request body read cut short");
    }
    body
}

/// Canonical header spelling: `_` becomes `-` and every alphabetic run is
/// title-cased (`x_forwarded-for` → `X-Forwarded-For`).
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for ch in name.chars() {
        let ch = if ch == '_' { '-' } else { ch };
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Percent-decode a request target; invalid UTF-8 is replaced, not rejected.
pub fn decode_path(target: &str) -> String {
    percent_decode_str(target).decode_utf8_lossy().into_owned()
}

/// Everything the scorer and telemetry see about one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    /// Percent-decoded target, query string included.
    pub path: String,
    pub version: String,
    pub remote_addr: SocketAddr,
    /// Canonical header name to value.
    pub headers: BTreeMap<String, String>,
    /// Filled after the response is written.
    pub body: Vec<u8>,
}

impl RequestContext {
    pub fn from_head(head: RequestHead, remote_addr: SocketAddr) -> Self {
        let headers = head
            .headers
            .into_iter()
            .map(|(name, value)| (canonical_header_name(&name), value))
            .collect();
        Self {
            method: head.method,
            path: decode_path(&head.target),
            version: head.version,
            remote_addr,
            headers,
            body: Vec::new(),
        }
    }

    /// Header lookup by any spelling of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(name))
            .map(String::as_str)
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or_default()
    }

    /// Declared body length; missing or invalid values count as zero.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn peer() -> SocketAddr {
        "10.0.0.5:51515".parse().unwrap()
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_header_name("user-agent"), "User-Agent");
        assert_eq!(canonical_header_name("x_real_ip"), "X-Real-Ip");
        assert_eq!(canonical_header_name("CONTENT-TYPE"), "Content-Type");
        assert_eq!(canonical_header_name("x-b3-traceid"), "X-B3-Traceid");
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(decode_path("/a%20b%2Fc"), "/a b/c");
        assert_eq!(decode_path("/%ff"), "/\u{fffd}");
        assert_eq!(decode_path("/admin.php?id=1"), "/admin.php?id=1");
    }

    #[test]
    fn reads_head_and_leaves_body() {
        let raw = b"POST /login%2Ephp HTTP/1.1\r\nhost: x\r\ncontent-length: 9\r\nX_Token: a\r\n\r\nuser=root";
        let mut reader = BufReader::new(Cursor::new(&raw[..]));
        let head = read_head(&mut reader, 1024).unwrap();
        assert_eq!(head.method, "POST");
        assert_eq!(head.version, "HTTP/1.1");

        let ctx = RequestContext::from_head(head, peer());
        assert_eq!(ctx.path, "/login.php");
        assert_eq!(ctx.header("host"), Some("x"));
        assert_eq!(ctx.header("X-Token"), Some("a"));
        assert_eq!(ctx.content_length(), 9);

        let body = read_body(&mut reader, ctx.content_length(), 1024);
        assert_eq!(body, b"user=root");
    }

    #[test]
    fn head_split_across_reads() {
        let raw = b"GET / HTTP/1.0\r\nUser-Agent: zgrab\r\n\r\n";
        let mut reader = BufReader::with_capacity(4, Cursor::new(&raw[..]));
        let head = read_head(&mut reader, 1024).unwrap();
        let ctx = RequestContext::from_head(head, peer());
        assert_eq!(ctx.version, "HTTP/1.0");
        assert_eq!(ctx.user_agent(), "zgrab");
        assert_eq!(ctx.content_length(), 0);
    }

    #[test]
    fn rejects_bad_heads() {
        let mut closed = BufReader::new(Cursor::new(&b"GET / HT"[..]));
        assert!(matches!(read_head(&mut closed, 1024), Err(RequestError::Closed)));

        let mut garbage = BufReader::new(Cursor::new(&b"\x16\x03\x01\x02\x00\r\n\r\n"[..]));
        assert!(matches!(read_head(&mut garbage, 1024), Err(RequestError::Malformed(_))));

        let long = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(200));
        let mut large = BufReader::with_capacity(16, Cursor::new(long.into_bytes()));
        assert!(matches!(read_head(&mut large, 64), Err(RequestError::TooLarge(64))));
    }

    #[test]
    fn body_capped_and_invalid_length_ignored() {
        let mut reader = Cursor::new(b"0123456789".to_vec());
        assert_eq!(read_body(&mut reader, 100, 4), b"0123");

        let head = RequestHead {
            method: "POST".into(),
            target: "/".into(),
            version: "HTTP/1.1".into(),
            headers: vec![("Content-Length".into(), "abc".into())],
        };
        assert_eq!(RequestContext::from_head(head, peer()).content_length(), 0);
    }
}
