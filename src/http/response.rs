//! Response assembly and emission.
//!
//! # Responsibilities
//! - Apply templating to the body and every header value
//! - Resolve the status code (explicit, or derived from body length)
//! - Serialize the status line and headers in a stable order
//! - Never add identification headers the canned response did not ask for
//!
//! # Design Decisions
//! - `Content-Length` is computed from the templated body, never the stored one
//! - A configured `Server` header goes first and is never emitted twice
//! - Responses are HTTP/1.0 and the connection closes afterwards

use std::io::{self, Write};

use crate::http::template::render;
use crate::signatures::{Customizations, Response};

/// Protocol version written on every status line.
pub const PROTOCOL_VERSION: &str = "HTTP/1.0";

/// Body of the fallback response; also the length threshold for the default status.
pub const NOT_FOUND_BODY: &str = "PAGE NOT FOUND.";

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// The response used when a response id cannot be resolved.
pub fn fallback_response() -> Response {
    Response {
        status_code: Some(404),
        headers: Default::default(),
        body: NOT_FOUND_BODY.to_string(),
    }
}

/// Status used when a response carries none.
pub fn default_status(body: &[u8]) -> u16 {
    if body.len() > NOT_FOUND_BODY.len() {
        200
    } else {
        404
    }
}

fn reason_phrase(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

fn header_safe(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// A response with templating applied, ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: u16,
    /// Spoofed server identity, if the response defines one.
    pub server: Option<String>,
    pub content_type: String,
    /// Remaining headers in emission order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RenderedResponse {
    /// Render a canned response against the active customizations.
    pub fn render(response: &Response, tags: &Customizations) -> Self {
        let body = render(&response.body, tags).into_bytes();
        let status = response.status_code.unwrap_or_else(|| default_status(&body));

        let mut server = None;
        let mut content_type = None;
        let mut headers = Vec::with_capacity(response.headers.len());
        for (name, value) in &response.headers {
            let value = header_safe(&render(value, tags));
            if name.eq_ignore_ascii_case("server") {
                // An empty banner means no Server header at all.
                server = (!value.is_empty()).then_some(value);
            } else if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value);
            } else if name.eq_ignore_ascii_case("content-length") {
                continue;
            } else {
                headers.push((name.clone(), value));
            }
        }

        Self {
            status,
            server,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            headers,
            body,
        }
    }

    /// Plain error page for requests that never reach signature dispatch.
    pub fn error(status: u16, message: &str) -> Self {
        let reason = reason_phrase(status);
        let body = format!(
            "<!DOCTYPE HTML>\n<html lang=\"en\">\n    <head>\n        <meta charset=\"utf-8\">\n        \
             <title>Error response</title>\n    </head>\n    <body>\n        <h1>Error response</h1>\n        \
             <p>Error code: {status}</p>\n        <p>Message: {message}.</p>\n        \
             <p>Error code explanation: {status} - {reason}.</p>\n    </body>\n</html>\n"
        );
        Self {
            status,
            server: None,
            content_type: "text/html;charset=utf-8".to_string(),
            headers: vec![("Connection".to_string(), "close".to_string())],
            body: body.into_bytes(),
        }
    }

    /// Serialized status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}\r\n",
            PROTOCOL_VERSION,
            self.status,
            reason_phrase(self.status)
        );
        if let Some(server) = &self.server {
            head.push_str(&format!("Server: {}\r\n", server));
        }
        head.push_str(&format!("Content-Type: {}\r\n", self.content_type));
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Write the whole response and flush.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }
}
