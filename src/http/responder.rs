//! Per-connection deception pipeline.
//!
//! # Responsibilities
//! - Read one request and normalize it into a `RequestContext`
//! - Score it against every signature and choose a response id
//! - Render and write the canned response
//! - Capture the request body and hand a `LogRecord` to telemetry
//!
//! # Design Decisions
//! - Every supported verb goes through the same path
//! - The snapshot is passed in by the caller and never re-read mid-request
//! - Peer I/O failures end the request here; nothing propagates to the worker

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{ListenerConfig, TelemetryConfig};
use crate::http::request::{read_body, read_head, RequestContext, RequestError};
use crate::http::response::{fallback_response, RenderedResponse};
use crate::observability::metrics;
use crate::signatures::{ResponseId, Scorer, Signature, Snapshot, DEFAULT_RESPONSE_ID};
use crate::telemetry::{LogRecord, TelemetrySink};

/// Verbs answered by the pipeline; anything else gets a 501.
pub const SUPPORTED_METHODS: [&str; 5] = ["GET", "POST", "HEAD", "PUT", "DELETE"];

/// Outcome of signature dispatch for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub response_id: ResponseId,
    /// Set only when a signature scored above zero.
    pub signature_id: Option<u64>,
    pub score: f64,
}

/// Pick a response id for `ctx`.
///
/// Signatures are scanned in order and only a strictly greater score replaces
/// the current best, so the earliest of equal maxima wins.
pub fn select_response<C, R>(scorer: &C, ctx: &RequestContext, signatures: &[Signature], rng: &mut R) -> Selection
where
    C: Scorer + ?Sized,
    R: Rng + ?Sized,
{
    let mut best_score = -1.0_f64;
    let mut best: Option<&Signature> = None;

    for signature in signatures {
        let score = scorer.score(ctx, signature);
        if score > best_score {
            best_score = score;
            best = Some(signature);
        }
    }

    match best {
        Some(signature) if best_score > 0.0 => Selection {
            response_id: signature
                .responses
                .choose(rng)
                .copied()
                .unwrap_or(DEFAULT_RESPONSE_ID),
            signature_id: Some(signature.id),
            score: best_score,
        },
        _ => Selection {
            response_id: DEFAULT_RESPONSE_ID,
            signature_id: None,
            score: best_score,
        },
    }
}

/// Per-connection limits taken from configuration.
#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub io_timeout: Option<Duration>,
    pub max_head_bytes: usize,
    pub max_body_bytes: usize,
    /// Address reported as `dip`; `None` uses the socket's local address.
    pub local_ip: Option<String>,
}

impl ResponderSettings {
    pub fn from_config(listener: &ListenerConfig, telemetry: &TelemetryConfig) -> Self {
        Self {
            io_timeout: listener.io_timeout(),
            max_head_bytes: listener.max_head_bytes,
            max_body_bytes: listener.max_body_bytes,
            local_ip: (!telemetry.local_ip.is_empty()).then(|| telemetry.local_ip.clone()),
        }
    }
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self::from_config(&ListenerConfig::default(), &TelemetryConfig::default())
    }
}

/// Answers attacker requests with canned responses.
pub struct Responder<S, C> {
    scorer: Arc<C>,
    sink: Arc<S>,
    settings: ResponderSettings,
}

impl<S: TelemetrySink, C: Scorer> Responder<S, C> {
    pub fn new(scorer: Arc<C>, sink: Arc<S>, settings: ResponderSettings) -> Self {
        Self {
            scorer,
            sink,
            settings,
        }
    }

    /// Serve one connection to completion. Never fails; errors are logged.
    pub fn handle(&self, stream: TcpStream, peer: SocketAddr, snapshot: &Snapshot) {
        if let Err(e) = stream
            .set_read_timeout(self.settings.io_timeout)
            .and_then(|()| stream.set_write_timeout(self.settings.io_timeout))
        {
            tracing::warn!(peer = %peer, error = %e, "Failed to set socket deadlines");
        }

        let local_ip = match &self.settings.local_ip {
            Some(ip) => ip.clone(),
            None => stream
                .local_addr()
                .map(|addr| addr.ip().to_string())
                .unwrap_or_default(),
        };

        let mut reader = BufReader::new(&stream);
        let mut writer = &stream;
        self.serve(&mut reader, &mut writer, peer, &local_ip, snapshot);
    }

    /// Transport-independent body of [`Responder::handle`].
    pub fn serve<R: BufRead, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        peer: SocketAddr,
        local_ip: &str,
        snapshot: &Snapshot,
    ) {
        let head = match read_head(reader, self.settings.max_head_bytes) {
            Ok(head) => head,
            Err(RequestError::Closed) => {
                tracing::debug!(peer = %peer, "Peer closed before sending a request");
                return;
            }
            Err(RequestError::Io(e)) => {
                tracing::debug!(peer = %peer, error = %e, "Failed reading request head");
                metrics::record_peer_error("read");
                return;
            }
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "Rejecting unparseable request");
                self.send_error(writer, peer, 400, "Bad request syntax");
                return;
            }
        };

        if !SUPPORTED_METHODS.contains(&head.method.as_str()) {
            tracing::debug!(peer = %peer, method = %head.method, "Unsupported method");
            let message = format!("Unsupported method ('{}')", head.method);
            self.send_error(writer, peer, 501, &message);
            return;
        }

        let mut ctx = RequestContext::from_head(head, peer);
        tracing::debug!(
            method = %ctx.method,
            path = %ctx.path,
            remote_addr = %peer.ip(),
            "Handling request"
        );

        let selection = select_response(
            self.scorer.as_ref(),
            &ctx,
            &snapshot.signatures,
            &mut rand::thread_rng(),
        );
        let signature_label = selection
            .signature_id
            .and_then(|id| snapshot.signatures.iter().find(|s| s.id == id))
            .map(Signature::label)
            .unwrap_or_else(|| "none".to_string());
        tracing::info!(
            response_id = selection.response_id,
            signature = %signature_label,
            score = selection.score,
            method = %ctx.method,
            path = %ctx.path,
            "Sending response"
        );

        let fallback;
        let response = match snapshot.response(selection.response_id) {
            Some(response) => response,
            None => {
                tracing::error!(
                    response_id = selection.response_id,
                    "Selected response does not exist, sending fallback"
                );
                fallback = fallback_response();
                &fallback
            }
        };

        let rendered = RenderedResponse::render(response, &snapshot.customizations);
        match rendered.write_to(writer) {
            Ok(()) => metrics::record_request(&ctx.method, selection.response_id),
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Client disconnected before response was fully sent");
                metrics::record_peer_error("write");
            }
        }

        ctx.body = read_body(reader, ctx.content_length(), self.settings.max_body_bytes);
        self.sink.enqueue(LogRecord::capture(
            &ctx,
            local_ip,
            selection.response_id,
            selection.signature_id,
        ));
    }

    fn send_error<W: Write>(&self, writer: &mut W, peer: SocketAddr, status: u16, message: &str) {
        if let Err(e) = RenderedResponse::error(status, message).write_to(writer) {
            tracing::debug!(peer = %peer, error = %e, "Failed to send error response");
            metrics::record_peer_error("write");
        }
    }
}
