//! Telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! Connection worker (std thread)
//!     → LogRecord::capture (per request)
//!     → TelemetrySink::enqueue (bounded try_send, never blocks)
//!     → collector.rs submitter task (tokio)
//!     → batched POST to the collector, retried with backoff
//! ```
//!
//! # Design Decisions
//! - Enqueue is fire-and-forget: a full or stopped queue drops the record
//! - Delivery runs in the sink's own task, off the request path
//! - Shutdown closes the queue, flushes what is left and joins the task

pub mod collector;

use std::collections::BTreeMap;
use std::future::Future;
use serde::Serialize;
use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::http::RequestContext;
use crate::signatures::ResponseId;

pub use collector::CollectorSink;

/// Error type for telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("collector answered with status {0}")]
    Status(u16),
}

/// One captured interaction, in the collector's wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub time: String,
    pub headers: BTreeMap<String, String>,
    pub sip: String,
    pub dip: String,
    pub method: String,
    pub url: String,
    pub data: String,
    pub useragent: String,
    pub version: String,
    pub response_id: ResponseId,
    pub signature_id: Option<u64>,
}

impl LogRecord {
    /// Assemble a record from a finished request.
    pub fn capture(
        ctx: &RequestContext,
        dip: &str,
        response_id: ResponseId,
        signature_id: Option<u64>,
    ) -> Self {
        Self {
            time: timestamp(OffsetDateTime::now_utc()),
            headers: ctx.headers.clone(),
            sip: ctx.remote_addr.ip().to_string(),
            dip: dip.to_string(),
            method: ctx.method.clone(),
            url: ctx.path.clone(),
            data: String::from_utf8_lossy(&ctx.body).into_owned(),
            useragent: ctx.user_agent().to_string(),
            version: ctx.version.clone(),
            response_id,
            signature_id,
        }
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");
    at.format(&format).unwrap_or_default()
}

/// Durably forwards captured records to a central collector.
pub trait TelemetrySink: Send + Sync + 'static {
    /// Bring up egress. May fail; the harness retries.
    fn start(&self) -> impl Future<Output = Result<(), TelemetryError>> + Send;

    /// Queue a record without waiting for delivery. Callable from any thread.
    fn enqueue(&self, record: LogRecord);

    /// Flush pending records and stop internal workers. Idempotent.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}
