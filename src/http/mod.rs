//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection (worker thread)
//!     → request.rs (read head, normalize into RequestContext)
//!     → responder.rs (score signatures, pick a response id)
//!     → template.rs (substitute tags in body and headers)
//!     → response.rs (status resolution, header ordering, emission)
//!     → telemetry sink (LogRecord, fire-and-forget)
//! ```

pub mod request;
pub mod responder;
pub mod response;
pub mod template;

pub use request::{RequestContext, RequestError};
pub use responder::{select_response, Responder, ResponderSettings, Selection};
pub use response::RenderedResponse;
