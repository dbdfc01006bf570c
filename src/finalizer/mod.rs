//! Response finalization.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor + RequestContext
//!     → pipeline.rs: Downstream::dispatch fills a ResponseIntent
//!     → pipeline.rs: structured? serializer.rs encodes : template renders
//!     → pipeline.rs: on failure, error.rs picks status + message, error page renders
//!     → pipeline.rs: finalize writes status, headers, body (exactly once)
//! ```
//!
//! # Design Decisions
//! - Handlers describe *what* to send; they never format errors or pick content types
//! - Failures are a closed enum: user-facing (code + safe message) or internal (500)
//! - The serialization filter never mutates handler data

pub mod error;
pub mod intent;
pub mod payload;
pub mod pipeline;
pub mod serializer;

pub use error::{error_message, HandlerError};
pub use intent::{IntentBody, RequestContext, RequestDescriptor, ResponseIntent, RouteArgs, UiContext};
pub use payload::{Payload, PayloadMap, UserIdentity};
pub use pipeline::{handler_fn, Dispatched, Downstream, ErrorPages, Finalizer, Representation};
