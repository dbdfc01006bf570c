//! HTTP Response Finalizer Library
//!
//! Sits at the end of a request-handling chain and decides how a handler's
//! intent (or failure) goes onto the wire: JSON, a rendered page, a redirect,
//! or a 304.

pub mod config;
pub mod finalizer;
pub mod http;
pub mod observability;
pub mod security;
pub mod templates;

pub use config::FinalizerConfig;
pub use finalizer::{Finalizer, HandlerError, Payload, ResponseIntent, UserIdentity};
pub use http::{HandlerResult, HttpServer};
