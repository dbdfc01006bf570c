//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → finalize.rs (middleware around every route)
//!         → request.rs (descriptor + ambient context)
//!         → route handler returns ResponseIntent | HandlerError (response.rs)
//!         → finalizer pipeline
//!     → Send to client
//! ```

pub mod finalize;
pub mod request;
pub mod response;
pub mod server;

pub use finalize::{finalize_response, FinalizeState};
pub use response::HandlerResult;
pub use server::{shutdown_signal, HttpServer, ServerError};
