//! Finalize middleware.
//!
//! Wraps every route: describes the request, runs the rest of the chain as the
//! downstream collaborator, and turns the outcome into the final response.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::NegotiationConfig;
use crate::finalizer::{Dispatched, Downstream, Finalizer, HandlerError, ResponseIntent};
use crate::http::request::{describe_request, request_context};

/// State shared by the finalize middleware.
#[derive(Clone)]
pub struct FinalizeState {
    pub finalizer: Arc<Finalizer>,
    pub negotiation: NegotiationConfig,
}

pub async fn finalize_response(
    State(state): State<FinalizeState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let descriptor = describe_request(&mut parts, &state.negotiation).await;
    let context = request_context(&parts);

    tracing::debug!(
        path = %parts.uri.path(),
        structured = descriptor.wants_structured_output,
        domain = %descriptor.args.domain_id,
        "Finalizing request"
    );

    let downstream = NextHandler {
        request: Request::from_parts(parts, body),
        next,
    };
    state.finalizer.run(&descriptor, &context, downstream).await
}

/// The remaining axum chain.
struct NextHandler {
    request: Request<Body>,
    next: Next,
}

#[async_trait]
impl Downstream for NextHandler {
    async fn dispatch(self, intent: &mut ResponseIntent) -> Result<Dispatched, HandlerError> {
        let mut response = self.next.run(self.request).await;

        if let Some(failure) = response.extensions_mut().remove::<HandlerError>() {
            return Err(failure);
        }
        match response.extensions_mut().remove::<ResponseIntent>() {
            Some(produced) => {
                *intent = produced;
                Ok(Dispatched::Intent)
            }
            None => Ok(Dispatched::Passthrough(response)),
        }
    }
}
