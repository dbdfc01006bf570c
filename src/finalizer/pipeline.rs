//! Dispatch / Recover / Finalize.
//!
//! ```text
//! run()
//!   ├─ dispatch: downstream handler → redirect url → encode JSON | render template
//!   │             → Content-Disposition, ETag
//!   ├─ recover (on failure or panic): status, {"error"} or error page
//!   └─ finalize (always, consumes the intent): 304 > 302 > body > empty
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;

use super::error::{error_message, HandlerError};
use super::intent::{IntentBody, RequestContext, RequestDescriptor, ResponseIntent};
use super::payload::Payload;
use super::serializer;
use crate::observability::metrics;
use crate::security::{IdentityPermissions, Permission, PermissionCheck};
use crate::templates::{TemplateRegistry, TemplateRenderer};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const REDIRECT_CONTENT_TYPE: &str = "application/octet-stream";

pub const UI_CONTEXT_KEY: &str = "UiContext";
pub const USER_CONTEXT_KEY: &str = "UserContext";
pub const ERROR_KEY: &str = "error";
pub const SERIALIZE_FAILURE: &str = "Serialize failure";

/// How a response ended up being represented on the wire.
///
/// Attached to every finalized response as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Structured,
    Template,
    Text,
    Redirect,
    NotModified,
    Empty,
    /// The handler answered with a plain response; nothing was finalized.
    Passthrough,
}

impl Representation {
    pub fn as_str(self) -> &'static str {
        match self {
            Representation::Structured => "structured",
            Representation::Template => "template",
            Representation::Text => "text",
            Representation::Redirect => "redirect",
            Representation::NotModified => "not_modified",
            Representation::Empty => "empty",
            Representation::Passthrough => "passthrough",
        }
    }
}

/// Result of running the downstream handler chain.
#[derive(Debug)]
pub enum Dispatched {
    /// The handler filled the intent.
    Intent,
    /// The handler produced a finished response of its own.
    Passthrough(Response),
}

/// The rest of the handler chain.
#[async_trait]
pub trait Downstream: Send {
    async fn dispatch(self, intent: &mut ResponseIntent) -> Result<Dispatched, HandlerError>;
}

#[async_trait]
impl<F> Downstream for F
where
    F: FnOnce(&mut ResponseIntent) -> Result<(), HandlerError> + Send,
{
    async fn dispatch(self, intent: &mut ResponseIntent) -> Result<Dispatched, HandlerError> {
        self(intent).map(|()| Dispatched::Intent)
    }
}

/// Wrap a synchronous closure as the downstream handler.
///
/// Mostly useful where the handler logic is inline, as in tests and adapters.
pub fn handler_fn<F>(f: F) -> F
where
    F: FnOnce(&mut ResponseIntent) -> Result<(), HandlerError> + Send,
{
    f
}

/// Templates rendered when a handler fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPages {
    /// For user-facing failures.
    pub user_facing: String,
    /// For everything else.
    pub internal: String,
}

impl Default for ErrorPages {
    fn default() -> Self {
        Self {
            user_facing: "error.html".to_string(),
            internal: "bsod.html".to_string(),
        }
    }
}

/// Turns response intents into HTTP responses.
#[derive(Clone)]
pub struct Finalizer {
    renderer: Arc<dyn TemplateRenderer>,
    registry: Arc<dyn TemplateRegistry>,
    permissions: Arc<dyn PermissionCheck>,
    pages: ErrorPages,
}

impl Finalizer {
    /// Create a finalizer over a template engine that renders and knows its templates.
    pub fn new<T>(templates: Arc<T>) -> Self
    where
        T: TemplateRenderer + TemplateRegistry + 'static,
    {
        Self {
            renderer: templates.clone(),
            registry: templates,
            permissions: Arc::new(IdentityPermissions),
            pages: ErrorPages::default(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn TemplateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionCheck>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_error_pages(mut self, pages: ErrorPages) -> Self {
        self.pages = pages;
        self
    }

    /// Run the downstream chain and finalize its outcome into a response.
    ///
    /// Never fails: handler failures and panics are rendered, not propagated.
    pub async fn run<D: Downstream>(
        &self,
        request: &RequestDescriptor,
        context: &RequestContext,
        downstream: D,
    ) -> Response {
        let start = Instant::now();
        let mut intent = ResponseIntent::default();

        let outcome = AssertUnwindSafe(self.dispatch(request, context, &mut intent, downstream))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HandlerError::from_panic(panic)));
        metrics::record_dispatch(start);

        match outcome {
            Ok(Dispatched::Intent) => {}
            Ok(Dispatched::Passthrough(mut response)) => {
                metrics::record_response(Representation::Passthrough.as_str(), response.status().as_u16());
                response.extensions_mut().insert(Representation::Passthrough);
                return response;
            }
            Err(failure) => {
                let recovered = AssertUnwindSafe(self.recover(request, &mut intent, failure))
                    .catch_unwind()
                    .await;
                if recovered.is_err() {
                    tracing::error!("Error page rendering panicked");
                    intent.body = None;
                }
            }
        }

        finalize(request, intent)
    }

    async fn dispatch<D: Downstream>(
        &self,
        request: &RequestDescriptor,
        context: &RequestContext,
        intent: &mut ResponseIntent,
        downstream: D,
    ) -> Result<Dispatched, HandlerError> {
        if let Dispatched::Passthrough(response) = downstream.dispatch(intent).await? {
            return Ok(Dispatched::Passthrough(response));
        }

        if let Some(target) = intent.redirect.clone() {
            let body = intent
                .body
                .get_or_insert_with(|| IntentBody::Data(Payload::map()));
            if let IntentBody::Data(payload) = body {
                payload.insert("url", target);
            }
        }

        if intent.content_type.is_none() {
            let structured = request.wants_structured_output
                || intent.redirect.is_some()
                || request.wants_no_template
                || intent.template.is_none();

            if structured {
                self.encode_structured(context, intent);
            } else if let Some(template) = intent.template.clone() {
                let name = specialize_template(&template, &request.args.domain_id, self.registry.as_ref());
                let data = intent
                    .body
                    .take()
                    .map(IntentBody::into_payload)
                    .unwrap_or_else(Payload::map);
                tracing::debug!(template = %name, "Rendering template");
                let markup = self.renderer.render(&name, &data).await?;
                intent.body = Some(IntentBody::Markup(markup));
            }
        }

        if let Some(disposition) = intent.disposition.clone() {
            record_header(intent, header::CONTENT_DISPOSITION, &disposition)?;
        }
        if let Some(tag) = intent.cache_tag.clone() {
            record_header(intent, header::ETAG, &tag)?;
            intent
                .headers
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("public"));
        }

        Ok(Dispatched::Intent)
    }

    fn encode_structured(&self, context: &RequestContext, intent: &mut ResponseIntent) {
        intent.body = match intent.body.take() {
            None => None,
            Some(IntentBody::Json(json)) => Some(IntentBody::Json(json)),
            Some(body) => {
                let mut payload = body.into_payload();
                if let Payload::Map(entries) = &mut payload {
                    entries.insert(UI_CONTEXT_KEY.to_string(), context.ui_context.0.clone());
                    if let Some(user) = &context.user {
                        entries.insert(USER_CONTEXT_KEY.to_string(), Payload::User(user.clone()));
                    }
                }
                let reveal = self
                    .permissions
                    .has_permission(context.user.as_ref(), Permission::VIEW_DISPLAYNAME);
                match serializer::encode(&payload, reveal) {
                    Ok(json) => Some(IntentBody::Json(json)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Serialize failure");
                        Some(IntentBody::Data(Payload::from(serialize_failure(&e))))
                    }
                }
            }
        };
        intent.content_type = Some(JSON_CONTENT_TYPE.to_string());
    }

    async fn recover(&self, request: &RequestDescriptor, intent: &mut ResponseIntent, failure: HandlerError) {
        let message = error_message(&failure);
        let status = failure.status();
        metrics::record_failure(failure.kind());

        if failure.is_user_facing() {
            tracing::debug!(status = status.as_u16(), error = %failure, "Request rejected");
        } else {
            tracing::error!(status = status.as_u16(), error = %failure, "Request failed");
        }

        intent.status = Some(status);
        intent.body = None;
        intent.content_type = None;
        intent.cache_tag = None;
        intent.disposition = None;
        intent.headers.clear();

        if request.wants_structured_output {
            intent.body = Some(IntentBody::Data(Payload::map().with(ERROR_KEY, message)));
            return;
        }

        let page = if failure.is_user_facing() {
            &self.pages.user_facing
        } else {
            &self.pages.internal
        };
        let data = Payload::map()
            .with("UserFacingError", failure.is_user_facing())
            .with(ERROR_KEY, message)
            .with("status", u32::from(status.as_u16()));

        match self.renderer.render(page, &data).await {
            Ok(markup) => intent.body = Some(IntentBody::Markup(markup)),
            Err(e) => tracing::error!(template = %page, error = %e, "Failed to render error page"),
        }
    }
}

/// `base.rest` → `base.<domain>.rest` when the registry has it, else `template`.
pub fn specialize_template(template: &str, domain_id: &str, registry: &dyn TemplateRegistry) -> String {
    if let Some((base, rest)) = template.split_once('.') {
        let candidate = format!("{base}.{domain_id}.{rest}");
        if registry.template_exists(&candidate) {
            return candidate;
        }
    }
    template.to_string()
}

fn record_header(intent: &mut ResponseIntent, name: HeaderName, value: &str) -> Result<(), HandlerError> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| HandlerError::internal(format!("invalid {name} header value")))?;
    intent.headers.insert(name, value);
    Ok(())
}

fn serialize_failure(err: &serde_json::Error) -> serde_json::Value {
    serde_json::json!({ ERROR_KEY: SERIALIZE_FAILURE, "params": [err.to_string()] })
}

/// Write the intent onto a response. Runs exactly once per request.
fn finalize(request: &RequestDescriptor, intent: ResponseIntent) -> Response {
    let ResponseIntent {
        body,
        redirect,
        cache_tag,
        content_type,
        status,
        headers,
        ..
    } = intent;

    let mut response = Response::new(Body::empty());
    *response.headers_mut() = headers;

    let not_modified = cache_tag.is_some() && cache_tag == request.conditional_tag;

    let representation = if not_modified {
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        Representation::NotModified
    } else if let Some(location) = redirect_location(redirect.as_deref(), request) {
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(REDIRECT_CONTENT_TYPE));
        headers.insert(header::LOCATION, location);
        *response.status_mut() = StatusCode::FOUND;
        Representation::Redirect
    } else if let Some(body) = body.filter(|b| !b.is_blank()) {
        let (text, natural_type, representation) = into_wire(body);
        let content_type = content_type
            .or_else(|| request.wants_structured_output.then(|| JSON_CONTENT_TYPE.to_string()))
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static(natural_type));
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        *response.status_mut() = status.unwrap_or(StatusCode::OK);
        *response.body_mut() = Body::from(text);
        representation
    } else {
        *response.status_mut() = status.unwrap_or(StatusCode::NO_CONTENT);
        Representation::Empty
    };

    metrics::record_response(representation.as_str(), response.status().as_u16());
    response.extensions_mut().insert(representation);
    response
}

fn redirect_location(redirect: Option<&str>, request: &RequestDescriptor) -> Option<HeaderValue> {
    let target = redirect.filter(|_| !request.wants_structured_output)?;
    match HeaderValue::from_str(target) {
        Ok(location) => Some(location),
        Err(_) => {
            tracing::warn!(target = %target, "Ignoring redirect to invalid location");
            None
        }
    }
}

fn into_wire(body: IntentBody) -> (String, &'static str, Representation) {
    match body {
        IntentBody::Json(json) => (json, JSON_CONTENT_TYPE, Representation::Structured),
        IntentBody::Markup(markup) => (markup, HTML_CONTENT_TYPE, Representation::Template),
        IntentBody::Data(Payload::String(text)) => (text, TEXT_CONTENT_TYPE, Representation::Text),
        IntentBody::Data(payload) => {
            let json = serializer::encode(&payload, false)
                .unwrap_or_else(|e| serialize_failure(&e).to_string());
            (json, JSON_CONTENT_TYPE, Representation::Structured)
        }
    }
}
