//! Per-request records: what the client asked for, and what the handler wants sent.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, StatusCode};

use super::payload::{Payload, UserIdentity};

pub const DEFAULT_DOMAIN: &str = "system";

/// Read-only description of the inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    /// Client asked for structured data (`Accept: application/json`).
    pub wants_structured_output: bool,
    /// Client disabled templating (`?noTemplate`).
    pub wants_no_template: bool,
    /// Value of `If-None-Match`.
    pub conditional_tag: Option<String>,
    pub args: RouteArgs,
}

/// Route arguments resolved upstream.
///
/// May be inserted as a request extension by routing middleware; otherwise the
/// finalizer derives it from matched path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteArgs {
    pub domain_id: String,
    pub params: BTreeMap<String, String>,
}

impl RouteArgs {
    pub fn new(domain_id: impl Into<String>) -> Self {
        Self {
            domain_id: domain_id.into(),
            params: BTreeMap::new(),
        }
    }
}

impl Default for RouteArgs {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN)
    }
}

/// Auxiliary data merged into structured output under `UiContext`.
#[derive(Debug, Clone, PartialEq)]
pub struct UiContext(pub Payload);

impl Default for UiContext {
    fn default() -> Self {
        UiContext(Payload::map())
    }
}

/// Ambient per-request context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ui_context: UiContext,
    pub user: Option<UserIdentity>,
}

/// Response body as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentBody {
    /// Handler data, not yet encoded.
    Data(Payload),
    /// An encoded JSON document.
    Json(String),
    /// Rendered markup.
    Markup(String),
}

impl IntentBody {
    pub fn is_blank(&self) -> bool {
        match self {
            IntentBody::Data(payload) => payload.is_blank(),
            IntentBody::Json(text) | IntentBody::Markup(text) => text.is_empty(),
        }
    }

    pub(crate) fn into_payload(self) -> Payload {
        match self {
            IntentBody::Data(payload) => payload,
            IntentBody::Json(text) | IntentBody::Markup(text) => Payload::String(text),
        }
    }
}

/// What the handler wants sent back.
///
/// Created empty at request start, filled by the handler, consumed by the
/// finalize stage.
#[derive(Debug, Clone, Default)]
pub struct ResponseIntent {
    pub body: Option<IntentBody>,
    /// Logical template name, e.g. `problem.html`.
    pub template: Option<String>,
    pub redirect: Option<String>,
    /// Opaque validator emitted as `ETag`.
    pub cache_tag: Option<String>,
    pub disposition: Option<String>,
    pub content_type: Option<String>,
    pub status: Option<StatusCode>,
    pub(crate) headers: HeaderMap,
}

impl ResponseIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structured data, rendered as JSON.
    pub fn data(body: impl Into<Payload>) -> Self {
        Self::new().with_body(body)
    }

    /// A page rendered from `template` with `body` as its data.
    pub fn page(template: impl Into<String>, body: impl Into<Payload>) -> Self {
        Self::new().with_template(template).with_body(body)
    }

    pub fn redirect_to(target: impl Into<String>) -> Self {
        Self::new().with_redirect(target)
    }

    pub fn with_body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(IntentBody::Data(body.into()));
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn with_cache_tag(mut self, tag: impl Into<String>) -> Self {
        self.cache_tag = Some(tag.into());
        self
    }

    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Body data, if the body has not been encoded yet.
    pub fn payload(&self) -> Option<&Payload> {
        match &self.body {
            Some(IntentBody::Data(payload)) => Some(payload),
            _ => None,
        }
    }
}
