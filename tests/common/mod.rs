//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower::ServiceExt;

use response_finalizer::config::FinalizerConfig;
use response_finalizer::finalizer::{Finalizer, Payload, UiContext, UserIdentity};
use response_finalizer::http::HttpServer;
use response_finalizer::security::Permission;
use response_finalizer::templates::HandlebarsTemplates;

/// Header naming the user the test request runs as.
pub const TEST_USER: &str = "x-test-user";
/// Header granting the test user permission to see display names.
pub const TEST_REVEAL: &str = "x-test-reveal";

/// Templates used across tests. Each renders its name so tests can tell them apart.
pub fn templates() -> Arc<HandlebarsTemplates> {
    let templates = HandlebarsTemplates::from_sources([
        ("foo.html", "generic foo: {{a}}"),
        ("foo.d1.html", "d1 foo: {{a}}"),
        ("error.html", "error page {{status}}: {{error}}"),
        ("bsod.html", "crash page {{status}}: {{error}}"),
    ])
    .expect("test templates compile");
    Arc::new(templates)
}

/// Wrap `routes` the same way the server does, plus an outer layer that
/// plays the upstream role of attaching the user and ui context.
pub fn app(routes: Router) -> Router {
    let config = FinalizerConfig::default();
    let finalizer = Arc::new(Finalizer::new(templates()).with_error_pages(config.templates.error_pages()));
    HttpServer::build_router(&config, routes, finalizer).layer(middleware::from_fn(attach_context))
}

async fn attach_context(mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(TEST_USER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Some(uname) = user {
        let permissions = if request.headers().contains_key(TEST_REVEAL) {
            Permission::VIEW_DISPLAYNAME
        } else {
            Permission::NONE
        };
        let identity = UserIdentity::new(42, uname)
            .with_display_name("Display Name")
            .with_field("_hash", "secret")
            .with_permissions(permissions);
        request.extensions_mut().insert(identity);
    }
    request
        .extensions_mut()
        .insert(UiContext(Payload::map().with("locale", "en")));
    next.run(request).await
}

/// Send a request through the router in-process.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects");
    (status, headers, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}
