//! Finalizer behavior through the HTTP stack.

use axum::{
    body::Body,
    extract::Path,
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use num_bigint::BigInt;
use serde_json::{json, Value};

use response_finalizer::{HandlerError, HandlerResult, Payload, ResponseIntent};

mod common;
use common::{app, send, TEST_REVEAL, TEST_USER};

fn json_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

fn page_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap()
}

async fn record() -> HandlerResult {
    let big: BigInt = "98765432109876543210".parse().unwrap();
    Ok(ResponseIntent::data(
        Payload::map()
            .with("_id", 1)
            .with("_internal", "hidden")
            .with("title", "record")
            .with("counter", big),
    ))
}

async fn page(Path(domain_id): Path<String>) -> HandlerResult {
    Ok(ResponseIntent::page("foo.html", Payload::map().with("a", domain_id)))
}

fn routes() -> Router {
    Router::new()
        .route("/record", get(record))
        .route("/d/{domain_id}/foo", get(page))
        .route("/plain", get(|| async { Ok::<_, HandlerError>(ResponseIntent::page("foo.html", Payload::map().with("a", 1))) }))
        .route("/redirect", get(|| async { Ok::<_, HandlerError>(ResponseIntent::redirect_to("/x")) }))
        .route(
            "/cached",
            get(|| async { Ok::<_, HandlerError>(ResponseIntent::redirect_to("/x").with_cache_tag("abc")) }),
        )
        .route("/missing", get(|| async { Err::<ResponseIntent, _>(HandlerError::not_found("No such problem")) }))
        .route("/broken", get(|| async { Err::<ResponseIntent, _>(HandlerError::internal("pool exhausted at /srv/db/pool.rs")) }))
        .route("/raw", get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout").into_response() }))
        .route(
            "/panic",
            get(|| async {
                if true {
                    panic!("handler exploded");
                }
                Ok::<_, HandlerError>(ResponseIntent::new())
            }),
        )
}

#[tokio::test]
async fn test_structured_output_filters_and_injects_context() {
    let mut request = json_get("/record");
    request.headers_mut().insert(TEST_USER, "alice".parse().unwrap());

    let (status, headers, body) = send(app(routes()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        value,
        json!({
            "_id": 1,
            "title": "record",
            "counter": "BigInt::98765432109876543210",
            "UiContext": { "locale": "en" },
            "UserContext": { "_id": 42, "uname": "alice" }
        })
    );
}

#[tokio::test]
async fn test_display_name_with_permission() {
    let mut request = json_get("/record");
    request.headers_mut().insert(TEST_USER, "root".parse().unwrap());
    request.headers_mut().insert(TEST_REVEAL, "1".parse().unwrap());

    let (_, _, body) = send(app(routes()), request).await;

    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["UserContext"]["displayName"], "Display Name");
    assert!(value["UserContext"].get("_hash").is_none());
}

#[tokio::test]
async fn test_conditional_hit_returns_304() {
    let mut request = page_get("/cached");
    request.headers_mut().insert(header::IF_NONE_MATCH, "abc".parse().unwrap());

    let (status, headers, body) = send(app(routes()), request).await;

    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());
    assert!(headers.get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_conditional_miss_sets_cache_headers() {
    let mut request = json_get("/cached");
    request.headers_mut().insert(header::IF_NONE_MATCH, "stale".parse().unwrap());

    let (status, headers, body) = send(app(routes()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ETAG], "abc");
    assert_eq!(headers[header::CACHE_CONTROL], "public");
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["url"], "/x");
}

#[tokio::test]
async fn test_redirect_for_browser() {
    let (status, headers, body) = send(app(routes()), page_get("/redirect")).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/x");
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_redirect_embedded_for_json_client() {
    let (status, headers, body) = send(app(routes()), json_get("/redirect")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::LOCATION).is_none());
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["url"], "/x");
}

#[tokio::test]
async fn test_domain_specialized_template() {
    let (status, headers, body) = send(app(routes()), page_get("/d/d1/foo")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(body, "d1 foo: d1");
}

#[tokio::test]
async fn test_generic_template_fallback() {
    let (_, _, body) = send(app(routes()), page_get("/d/d2/foo")).await;
    assert_eq!(body, "generic foo: d2");

    let (_, _, body) = send(app(routes()), page_get("/plain")).await;
    assert_eq!(body, "generic foo: 1");
}

#[tokio::test]
async fn test_no_template_query_returns_json() {
    let (status, headers, body) = send(app(routes()), page_get("/plain?noTemplate")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["a"], 1);
}

#[tokio::test]
async fn test_user_facing_failure_page() {
    let (status, _, body) = send(app(routes()), page_get("/missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "error page 404: No such problem");
}

#[tokio::test]
async fn test_internal_failure_page() {
    let (status, _, body) = send(app(routes()), page_get("/broken")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "crash page 500: pool exhausted at pool.rs");
}

#[tokio::test]
async fn test_failure_as_json() {
    let (status, headers, body) = send(app(routes()), json_get("/missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(body, r#"{"error":"No such problem"}"#);
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let (status, _, body) = send(app(routes()), page_get("/panic")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "crash page 500: Handler panicked: handler exploded");
}

#[tokio::test]
async fn test_plain_response_passes_through() {
    let (status, _, body) = send(app(routes()), json_get("/raw")).await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, "short and stout");
}

#[tokio::test]
async fn test_request_id_echoed() {
    let (_, headers, _) = send(app(routes()), json_get("/record")).await;
    assert!(headers.contains_key("x-request-id"));
}
