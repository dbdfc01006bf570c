//! Request inspection.
//!
//! # Responsibilities
//! - Decide whether the client wants structured output or disabled templating
//! - Capture the conditional cache tag (`If-None-Match`)
//! - Resolve route arguments (domain id) from upstream extensions or path params
//! - Collect the ambient context (ui context, current user) from extensions

use std::collections::{BTreeMap, HashMap};

use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::{header, request::Parts};

use crate::config::NegotiationConfig;
use crate::finalizer::{RequestContext, RequestDescriptor, RouteArgs, UiContext, UserIdentity};

const DOMAIN_PARAMS: [&str; 2] = ["domain_id", "domainId"];

/// Build the request descriptor from request parts.
pub async fn describe_request(parts: &mut Parts, negotiation: &NegotiationConfig) -> RequestDescriptor {
    let wants_structured_output = parts
        .headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("application/json"));

    let wants_no_template = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .is_ok_and(|Query(params)| params.contains_key(&negotiation.no_template_param));

    let conditional_tag = parts
        .headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let args = match parts.extensions.get::<RouteArgs>() {
        Some(args) => args.clone(),
        None => route_args_from_path(parts, &negotiation.default_domain).await,
    };

    RequestDescriptor {
        wants_structured_output,
        wants_no_template,
        conditional_tag,
        args,
    }
}

/// Collect the ambient context set by upstream middleware.
pub fn request_context(parts: &Parts) -> RequestContext {
    RequestContext {
        ui_context: parts.extensions.get::<UiContext>().cloned().unwrap_or_default(),
        user: parts.extensions.get::<UserIdentity>().cloned(),
    }
}

async fn route_args_from_path(parts: &mut Parts, default_domain: &str) -> RouteArgs {
    let params: BTreeMap<String, String> = match RawPathParams::from_request_parts(parts, &()).await {
        Ok(raw) => raw
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        Err(_) => BTreeMap::new(),
    };

    let domain_id = DOMAIN_PARAMS
        .iter()
        .find_map(|name| params.get(*name))
        .cloned()
        .unwrap_or_else(|| default_domain.to_string());

    RouteArgs { domain_id, params }
}
