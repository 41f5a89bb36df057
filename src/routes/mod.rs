// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;

use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::http::{header, HeaderValue, Method, Uri};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Origins allowed to call the API with credentials: the configured
/// frontend, local dev servers, and the Expo dev client on the local network.
fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url {
        return true;
    }

    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    let (Some(scheme), Some(host)) = (uri.scheme_str(), uri.host()) else {
        return false;
    };
    if uri.path() != "/" || uri.query().is_some() {
        return false;
    }

    let loopback = host == "localhost" || host == "127.0.0.1";
    match scheme {
        "http" => loopback,
        "exp" => loopback || host.parse::<Ipv4Addr>().is_ok_and(|ip| ip.is_private()),
        _ => false,
    }
}

fn cors_layer(frontend_url: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .is_ok_and(|o| is_allowed_origin(o, &frontend_url))
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.frontend_url.clone());

    // Everything except the health check needs a session
    let protected_routes =
        api::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let frontend = "https://app.example.com";
        assert!(is_allowed_origin("https://app.example.com", frontend));
        assert!(is_allowed_origin("http://localhost:8081", frontend));
        assert!(is_allowed_origin("exp://192.168.1.20:8081", frontend));
        assert!(!is_allowed_origin("https://evil.example.com", frontend));
        assert!(!is_allowed_origin("https://app.example.com.evil.net", frontend));
    }

    #[test]
    fn test_lookalike_origins_rejected() {
        let frontend = "https://app.example.com";
        assert!(is_allowed_origin("http://localhost", frontend));
        assert!(is_allowed_origin("http://127.0.0.1:5173", frontend));
        assert!(is_allowed_origin("exp://localhost:19000", frontend));

        assert!(!is_allowed_origin("http://localhost.evil.com", frontend));
        assert!(!is_allowed_origin("http://127.0.0.1.evil.net", frontend));
        assert!(!is_allowed_origin("http://localhost@evil.com", frontend));
        assert!(!is_allowed_origin("https://localhost:8081", frontend));
        assert!(!is_allowed_origin("exp://evil.com", frontend));
        assert!(!is_allowed_origin("exp://8.8.8.8:8081", frontend));
        assert!(!is_allowed_origin("null", frontend));
    }
}
