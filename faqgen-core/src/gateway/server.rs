//! HTTP gateway server built on axum.

use super::{
    ANONYMOUS_USER, ApiError, GenerateFaqRequest, GenerateFaqResponse, SharedGateway,
    USER_ID_HEADER,
};
use crate::error::GenerateError;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the axum Router with `/generate-faq` and `/hello`, mounted at the
/// root and under the configured route prefix.
pub fn router(shared: SharedGateway) -> Router {
    let routes: Router<SharedGateway> = Router::new()
        .route("/generate-faq", post(generate_faq_handler))
        .route("/hello", get(hello_handler));

    let prefix = shared.config().route_prefix.trim_end_matches('/').to_string();
    let app = if prefix.is_empty() {
        routes
    } else {
        let prefix = if prefix.starts_with('/') {
            prefix
        } else {
            format!("/{prefix}")
        };
        routes.clone().nest(&prefix, routes)
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared)
}

/// Liveness probe.
async fn hello_handler() -> &'static str {
    "Hello, World!"
}

fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

/// Generate the FAQ for the submitted document URLs.
async fn generate_faq_handler(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    body: Result<Json<GenerateFaqRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ApiError::invalid_request(format!(
                "Request body must be {{\"urls\": [...]}}: {}",
                rejection.body_text()
            ))
            .into_response();
        }
    };

    let max = gw.config().max_urls_per_request;
    if request.urls.len() > max {
        return ApiError::from(GenerateError::TooManyReferences {
            count: request.urls.len(),
            max,
        })
        .into_response();
    }

    let user_id = user_id(&headers);
    info!(user_id = %user_id, urls = request.urls.len(), "FAQ generation requested");

    let orchestrator = gw.orchestrator();
    let result = match gw.batch_timeout() {
        Some(deadline) => {
            orchestrator
                .generate_urls_within(&user_id, &request.urls, deadline)
                .await
        }
        None => orchestrator.generate_urls(&user_id, &request.urls).await,
    };

    match result {
        Ok(entries) => Json(GenerateFaqResponse::from_entries(&entries)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Start the gateway server on the configured address.
///
/// This is an async function that runs until cancelled.
pub async fn run(gw: SharedGateway) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", gw.config().host, gw.config().port);
    let app = router(gw);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
