//! HTTP request metrics, layered over the whole router. Tags each request
//! with the venue phase active when it was served, since rejection spikes
//! often line up with the opening auction or the close rather than with any
//! particular route.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics;
use crate::AppState;

fn resolve_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

pub async fn metrics_middleware(State(state): State<Arc<AppState>>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = resolve_path(&request);
    let phase = state.venue.current_phase().to_string();

    metrics::set_http_requests_in_flight(1);
    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();
    metrics::record_http_request(&method, &path, status, &phase, duration);
    metrics::set_http_requests_in_flight(-1);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_path_falls_back_to_the_raw_uri_when_unmatched() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(resolve_path(&request), "/health");
    }
}
