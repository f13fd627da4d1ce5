//! Resolves the Bearer api key on every protected request into an
//! `AuthenticatedTeam` extension, the way the teacher's auth middleware
//! resolved a JWT into an `AuthUser`.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::team::Role;
use crate::AppState;

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedTeam {
    pub team_id: Uuid,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let (team_id, role) = state
        .teams
        .authenticate(api_key)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthenticatedTeam { team_id, role });
    Ok(next.run(request).await)
}
