//! Team registration and instrument listing (§6 ops 0 and 1). Both are
//! ambient admin/transport operations backed directly by C11/C5 — neither
//! goes through the pipeline, since there is nothing to validate against
//! positions or a book.

use axum::{extract::State, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{AppError, Envelope};
use crate::models::instrument::ListInstrumentRequest;
use crate::models::team::{RegisterTeamRequest, RegisterTeamResponse};
use crate::teams::TeamError;
use crate::venue::VenueError;
use crate::AppState;

pub async fn register_team(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterTeamRequest>,
) -> Result<Json<Envelope<RegisterTeamResponse>>, AppError> {
    let (team, api_key) = state.teams.register(&req.team_name, &req.role).map_err(|err| match err {
        TeamError::NameTaken => AppError::bad_request("TEAM_NAME_TAKEN", "team name is already registered"),
        TeamError::InvalidRole => AppError::bad_request("INVALID_ROLE", "role is not a recognized team role"),
        TeamError::InvalidApiKey => AppError::internal("INTERNAL_ERROR", "unexpected api key error during registration"),
    })?;

    let response = RegisterTeamResponse {
        team_id: team.team_id,
        team_name: team.team_name,
        role: team.role,
        api_key,
        created_at: team.created_at,
    };
    Ok(Json(Envelope::ok(Uuid::new_v4().to_string(), None, response)))
}

pub async fn list_instrument(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListInstrumentRequest>,
) -> Result<Json<Envelope<crate::models::instrument::Instrument>>, AppError> {
    let instrument = crate::models::instrument::Instrument::from(req);
    let symbol = instrument.symbol.clone();
    state.venue.list_instrument(instrument.clone()).map_err(|err| match err {
        VenueError::InstrumentExists(symbol) => {
            AppError::bad_request("INSTRUMENT_EXISTS", format!("instrument {symbol} is already listed"))
        }
        other => AppError::internal("INTERNAL_ERROR", other.to_string()),
    })?;
    tracing::info!(symbol, "instrument listed");
    Ok(Json(Envelope::ok(Uuid::new_v4().to_string(), None, instrument)))
}
