//! In-memory team directory (§4.11). Not durable: issued api keys stop
//! validating the moment the process restarts, since the signing key is
//! regenerated (or reloaded) at startup and the team map is gone either way.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::team::{Role, Team, TeamSummary};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    #[error("team name already registered")]
    NameTaken,
    #[error("unrecognized role")]
    InvalidRole,
    #[error("api key is invalid or expired")]
    InvalidApiKey,
}

pub struct TeamRegistry {
    teams: DashMap<Uuid, Team>,
    names: DashMap<String, Uuid>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    key_ttl: Duration,
}

impl TeamRegistry {
    pub fn new(signing_key: &str) -> Self {
        Self {
            teams: DashMap::new(),
            names: DashMap::new(),
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
            key_ttl: Duration::days(30),
        }
    }

    pub fn register(&self, team_name: &str, role_str: &str) -> Result<(Team, String), TeamError> {
        let role = Role::parse(role_str).ok_or(TeamError::InvalidRole)?;

        let team_id = Uuid::new_v4();
        let entry = self.names.entry(team_name.to_string());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(TeamError::NameTaken),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(team_id);
            }
        }

        let team = Team {
            team_id,
            team_name: team_name.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.teams.insert(team_id, team.clone());

        let api_key = self.issue_api_key(team_id, role);
        Ok((team, api_key))
    }

    fn issue_api_key(&self, team_id: Uuid, role: Role) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: team_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + self.key_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .expect("HS256 encoding with a constructed key never fails")
    }

    /// Validate an api key and resolve it to `(team_id, role)` without a
    /// map lookup — everything needed is in the signed claims.
    pub fn authenticate(&self, api_key: &str) -> Result<(Uuid, Role), TeamError> {
        let data: TokenData<Claims> = decode(api_key, &self.decoding_key, &Validation::default())
            .map_err(|_| TeamError::InvalidApiKey)?;
        let team_id = Uuid::parse_str(&data.claims.sub).map_err(|_| TeamError::InvalidApiKey)?;
        let role = Role::parse(&data.claims.role).ok_or(TeamError::InvalidApiKey)?;
        Ok((team_id, role))
    }

    pub fn lookup(&self, team_id: Uuid) -> Option<TeamSummary> {
        self.teams.get(&team_id).map(|t| TeamSummary::from(&*t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_authenticate_round_trips() {
        let registry = TeamRegistry::new("test-signing-key");
        let (team, api_key) = registry.register("alpha-desk", "hedge_fund").unwrap();

        let (team_id, role) = registry.authenticate(&api_key).unwrap();
        assert_eq!(team_id, team.team_id);
        assert_eq!(role, Role::HedgeFund);
    }

    #[test]
    fn duplicate_team_name_is_rejected() {
        let registry = TeamRegistry::new("test-signing-key");
        registry.register("alpha-desk", "retail").unwrap();
        let err = registry.register("alpha-desk", "retail").unwrap_err();
        assert!(matches!(err, TeamError::NameTaken));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let registry = TeamRegistry::new("test-signing-key");
        let err = registry.register("beta-desk", "quant_pod").unwrap_err();
        assert!(matches!(err, TeamError::InvalidRole));
    }

    #[test]
    fn garbage_api_key_fails_auth() {
        let registry = TeamRegistry::new("test-signing-key");
        assert!(registry.authenticate("not-a-real-token").is_err());
    }
}
