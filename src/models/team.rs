use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed enumeration of the roles a team may register under. Each role maps
/// to its own constraint list and fee schedule, configured once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    MarketMaker,
    HedgeFund,
    ArbitrageDesk,
    Retail,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "market_maker" => Some(Role::MarketMaker),
            "hedge_fund" => Some(Role::HedgeFund),
            "arbitrage_desk" => Some(Role::ArbitrageDesk),
            "retail" => Some(Role::Retail),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::MarketMaker => "market_maker",
            Role::HedgeFund => "hedge_fund",
            Role::ArbitrageDesk => "arbitrage_desk",
            Role::Retail => "retail",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub team_id: Uuid,
    pub team_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterTeamRequest {
    pub team_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterTeamResponse {
    pub team_id: Uuid,
    pub team_name: String,
    pub role: Role,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    pub team_id: Uuid,
    pub team_name: String,
    pub role: Role,
}

impl From<&Team> for TeamSummary {
    fn from(team: &Team) -> Self {
        TeamSummary {
            team_id: team.team_id,
            team_name: team.team_name.clone(),
            role: team.role,
        }
    }
}
