//! Typed application configuration (§6), loaded from environment variables
//! (via `.env` if present) with defaults for everything optional.

use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::core::PricingStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    Continuous,
    Batch,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    exchange_matching_mode: String,
    exchange_batch_pricing_strategy: String,
    exchange_phase_check_interval_ms: u64,
    exchange_order_queue_timeout_ms: u64,
    coordinator_default_timeout_ms: u64,
    coordinator_max_pending_requests: usize,
    coordinator_cleanup_interval_ms: u64,
    exchange_constraints_path: Option<String>,
    exchange_fees_path: Option<String>,
    exchange_schedule_path: Option<String>,
    server_port: u16,
    rust_log: String,
    auth_signing_key: String,
}

pub struct AppConfig {
    pub matching_mode: MatchingMode,
    pub batch_pricing_strategy: PricingStrategy,
    pub phase_check_interval: Duration,
    pub order_queue_timeout: Duration,
    pub coordinator_default_timeout: Duration,
    pub coordinator_max_pending_requests: usize,
    pub coordinator_cleanup_interval: Duration,
    pub constraints_path: Option<String>,
    pub fees_path: Option<String>,
    pub schedule_path: Option<String>,
    pub server_port: u16,
    pub rust_log: String,
    pub auth_signing_key: String,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = Config::builder()
            .set_default("exchange_matching_mode", "continuous")?
            .set_default("exchange_batch_pricing_strategy", "maximum_volume")?
            .set_default("exchange_phase_check_interval_ms", 100)?
            .set_default("exchange_order_queue_timeout_ms", 10)?
            .set_default("coordinator_default_timeout_ms", 5000)?
            .set_default("coordinator_max_pending_requests", 1000)?
            .set_default("coordinator_cleanup_interval_ms", 30000)?
            .set_default("server_port", 8080)?
            .set_default("rust_log", "exchange_core=debug,tower_http=debug")?
            .set_default("auth_signing_key", "dev-only-signing-key-change-me")?
            .add_source(Environment::default());

        let raw: RawConfig = builder.build()?.try_deserialize()?;

        let matching_mode = match raw.exchange_matching_mode.as_str() {
            "continuous" => MatchingMode::Continuous,
            "batch" => MatchingMode::Batch,
            other => anyhow::bail!("unrecognized EXCHANGE_MATCHING_MODE: {other}"),
        };
        let batch_pricing_strategy = match raw.exchange_batch_pricing_strategy.as_str() {
            "equilibrium" => PricingStrategy::Equilibrium,
            "maximum_volume" => PricingStrategy::MaximumVolume,
            other => anyhow::bail!("unrecognized EXCHANGE_BATCH_PRICING_STRATEGY: {other}"),
        };

        Ok(Self {
            matching_mode,
            batch_pricing_strategy,
            phase_check_interval: Duration::from_millis(raw.exchange_phase_check_interval_ms),
            order_queue_timeout: Duration::from_millis(raw.exchange_order_queue_timeout_ms),
            coordinator_default_timeout: Duration::from_millis(raw.coordinator_default_timeout_ms),
            coordinator_max_pending_requests: raw.coordinator_max_pending_requests,
            coordinator_cleanup_interval: Duration::from_millis(raw.coordinator_cleanup_interval_ms),
            constraints_path: raw.exchange_constraints_path,
            fees_path: raw.exchange_fees_path,
            schedule_path: raw.exchange_schedule_path,
            server_port: raw.server_port,
            rust_log: raw.rust_log,
            auth_signing_key: raw.auth_signing_key,
        })
    }
}
