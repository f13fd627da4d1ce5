//! Instrument definitions.
//!
//! Instruments are listed once by an admin operation and are immutable for the
//! lifetime of the process — there is no update or delist operation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Option,
    Future,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub underlying: String,
    pub kind: InstrumentKind,
    pub strike: Option<rust_decimal::Decimal>,
    pub expiry: Option<chrono::NaiveDate>,
    pub option_type: Option<OptionType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListInstrumentRequest {
    pub symbol: String,
    pub underlying: String,
    pub kind: InstrumentKind,
    pub strike: Option<rust_decimal::Decimal>,
    pub expiry: Option<chrono::NaiveDate>,
    pub option_type: Option<OptionType>,
}

impl From<ListInstrumentRequest> for Instrument {
    fn from(req: ListInstrumentRequest) -> Self {
        Instrument {
            symbol: req.symbol,
            underlying: req.underlying,
            kind: req.kind,
            strike: req.strike,
            expiry: req.expiry,
            option_type: req.option_type,
        }
    }
}
