use serde::Serialize;

/// Market state. Drives the capability vector every entry point consults
/// before touching an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Closed,
    PreOpen,
    OpeningAuction,
    Continuous,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Closed => "closed",
            Phase::PreOpen => "pre_open",
            Phase::OpeningAuction => "opening_auction",
            Phase::Continuous => "continuous",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStyle {
    None,
    Batch,
    Continuous,
}

/// The set of operations a phase allows. Computed once per `Phase` and never
/// mutated; callers hold it by value.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub order_entry_allowed: bool,
    pub cancellation_allowed: bool,
    pub matching_enabled: bool,
    pub execution_style: ExecutionStyle,
}

impl Phase {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Phase::Closed => Capabilities {
                order_entry_allowed: false,
                cancellation_allowed: false,
                matching_enabled: false,
                execution_style: ExecutionStyle::None,
            },
            Phase::PreOpen => Capabilities {
                order_entry_allowed: true,
                cancellation_allowed: true,
                matching_enabled: false,
                execution_style: ExecutionStyle::None,
            },
            Phase::OpeningAuction => Capabilities {
                order_entry_allowed: false,
                cancellation_allowed: false,
                matching_enabled: true,
                execution_style: ExecutionStyle::Batch,
            },
            Phase::Continuous => Capabilities {
                order_entry_allowed: true,
                cancellation_allowed: true,
                matching_enabled: true,
                execution_style: ExecutionStyle::Continuous,
            },
        }
    }
}
