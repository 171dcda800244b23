//! Accounting method selector

use serde::{Deserialize, Serialize};

/// Policy governing how simulated resource levels evolve during a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountingMethod {
    /// Fixed initial levels with no further inflow
    #[default]
    Fresh,
    /// Replay the historical series, extrapolating past its end
    Historical,
    /// Replay the historical series strictly, frozen past its end
    Exact,
}

impl AccountingMethod {
    /// Whether the method consumes a historical series
    #[inline]
    pub fn uses_history(&self) -> bool {
        !matches!(self, AccountingMethod::Fresh)
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountingMethod::Fresh => "fresh",
            AccountingMethod::Historical => "historical",
            AccountingMethod::Exact => "exact",
        }
    }
}

impl std::fmt::Display for AccountingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fresh" | "initial" => Ok(AccountingMethod::Fresh),
            "historical" | "history" => Ok(AccountingMethod::Historical),
            "exact" => Ok(AccountingMethod::Exact),
            other => Err(format!("unknown accounting method '{}'", other)),
        }
    }
}
