//! Risk profile table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Conservative,
        RiskProfile::Moderate,
        RiskProfile::Aggressive,
    ];

    /// Fraction of the bankroll risked on a single entry.
    pub fn risk_fraction(&self) -> f64 {
        match self {
            RiskProfile::Conservative => 0.02,
            RiskProfile::Moderate => 0.05,
            RiskProfile::Aggressive => 0.10,
        }
    }

    /// Fraction of the bankroll considered a sustainable daily extraction.
    /// Same values as the risk fraction today, but tuned independently.
    pub fn safe_withdrawal_fraction(&self) -> f64 {
        match self {
            RiskProfile::Conservative => 0.02,
            RiskProfile::Moderate => 0.05,
            RiskProfile::Aggressive => 0.10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "Conservative",
            RiskProfile::Moderate => "Moderate",
            RiskProfile::Aggressive => "Aggressive",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Moderate => "moderate",
            RiskProfile::Aggressive => "aggressive",
        }
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        RiskProfile::Moderate
    }
}

impl FromStr for RiskProfile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            other => Err(ValidationError::UnknownProfile(other.to_string())),
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0}% risk)", self.label(), self.risk_fraction() * 100.0)
    }
}
