//! Subscription plan levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription plan selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Entry plan: workout library only.
    Basic,

    /// Adds nutrition tracking and trainer messaging.
    Premium,

    /// Full access including priority appointment booking.
    Elite,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Premium => "premium",
            Plan::Elite => "elite",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            "elite" => Ok(Plan::Elite),
            other => Err(ValidationError::invalid_value(
                "plan",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}
