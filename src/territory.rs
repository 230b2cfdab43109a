//! Agent territories: which slice of the lattice an agent patrols.
//!
//! A territory is either the wildcard (`*`, the whole lattice) or a scope
//! string matched against a record's tags, domain, and scope field. Territories
//! restrict which records an agent scans; they never restrict the id set used
//! for existence checks.

use serde::{Deserialize, Serialize};

use crate::lattice::Record;

/// The record subset an agent is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Territory {
    /// Matches every record.
    All,
    /// Matches records carrying this value as a tag, domain, or scope.
    Scoped(String),
}

impl Territory {
    pub fn scoped(scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if scope.is_empty() || scope == "*" {
            Territory::All
        } else {
            Territory::Scoped(scope)
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Territory::All => true,
            Territory::Scoped(scope) => {
                record.has_tag(scope)
                    || record.domain.as_deref() == Some(scope.as_str())
                    || record.scope.as_deref() == Some(scope.as_str())
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Territory::All)
    }
}

impl Default for Territory {
    fn default() -> Self {
        Territory::All
    }
}

impl From<String> for Territory {
    fn from(s: String) -> Self {
        Territory::scoped(s)
    }
}

impl From<Territory> for String {
    fn from(t: Territory) -> Self {
        match t {
            Territory::All => "*".to_string(),
            Territory::Scoped(scope) => scope,
        }
    }
}

impl std::str::FromStr for Territory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Territory::scoped(s))
    }
}

impl std::fmt::Display for Territory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Territory::All => write!(f, "*"),
            Territory::Scoped(scope) => write!(f, "{scope}"),
        }
    }
}
