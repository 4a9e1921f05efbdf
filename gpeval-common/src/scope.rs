//! Ownership scopes
//!
//! Every roster lookup and ledger mutation is evaluated against a [`Scope`]:
//! admins act globally, floor managers act for their team or for the presenters
//! they own. The textual form (`global`, `team:5`, `owner:7`) is what appears in
//! JSON bodies and query strings.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ownership boundary for a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
    /// Admin access: every presenter is visible
    Global,
    /// Presenters assigned to a team
    Team(i64),
    /// Presenters owned by an individual user
    Owner(i64),
}

impl Scope {
    /// Whether a presenter with the given scoping columns is visible in this scope
    pub fn permits(&self, team_id: Option<i64>, owner_id: Option<i64>) -> bool {
        match *self {
            Scope::Global => true,
            Scope::Team(id) => team_id == Some(id),
            Scope::Owner(id) => owner_id == Some(id),
        }
    }

    /// Scoping columns a presenter receives when created under this scope
    pub fn creation_columns(&self) -> (Option<i64>, Option<i64>) {
        match *self {
            Scope::Global => (None, None),
            Scope::Team(id) => (Some(id), None),
            Scope::Owner(id) => (None, Some(id)),
        }
    }

    /// Every scope in which a presenter with these columns is visible
    pub fn covering(team_id: Option<i64>, owner_id: Option<i64>) -> Vec<Scope> {
        let mut scopes = vec![Scope::Global];
        scopes.extend(team_id.map(Scope::Team));
        scopes.extend(owner_id.map(Scope::Owner));
        scopes
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Team(id) => write!(f, "team:{}", id),
            Scope::Owner(id) => write!(f, "owner:{}", id),
        }
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("global") {
            return Ok(Scope::Global);
        }

        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("Unrecognized scope: {:?}", s)))?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Invalid scope id in {:?}", s)))?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "team" => Ok(Scope::Team(id)),
            "owner" => Ok(Scope::Owner(id)),
            other => Err(Error::InvalidInput(format!("Unknown scope kind: {}", other))),
        }
    }
}

impl TryFrom<String> for Scope {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}
