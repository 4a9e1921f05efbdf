//! Ownership verification
//!
//! Every mutation that names presenter ids goes through [`OwnershipGuard::verify`]
//! first. Ids that do not exist are reported alongside ids that belong to someone
//! else, so a caller cannot discover presenters outside its scope.

use crate::roster::Roster;
use gpeval_common::{Error, Result, Scope};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Result of an ownership check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipReport {
    pub valid: bool,
    /// Offending ids, deduplicated, in input order
    pub invalid_ids: Vec<i64>,
}

impl OwnershipReport {
    pub fn is_invalid(&self, id: i64) -> bool {
        self.invalid_ids.contains(&id)
    }
}

#[derive(Clone)]
pub struct OwnershipGuard {
    roster: Roster,
}

impl OwnershipGuard {
    pub fn new(roster: Roster) -> Self {
        Self { roster }
    }

    /// Flag every id whose presenter is missing or outside `scope`
    pub async fn verify(&self, ids: &[i64], scope: &Scope) -> Result<OwnershipReport> {
        if scope.is_global() || ids.is_empty() {
            return Ok(OwnershipReport {
                valid: true,
                invalid_ids: Vec::new(),
            });
        }

        let columns = self.roster.scope_columns(ids).await?;

        let mut seen = HashSet::new();
        let invalid_ids: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .filter(|id| match columns.get(id) {
                Some((team_id, owner_id)) => !scope.permits(*team_id, *owner_id),
                None => true,
            })
            .collect();

        if !invalid_ids.is_empty() {
            warn!(
                scope = %scope,
                invalid = ?invalid_ids,
                "Ownership check rejected presenter ids"
            );
        }

        Ok(OwnershipReport {
            valid: invalid_ids.is_empty(),
            invalid_ids,
        })
    }

    /// Single-id form for scoped single-item mutations
    pub async fn ensure(&self, id: i64, scope: &Scope) -> Result<()> {
        let report = self.verify(&[id], scope).await?;
        if report.valid {
            Ok(())
        } else {
            Err(Error::OutOfScope(format!(
                "Game presenter {} is not accessible in scope {}",
                id, scope
            )))
        }
    }
}
