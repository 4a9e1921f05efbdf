//! Identity resolution
//!
//! Decides whether a raw OCR'd name is an existing presenter (exact or fuzzy
//! match within the caller's scope) or a new one. Two pre-existing presenters are
//! never merged here; that is an explicit administrative action.

use super::{normalize, score, EXACT_MATCH};
use crate::roster::Roster;
use gpeval_common::db::GamePresenter;
use gpeval_common::{Error, Result, Scope};
use serde::Serialize;
use tracing::{debug, info};

/// An existing presenter scored against a name
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub presenter: GamePresenter,
    /// 0..=100
    pub similarity: u8,
    pub is_exact: bool,
}

/// Outcome of [`IdentityResolver::resolve`]
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub presenter: GamePresenter,
    pub is_new: bool,
    pub similarity: u8,
}

/// Highest-scoring candidate; ties go to the earliest in `candidates`
///
/// `candidates` must be in creation order so repeated uploads keep landing on the
/// same presenter.
pub fn best_match<'a>(
    canonical: &str,
    candidates: &'a [GamePresenter],
) -> Option<(&'a GamePresenter, u8)> {
    let mut best: Option<(&'a GamePresenter, u8)> = None;

    for candidate in candidates {
        let similarity = score(canonical, &candidate.canonical_name);
        if best.map_or(true, |(_, top)| similarity > top) {
            best = Some((candidate, similarity));
            if similarity == EXACT_MATCH {
                break;
            }
        }
    }

    best
}

/// Resolves raw presenter names against the scoped roster
#[derive(Clone)]
pub struct IdentityResolver {
    roster: Roster,
    fuzzy_threshold: u8,
}

impl IdentityResolver {
    pub fn new(roster: Roster, fuzzy_threshold: u8) -> Self {
        Self {
            roster,
            fuzzy_threshold: fuzzy_threshold.min(EXACT_MATCH),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn fuzzy_threshold(&self) -> u8 {
        self.fuzzy_threshold
    }

    /// Resolve `raw_name` to a presenter visible in `scope`, creating one when no
    /// candidate reaches the fuzzy threshold.
    pub async fn resolve(&self, raw_name: &str, scope: &Scope) -> Result<Resolution> {
        let canonical = normalize(raw_name)?;

        if let Some(found) = self.match_canonical(raw_name, &canonical, scope).await? {
            return Ok(Resolution {
                presenter: found.presenter,
                is_new: false,
                similarity: found.similarity,
            });
        }

        let (presenter, created) = self
            .roster
            .find_or_insert(raw_name.trim(), &canonical, scope)
            .await?;

        Ok(Resolution {
            presenter,
            is_new: created,
            similarity: EXACT_MATCH,
        })
    }

    /// Like [`IdentityResolver::resolve`] but never creates a presenter
    pub async fn find_match(&self, raw_name: &str, scope: &Scope) -> Result<Option<Match>> {
        let canonical = normalize(raw_name)?;
        self.match_canonical(raw_name, &canonical, scope).await
    }

    async fn match_canonical(
        &self,
        raw_name: &str,
        canonical: &str,
        scope: &Scope,
    ) -> Result<Option<Match>> {
        let candidates = self.roster.candidates(scope).await?;

        let Some((presenter, similarity)) = best_match(canonical, &candidates) else {
            return Ok(None);
        };

        if similarity == EXACT_MATCH {
            debug!(id = presenter.id, scope = %scope, "Exact presenter match");
        } else if similarity >= self.fuzzy_threshold {
            info!(
                raw = %raw_name,
                matched = %presenter.display_name,
                id = presenter.id,
                similarity,
                "Fuzzy presenter match"
            );
        } else {
            return Ok(None);
        }

        Ok(Some(Match {
            presenter: presenter.clone(),
            similarity,
            is_exact: similarity == EXACT_MATCH,
        }))
    }

    /// Every candidate scoring at least `threshold`, best first
    pub async fn suggest(&self, raw_name: &str, scope: &Scope, threshold: u8) -> Result<Vec<Match>> {
        if threshold > EXACT_MATCH {
            return Err(Error::InvalidInput(format!(
                "threshold must be within 0..=100, got {}",
                threshold
            )));
        }

        let canonical = normalize(raw_name)?;
        let candidates = self.roster.candidates(scope).await?;

        let mut matches: Vec<Match> = candidates
            .iter()
            .filter_map(|candidate| {
                let similarity = score(&canonical, &candidate.canonical_name);
                (similarity >= threshold).then(|| Match {
                    presenter: candidate.clone(),
                    similarity,
                    is_exact: similarity == EXACT_MATCH,
                })
            })
            .collect();

        // Stable sort keeps creation order among equal scores
        matches.sort_by(|a, b| b.similarity.cmp(&a.similarity));
        Ok(matches)
    }
}
