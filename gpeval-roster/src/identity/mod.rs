//! Presenter identity: canonicalization, similarity and resolution

pub mod normalizer;
pub mod resolver;
pub mod similarity;

pub use normalizer::{normalize, MAX_NAME_LENGTH};
pub use resolver::{best_match, IdentityResolver, Match, Resolution};
pub use similarity::{score, EXACT_MATCH};
