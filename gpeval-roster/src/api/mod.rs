//! HTTP API handlers for gpeval-roster
//!
//! JSON in and out with snake_case fields. Scopes travel in their textual form
//! (`global`, `team:5`, `owner:7`).

pub mod bulk;
pub mod health;
pub mod ownership;
pub mod presenters;
pub mod stats;

pub use bulk::bulk_routes;
pub use health::health_routes;
pub use ownership::ownership_routes;
pub use presenters::presenter_routes;
pub use stats::stats_routes;
