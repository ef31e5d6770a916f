pub mod contracts;
pub mod health;
pub mod obligations;
pub mod payouts;
pub mod reports;

use crate::state::AppState;

pub fn v1_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/health", axum::routing::get(health::health))
        .merge(contracts::router())
        .merge(obligations::router())
        .merge(payouts::router())
        .merge(reports::router())
}
