use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::state::AppState;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let db_ok = match &state.db_pool {
        // Bound the round trip so the healthcheck answers quickly even when
        // the pool's first connection is stuck on DNS, SSL or TCP.
        Some(pool) => {
            match tokio::time::timeout(DB_CHECK_TIMEOUT, sqlx::query("SELECT 1").fetch_one(pool))
                .await
            {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Health check DB query failed");
                    false
                }
                Err(_) => {
                    tracing::error!("Health check DB query timed out (3s)");
                    false
                }
            }
        }
        // No DATABASE_URL means the ledger runs without a store; that is a
        // configuration choice, not a degradation.
        None => true,
    };

    Json(json!({
        "status": status_label(db_ok),
        "service": state.config.app_name,
        "environment": state.config.environment,
        "now": Utc::now().to_rfc3339(),
        "db": db_ok
    }))
}

fn status_label(db_ok: bool) -> &'static str {
    if db_ok {
        "ok"
    } else {
        "degraded"
    }
}

#[cfg(test)]
mod tests {
    use super::status_label;

    #[test]
    fn degrades_only_when_the_store_is_unreachable() {
        assert_eq!(status_label(true), "ok");
        assert_eq!(status_label(false), "degraded");
    }
}
