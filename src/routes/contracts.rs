use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    auth::require_internal_key,
    error::{AppError, AppResult},
    schemas::ContractPath,
    services::{audit::write_audit_log, schedule},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/contracts/{contract_id}/generate-schedule",
            axum::routing::post(generate_schedule),
        )
        .route(
            "/contracts/generate-schedules",
            axum::routing::post(generate_all_schedules),
        )
}

async fn generate_schedule(
    State(state): State<AppState>,
    Path(path): Path<ContractPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_internal_key(&state, &headers)?;
    let pool = db_pool(&state)?;

    let today = Utc::now().date_naive();
    let created = schedule::generate_contract_schedule(pool, &path.contract_id, today).await?;

    write_audit_log(
        state.db_pool.as_ref(),
        "generate_schedule",
        "contracts",
        Some(&path.contract_id),
        None,
        Some(json!({ "obligations_created": created })),
    )
    .await;
    state.dashboard_cache.invalidate_all();

    Ok(Json(json!({ "count": created })))
}

async fn generate_all_schedules(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_internal_key(&state, &headers)?;
    let pool = db_pool(&state)?;

    let today = Utc::now().date_naive();
    let outcome = schedule::generate_all_active(pool, today).await?;

    write_audit_log(
        state.db_pool.as_ref(),
        "generate_schedules",
        "contracts",
        None,
        None,
        Some(json!({
            "contracts_scanned": outcome.contracts_scanned,
            "obligations_created": outcome.obligations_created,
        })),
    )
    .await;
    if outcome.obligations_created > 0 {
        state.dashboard_cache.invalidate_all();
    }

    Ok(Json(json!({
        "contracts_scanned": outcome.contracts_scanned,
        "contracts_generated": outcome.contracts_generated,
        "contracts_skipped": outcome.contracts_skipped,
        "obligations_created": outcome.obligations_created,
        "errors": outcome.errors,
    })))
}

fn db_pool(state: &AppState) -> AppResult<&sqlx::PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}
