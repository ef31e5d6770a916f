use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Map, Value};

use crate::{
    auth::require_internal_key,
    error::{AppError, AppResult},
    repository::table_service::{get_row, list_rows, update_row},
    schemas::{clamp_limit_in_range, PayoutPath, PayoutsQuery},
    services::audit::write_audit_log,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/payouts", axum::routing::get(list_payouts))
        .route(
            "/payouts/{payout_id}/mark-completed",
            axum::routing::post(mark_payout_completed),
        )
}

async fn list_payouts(
    State(state): State<AppState>,
    Query(query): Query<PayoutsQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;

    let mut filters = Map::new();
    if let Some(status) = non_empty_opt(query.status.as_deref()) {
        filters.insert("status".to_string(), Value::String(status));
    }
    if let Some(owner_id) = non_empty_opt(query.owner_id.as_deref()) {
        filters.insert("owner_id".to_string(), Value::String(owner_id));
    }

    let rows = list_rows(
        pool,
        "payouts",
        Some(&filters),
        clamp_limit_in_range(query.limit, 1, 1000),
        0,
        "scheduled_date",
        true,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

/// Called by the external reconciliation process once the owner transfer
/// settles; the only transition is pending -> completed.
async fn mark_payout_completed(
    State(state): State<AppState>,
    Path(path): Path<PayoutPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_internal_key(&state, &headers)?;
    let pool = db_pool(&state)?;

    let existing = get_row(pool, "payouts", &path.payout_id, "id").await?;
    if value_str(&existing, "status") == "completed" {
        return Err(AppError::Conflict(format!(
            "Payout {} is already completed.",
            path.payout_id
        )));
    }

    let mut patch = Map::new();
    patch.insert("status".to_string(), Value::String("completed".to_string()));
    let updated = update_row(pool, "payouts", &path.payout_id, &patch, "id").await?;

    write_audit_log(
        state.db_pool.as_ref(),
        "status_transition",
        "payouts",
        Some(&path.payout_id),
        Some(existing),
        Some(updated.clone()),
    )
    .await;

    Ok(Json(updated))
}

fn db_pool(state: &AppState) -> AppResult<&sqlx::PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}

fn value_str(row: &Value, key: &str) -> String {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

fn non_empty_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
}
