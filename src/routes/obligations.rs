use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::{
    auth::require_internal_key,
    error::{AppError, AppResult},
    repository::table_service::{delete_row, get_row, list_rows},
    schemas::{clamp_limit_in_range, validate_input, ObligationPath, ObligationsQuery, RecordPaymentInput},
    services::{audit::write_audit_log, payments},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/obligations", axum::routing::get(list_obligations))
        .route(
            "/obligations/{obligation_id}",
            axum::routing::get(get_obligation).delete(delete_obligation),
        )
        .route(
            "/obligations/{obligation_id}/record-payment",
            axum::routing::post(record_payment),
        )
}

async fn list_obligations(
    State(state): State<AppState>,
    Query(query): Query<ObligationsQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;

    let mut filters = Map::new();
    if let Some(status) = non_empty_opt(query.status.as_deref()) {
        filters.insert("status".to_string(), Value::String(status));
    }
    if let Some(kind) = non_empty_opt(query.kind.as_deref()) {
        filters.insert("kind".to_string(), Value::String(kind));
    }
    if let Some(contract_id) = non_empty_opt(query.contract_id.as_deref()) {
        filters.insert("contract_id".to_string(), Value::String(contract_id));
    }
    if let (Some(month), Some(year)) = (query.month, query.year) {
        let (from, to) = month_bounds(year, month)?;
        filters.insert(
            "due_date__gte".to_string(),
            Value::String(from.to_string()),
        );
        filters.insert("due_date__lt".to_string(), Value::String(to.to_string()));
    }

    let rows = list_rows(
        pool,
        "obligations",
        Some(&filters),
        clamp_limit_in_range(query.limit, 1, 2000),
        0,
        "due_date",
        true,
    )
    .await?;

    let enriched = enrich_obligation_rows(pool, rows).await?;
    Ok(Json(json!({ "data": enriched })))
}

async fn get_obligation(
    State(state): State<AppState>,
    Path(path): Path<ObligationPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;

    let row = get_row(pool, "obligations", &path.obligation_id, "id").await?;
    let mut enriched = enrich_obligation_rows(pool, vec![row]).await?;
    Ok(Json(
        enriched.pop().unwrap_or_else(|| Value::Object(Map::new())),
    ))
}

async fn record_payment(
    State(state): State<AppState>,
    Path(path): Path<ObligationPath>,
    headers: HeaderMap,
    Json(payload): Json<RecordPaymentInput>,
) -> AppResult<Json<Value>> {
    require_internal_key(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let (obligation, payout) = payments::record_payment(pool, &path.obligation_id, &payload).await?;

    write_audit_log(
        state.db_pool.as_ref(),
        "record_payment",
        "obligations",
        Some(&path.obligation_id),
        None,
        Some(json!({ "obligation": obligation, "payout": payout })),
    )
    .await;
    state.dashboard_cache.invalidate_all();

    Ok(Json(json!({ "obligation": obligation, "payout": payout })))
}

async fn delete_obligation(
    State(state): State<AppState>,
    Path(path): Path<ObligationPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_internal_key(&state, &headers)?;
    let pool = db_pool(&state)?;

    let existing = get_row(pool, "obligations", &path.obligation_id, "id").await?;
    if value_str(&existing, "status") == "paid" {
        return Err(AppError::Conflict(
            "A paid obligation cannot be deleted; its payout references it.".to_string(),
        ));
    }

    let deleted = delete_row(pool, "obligations", &path.obligation_id, "id").await?;

    write_audit_log(
        state.db_pool.as_ref(),
        "delete",
        "obligations",
        Some(&path.obligation_id),
        Some(deleted.clone()),
        None,
    )
    .await;
    state.dashboard_cache.invalidate_all();

    Ok(Json(json!({ "deleted": deleted })))
}

/// Attaches a property label and the tenant name to each obligation row by
/// batch-loading the contracts, properties and tenants they reference.
async fn enrich_obligation_rows(pool: &sqlx::PgPool, rows: Vec<Value>) -> AppResult<Vec<Value>> {
    if rows.is_empty() {
        return Ok(rows);
    }

    let contract_ids = collect_ids(&rows, "contract_id");
    let contracts = load_by_ids(pool, "contracts", &contract_ids).await?;

    let property_ids = collect_ids(&contracts.values().cloned().collect::<Vec<_>>(), "property_id");
    let properties = load_by_ids(pool, "properties", &property_ids).await?;

    let tenant_ids = collect_ids(
        &contracts.values().cloned().collect::<Vec<_>>(),
        "primary_tenant_id",
    );
    let tenants = load_by_ids(pool, "tenants", &tenant_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let contract_id = value_str(&row, "contract_id");
            let contract = contracts.get(&contract_id);
            let property = contract
                .map(|contract| value_str(contract, "property_id"))
                .and_then(|property_id| properties.get(&property_id));
            let tenant = contract
                .map(|contract| value_str(contract, "primary_tenant_id"))
                .and_then(|tenant_id| tenants.get(&tenant_id));

            let mut obj = row.as_object().cloned().unwrap_or_default();
            obj.insert(
                "property_label".to_string(),
                property
                    .map(property_label)
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            obj.insert(
                "tenant_name".to_string(),
                tenant
                    .map(|tenant| value_str(tenant, "name"))
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            Value::Object(obj)
        })
        .collect())
}

fn property_label(property: &Value) -> String {
    let street = value_str(property, "street");
    let number = value_str(property, "number");
    let district = value_str(property, "district");
    let mut label = street;
    if !number.is_empty() {
        label = format!("{label}, {number}");
    }
    if !district.is_empty() {
        label = format!("{label} - {district}");
    }
    label
}

fn collect_ids(rows: &[Value], key: &str) -> Vec<Value> {
    rows.iter()
        .map(|row| value_str(row, key))
        .filter(|id| !id.is_empty())
        .collect::<HashSet<_>>()
        .into_iter()
        .map(Value::String)
        .collect()
}

async fn load_by_ids(
    pool: &sqlx::PgPool,
    table: &str,
    ids: &[Value],
) -> AppResult<HashMap<String, Value>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut filters = Map::new();
    filters.insert("id__in".to_string(), Value::Array(ids.to_vec()));
    let rows = list_rows(pool, table, Some(&filters), ids.len() as i64, 0, "created_at", false)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (value_str(&row, "id"), row))
        .collect())
}

fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let from = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month {year}-{month:02}.")))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let to = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month {year}-{month:02}.")))?;
    Ok((from, to))
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

#[cfg(test)]
mod tests {
    use super::{month_bounds, property_label};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn month_bounds_are_half_open() {
        let (from, to) = month_bounds(2026, 8).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());

        let (from, to) = month_bounds(2026, 12).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());

        assert!(month_bounds(2026, 13).is_err());
    }

    #[test]
    fn property_labels_skip_missing_parts() {
        let full = json!({ "street": "Rua A", "number": "120", "district": "Centro" });
        assert_eq!(property_label(&full), "Rua A, 120 - Centro");

        let partial = json!({ "street": "Rua A" });
        assert_eq!(property_label(&partial), "Rua A");
    }
}
