use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Map, Value};

use crate::{
    error::{AppError, AppResult},
    repository::table_service::{count_rows, list_rows},
    schemas::{DashboardQuery, ReportRangeQuery},
    services::reporting::{
        date_value, decimal_field, decimal_to_number, delinquency_rate, effective_status,
        growth_percent, headline_fee_rate, monthly_series, month_received, months_back,
        occupancy_rate, parse_date, summarize_rent, unpaid_shortlist, value_str,
        ReportingPeriod,
    },
    state::AppState,
};

const SHORTLIST_SIZE: usize = 5;
const SERIES_MONTHS: u32 = 6;
const REPORT_ROW_LIMIT: i64 = 10000;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/reports/dashboard", axum::routing::get(dashboard_report))
        .route("/reports/finance", axum::routing::get(finance_report))
        .route(
            "/reports/delinquency",
            axum::routing::get(delinquency_report),
        )
        .route("/reports/owners", axum::routing::get(owner_report))
        .route("/reports/properties", axum::routing::get(property_report))
}

async fn dashboard_report(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    let period = ReportingPeriod::parse(&query.period)?;
    let cache_key = period.cache_key();
    if let Some(cached) = state.dashboard_cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let pool = db_pool(&state)?;
    let today = Utc::now().date_naive();

    let rent_rows = list_rows(
        pool,
        "obligations",
        Some(&json_map(&[("kind", Value::String("rent".to_string()))])),
        REPORT_ROW_LIMIT,
        0,
        "due_date",
        true,
    )
    .await?;

    // Stored pending/overdue covers every unpaid row; the shortlist derives
    // the displayed status from the due date.
    let unpaid_rows = list_rows(
        pool,
        "obligations",
        Some(&json_map(&[(
            "status",
            json!(["pending", "overdue"]),
        )])),
        REPORT_ROW_LIMIT,
        0,
        "due_date",
        true,
    )
    .await?;

    let recent_contracts = list_rows(
        pool,
        "contracts",
        Some(&json_map(&[("status", Value::String("active".to_string()))])),
        SHORTLIST_SIZE as i64,
        0,
        "start_date",
        false,
    )
    .await?;
    let recent_contracts = enrich_contract_rows(pool, recent_contracts).await?;

    let summary = summarize_rent(&rent_rows, period, today);
    let fee_rate = headline_fee_rate();

    let (current_year, current_month) = (today.year(), today.month());
    let (previous_year, previous_month) = months_back(current_year, current_month, 1);
    let received_this_month = month_received(&rent_rows, current_year, current_month);
    let received_last_month = month_received(&rent_rows, previous_year, previous_month);

    let properties_total = count_rows(pool, "properties", None).await?;
    let properties_rented = count_rows(
        pool,
        "properties",
        Some(&json_map(&[("status", Value::String("rented".to_string()))])),
    )
    .await?;
    let properties_available = count_rows(
        pool,
        "properties",
        Some(&json_map(&[(
            "status",
            Value::String("available".to_string()),
        )])),
    )
    .await?;
    let contracts_active = count_rows(
        pool,
        "contracts",
        Some(&json_map(&[("status", Value::String("active".to_string()))])),
    )
    .await?;
    let tenants_total = count_rows(pool, "tenants", None).await?;
    let owners_total = count_rows(pool, "owners", None).await?;

    let response = json!({
        "period": query.period,
        "revenue_gross": decimal_to_number(summary.billed),
        "revenue_fee": decimal_to_number(at_fee_scale(summary.billed, fee_rate)),
        "received_gross": decimal_to_number(summary.received),
        "received_fee": decimal_to_number(at_fee_scale(summary.received, fee_rate)),
        "pending_gross": decimal_to_number(summary.pending),
        "pending_fee": decimal_to_number(at_fee_scale(summary.pending, fee_rate)),
        "overdue_gross": decimal_to_number(summary.overdue),
        "overdue_fee": decimal_to_number(at_fee_scale(summary.overdue, fee_rate)),
        "growth_percent": decimal_to_number(growth_percent(
            received_this_month,
            received_last_month,
        )),
        "upcoming_obligations": unpaid_shortlist(&unpaid_rows, today, SHORTLIST_SIZE),
        "recent_contracts": recent_contracts,
        "monthly_series": monthly_series(&rent_rows, today, SERIES_MONTHS),
        "counters": {
            "properties_total": properties_total,
            "properties_rented": properties_rented,
            "properties_available": properties_available,
            "contracts_active": contracts_active,
            "tenants_total": tenants_total,
            "owners_total": owners_total,
        },
    });

    state
        .dashboard_cache
        .insert(cache_key, response.clone())
        .await;
    Ok(Json(response))
}

async fn finance_report(
    State(state): State<AppState>,
    Query(query): Query<ReportRangeQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be earlier than 'from'.".to_string(),
        ));
    }
    let today = Utc::now().date_naive();

    let rows = list_rows(
        pool,
        "obligations",
        Some(&json_map(&[
            ("kind", Value::String("rent".to_string())),
            ("due_date__gte", Value::String(from.to_string())),
            ("due_date__lte", Value::String(to.to_string())),
        ])),
        REPORT_ROW_LIMIT,
        0,
        "due_date",
        true,
    )
    .await?;

    let payouts = list_rows(
        pool,
        "payouts",
        Some(&json_map(&[
            ("scheduled_date__gte", Value::String(from.to_string())),
            ("scheduled_date__lte", Value::String(to.to_string())),
        ])),
        REPORT_ROW_LIMIT,
        0,
        "scheduled_date",
        true,
    )
    .await?;

    Ok(Json(build_finance_report(from, to, &rows, &payouts, today)))
}

/// Folds the in-range rent rows into the finance totals. The administration
/// fee is charged on everything billed in the range, not only on what came
/// in; `received` is the sum of the recorded payments.
fn build_finance_report(
    from: NaiveDate,
    to: NaiveDate,
    rows: &[Value],
    payouts: &[Value],
    today: NaiveDate,
) -> Value {
    let mut billed = Decimal::ZERO;
    let mut received = Decimal::ZERO;
    let mut pending = Decimal::ZERO;
    let mut overdue = Decimal::ZERO;
    for row in rows {
        let status = effective_status(row, today);
        if status == "cancelled" {
            continue;
        }
        let original = decimal_field(row, "original_amount");
        billed += original;
        match status.as_str() {
            "paid" => {
                let paid = decimal_field(row, "paid_amount");
                received += if paid.is_zero() { original } else { paid };
            }
            "overdue" => overdue += original,
            _ => pending += original,
        }
    }

    let payout_net_total: Decimal = payouts
        .iter()
        .map(|row| decimal_field(row, "net_amount"))
        .sum();

    json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "billed": decimal_to_number(billed),
        "received": decimal_to_number(received),
        "pending": decimal_to_number(pending),
        "overdue": decimal_to_number(overdue),
        "administration_fee": decimal_to_number(at_fee_scale(billed, headline_fee_rate())),
        "payout_net_total": decimal_to_number(payout_net_total),
        "delinquency_rate": decimal_to_number(delinquency_rate(overdue, billed)),
    })
}

async fn delinquency_report(
    State(state): State<AppState>,
    Query(query): Query<ReportRangeQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be earlier than 'from'.".to_string(),
        ));
    }
    let today = Utc::now().date_naive();

    let rows = list_rows(
        pool,
        "obligations",
        Some(&json_map(&[
            ("status", json!(["pending", "overdue"])),
            ("due_date__gte", Value::String(from.to_string())),
            ("due_date__lte", Value::String(to.to_string())),
        ])),
        REPORT_ROW_LIMIT,
        0,
        "due_date",
        true,
    )
    .await?;

    let overdue_rows = rows
        .iter()
        .filter(|row| effective_status(row, today) == "overdue")
        .cloned()
        .collect::<Vec<_>>();

    let contract_ids = overdue_rows
        .iter()
        .map(|row| value_str(row, "contract_id"))
        .filter(|id| !id.is_empty())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .map(Value::String)
        .collect::<Vec<_>>();
    let contracts = load_by_ids(pool, "contracts", &contract_ids).await?;
    let tenant_ids = contracts
        .values()
        .map(|contract| value_str(contract, "primary_tenant_id"))
        .filter(|id| !id.is_empty())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .map(Value::String)
        .collect::<Vec<_>>();
    let tenants = load_by_ids(pool, "tenants", &tenant_ids).await?;

    let mut total_amount = Decimal::ZERO;
    let items = overdue_rows
        .iter()
        .map(|row| {
            let amount = decimal_field(row, "original_amount");
            total_amount += amount;
            let due_date = date_value(row, "due_date");
            let days_overdue = due_date
                .map(|due_date| (today - due_date).num_days().max(0))
                .unwrap_or(0);
            let tenant = contracts
                .get(&value_str(row, "contract_id"))
                .map(|contract| value_str(contract, "primary_tenant_id"))
                .and_then(|tenant_id| tenants.get(&tenant_id));
            json!({
                "id": value_str(row, "id"),
                "contract_id": value_str(row, "contract_id"),
                "kind": value_str(row, "kind"),
                "due_date": due_date.map(|d| d.to_string()),
                "original_amount": decimal_to_number(amount),
                "days_overdue": days_overdue,
                "tenant_name": tenant.map(|tenant| value_str(tenant, "name")),
                "tenant_phone": tenant.map(|tenant| value_str(tenant, "phone")),
            })
        })
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "count": items.len(),
        "total_amount": decimal_to_number(total_amount),
        "items": items,
    })))
}

async fn owner_report(
    State(state): State<AppState>,
    Query(query): Query<ReportRangeQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be earlier than 'from'.".to_string(),
        ));
    }

    let owners = list_rows(pool, "owners", None, REPORT_ROW_LIMIT, 0, "name", true).await?;
    let properties =
        list_rows(pool, "properties", None, REPORT_ROW_LIMIT, 0, "created_at", true).await?;
    let payouts = list_rows(
        pool,
        "payouts",
        Some(&json_map(&[
            ("scheduled_date__gte", Value::String(from.to_string())),
            ("scheduled_date__lte", Value::String(to.to_string())),
        ])),
        REPORT_ROW_LIMIT,
        0,
        "scheduled_date",
        true,
    )
    .await?;

    let items = fold_owner_report(&owners, &properties, &payouts);
    Ok(Json(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "count": items.len(),
        "items": items,
    })))
}

/// One line per owner: property counts plus the net amount scheduled for
/// payout in the range, biggest earners first.
fn fold_owner_report(owners: &[Value], properties: &[Value], payouts: &[Value]) -> Vec<Value> {
    let mut property_counts: HashMap<String, (i64, i64)> = HashMap::new();
    for property in properties {
        let owner_id = value_str(property, "owner_id");
        if owner_id.is_empty() {
            continue;
        }
        let entry = property_counts.entry(owner_id).or_default();
        entry.0 += 1;
        if value_str(property, "status") == "rented" {
            entry.1 += 1;
        }
    }

    let mut net_totals: HashMap<String, Decimal> = HashMap::new();
    for payout in payouts {
        let owner_id = value_str(payout, "owner_id");
        if owner_id.is_empty() {
            continue;
        }
        *net_totals.entry(owner_id).or_insert(Decimal::ZERO) +=
            decimal_field(payout, "net_amount");
    }

    let mut ranked = owners
        .iter()
        .map(|owner| {
            let id = value_str(owner, "id");
            let (total, rented) = property_counts.get(&id).copied().unwrap_or((0, 0));
            let net = net_totals.get(&id).copied().unwrap_or(Decimal::ZERO);
            let item = json!({
                "owner_id": id,
                "name": value_str(owner, "name"),
                "document": value_str(owner, "document"),
                "properties_total": total,
                "properties_rented": rented,
                "payout_net": decimal_to_number(net),
            });
            (net, item)
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, item)| item).collect()
}

async fn property_report(
    State(state): State<AppState>,
    Query(query): Query<ReportRangeQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be earlier than 'from'.".to_string(),
        ));
    }

    let properties =
        list_rows(pool, "properties", None, REPORT_ROW_LIMIT, 0, "created_at", true).await?;
    let contracts =
        list_rows(pool, "contracts", None, REPORT_ROW_LIMIT, 0, "start_date", true).await?;
    let paid_rows = list_rows(
        pool,
        "obligations",
        Some(&json_map(&[
            ("status", Value::String("paid".to_string())),
            ("paid_date__gte", Value::String(from.to_string())),
            ("paid_date__lte", Value::String(to.to_string())),
        ])),
        REPORT_ROW_LIMIT,
        0,
        "paid_date",
        true,
    )
    .await?;

    let owner_ids = properties
        .iter()
        .map(|property| value_str(property, "owner_id"))
        .filter(|id| !id.is_empty())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .map(Value::String)
        .collect::<Vec<_>>();
    let owners = load_by_ids(pool, "owners", &owner_ids).await?;

    let items = fold_property_report(&properties, &contracts, &paid_rows, &owners);
    let total = properties.len() as i64;
    let rented = properties
        .iter()
        .filter(|property| value_str(property, "status") == "rented")
        .count() as i64;

    Ok(Json(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "properties_total": total,
        "properties_rented": rented,
        "occupancy_rate": decimal_to_number(occupancy_rate(rented, total)),
        "items": items,
    })))
}

/// One line per property: what its tenants actually paid in the range across
/// every obligation kind, joined through the property's contracts. Ordered by
/// that revenue, descending.
fn fold_property_report(
    properties: &[Value],
    contracts: &[Value],
    paid_rows: &[Value],
    owners: &HashMap<String, Value>,
) -> Vec<Value> {
    let mut contract_property: HashMap<String, String> = HashMap::new();
    let mut active_rent: HashMap<String, Decimal> = HashMap::new();
    for contract in contracts {
        let contract_id = value_str(contract, "id");
        let property_id = value_str(contract, "property_id");
        if contract_id.is_empty() || property_id.is_empty() {
            continue;
        }
        if value_str(contract, "status") == "active" {
            active_rent.insert(property_id.clone(), decimal_field(contract, "rent_amount"));
        }
        contract_property.insert(contract_id, property_id);
    }

    let mut received: HashMap<String, Decimal> = HashMap::new();
    for row in paid_rows {
        let Some(property_id) = contract_property.get(&value_str(row, "contract_id")) else {
            continue;
        };
        let paid = decimal_field(row, "paid_amount");
        let amount = if paid.is_zero() {
            decimal_field(row, "original_amount")
        } else {
            paid
        };
        *received.entry(property_id.clone()).or_insert(Decimal::ZERO) += amount;
    }

    let mut ranked = properties
        .iter()
        .map(|property| {
            let id = value_str(property, "id");
            let revenue = received.get(&id).copied().unwrap_or(Decimal::ZERO);
            let owner_name = owners
                .get(&value_str(property, "owner_id"))
                .map(|owner| value_str(owner, "name"));
            let item = json!({
                "property_id": id,
                "label": property_label(property),
                "status": value_str(property, "status"),
                "owner_name": owner_name,
                "rent_amount": active_rent.get(&id).copied().map(decimal_to_number),
                "received": decimal_to_number(revenue),
            });
            (revenue, item)
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, item)| item).collect()
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

async fn enrich_contract_rows(pool: &sqlx::PgPool, rows: Vec<Value>) -> AppResult<Vec<Value>> {
    if rows.is_empty() {
        return Ok(rows);
    }
    let property_ids = rows
        .iter()
        .map(|row| value_str(row, "property_id"))
        .filter(|id| !id.is_empty())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .map(Value::String)
        .collect::<Vec<_>>();
    let properties = load_by_ids(pool, "properties", &property_ids).await?;
    let tenant_ids = rows
        .iter()
        .map(|row| value_str(row, "primary_tenant_id"))
        .filter(|id| !id.is_empty())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .map(Value::String)
        .collect::<Vec<_>>();
    let tenants = load_by_ids(pool, "tenants", &tenant_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let property_street = properties
                .get(&value_str(&row, "property_id"))
                .map(|property| value_str(property, "street"));
            let tenant_name = tenants
                .get(&value_str(&row, "primary_tenant_id"))
                .map(|tenant| value_str(tenant, "name"));
            let mut obj = row.as_object().cloned().unwrap_or_default();
            obj.insert(
                "property_street".to_string(),
                property_street.map(Value::String).unwrap_or(Value::Null),
            );
            obj.insert(
                "tenant_name".to_string(),
                tenant_name.map(Value::String).unwrap_or(Value::Null),
            );
            Value::Object(obj)
        })
        .collect())
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

fn at_fee_scale(amount: Decimal, fee_rate: Decimal) -> Decimal {
    (amount * fee_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

fn json_map(entries: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert((*key).to_string(), value.clone());
    }
    map
}

fn db_pool(state: &AppState) -> AppResult<&sqlx::PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::{
        at_fee_scale, build_finance_report, fold_owner_report, fold_property_report, json_map,
        property_label,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn fee_scale_applies_the_headline_rate() {
        assert_eq!(at_fee_scale(dec("12500"), dec("0.10")), dec("1250.00"));
        assert_eq!(at_fee_scale(dec("0"), dec("0.10")), dec("0.00"));
    }

    #[test]
    fn administration_fee_is_charged_on_the_billed_total() {
        let rows = vec![
            json!({
                "status": "paid",
                "due_date": "2026-08-05",
                "original_amount": 1000.0,
                "paid_amount": 1010.0,
            }),
            json!({
                "status": "pending",
                "due_date": "2026-08-25",
                "original_amount": 500.0,
            }),
        ];
        let report = build_finance_report(
            date("2026-08-01"),
            date("2026-08-31"),
            &rows,
            &[],
            date("2026-08-15"),
        );

        assert_eq!(report["billed"], json!(1500.0));
        assert_eq!(report["received"], json!(1010.0));
        // 10% of billed, unmoved by penalties or discounts in paid_amount.
        assert_eq!(report["administration_fee"], json!(150.0));
    }

    #[test]
    fn owner_report_ranks_owners_by_payout_net() {
        let owners = vec![
            json!({ "id": "own-1", "name": "Ana", "document": "111" }),
            json!({ "id": "own-2", "name": "Bruno", "document": "222" }),
        ];
        let properties = vec![
            json!({ "id": "prop-1", "owner_id": "own-1", "status": "rented" }),
            json!({ "id": "prop-2", "owner_id": "own-1", "status": "available" }),
            json!({ "id": "prop-3", "owner_id": "own-2", "status": "rented" }),
        ];
        let payouts = vec![
            json!({ "owner_id": "own-1", "net_amount": 900.0 }),
            json!({ "owner_id": "own-2", "net_amount": 1350.0 }),
            json!({ "owner_id": "own-2", "net_amount": 450.0 }),
        ];

        let items = fold_owner_report(&owners, &properties, &payouts);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["owner_id"], json!("own-2"));
        assert_eq!(items[0]["payout_net"], json!(1800.0));
        assert_eq!(items[0]["properties_total"], json!(1));
        assert_eq!(items[1]["owner_id"], json!("own-1"));
        assert_eq!(items[1]["properties_total"], json!(2));
        assert_eq!(items[1]["properties_rented"], json!(1));
    }

    #[test]
    fn property_report_sums_recorded_payments_per_property() {
        let properties = vec![
            json!({
                "id": "prop-1", "owner_id": "own-1", "status": "rented",
                "street": "Rua A", "number": "120", "district": "Centro",
            }),
            json!({ "id": "prop-2", "owner_id": "own-1", "status": "available", "street": "Rua B" }),
        ];
        let contracts = vec![json!({
            "id": "con-1", "property_id": "prop-1", "status": "active", "rent_amount": 1500.0,
        })];
        let paid_rows = vec![
            json!({ "contract_id": "con-1", "kind": "rent", "paid_amount": 1500.0 }),
            json!({ "contract_id": "con-1", "kind": "condo_fee", "paid_amount": 380.0 }),
        ];
        let mut owners = HashMap::new();
        owners.insert(
            "own-1".to_string(),
            json!({ "id": "own-1", "name": "Ana" }),
        );

        let items = fold_property_report(&properties, &contracts, &paid_rows, &owners);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["property_id"], json!("prop-1"));
        assert_eq!(items[0]["label"], json!("Rua A, 120 - Centro"));
        assert_eq!(items[0]["owner_name"], json!("Ana"));
        assert_eq!(items[0]["rent_amount"], json!(1500.0));
        assert_eq!(items[0]["received"], json!(1880.0));
        assert_eq!(items[1]["property_id"], json!("prop-2"));
        assert_eq!(items[1]["received"], json!(0.0));
        assert_eq!(items[1]["rent_amount"], Value::Null);
    }

    #[test]
    fn json_map_preserves_entries() {
        let map = json_map(&[
            ("kind", Value::String("rent".to_string())),
            ("status", Value::String("paid".to_string())),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("kind"), Some(&Value::String("rent".to_string())));
    }

    #[test]
    fn property_labels_skip_missing_parts() {
        let partial = json!({ "street": "Rua A", "district": "Centro" });
        assert_eq!(property_label(&partial), "Rua A - Centro");
    }
}
