use chrono::{Datelike, NaiveDate};
use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::repository::table_service::{
    count_rows_tx, create_row_tx, get_row, list_rows, map_db_error,
};

/// Due days above 28 would shift in short months, so contracts cap there.
pub const MAX_DUE_DAY: u32 = 28;

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub contracts_scanned: usize,
    pub contracts_generated: usize,
    pub contracts_skipped: usize,
    pub obligations_created: usize,
    pub errors: Vec<Value>,
}

/// Walks calendar months from the contract start and yields one due date per
/// month through the contract end, inclusive. The first due date is pushed
/// into the following month when the contract starts after that month's due
/// day, so a mid-month signing never bills a period before the tenancy began.
pub fn monthly_due_dates(
    start_date: NaiveDate,
    end_date: NaiveDate,
    due_day: u32,
) -> AppResult<Vec<NaiveDate>> {
    if due_day == 0 || due_day > MAX_DUE_DAY {
        return Err(AppError::UnprocessableEntity(format!(
            "due_day must be between 1 and {MAX_DUE_DAY}."
        )));
    }
    if end_date < start_date {
        return Ok(Vec::new());
    }

    let mut year = start_date.year();
    let mut month = start_date.month();
    let mut cursor = due_date_for(year, month, due_day)?;
    if cursor < start_date {
        (year, month) = following_month(year, month);
        cursor = due_date_for(year, month, due_day)?;
    }

    let mut due_dates = Vec::new();
    while cursor <= end_date {
        due_dates.push(cursor);
        (year, month) = following_month(year, month);
        cursor = due_date_for(year, month, due_day)?;
    }
    Ok(due_dates)
}

/// Builds the insert payloads for a contract's monthly rent obligations.
/// Rows falling before `today` start out `overdue`, the rest `pending`.
pub fn build_rent_schedule(
    contract_id: &str,
    rent_amount: &Value,
    due_dates: &[NaiveDate],
    today: NaiveDate,
) -> Vec<Map<String, Value>> {
    due_dates
        .iter()
        .map(|due_date| {
            let status = if *due_date < today { "overdue" } else { "pending" };
            let reference_month = NaiveDate::from_ymd_opt(due_date.year(), due_date.month(), 1)
                .unwrap_or(*due_date);

            let mut record = Map::new();
            record.insert(
                "contract_id".to_string(),
                Value::String(contract_id.to_string()),
            );
            record.insert("kind".to_string(), Value::String("rent".to_string()));
            record.insert(
                "reference_month".to_string(),
                Value::String(reference_month.to_string()),
            );
            record.insert("due_date".to_string(), Value::String(due_date.to_string()));
            record.insert("original_amount".to_string(), rent_amount.clone());
            record.insert("status".to_string(), Value::String(status.to_string()));
            record
        })
        .collect()
}

/// Generates the full rent schedule for one contract. All rows are inserted
/// in a single transaction, with a count precheck against existing rent
/// obligations; the unique key on (contract_id, due_date, kind) is the
/// backstop against concurrent generators.
pub async fn generate_contract_schedule(
    pool: &PgPool,
    contract_id: &str,
    today: NaiveDate,
) -> AppResult<usize> {
    let contract = get_row(pool, "contracts", contract_id, "id").await?;
    generate_for_contract(pool, &contract, today).await
}

pub async fn generate_for_contract(
    pool: &PgPool,
    contract: &Value,
    today: NaiveDate,
) -> AppResult<usize> {
    let contract_id = value_str(contract, "id");
    if value_str(contract, "status") != "active" {
        return Err(AppError::ContractNotActive(format!(
            "Contract {contract_id} is not active."
        )));
    }

    let start_date = parse_contract_date(contract, "start_date")?;
    let end_date = parse_contract_date(contract, "end_date")?;
    let due_day = contract
        .as_object()
        .and_then(|obj| obj.get("due_day"))
        .and_then(Value::as_i64)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| {
            AppError::UnprocessableEntity(format!("Contract {contract_id} has no valid due_day."))
        })?;
    let rent_amount = contract
        .as_object()
        .and_then(|obj| obj.get("rent_amount"))
        .cloned()
        .ok_or_else(|| {
            AppError::UnprocessableEntity(format!(
                "Contract {contract_id} has no rent_amount."
            ))
        })?;

    let due_dates = monthly_due_dates(start_date, end_date, due_day)?;
    let records = build_rent_schedule(&contract_id, &rent_amount, &due_dates, today);

    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let mut existing_filter = Map::new();
    existing_filter.insert("contract_id".to_string(), Value::String(contract_id.clone()));
    existing_filter.insert("kind".to_string(), Value::String("rent".to_string()));
    let existing = count_rows_tx(&mut *tx, "obligations", Some(&existing_filter)).await?;
    if existing > 0 {
        return Err(AppError::AlreadyExists(format!(
            "Contract {contract_id} already has a generated schedule."
        )));
    }

    for record in &records {
        create_row_tx(&mut *tx, "obligations", record).await?;
    }

    tx.commit().await.map_err(map_db_error)?;
    Ok(records.len())
}

/// Runs schedule generation across every active contract. Contracts that
/// already have a schedule are skipped; other failures are collected per
/// contract and never abort the sweep.
pub async fn generate_all_active(pool: &PgPool, today: NaiveDate) -> AppResult<BatchOutcome> {
    let mut filters = Map::new();
    filters.insert("status".to_string(), Value::String("active".to_string()));
    let contracts = list_rows(pool, "contracts", Some(&filters), 10000, 0, "start_date", true).await?;

    let mut results = Vec::with_capacity(contracts.len());
    for contract in &contracts {
        let contract_id = value_str(contract, "id");
        let result = generate_for_contract(pool, contract, today).await;
        if let Err(error) = &result {
            if !matches!(error, AppError::AlreadyExists(_)) {
                tracing::warn!(%contract_id, error = %error, "Schedule generation failed");
            }
        }
        results.push((contract_id, result));
    }
    Ok(fold_batch_outcome(results))
}

pub fn fold_batch_outcome(results: Vec<(String, AppResult<usize>)>) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        contracts_scanned: results.len(),
        ..BatchOutcome::default()
    };
    for (contract_id, result) in results {
        match result {
            Ok(created) => {
                outcome.contracts_generated += 1;
                outcome.obligations_created += created;
            }
            Err(AppError::AlreadyExists(_)) => {
                outcome.contracts_skipped += 1;
            }
            Err(error) => {
                outcome.errors.push(json!({
                    "contract_id": contract_id,
                    "error": error.to_string(),
                }));
            }
        }
    }
    outcome
}

fn due_date_for(year: i32, month: u32, due_day: u32) -> AppResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, due_day).ok_or_else(|| {
        AppError::Internal(format!("Invalid due date {year}-{month:02}-{due_day:02}."))
    })
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn parse_contract_date(contract: &Value, key: &str) -> AppResult<NaiveDate> {
    let raw = value_str(contract, key);
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        AppError::UnprocessableEntity(format!("Contract field '{key}' is not a valid date."))
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
