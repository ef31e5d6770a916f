use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::table_service::{create_row_tx, get_row, map_db_error};
use crate::schemas::RecordPaymentInput;

/// Splits a gross amount into (fee, net) at the given percentage. The fee is
/// rounded half-to-even at 2 decimal places and the net is its exact
/// complement, so `fee + net == gross` always holds.
pub fn fee_split(gross: Decimal, fee_percent: Decimal) -> (Decimal, Decimal) {
    let fee = (gross * fee_percent / Decimal::from(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    (fee, gross - fee)
}

pub fn decimal_from_value(value: Option<&Value>) -> Option<Decimal> {
    match value {
        Some(Value::Number(number)) => number
            .as_f64()
            .and_then(Decimal::from_f64_retain),
        Some(Value::String(text)) => text.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

/// Records a payment against an obligation and creates the owner payout, in
/// one transaction. The status flip is a conditional UPDATE, so two
/// concurrent recorders cannot both succeed; the loser gets AlreadyPaid and
/// no second payout row is ever written.
pub async fn record_payment(
    pool: &PgPool,
    obligation_id: &str,
    input: &RecordPaymentInput,
) -> AppResult<(Value, Value)> {
    let obligation_uuid = Uuid::parse_str(obligation_id.trim())
        .map_err(|_| AppError::BadRequest("obligation_id is not a valid UUID.".to_string()))?;
    let paid_date = NaiveDate::parse_from_str(input.paid_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::UnprocessableEntity("paid_date must be YYYY-MM-DD.".to_string()))?;
    let gross = decimal_amount(input.paid_amount, "paid_amount")?;

    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let mut query = build_mark_paid_query(obligation_uuid, paid_date, gross, input);
    let updated = query
        .build()
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .and_then(|row| row.try_get::<Option<Value>, _>("row").ok().flatten());

    let Some(obligation) = updated else {
        // Zero rows: either the obligation is missing or it is already paid.
        let exists = sqlx::query("SELECT 1 FROM obligations WHERE id = $1")
            .bind(obligation_uuid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .is_some();
        if exists {
            return Err(AppError::AlreadyPaid(format!(
                "Obligation {obligation_id} is already paid."
            )));
        }
        return Err(AppError::NotFound(format!(
            "Obligation {obligation_id} not found."
        )));
    };

    let contract_id = value_str(&obligation, "contract_id");
    let contract = get_row(pool, "contracts", &contract_id, "id").await?;
    let property_id = value_str(&contract, "property_id");
    let property = get_row(pool, "properties", &property_id, "id").await?;
    let owner_id = value_str(&property, "owner_id");
    if owner_id.is_empty() {
        return Err(AppError::UnprocessableEntity(format!(
            "Property {property_id} has no owner."
        )));
    }

    let fee_percent = decimal_from_value(
        contract
            .as_object()
            .and_then(|obj| obj.get("admin_fee_percent")),
    )
    .unwrap_or(Decimal::ZERO);
    let (fee, net) = fee_split(gross, fee_percent);

    let mut payout_record = Map::new();
    payout_record.insert("owner_id".to_string(), Value::String(owner_id));
    payout_record.insert(
        "obligation_id".to_string(),
        Value::String(obligation_uuid.to_string()),
    );
    payout_record.insert(
        "gross_amount".to_string(),
        Value::String(gross.to_string()),
    );
    payout_record.insert(
        "fee_percent".to_string(),
        Value::String(fee_percent.to_string()),
    );
    payout_record.insert("net_amount".to_string(), Value::String(net.to_string()));
    payout_record.insert(
        "scheduled_date".to_string(),
        Value::String(paid_date.to_string()),
    );
    payout_record.insert("status".to_string(), Value::String("pending".to_string()));

    let payout = create_row_tx(&mut *tx, "payouts", &payout_record).await?;

    tx.commit().await.map_err(map_db_error)?;

    tracing::info!(
        obligation_id = %obligation_uuid,
        gross = %gross,
        fee = %fee,
        net = %net,
        "Payment recorded"
    );
    Ok((obligation, payout))
}

fn build_mark_paid_query(
    obligation_id: Uuid,
    paid_date: NaiveDate,
    gross: Decimal,
    input: &RecordPaymentInput,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE obligations SET status = 'paid'");
    query.push(", paid_date = ").push_bind(paid_date);
    query.push(", paid_amount = ").push_bind(gross);
    query
        .push(", payment_method = ")
        .push_bind(input.payment_method.trim().to_string());
    if let Some(penalty) = input.penalty_amount.and_then(Decimal::from_f64_retain) {
        query.push(", penalty_amount = ").push_bind(penalty);
    }
    if let Some(interest) = input.interest_amount.and_then(Decimal::from_f64_retain) {
        query.push(", interest_amount = ").push_bind(interest);
    }
    if let Some(discount) = input.discount_amount.and_then(Decimal::from_f64_retain) {
        query.push(", discount_amount = ").push_bind(discount);
    }
    if let Some(notes) = input.notes.as_deref() {
        query.push(", notes = ").push_bind(notes.to_string());
    }
    query.push(", updated_at = now()");
    query.push(" WHERE id = ").push_bind(obligation_id);
    query.push(" AND status <> 'paid'");
    query.push(" RETURNING row_to_json(obligations.*) AS row");
    query
}

fn decimal_amount(raw: f64, field: &str) -> AppResult<Decimal> {
    let amount = Decimal::from_f64_retain(raw).ok_or_else(|| {
        AppError::UnprocessableEntity(format!("{field} is not a finite number."))
    })?;
    Ok(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    #[test]
    fn ten_percent_split_is_exact() {
        let (fee, net) = fee_split(dec("1000"), dec("10"));
        assert_eq!(fee, dec("100"));
        assert_eq!(net, dec("900"));
    }

    #[test]
    fn net_is_the_exact_complement_of_the_rounded_fee() {
        for (gross, percent) in [
            ("1500.00", "8"),
            ("100.05", "3.33"),
            ("987.65", "12.5"),
            ("0.01", "50"),
            ("2300.50", "0"),
        ] {
            let gross = dec(gross);
            let (fee, net) = fee_split(gross, dec(percent));
            assert_eq!(fee + net, gross, "split of {gross} at {percent}%");
            assert!(fee.scale() <= 2);
        }
    }

    #[test]
    fn midpoints_round_to_even() {
        // 1 * 12.5% = 0.125, which sits exactly between 0.12 and 0.13.
        let (fee, net) = fee_split(dec("1"), dec("12.5"));
        assert_eq!(fee, dec("0.12"));
        assert_eq!(net, dec("0.88"));

        // 3 * 12.5% = 0.375 rounds up to the even 0.38.
        let (fee, _) = fee_split(dec("3"), dec("12.5"));
        assert_eq!(fee, dec("0.38"));
    }

    #[test]
    fn zero_fee_percent_passes_the_gross_through() {
        let (fee, net) = fee_split(dec("1234.56"), Decimal::ZERO);
        assert_eq!(fee, Decimal::ZERO);
        assert_eq!(net, dec("1234.56"));
    }

    #[test]
    fn decimal_parsing_accepts_numbers_and_numeric_strings() {
        assert_eq!(decimal_from_value(Some(&json!("8.5"))), Some(dec("8.5")));
        assert_eq!(decimal_from_value(Some(&json!(10))), Some(dec("10")));
        assert_eq!(decimal_from_value(Some(&json!(null))), None);
        assert_eq!(decimal_from_value(None), None);
    }

    #[test]
    fn mark_paid_sql_guards_against_double_payment() {
        let input = RecordPaymentInput {
            paid_date: "2026-02-10".to_string(),
            paid_amount: 1500.0,
            payment_method: "pix".to_string(),
            penalty_amount: Some(15.0),
            interest_amount: None,
            discount_amount: None,
            notes: None,
        };
        let mut query = build_mark_paid_query(
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            dec("1500"),
            &input,
        );
        let sql = query.sql().to_string();
        assert!(
            sql.contains("AND status <> 'paid'"),
            "Expected the conditional status guard in SQL but got: {sql}"
        );
        assert!(sql.contains("RETURNING row_to_json(obligations.*)"));
        assert!(sql.contains("penalty_amount = "));
        assert!(!sql.contains("interest_amount = "));
    }
}
