use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::services::payments::decimal_from_value;

/// The dashboard presents revenue at "fee scale" with a flat 10% multiplier,
/// independent of each contract's real admin_fee_percent. Payouts use the
/// real percentage; this figure is a headline approximation kept for
/// compatibility with the historical dashboard.
pub fn headline_fee_rate() -> Decimal {
    Decimal::new(10, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingPeriod {
    CurrentMonth,
    TrailingDays(i64),
}

impl ReportingPeriod {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim() {
            "current_month" | "" => Ok(Self::CurrentMonth),
            "30d" => Ok(Self::TrailingDays(30)),
            "60d" => Ok(Self::TrailingDays(60)),
            "90d" => Ok(Self::TrailingDays(90)),
            "180d" => Ok(Self::TrailingDays(180)),
            "365d" => Ok(Self::TrailingDays(365)),
            other => Err(AppError::BadRequest(format!(
                "Unknown period '{other}'. Expected current_month, 30d, 60d, 90d, 180d or 365d."
            ))),
        }
    }

    /// Trailing windows have a lower bound only: future-dated obligations
    /// are included on purpose, so upcoming scheduled rent shows up in the
    /// pending bucket.
    pub fn contains(&self, due_date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::CurrentMonth => {
                due_date.year() == today.year() && due_date.month() == today.month()
            }
            Self::TrailingDays(days) => due_date >= today - chrono::Duration::days(*days),
        }
    }

    pub fn cache_key(&self) -> String {
        match self {
            Self::CurrentMonth => "dashboard:current_month".to_string(),
            Self::TrailingDays(days) => format!("dashboard:{days}d"),
        }
    }
}

/// Status as the reader should see it: unpaid rows are re-derived from the
/// due date, so a stale stored `pending` still reports as overdue.
pub fn effective_status(row: &Value, today: NaiveDate) -> String {
    let stored = value_str(row, "status");
    if stored == "paid" || stored == "cancelled" {
        return stored;
    }
    match date_value(row, "due_date") {
        Some(due_date) if due_date < today => "overdue".to_string(),
        _ => "pending".to_string(),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RevenueSummary {
    pub billed: Decimal,
    pub received: Decimal,
    pub pending: Decimal,
    pub overdue: Decimal,
}

/// Folds rent obligations into the period's revenue buckets. Cancelled rows
/// never count. Every bucket, received included, sums the amounts originally
/// billed; what was actually paid can differ and belongs to the finance
/// report, not the dashboard headline.
pub fn summarize_rent(rows: &[Value], period: ReportingPeriod, today: NaiveDate) -> RevenueSummary {
    let mut summary = RevenueSummary::default();
    for row in rows {
        if value_str(row, "kind") != "rent" {
            continue;
        }
        let Some(due_date) = date_value(row, "due_date") else {
            continue;
        };
        if !period.contains(due_date, today) {
            continue;
        }
        let status = effective_status(row, today);
        if status == "cancelled" {
            continue;
        }
        let original = decimal_field(row, "original_amount");
        summary.billed += original;
        match status.as_str() {
            "paid" => summary.received += original,
            "overdue" => summary.overdue += original,
            _ => summary.pending += original,
        }
    }
    summary
}

/// Billed rent received in a specific calendar month, keyed by due date.
/// Sums the original amounts of paid rows, not the recorded payments.
pub fn month_received(rows: &[Value], year: i32, month: u32) -> Decimal {
    rows.iter()
        .filter(|row| value_str(row, "kind") == "rent")
        .filter(|row| value_str(row, "status") == "paid")
        .filter(|row| {
            date_value(row, "due_date")
                .is_some_and(|due_date| due_date.year() == year && due_date.month() == month)
        })
        .map(|row| decimal_field(row, "original_amount"))
        .sum()
}

/// Month-over-month growth in percent, 0 when the previous month had no
/// received revenue.
pub fn growth_percent(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    ((current - previous) / previous * Decimal::from(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// The up-to-`limit` nearest unpaid obligations across all kinds, ascending
/// by due date, each annotated with how many days it is overdue (0 when the
/// due date has not passed).
pub fn unpaid_shortlist(rows: &[Value], today: NaiveDate, limit: usize) -> Vec<Value> {
    let mut unpaid = rows
        .iter()
        .filter_map(|row| {
            let status = effective_status(row, today);
            if status == "paid" || status == "cancelled" {
                return None;
            }
            let due_date = date_value(row, "due_date")?;
            Some((due_date, row, status))
        })
        .collect::<Vec<_>>();
    unpaid.sort_by_key(|(due_date, _, _)| *due_date);

    unpaid
        .into_iter()
        .take(limit)
        .map(|(due_date, row, status)| {
            let days_overdue = (today - due_date).num_days().max(0);
            json!({
                "id": value_str(row, "id"),
                "contract_id": value_str(row, "contract_id"),
                "kind": value_str(row, "kind"),
                "due_date": due_date.to_string(),
                "original_amount": decimal_to_number(decimal_field(row, "original_amount")),
                "status": status,
                "days_overdue": days_overdue,
            })
        })
        .collect()
}

/// Paid rent for the last `months` calendar months ending in the current
/// one, at gross scale and at the headline fee scale.
pub fn monthly_series(rows: &[Value], today: NaiveDate, months: u32) -> Vec<Value> {
    let mut series = Vec::with_capacity(months as usize);
    for offset in (0..months).rev() {
        let (year, month) = months_back(today.year(), today.month(), offset);
        let gross = month_received(rows, year, month);
        let fee = (gross * headline_fee_rate())
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        series.push(json!({
            "month": format!("{year}-{month:02}"),
            "gross": decimal_to_number(gross),
            "fee": decimal_to_number(fee),
        }));
    }
    series
}

/// Rented properties as a percentage of all properties, 0 when there are
/// none.
pub fn occupancy_rate(rented: i64, total: i64) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(rented) / Decimal::from(total) * Decimal::from(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Overdue amount as a percentage of the billed amount, 0 when nothing was
/// billed.
pub fn delinquency_rate(overdue: Decimal, billed: Decimal) -> Decimal {
    if billed.is_zero() {
        return Decimal::ZERO;
    }
    (overdue / billed * Decimal::from(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

pub fn months_back(year: i32, month: u32, offset: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - offset as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{raw}'. Expected YYYY-MM-DD.")))
}

pub fn date_value(row: &Value, key: &str) -> Option<NaiveDate> {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
}

pub fn decimal_field(row: &Value, key: &str) -> Decimal {
    decimal_from_value(row.as_object().and_then(|obj| obj.get(key))).unwrap_or(Decimal::ZERO)
}

pub fn decimal_to_number(value: Decimal) -> Value {
    json!(value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        .to_f64()
        .unwrap_or(0.0))
}

pub fn value_str(row: &Value, key: &str) -> String {
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

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn rent_row(id: &str, due: &str, status: &str, amount: f64) -> Value {
        json!({
            "id": id,
            "contract_id": "c-1",
            "kind": "rent",
            "due_date": due,
            "original_amount": amount,
            "status": status,
        })
    }

    #[test]
    fn parses_the_supported_periods() {
        assert_eq!(
            ReportingPeriod::parse("current_month").unwrap(),
            ReportingPeriod::CurrentMonth
        );
        assert_eq!(
            ReportingPeriod::parse("90d").unwrap(),
            ReportingPeriod::TrailingDays(90)
        );
        assert!(ReportingPeriod::parse("45d").is_err());
        assert!(ReportingPeriod::parse("quarter").is_err());
    }

    #[test]
    fn current_month_respects_calendar_boundaries() {
        let today = date("2026-08-15");
        let period = ReportingPeriod::CurrentMonth;
        assert!(period.contains(date("2026-08-01"), today));
        assert!(period.contains(date("2026-08-31"), today));
        assert!(!period.contains(date("2026-07-31"), today));
        assert!(!period.contains(date("2026-09-01"), today));
    }

    #[test]
    fn trailing_window_has_no_upper_bound() {
        let today = date("2026-08-15");
        let period = ReportingPeriod::TrailingDays(30);
        assert!(period.contains(date("2026-07-16"), today));
        assert!(!period.contains(date("2026-07-15"), today));
        // Scheduled future rent stays visible.
        assert!(period.contains(date("2027-01-10"), today));
    }

    #[test]
    fn unpaid_statuses_are_rederived_from_the_due_date() {
        let today = date("2026-08-15");
        let stale_pending = rent_row("o-1", "2026-08-01", "pending", 100.0);
        assert_eq!(effective_status(&stale_pending, today), "overdue");

        let upcoming = rent_row("o-2", "2026-08-20", "overdue", 100.0);
        assert_eq!(effective_status(&upcoming, today), "pending");

        let paid = rent_row("o-3", "2026-08-01", "paid", 100.0);
        assert_eq!(effective_status(&paid, today), "paid");

        let cancelled = rent_row("o-4", "2026-08-01", "cancelled", 100.0);
        assert_eq!(effective_status(&cancelled, today), "cancelled");
    }

    #[test]
    fn buckets_partition_the_billed_total() {
        let today = date("2026-08-15");
        let mut paid = rent_row("o-1", "2026-08-05", "paid", 1000.0);
        paid.as_object_mut()
            .unwrap()
            .insert("paid_amount".to_string(), json!(1010.0));
        let rows = vec![
            paid,
            rent_row("o-2", "2026-08-10", "pending", 800.0),
            rent_row("o-3", "2026-08-25", "pending", 900.0),
            rent_row("o-4", "2026-08-01", "cancelled", 500.0),
            rent_row("o-5", "2026-07-10", "pending", 700.0),
        ];
        let summary = summarize_rent(&rows, ReportingPeriod::CurrentMonth, today);

        assert_eq!(summary.billed, dec("2700"));
        assert_eq!(summary.received, dec("1000"));
        assert_eq!(summary.overdue, dec("800"));
        assert_eq!(summary.pending, dec("900"));
        assert_eq!(
            summary.received + summary.pending + summary.overdue,
            summary.billed
        );
    }

    #[test]
    fn received_bucket_sums_billed_amounts_not_recorded_payments() {
        let today = date("2026-08-15");
        let mut row = rent_row("o-1", "2026-08-05", "paid", 1000.0);
        row.as_object_mut()
            .unwrap()
            .insert("paid_amount".to_string(), json!(1010.0));
        let rows = vec![row];

        let summary = summarize_rent(&rows, ReportingPeriod::CurrentMonth, today);
        assert_eq!(summary.received, dec("1000"));

        assert_eq!(month_received(&rows, 2026, 8), dec("1000"));
    }

    #[test]
    fn non_rent_kinds_stay_out_of_the_revenue_buckets() {
        let today = date("2026-08-15");
        let condo = json!({
            "id": "o-9",
            "kind": "condo_fee",
            "due_date": "2026-08-10",
            "original_amount": 350.0,
            "status": "pending",
        });
        let summary = summarize_rent(&[condo], ReportingPeriod::CurrentMonth, today);
        assert_eq!(summary, RevenueSummary::default());
    }

    #[test]
    fn growth_is_zero_when_the_previous_month_received_nothing() {
        assert_eq!(growth_percent(dec("1200"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(growth_percent(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn growth_tracks_the_relative_change() {
        assert_eq!(growth_percent(dec("1200"), dec("1000")), dec("20.00"));
        assert_eq!(growth_percent(dec("800"), dec("1000")), dec("-20.00"));
    }

    #[test]
    fn shortlist_orders_by_due_date_and_caps_at_the_limit() {
        let today = date("2026-08-15");
        let rows = vec![
            rent_row("o-1", "2026-08-20", "pending", 100.0),
            rent_row("o-2", "2026-08-01", "pending", 100.0),
            rent_row("o-3", "2026-09-10", "pending", 100.0),
            rent_row("o-4", "2026-07-10", "pending", 100.0),
            rent_row("o-5", "2026-08-05", "paid", 100.0),
            rent_row("o-6", "2026-08-11", "pending", 100.0),
            rent_row("o-7", "2026-08-12", "pending", 100.0),
        ];
        let shortlist = unpaid_shortlist(&rows, today, 5);
        assert_eq!(shortlist.len(), 5);

        let ids = shortlist
            .iter()
            .map(|item| value_str(item, "id"))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["o-4", "o-2", "o-6", "o-7", "o-1"]);

        assert_eq!(shortlist[0].get("days_overdue"), Some(&json!(36)));
        assert_eq!(shortlist[0].get("status"), Some(&json!("overdue")));
        assert_eq!(shortlist[4].get("days_overdue"), Some(&json!(0)));
        assert_eq!(shortlist[4].get("status"), Some(&json!("pending")));
    }

    #[test]
    fn monthly_series_covers_the_trailing_six_months() {
        let today = date("2026-02-15");
        let mut paid_jan = rent_row("o-1", "2026-01-10", "paid", 1000.0);
        paid_jan
            .as_object_mut()
            .unwrap()
            .insert("paid_amount".to_string(), json!(1010.0));
        let mut paid_nov = rent_row("o-2", "2025-11-10", "paid", 500.0);
        paid_nov
            .as_object_mut()
            .unwrap()
            .insert("paid_amount".to_string(), json!(500.0));
        let rows = vec![paid_jan, paid_nov, rent_row("o-3", "2026-01-20", "pending", 750.0)];

        let series = monthly_series(&rows, today, 6);
        assert_eq!(series.len(), 6);
        let months = series
            .iter()
            .map(|item| value_str(item, "month"))
            .collect::<Vec<_>>();
        assert_eq!(
            months,
            vec!["2025-09", "2025-10", "2025-11", "2025-12", "2026-01", "2026-02"]
        );
        assert_eq!(series[2].get("gross"), Some(&json!(500.0)));
        assert_eq!(series[2].get("fee"), Some(&json!(50.0)));
        assert_eq!(series[4].get("gross"), Some(&json!(1000.0)));
        assert_eq!(series[5].get("gross"), Some(&json!(0.0)));
    }

    #[test]
    fn months_back_wraps_across_year_boundaries() {
        assert_eq!(months_back(2026, 2, 0), (2026, 2));
        assert_eq!(months_back(2026, 2, 1), (2026, 1));
        assert_eq!(months_back(2026, 2, 2), (2025, 12));
        assert_eq!(months_back(2026, 2, 14), (2024, 12));
    }

    #[test]
    fn occupancy_rate_guards_the_zero_denominator() {
        assert_eq!(occupancy_rate(3, 0), Decimal::ZERO);
        assert_eq!(occupancy_rate(3, 4), dec("75.00"));
        assert_eq!(occupancy_rate(0, 4), Decimal::ZERO);
    }

    #[test]
    fn delinquency_rate_guards_the_zero_denominator() {
        assert_eq!(delinquency_rate(dec("100"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(delinquency_rate(dec("250"), dec("1000")), dec("25.00"));
    }
}
