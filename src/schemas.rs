use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn default_limit_100() -> i64 {
    100
}
fn default_limit_500() -> i64 {
    500
}
fn default_period_current_month() -> String {
    "current_month".to_string()
}

pub fn clamp_limit_in_range(limit: i64, min: i64, max: i64) -> i64 {
    limit.clamp(min, max)
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ContractPath {
    pub contract_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ObligationPath {
    pub obligation_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PayoutPath {
    pub payout_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct RecordPaymentInput {
    /// YYYY-MM-DD
    pub paid_date: String,
    #[validate(range(min = 0.0))]
    pub paid_amount: f64,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    #[validate(range(min = 0.0))]
    pub penalty_amount: Option<f64>,
    #[validate(range(min = 0.0))]
    pub interest_amount: Option<f64>,
    #[validate(range(min = 0.0))]
    pub discount_amount: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ObligationsQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub contract_id: Option<String>,
    #[serde(default = "default_limit_500")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PayoutsQuery {
    pub status: Option<String>,
    pub owner_id: Option<String>,
    #[serde(default = "default_limit_100")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct DashboardQuery {
    #[serde(default = "default_period_current_month")]
    pub period: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ReportRangeQuery {
    /// YYYY-MM-DD, inclusive
    pub from: String,
    /// YYYY-MM-DD, inclusive
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_limits_at_both_ends() {
        assert_eq!(clamp_limit_in_range(0, 1, 1000), 1);
        assert_eq!(clamp_limit_in_range(50, 1, 1000), 50);
        assert_eq!(clamp_limit_in_range(9000, 1, 1000), 1000);
    }

    #[test]
    fn record_payment_rejects_negative_amounts() {
        let input = RecordPaymentInput {
            paid_date: "2026-02-10".to_string(),
            paid_amount: -1.0,
            payment_method: "pix".to_string(),
            penalty_amount: None,
            interest_amount: None,
            discount_amount: None,
            notes: None,
        };
        assert!(validate_input(&input).is_err());

        let input = RecordPaymentInput {
            paid_amount: 1500.0,
            ..input
        };
        assert!(validate_input(&input).is_ok());
    }
}
