use axum::http::HeaderMap;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const INTERNAL_KEY_HEADER: &str = "x-internal-api-key";

/// Guards mutating routes when INTERNAL_API_KEY is configured. With no key
/// configured the deployment is expected to sit behind a trusted gateway.
pub fn require_internal_key(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.config.internal_api_key.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(INTERNAL_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if provided.is_empty() {
        return Err(AppError::Unauthorized(format!(
            "Missing {INTERNAL_KEY_HEADER} header."
        )));
    }
    if provided != expected {
        return Err(AppError::Forbidden("Invalid internal API key.".to_string()));
    }
    Ok(())
}
