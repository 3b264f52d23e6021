use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

use crate::admission::{AdmissionDecision, DenyReason, normalize_key};
use crate::models::QuotaResponse;
use crate::state::AppState;

// Read-only quota preview. Built on `check`, so refreshing this endpoint
// never burns quota.
pub async fn quota_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Json<QuotaResponse> {
    let limit = state.admission.per_identity_cap();
    let email = normalize_key(&email);

    let response = match state.admission.check(&email) {
        AdmissionDecision::Allowed { used, remaining } => QuotaResponse {
            email,
            allowed: true,
            used,
            limit,
            remaining,
            reason: None,
            retry_after_secs: None,
        },
        AdmissionDecision::Denied(denial) => {
            let used = match denial.reason {
                DenyReason::QuotaExhausted { used, .. } => used,
                DenyReason::GlobalCapacity => 0,
            };
            QuotaResponse {
                email,
                allowed: false,
                used,
                limit,
                remaining: 0,
                reason: Some(denial.reason.to_string()),
                retry_after_secs: Some(denial.retry_after.as_secs()),
            }
        }
    };
    Json(response)
}
