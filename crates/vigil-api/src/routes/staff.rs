//! Staff verification route.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::routes::{duty::ledger_fault, local_now};
use crate::server::AppState;

/// Creates staff routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/staff/by-mobile/:mobile", get(staff_by_mobile))
}

/// Staff identity summary for front-desk verification.
#[derive(Debug, Serialize, ToSchema)]
pub struct StaffResponse {
    /// Assigned staff member's name.
    pub name: String,
    /// Department label with a `"Not specified"` fallback.
    pub department: String,
    /// Mobile number the duty is keyed by.
    pub mobile_no: String,
    /// Assigned hall.
    pub hall: String,
    /// Exam date.
    pub duty_date: NaiveDate,
}

/// Verify the staff member assigned under a mobile number today.
///
/// GET /staff/by-mobile/{mobile}
#[utoipa::path(
    get,
    path = "/staff/by-mobile/{mobile}",
    tag = "staff",
    params(("mobile" = String, Path, description = "Mobile number the duty is keyed by")),
    responses(
        (status = 200, description = "Assigned staff summary", body = StaffResponse),
        (status = 404, description = "No duty for this mobile number today", body = crate::error::ApiErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn staff_by_mobile(
    State(state): State<Arc<AppState>>,
    Path(mobile): Path<String>,
) -> Result<Json<StaffResponse>, ApiError> {
    let (today, _) = local_now();

    let record = state
        .ledger()
        .lookup(&mobile, today)
        .await
        .map_err(ledger_fault)?
        .ok_or_else(|| ApiError::not_found(format!("Staff not found for {today}")))?;

    Ok(Json(StaffResponse {
        name: record.assigned_staff_name.clone(),
        department: record.department().to_string(),
        mobile_no: record.mobile_number.clone(),
        hall: record.hall_no.clone(),
        duty_date: record.duty_date,
    }))
}
