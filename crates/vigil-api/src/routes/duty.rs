//! Duty check-in, proxy, submission, and roster routes.
//!
//! ## Routes
//!
//! - `GET  /duty/check-mobile/{mobile}` - Derived standing before a mutating call
//! - `GET  /duty/today` - Today's roster, ordered by hall
//! - `GET  /duty/all` - Every record, newest date first
//! - `GET  /duty/query` - Generic filtered read
//! - `POST /duty/report` - Check in the assigned staff member
//! - `POST /duty/proxy` - Proxy check-in for an absent assignee
//! - `POST /duty/submit` - Record paper submission
//!
//! Benign ledger outcomes are returned as structured 400 bodies carrying the
//! current record and next-action flags; only store faults become opaque
//! errors.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use vigil_core::{DutyRecord, LedgerError};

use crate::error::ApiError;
use crate::routes::local_now;
use crate::server::AppState;

/// Creates duty routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/duty/check-mobile/:mobile", get(check_mobile))
        .route("/duty/today", get(today_roster))
        .route("/duty/all", get(full_roster))
        .route("/duty/query", get(query_duties))
        .route("/duty/report", post(report))
        .route("/duty/proxy", post(proxy_report))
        .route("/duty/submit", post(submit))
}

// ============================================================================
// Request / Response bodies
// ============================================================================

/// Request to check in the assigned staff member.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRequest {
    /// Mobile number of the person physically present.
    pub mobile_number: String,
}

/// Request for a proxy check-in on behalf of an absent assignee.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProxyRequest {
    /// Mobile number of the originally assigned (absent) staff member.
    pub absent_mobile_number: String,
    /// Name of the substitute (free text).
    pub proxy_staff_name: String,
    /// Reason for the substitution. Logged, not persisted.
    #[serde(default)]
    pub emergency_reason: Option<String>,
}

/// Request to record paper submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Mobile number the duty is keyed by.
    pub mobile_number: String,
}

/// Outcome body for the mutating duty operations.
///
/// Optional flags appear only on the branches that need them, matching what
/// check-in clients already consume.
#[derive(Debug, Serialize, ToSchema)]
pub struct DutyActionReply {
    /// Human-readable outcome message.
    pub message: String,
    /// Present and true on a first successful check-in.
    #[serde(rename = "isFirstTime", skip_serializing_if = "Option::is_none")]
    pub is_first_time: Option<bool>,
    /// Present and true when the duty is already terminal.
    #[serde(rename = "alreadySubmitted", skip_serializing_if = "Option::is_none")]
    pub already_submitted: Option<bool>,
    /// Present and true when the caller's next step is submission.
    #[serde(rename = "shouldSubmitPapers", skip_serializing_if = "Option::is_none")]
    pub should_submit_papers: Option<bool>,
    /// Present and true when the duty is fulfilled by a substitute.
    #[serde(rename = "isProxy", skip_serializing_if = "Option::is_none")]
    pub is_proxy: Option<bool>,
    /// Present and true when another staff member holds the hall's papers.
    #[serde(rename = "papersCollected", skip_serializing_if = "Option::is_none")]
    pub papers_collected: Option<bool>,
    /// The current duty record, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub duty: Option<DutyRecord>,
}

impl DutyActionReply {
    fn new(message: impl Into<String>, duty: Option<DutyRecord>) -> Self {
        Self {
            message: message.into(),
            is_first_time: None,
            already_submitted: None,
            should_submit_papers: None,
            is_proxy: None,
            papers_collected: None,
            duty,
        }
    }
}

/// Derived standing for a mobile number, pre-mutation.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckMobileResponse {
    /// Whether a duty exists for this mobile number today.
    pub exists: bool,
    /// No check-in recorded yet.
    #[serde(rename = "isFirstTime", skip_serializing_if = "Option::is_none")]
    pub is_first_time: Option<bool>,
    /// Duty fulfilled (or being fulfilled) by a substitute.
    #[serde(rename = "isProxy", skip_serializing_if = "Option::is_none")]
    pub is_proxy: Option<bool>,
    /// Papers already handed in.
    #[serde(rename = "isSubmitted", skip_serializing_if = "Option::is_none")]
    pub is_submitted: Option<bool>,
    /// Checked in, not submitted, not a proxy case.
    #[serde(rename = "shouldSubmitPapers", skip_serializing_if = "Option::is_none")]
    pub should_submit_papers: Option<bool>,
    /// The duty record, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub duty: Option<DutyRecord>,
}

/// A duty record with the display-friendly department field filled in.
#[derive(Debug, Serialize, ToSchema)]
pub struct DutyView {
    /// The underlying record.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub record: DutyRecord,
    /// Department label with a `"Not specified"` fallback.
    pub department: String,
}

impl From<DutyRecord> for DutyView {
    fn from(record: DutyRecord) -> Self {
        let department = record.department().to_string();
        Self { record, department }
    }
}

/// Equality filters for the generic duty query.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DutyQuery {
    /// Restrict to one exam date (`YYYY-MM-DD`).
    pub date: Option<NaiveDate>,
    /// Restrict to one hall.
    pub hall_no: Option<String>,
    /// Restrict to one mobile number.
    pub mobile_number: Option<String>,
}

// ============================================================================
// Read handlers
// ============================================================================

/// Derived standing for a mobile number.
///
/// GET /duty/check-mobile/{mobile}
#[utoipa::path(
    get,
    path = "/duty/check-mobile/{mobile}",
    tag = "duty",
    params(("mobile" = String, Path, description = "Mobile number the duty is keyed by")),
    responses(
        (status = 200, description = "Standing (exists=false when no duty today)", body = CheckMobileResponse),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn check_mobile(
    State(state): State<Arc<AppState>>,
    Path(mobile): Path<String>,
) -> Result<Json<CheckMobileResponse>, ApiError> {
    let (today, _) = local_now();

    let Some(record) = state.ledger().lookup(&mobile, today).await.map_err(ledger_fault)? else {
        return Ok(Json(CheckMobileResponse {
            exists: false,
            is_first_time: None,
            is_proxy: None,
            is_submitted: None,
            should_submit_papers: None,
            duty: None,
        }));
    };

    let standing = record.standing();
    Ok(Json(CheckMobileResponse {
        exists: true,
        is_first_time: Some(standing.is_first_time),
        is_proxy: Some(standing.is_proxy),
        is_submitted: Some(standing.is_submitted),
        should_submit_papers: Some(standing.should_submit_papers),
        duty: Some(record),
    }))
}

/// Today's duty roster, ordered by hall.
///
/// GET /duty/today
#[utoipa::path(
    get,
    path = "/duty/today",
    tag = "duty",
    responses(
        (status = 200, description = "Today's assignments", body = [DutyView]),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn today_roster(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DutyView>>, ApiError> {
    let (today, _) = local_now();
    let records = state.ledger().roster(today).await.map_err(ledger_fault)?;
    Ok(Json(records.into_iter().map(DutyView::from).collect()))
}

/// Every duty record, newest date first.
///
/// GET /duty/all
#[utoipa::path(
    get,
    path = "/duty/all",
    tag = "duty",
    responses(
        (status = 200, description = "All assignments", body = [DutyView]),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn full_roster(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DutyView>>, ApiError> {
    let records = state.ledger().roster_all().await.map_err(ledger_fault)?;
    Ok(Json(records.into_iter().map(DutyView::from).collect()))
}

/// Generic filtered read over duty records.
///
/// GET /duty/query
#[utoipa::path(
    get,
    path = "/duty/query",
    tag = "duty",
    params(DutyQuery),
    responses(
        (status = 200, description = "Matching records", body = [DutyView]),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn query_duties(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DutyQuery>,
) -> Result<Json<Vec<DutyView>>, ApiError> {
    let records = state.ledger().roster_all().await.map_err(ledger_fault)?;
    let matching = records
        .into_iter()
        .filter(|r| filter.date.is_none_or(|d| r.duty_date == d))
        .filter(|r| {
            filter
                .hall_no
                .as_deref()
                .is_none_or(|hall| r.hall_no == hall)
        })
        .filter(|r| {
            filter
                .mobile_number
                .as_deref()
                .is_none_or(|mobile| r.mobile_number == mobile)
        })
        .map(DutyView::from)
        .collect();
    Ok(Json(matching))
}

// ============================================================================
// Mutating handlers
// ============================================================================

/// Check in the assigned staff member.
///
/// POST /duty/report
#[utoipa::path(
    post,
    path = "/duty/report",
    tag = "duty",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "First check-in recorded", body = DutyActionReply),
        (status = 400, description = "Already handled; body carries next-action flags", body = DutyActionReply),
        (status = 404, description = "No duty assignment for this mobile number", body = DutyActionReply),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> Result<Response, ApiError> {
    let (today, now) = local_now();
    tracing::info!(mobile = %req.mobile_number, date = %today, "duty check-in requested");

    match state.ledger().check_in(&req.mobile_number, today, now).await {
        Ok(duty) => {
            let reply = DutyActionReply {
                is_first_time: Some(true),
                ..DutyActionReply::new("Successfully checked in for duty", Some(duty))
            };
            Ok(Json(reply).into_response())
        }
        Err(LedgerError::AssignmentNotFound { mobile, date }) => Ok(not_found_reply(format!(
            "Duty assignment not found for this mobile number (mobile: {mobile}, date: {date})"
        ))),
        Err(LedgerError::AlreadySubmitted(duty)) => {
            let reply = DutyActionReply {
                already_submitted: Some(true),
                ..DutyActionReply::new("Papers already submitted", Some(duty))
            };
            Ok((StatusCode::BAD_REQUEST, Json(reply)).into_response())
        }
        Err(LedgerError::ProxyAlreadyCheckedIn(duty)) => {
            let reply = DutyActionReply {
                should_submit_papers: Some(true),
                is_proxy: Some(true),
                ..DutyActionReply::new(
                    "Proxy check-in found. Please proceed to submit papers.",
                    Some(duty),
                )
            };
            Ok((StatusCode::BAD_REQUEST, Json(reply)).into_response())
        }
        Err(LedgerError::AlreadyCheckedIn(duty)) => {
            let reply = DutyActionReply {
                should_submit_papers: Some(true),
                ..DutyActionReply::new("Already checked in. Please submit papers.", Some(duty))
            };
            Ok((StatusCode::BAD_REQUEST, Json(reply)).into_response())
        }
        Err(LedgerError::HallAlreadyServiced(duty)) => {
            let reply = DutyActionReply {
                papers_collected: Some(true),
                ..DutyActionReply::new(
                    "Papers have been collected for your hall. Please proceed to the exam centre.",
                    Some(duty),
                )
            };
            Ok((StatusCode::BAD_REQUEST, Json(reply)).into_response())
        }
        Err(err) => Err(ledger_fault(err)),
    }
}

/// Proxy check-in for an absent assignee.
///
/// POST /duty/proxy
#[utoipa::path(
    post,
    path = "/duty/proxy",
    tag = "duty",
    request_body = ProxyRequest,
    responses(
        (status = 200, description = "Proxy check-in recorded", body = DutyActionReply),
        (status = 400, description = "Slot already taken by another proxy", body = DutyActionReply),
        (status = 404, description = "No duty assignment for this mobile number", body = DutyActionReply),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn proxy_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProxyRequest>,
) -> Result<Response, ApiError> {
    let (today, now) = local_now();
    tracing::info!(
        absent_mobile = %req.absent_mobile_number,
        proxy_name = %req.proxy_staff_name,
        emergency_reason = req.emergency_reason.as_deref().unwrap_or(""),
        "proxy check-in requested"
    );

    match state
        .ledger()
        .proxy_check_in(&req.absent_mobile_number, &req.proxy_staff_name, today, now)
        .await
    {
        Ok(duty) => Ok(Json(DutyActionReply::new(
            "Successfully processed proxy check-in",
            Some(duty),
        ))
        .into_response()),
        Err(LedgerError::AssignmentNotFound { .. }) => Ok(not_found_reply(
            "Duty assignment not found for this mobile number",
        )),
        Err(LedgerError::ProxySlotTaken(duty)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(DutyActionReply::new(
                "Duty already taken by another proxy staff",
                Some(duty),
            )),
        )
            .into_response()),
        Err(err) => Err(ledger_fault(err)),
    }
}

/// Record paper submission for a duty.
///
/// POST /duty/submit
#[utoipa::path(
    post,
    path = "/duty/submit",
    tag = "duty",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Submission recorded", body = DutyActionReply),
        (status = 400, description = "Papers already submitted", body = DutyActionReply),
        (status = 404, description = "No duty record for this mobile number", body = DutyActionReply),
        (status = 503, description = "Store unavailable", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Response, ApiError> {
    let (today, now) = local_now();
    tracing::info!(mobile = %req.mobile_number, date = %today, "paper submission requested");

    match state.ledger().submit(&req.mobile_number, today, now).await {
        Ok(duty) => Ok(Json(DutyActionReply::new(
            "Successfully submitted papers",
            Some(duty),
        ))
        .into_response()),
        Err(LedgerError::AssignmentNotFound { date, .. }) => {
            Ok(not_found_reply(format!("Duty record not found for {date}")))
        }
        Err(LedgerError::AlreadySubmitted(duty)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(DutyActionReply::new("Papers already submitted", Some(duty))),
        )
            .into_response()),
        Err(err) => Err(ledger_fault(err)),
    }
}

// ============================================================================
// Shared mapping helpers
// ============================================================================

fn not_found_reply(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(DutyActionReply::new(message, None)),
    )
        .into_response()
}

/// Maps residual ledger errors (store faults) to API errors.
pub(crate) fn ledger_fault(err: LedgerError) -> ApiError {
    match err {
        LedgerError::Store(core) => ApiError::from(core),
        // Benign variants are handled branch-by-branch in the handlers.
        other => ApiError::internal(other.to_string()),
    }
}
