//! HTTP route handlers.

pub mod duty;
pub mod staff;

use std::sync::Arc;

use axum::Router;
use chrono::{Local, NaiveDate, NaiveTime, Timelike};

use crate::server::AppState;

/// Duty and staff routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().merge(duty::routes()).merge(staff::routes())
}

/// The reference date and wall-clock time in the exam's local timezone.
///
/// Computed once per request, never cached across requests, so a request
/// straddling midnight is pinned to a single date. Sub-second precision is
/// dropped to match the store's `HH:MM:SS` time columns.
pub(crate) fn local_now() -> (NaiveDate, NaiveTime) {
    let now = Local::now();
    let time = now.time();
    (now.date_naive(), time.with_nanosecond(0).unwrap_or(time))
}
