//! PostgREST-backed record store.
//!
//! Talks to a PostgREST-style REST endpoint (e.g. a Supabase project) over
//! HTTP. Update guards become row filters on the `PATCH` request, so the
//! compare-and-set is enforced by the store itself: a guarded update that
//! matches zero rows returns an empty representation, which is surfaced as
//! [`UpdateOutcome::GuardFailed`] after a re-read.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use vigil_core::{
    DutyRecord, Error, RecordPatch, RecordStore, Result, UpdateGuard, UpdateOutcome,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Record store over a PostgREST REST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    base_url: String,
    table: String,
    client: reqwest::Client,
}

impl PostgrestStore {
    /// Creates a store targeting the given base URL and table.
    ///
    /// `api_key`, when present, is sent both as `apikey` and as a bearer
    /// token, matching what Supabase expects.
    #[must_use]
    pub fn new(base_url: impl Into<String>, table: impl Into<String>, api_key: Option<&str>) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("apikey", value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            table: table.into(),
            client,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    async fn select(&self, filters: &[(&str, String)]) -> Result<Vec<DutyRecord>> {
        let response = self
            .client
            .get(self.table_url())
            .query(filters)
            .send()
            .await
            .map_err(|e| Error::unavailable_with_source("record store request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(format!(
                "record store query failed ({status}): {body}"
            )));
        }

        response
            .json::<Vec<DutyRecord>>()
            .await
            .map_err(|e| Error::serialization(format!("invalid record store response: {e}")))
    }
}

fn guard_filters(guard: &UpdateGuard) -> Vec<(&'static str, String)> {
    match guard {
        UpdateGuard::None => vec![],
        UpdateGuard::CheckinUnset => vec![("checkin_time", "is.null".to_string())],
        UpdateGuard::SubmissionUnset => vec![("submission_time", "is.null".to_string())],
        UpdateGuard::NotProxied {
            assigned_staff_name,
        } => vec![(
            "or",
            format!(
                "(reported_staff_name.is.null,reported_staff_name.eq.\"{}\")",
                assigned_staff_name.replace('"', "")
            ),
        )],
    }
}

fn patch_body(patch: &RecordPatch) -> Result<serde_json::Value> {
    let mut body = serde_json::Map::new();
    if let Some(name) = &patch.reported_staff_name {
        body.insert("reported_staff_name".to_string(), name.clone().into());
    }
    if let Some(time) = patch.checkin_time {
        body.insert(
            "checkin_time".to_string(),
            time.format("%H:%M:%S").to_string().into(),
        );
    }
    if let Some(time) = patch.submission_time {
        body.insert(
            "submission_time".to_string(),
            time.format("%H:%M:%S").to_string().into(),
        );
    }
    if let Some(status) = patch.status {
        let value = serde_json::to_value(status)
            .map_err(|e| Error::serialization(format!("status encoding failed: {e}")))?;
        body.insert("status".to_string(), value);
    }
    Ok(serde_json::Value::Object(body))
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn find_by_mobile(&self, mobile: &str, date: NaiveDate) -> Result<Option<DutyRecord>> {
        let rows = self
            .select(&[
                ("mobile_number", format!("eq.{mobile}")),
                ("duty_date", format!("eq.{date}")),
            ])
            .await?;

        let mut rows = rows.into_iter();
        let first = rows.next();
        if rows.next().is_some() {
            return Err(Error::internal(format!(
                "multiple duty records for mobile {mobile} on {date}"
            )));
        }
        Ok(first)
    }

    async fn find_by_hall(&self, hall_no: &str, date: NaiveDate) -> Result<Vec<DutyRecord>> {
        self.select(&[
            ("hall_no", format!("eq.{hall_no}")),
            ("duty_date", format!("eq.{date}")),
            ("order", "mobile_number.asc".to_string()),
        ])
        .await
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<DutyRecord>> {
        self.select(&[
            ("duty_date", format!("eq.{date}")),
            ("order", "hall_no.asc".to_string()),
        ])
        .await
    }

    async fn list_all(&self) -> Result<Vec<DutyRecord>> {
        self.select(&[("order", "duty_date.desc,hall_no.asc".to_string())])
            .await
    }

    async fn update(
        &self,
        id: &str,
        patch: RecordPatch,
        guard: UpdateGuard,
    ) -> Result<UpdateOutcome> {
        let mut filters = vec![("id", format!("eq.{id}"))];
        filters.extend(guard_filters(&guard));

        let response = self
            .client
            .patch(self.table_url())
            .query(&filters)
            .header("Prefer", "return=representation")
            .json(&patch_body(&patch)?)
            .send()
            .await
            .map_err(|e| Error::unavailable_with_source("record store update failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(format!(
                "record store update failed ({status}): {body}"
            )));
        }

        let mut rows = response
            .json::<Vec<DutyRecord>>()
            .await
            .map_err(|e| Error::serialization(format!("invalid record store response: {e}")))?;

        if let Some(updated) = rows.pop() {
            return Ok(UpdateOutcome::Updated(updated));
        }

        // Zero rows matched: either the guard lost, or the row is gone.
        let current = self
            .select(&[("id", format!("eq.{id}"))])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::unavailable(format!("record {id} no longer exists")))?;
        Ok(UpdateOutcome::GuardFailed(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use vigil_core::DutyStatus;

    #[test]
    fn guard_filters_translate_to_row_filters() {
        assert!(guard_filters(&UpdateGuard::None).is_empty());
        assert_eq!(
            guard_filters(&UpdateGuard::CheckinUnset),
            vec![("checkin_time", "is.null".to_string())]
        );
        assert_eq!(
            guard_filters(&UpdateGuard::SubmissionUnset),
            vec![("submission_time", "is.null".to_string())]
        );

        let filters = guard_filters(&UpdateGuard::NotProxied {
            assigned_staff_name: "A. Rao".to_string(),
        });
        assert_eq!(
            filters,
            vec![(
                "or",
                "(reported_staff_name.is.null,reported_staff_name.eq.\"A. Rao\")".to_string()
            )]
        );
    }

    #[test]
    fn patch_body_carries_only_set_fields() {
        let body = patch_body(&RecordPatch {
            checkin_time: NaiveTime::from_hms_opt(8, 30, 0),
            status: Some(DutyStatus::ProxyReported),
            ..RecordPatch::default()
        })
        .unwrap();

        assert_eq!(body["checkin_time"], "08:30:00");
        assert_eq!(body["status"], "Proxy Reported");
        assert!(body.get("reported_staff_name").is_none());
        assert!(body.get("submission_time").is_none());
    }

    #[test]
    fn table_url_joins_without_double_slash() {
        let store = PostgrestStore::new(
            "https://project.supabase.co/rest/v1/",
            "admin_dashboard",
            None,
        );
        assert_eq!(
            store.table_url(),
            "https://project.supabase.co/rest/v1/admin_dashboard"
        );
    }
}
