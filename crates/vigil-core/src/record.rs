//! Duty record model and derived status helpers.
//!
//! One [`DutyRecord`] exists per (staff assignment, exam date). Records are
//! created by an external assignment process and mutated exclusively through
//! the ledger transitions in [`crate::ledger`].

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a duty record.
///
/// `Assigned` is the implicit initial state (no explicit check-in yet).
/// `Submitted` is terminal; no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DutyStatus {
    /// Assigned but not yet checked in (implicit initial state).
    #[default]
    Assigned,
    /// The originally assigned staff member checked in.
    Reported,
    /// A substitute checked in on behalf of the absent assignee.
    #[serde(rename = "Proxy Reported")]
    ProxyReported,
    /// Papers handed in. Terminal.
    Submitted,
}

/// One row per (staff assignment, exam date).
///
/// `mobile_number` is the lookup key for every operation and always belongs
/// to the *originally assigned* staff member; a proxy check-in never changes
/// it. Whether a duty was fulfilled by a proxy is derived solely from
/// `reported_staff_name != assigned_staff_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyRecord {
    /// Opaque unique identifier, assigned at creation. Immutable.
    pub id: String,
    /// Exam day. Immutable.
    pub duty_date: NaiveDate,
    /// Examination hall identifier. Immutable.
    pub hall_no: String,
    /// Contact number of the originally assigned staff member. Immutable.
    pub mobile_number: String,
    /// Name of the originally assigned staff member. Immutable.
    pub assigned_staff_name: String,
    /// Name of whoever actually checked in; null until first check-in.
    #[serde(default)]
    pub reported_staff_name: Option<String>,
    /// Time of check-in (`HH:MM:SS`, exam-local). Set exactly once.
    #[serde(default)]
    pub checkin_time: Option<NaiveTime>,
    /// Time papers were submitted. Set exactly once.
    #[serde(default)]
    pub submission_time: Option<NaiveTime>,
    /// Lifecycle state. A null or missing column reads as [`DutyStatus::Assigned`].
    #[serde(default, deserialize_with = "null_status_as_assigned")]
    pub status: DutyStatus,
    /// Department label. Descriptive, non-authoritative.
    #[serde(default)]
    pub dept: Option<String>,
}

/// SQL-backed stores return every selected column, so a pre-check-in row
/// arrives with an explicit `"status": null` rather than a missing key.
fn null_status_as_assigned<'de, D>(deserializer: D) -> Result<DutyStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<DutyStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the next legal action is for a record, computed without mutation.
///
/// Exposed to callers before they attempt a mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DutyStanding {
    /// No check-in recorded yet.
    #[serde(rename = "isFirstTime")]
    pub is_first_time: bool,
    /// The duty was (or is being) fulfilled by a substitute.
    #[serde(rename = "isProxy")]
    pub is_proxy: bool,
    /// Papers already handed in.
    #[serde(rename = "isSubmitted")]
    pub is_submitted: bool,
    /// Checked in, not yet submitted, not a proxy case.
    #[serde(rename = "shouldSubmitPapers")]
    pub should_submit_papers: bool,
}

impl DutyRecord {
    /// Returns true when a check-in time has been recorded.
    #[must_use]
    pub fn has_checked_in(&self) -> bool {
        self.checkin_time.is_some()
    }

    /// Returns true when the duty is fulfilled by a substitute.
    ///
    /// The name inequality is the sole source of truth for proxy-ness; there
    /// is deliberately no separate flag to drift out of sync.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.reported_staff_name
            .as_deref()
            .is_some_and(|reported| reported != self.assigned_staff_name)
    }

    /// Returns true when papers have been handed in.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == DutyStatus::Submitted || self.submission_time.is_some()
    }

    /// Computes the derived standing of this record.
    #[must_use]
    pub fn standing(&self) -> DutyStanding {
        let is_proxy = self.is_proxy();
        let is_submitted = self.is_submitted();
        let checked_in = self.has_checked_in();
        DutyStanding {
            is_first_time: !checked_in,
            is_proxy,
            is_submitted,
            should_submit_papers: checked_in && !is_submitted && !is_proxy,
        }
    }

    /// Display-friendly department label.
    #[must_use]
    pub fn department(&self) -> &str {
        self.dept.as_deref().unwrap_or("Not specified")
    }
}
