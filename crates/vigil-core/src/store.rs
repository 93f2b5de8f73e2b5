//! Record store abstraction and the in-memory implementation.
//!
//! The ledger never talks to a database directly. It depends on this trait:
//! equality-filter reads plus a *guarded* partial update. The guard is the
//! store-native compare-and-set: a SQL implementation translates it into the
//! `WHERE` clause of the `UPDATE`, so two racing writers cannot both mutate
//! the same row. "Zero rows updated" comes back as [`UpdateOutcome::GuardFailed`]
//! and is handled by the ledger as the already-done/contention branch, never
//! as a fault.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::error::{Error, Result};
use crate::record::{DutyRecord, DutyStatus};

/// Partial field set applied to a record by [`RecordStore::update`].
///
/// Only the fields a transition touches; `None` means "leave unchanged".
/// Immutable fields (`id`, `duty_date`, `hall_no`, `mobile_number`,
/// `assigned_staff_name`) are deliberately not expressible here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// New reported staff name.
    pub reported_staff_name: Option<String>,
    /// New check-in time.
    pub checkin_time: Option<NaiveTime>,
    /// New submission time.
    pub submission_time: Option<NaiveTime>,
    /// New lifecycle status.
    pub status: Option<DutyStatus>,
}

/// Precondition for a conditional update.
///
/// Backends evaluate the guard atomically with the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateGuard {
    /// Apply unconditionally.
    None,
    /// Apply only while no check-in time is recorded.
    CheckinUnset,
    /// Apply only while no submission time is recorded.
    SubmissionUnset,
    /// Apply only while the duty has not been claimed by a substitute:
    /// `reported_staff_name` is null or equals the assigned name.
    ///
    /// Carries the (immutable) assigned name so that SQL-shaped backends can
    /// express the comparison as a literal filter value.
    NotProxied {
        /// The record's `assigned_staff_name`.
        assigned_staff_name: String,
    },
}

/// Result of a guarded update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The guard held and the patch was applied; carries the resulting row.
    Updated(DutyRecord),
    /// The guard did not hold; carries the current row for classification.
    GuardFailed(DutyRecord),
}

/// Query interface over duty records.
///
/// Implementations must distinguish "no matching row" (`Ok(None)` / empty
/// vec) from store failures ([`Error::Unavailable`]).
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Returns the unique record for (mobile, date), if any.
    ///
    /// At most one record exists per pair; implementations may treat more
    /// than one matching row as [`Error::Internal`].
    async fn find_by_mobile(&self, mobile: &str, date: NaiveDate) -> Result<Option<DutyRecord>>;

    /// Returns every record for (hall, date).
    async fn find_by_hall(&self, hall_no: &str, date: NaiveDate) -> Result<Vec<DutyRecord>>;

    /// Returns every record for the date, ordered by hall number.
    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<DutyRecord>>;

    /// Returns every record, newest duty date first, then by hall number.
    async fn list_all(&self) -> Result<Vec<DutyRecord>>;

    /// Applies `patch` to the record with the given id while `guard` holds.
    ///
    /// Guard evaluation and the write are atomic. Returns
    /// [`UpdateOutcome::GuardFailed`] with the current row when the guard does
    /// not hold, and [`Error::Unavailable`] when the row has vanished or the
    /// store failed.
    async fn update(&self, id: &str, patch: RecordPatch, guard: UpdateGuard)
        -> Result<UpdateOutcome>;
}

fn guard_holds(guard: &UpdateGuard, record: &DutyRecord) -> bool {
    match guard {
        UpdateGuard::None => true,
        UpdateGuard::CheckinUnset => record.checkin_time.is_none(),
        UpdateGuard::SubmissionUnset => record.submission_time.is_none(),
        UpdateGuard::NotProxied {
            assigned_staff_name,
        } => record
            .reported_staff_name
            .as_deref()
            .is_none_or(|reported| reported == assigned_staff_name),
    }
}

fn apply_patch(record: &mut DutyRecord, patch: RecordPatch) {
    if let Some(name) = patch.reported_staff_name {
        record.reported_staff_name = Some(name);
    }
    if let Some(time) = patch.checkin_time {
        record.checkin_time = Some(time);
    }
    if let Some(time) = patch.submission_time {
        record.submission_time = Some(time);
    }
    if let Some(status) = patch.status {
        record.status = status;
    }
}

/// In-memory record store for tests and debug mode.
///
/// Guard evaluation happens under the same write lock as the mutation, so it
/// has the same atomicity as a SQL conditional update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, DutyRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record (assignment pre-population).
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned (test-only backend).
    pub fn insert(&self, record: DutyRecord) {
        self.records
            .write()
            .expect("lock")
            .insert(record.id.clone(), record);
    }

    /// Seeds the store from an iterator of records.
    pub fn seed(&self, records: impl IntoIterator<Item = DutyRecord>) {
        let mut map = self.records.write().expect("lock");
        for record in records {
            map.insert(record.id.clone(), record);
        }
    }

    /// Returns a snapshot of a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<DutyRecord> {
        self.records.read().expect("lock").get(id).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_mobile(&self, mobile: &str, date: NaiveDate) -> Result<Option<DutyRecord>> {
        let records = self.records.read().expect("lock");
        let mut matches = records
            .values()
            .filter(|r| r.mobile_number == mobile && r.duty_date == date);
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(Error::internal(format!(
                "multiple duty records for mobile {mobile} on {date}"
            )));
        }
        Ok(first)
    }

    async fn find_by_hall(&self, hall_no: &str, date: NaiveDate) -> Result<Vec<DutyRecord>> {
        let records = self.records.read().expect("lock");
        let mut rows: Vec<DutyRecord> = records
            .values()
            .filter(|r| r.hall_no == hall_no && r.duty_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.mobile_number.cmp(&b.mobile_number));
        Ok(rows)
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<DutyRecord>> {
        let records = self.records.read().expect("lock");
        let mut rows: Vec<DutyRecord> = records
            .values()
            .filter(|r| r.duty_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.hall_no.cmp(&b.hall_no));
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<DutyRecord>> {
        let records = self.records.read().expect("lock");
        let mut rows: Vec<DutyRecord> = records.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.duty_date
                .cmp(&a.duty_date)
                .then_with(|| a.hall_no.cmp(&b.hall_no))
        });
        Ok(rows)
    }

    async fn update(
        &self,
        id: &str,
        patch: RecordPatch,
        guard: UpdateGuard,
    ) -> Result<UpdateOutcome> {
        let mut records = self.records.write().expect("lock");
        let record = records
            .get_mut(id)
            .ok_or_else(|| Error::unavailable(format!("record {id} no longer exists")))?;

        if !guard_holds(&guard, record) {
            return Ok(UpdateOutcome::GuardFailed(record.clone()));
        }

        apply_patch(record, patch);
        Ok(UpdateOutcome::Updated(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 4).unwrap()
    }

    fn record(id: &str, mobile: &str, hall: &str) -> DutyRecord {
        DutyRecord {
            id: id.to_string(),
            duty_date: date(),
            hall_no: hall.to_string(),
            mobile_number: mobile.to_string(),
            assigned_staff_name: format!("Staff {mobile}"),
            reported_staff_name: None,
            checkin_time: None,
            submission_time: None,
            status: DutyStatus::Assigned,
            dept: None,
        }
    }

    #[tokio::test]
    async fn find_by_mobile_is_zero_or_one() {
        let store = MemoryStore::new();
        store.insert(record("r-1", "9990001", "5"));

        let found = store.find_by_mobile("9990001", date()).await.unwrap();
        assert_eq!(found.unwrap().id, "r-1");

        let missing = store.find_by_mobile("0000000", date()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_key_pair_is_an_internal_fault() {
        let store = MemoryStore::new();
        store.insert(record("r-1", "9990001", "5"));
        store.insert(record("r-2", "9990001", "6"));

        let err = store.find_by_mobile("9990001", date()).await.unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
    }

    #[tokio::test]
    async fn checkin_guard_blocks_second_write() {
        let store = MemoryStore::new();
        store.insert(record("r-1", "9990001", "5"));

        let patch = RecordPatch {
            checkin_time: NaiveTime::from_hms_opt(8, 0, 0),
            status: Some(DutyStatus::Reported),
            ..RecordPatch::default()
        };
        let outcome = store
            .update("r-1", patch.clone(), UpdateGuard::CheckinUnset)
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));

        let outcome = store
            .update("r-1", patch, UpdateGuard::CheckinUnset)
            .await
            .unwrap();
        let UpdateOutcome::GuardFailed(current) = outcome else {
            panic!("expected guard failure");
        };
        assert_eq!(current.checkin_time, NaiveTime::from_hms_opt(8, 0, 0));
    }

    #[tokio::test]
    async fn not_proxied_guard_admits_self_checkin_but_not_second_proxy() {
        let store = MemoryStore::new();
        let mut rec = record("r-1", "9990001", "5");
        let assigned = rec.assigned_staff_name.clone();
        rec.reported_staff_name = Some(assigned.clone());
        rec.checkin_time = NaiveTime::from_hms_opt(8, 0, 0);
        rec.status = DutyStatus::Reported;
        store.insert(rec);

        let guard = UpdateGuard::NotProxied {
            assigned_staff_name: assigned,
        };

        // Reported-by-self still satisfies NotProxied.
        let patch = RecordPatch {
            reported_staff_name: Some("S. Iyer".to_string()),
            status: Some(DutyStatus::ProxyReported),
            ..RecordPatch::default()
        };
        let outcome = store.update("r-1", patch, guard.clone()).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));

        // A second proxy does not.
        let patch = RecordPatch {
            reported_staff_name: Some("T. Menon".to_string()),
            ..RecordPatch::default()
        };
        let outcome = store.update("r-1", patch, guard).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::GuardFailed(_)));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_unavailable() {
        let store = MemoryStore::new();
        let err = store
            .update("ghost", RecordPatch::default(), UpdateGuard::None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn list_orderings() {
        let store = MemoryStore::new();
        let mut old = record("r-0", "9990000", "2");
        old.duty_date = NaiveDate::from_ymd_opt(2024, 8, 3).unwrap();
        store.seed([
            old,
            record("r-1", "9990001", "3"),
            record("r-2", "9990002", "1"),
        ]);

        let today: Vec<String> = store
            .list_for_date(date())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.hall_no)
            .collect();
        assert_eq!(today, vec!["1", "3"]);

        let all: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        // Newest date first.
        assert_eq!(all, vec!["r-2", "r-1", "r-0"]);
    }
}
