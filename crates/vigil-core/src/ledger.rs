//! Duty ledger: the check-in / proxy / submission state machine.
//!
//! Per record and exam date the lifecycle is:
//!
//! ```text
//! Assigned -> Reported       -> Submitted   (normal path)
//! Assigned -> ProxyReported  -> Submitted   (substitute path)
//! ```
//!
//! `Submitted` is terminal. The first person from a hall to check in becomes
//! that hall's sole paper-handler; everyone else assigned to the hall is
//! turned away (`HallAlreadyServiced`). Every mutation goes through a guarded
//! store update, so a retried or racing request lands in the corresponding
//! "already done" branch instead of mutating twice.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use crate::error::Error;
use crate::record::{DutyRecord, DutyStatus};
use crate::store::{RecordPatch, RecordStore, UpdateGuard, UpdateOutcome};

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Outcomes of ledger transitions that are not plain success.
///
/// Everything except `Store` is a benign, expected condition and carries the
/// current record so callers can tell the staff member what to do next
/// without another read.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No duty row exists for the (mobile, date) key.
    #[error("no duty assignment found for mobile {mobile} on {date}")]
    AssignmentNotFound {
        /// The mobile number that was looked up.
        mobile: String,
        /// The reference date of the lookup.
        date: NaiveDate,
    },

    /// The assignee already checked in; the next step is submission.
    #[error("already checked in; papers should be submitted")]
    AlreadyCheckedIn(DutyRecord),

    /// A substitute already checked in for this duty; proceed to submission.
    #[error("proxy check-in already recorded; papers should be submitted")]
    ProxyAlreadyCheckedIn(DutyRecord),

    /// Papers were already handed in. Terminal for this duty.
    #[error("papers already submitted")]
    AlreadySubmitted(DutyRecord),

    /// Another staff member already collected papers for this hall.
    #[error("papers already collected for hall {} by someone else", .0.hall_no)]
    HallAlreadyServiced(DutyRecord),

    /// Another substitute already claimed this absent assignment.
    #[error("duty already taken by another proxy staff member")]
    ProxySlotTaken(DutyRecord),

    /// The record store failed or is unreachable.
    #[error(transparent)]
    Store(#[from] Error),
}

impl LedgerError {
    /// Returns the current record carried by benign outcomes.
    #[must_use]
    pub fn record(&self) -> Option<&DutyRecord> {
        match self {
            Self::AlreadyCheckedIn(rec)
            | Self::ProxyAlreadyCheckedIn(rec)
            | Self::AlreadySubmitted(rec)
            | Self::HallAlreadyServiced(rec)
            | Self::ProxySlotTaken(rec) => Some(rec),
            Self::AssignmentNotFound { .. } | Self::Store(_) => None,
        }
    }
}

/// The authoritative per-(staff, hall, date) transition rules.
///
/// The reference date and wall-clock time are explicit on every call; the
/// ledger never reads the ambient clock.
#[derive(Clone)]
pub struct DutyLedger {
    store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for DutyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DutyLedger")
            .field("store", &"<RecordStore>")
            .finish()
    }
}

impl DutyLedger {
    /// Creates a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the unique record for (mobile, date), if any.
    ///
    /// Read-only; not-found is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the store fails.
    pub async fn lookup(&self, mobile: &str, date: NaiveDate) -> LedgerResult<Option<DutyRecord>> {
        Ok(self.store.find_by_mobile(mobile, date).await?)
    }

    /// Records the originally assigned staff member as present.
    ///
    /// On success the record moves to `Reported` with
    /// `reported_staff_name = assigned_staff_name` and `checkin_time = now`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AssignmentNotFound`] when no duty row exists
    /// - [`LedgerError::AlreadySubmitted`] when the duty is terminal
    /// - [`LedgerError::ProxyAlreadyCheckedIn`] / [`LedgerError::AlreadyCheckedIn`]
    ///   when a check-in exists (caller should proceed to submission)
    /// - [`LedgerError::HallAlreadyServiced`] when another staff member
    ///   already collected papers for the hall
    /// - [`LedgerError::Store`] on store faults
    pub async fn check_in(
        &self,
        mobile: &str,
        date: NaiveDate,
        now: NaiveTime,
    ) -> LedgerResult<DutyRecord> {
        let record = self.require_record(mobile, date).await?;

        if record.has_checked_in() {
            return Err(classify_checked_in(record));
        }

        // Hall lock: the first check-in for a hall wins paper-handling for
        // the day; everyone else at that hall is redirected away.
        let peers = self.store.find_by_hall(&record.hall_no, date).await?;
        let hall_serviced = peers
            .iter()
            .filter(|peer| peer.mobile_number != record.mobile_number)
            .any(peer_has_reported);
        if hall_serviced {
            tracing::info!(
                mobile = %mobile,
                hall_no = %record.hall_no,
                "check-in refused: hall already serviced"
            );
            return Err(LedgerError::HallAlreadyServiced(record));
        }

        let patch = RecordPatch {
            reported_staff_name: Some(record.assigned_staff_name.clone()),
            checkin_time: Some(now),
            status: Some(DutyStatus::Reported),
            ..RecordPatch::default()
        };
        match self
            .store
            .update(&record.id, patch, UpdateGuard::CheckinUnset)
            .await?
        {
            UpdateOutcome::Updated(updated) => {
                tracing::info!(
                    mobile = %mobile,
                    hall_no = %updated.hall_no,
                    checkin_time = %now,
                    "duty check-in recorded"
                );
                Ok(updated)
            }
            // A concurrent or retried request won the write.
            UpdateOutcome::GuardFailed(current) => Err(classify_checked_in(current)),
        }
    }

    /// Records a substitute as present for an absent staff member's duty.
    ///
    /// `mobile_number` on the record is never changed: the duty stays keyed
    /// by the absent assignee for traceability, and proxy-ness is derived
    /// from the name inequality. First proxy wins; a proxy may take over a
    /// duty the assignee had already self-checked-in (the proxy flow is
    /// operator-authorized for that specific assignment, which is also why
    /// no hall-lock check runs here).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AssignmentNotFound`] when no duty row exists
    /// - [`LedgerError::ProxySlotTaken`] when another substitute already
    ///   claimed the duty
    /// - [`LedgerError::Store`] on store faults
    pub async fn proxy_check_in(
        &self,
        absent_mobile: &str,
        proxy_name: &str,
        date: NaiveDate,
        now: NaiveTime,
    ) -> LedgerResult<DutyRecord> {
        let record = self.require_record(absent_mobile, date).await?;

        if record.is_proxy() {
            return Err(LedgerError::ProxySlotTaken(record));
        }

        let patch = RecordPatch {
            reported_staff_name: Some(proxy_name.to_string()),
            checkin_time: Some(now),
            status: Some(DutyStatus::ProxyReported),
            ..RecordPatch::default()
        };
        let guard = UpdateGuard::NotProxied {
            assigned_staff_name: record.assigned_staff_name.clone(),
        };
        match self.store.update(&record.id, patch, guard).await? {
            UpdateOutcome::Updated(updated) => {
                tracing::info!(
                    absent_mobile = %absent_mobile,
                    proxy_name = %proxy_name,
                    hall_no = %updated.hall_no,
                    "proxy check-in recorded"
                );
                Ok(updated)
            }
            UpdateOutcome::GuardFailed(current) => Err(LedgerError::ProxySlotTaken(current)),
        }
    }

    /// Records the hand-in of completed papers for a duty.
    ///
    /// Both originally-assigned and proxy reporters may submit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AssignmentNotFound`] when no duty row exists
    /// - [`LedgerError::AlreadySubmitted`] when papers were already handed in
    /// - [`LedgerError::Store`] on store faults
    pub async fn submit(
        &self,
        mobile: &str,
        date: NaiveDate,
        now: NaiveTime,
    ) -> LedgerResult<DutyRecord> {
        let record = self.require_record(mobile, date).await?;

        if record.submission_time.is_some() {
            return Err(LedgerError::AlreadySubmitted(record));
        }

        let patch = RecordPatch {
            submission_time: Some(now),
            status: Some(DutyStatus::Submitted),
            ..RecordPatch::default()
        };
        match self
            .store
            .update(&record.id, patch, UpdateGuard::SubmissionUnset)
            .await?
        {
            UpdateOutcome::Updated(updated) => {
                tracing::info!(
                    mobile = %mobile,
                    hall_no = %updated.hall_no,
                    submission_time = %now,
                    "paper submission recorded"
                );
                Ok(updated)
            }
            UpdateOutcome::GuardFailed(current) => Err(LedgerError::AlreadySubmitted(current)),
        }
    }

    /// Returns the roster for a date, ordered by hall.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the store fails.
    pub async fn roster(&self, date: NaiveDate) -> LedgerResult<Vec<DutyRecord>> {
        Ok(self.store.list_for_date(date).await?)
    }

    /// Returns every record, newest duty date first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the store fails.
    pub async fn roster_all(&self) -> LedgerResult<Vec<DutyRecord>> {
        Ok(self.store.list_all().await?)
    }

    async fn require_record(&self, mobile: &str, date: NaiveDate) -> LedgerResult<DutyRecord> {
        self.store
            .find_by_mobile(mobile, date)
            .await?
            .ok_or_else(|| LedgerError::AssignmentNotFound {
                mobile: mobile.to_string(),
                date,
            })
    }
}

/// Classifies an existing check-in for the retry/duplicate branches.
fn classify_checked_in(record: DutyRecord) -> LedgerError {
    if record.is_submitted() {
        LedgerError::AlreadySubmitted(record)
    } else if record.is_proxy() {
        LedgerError::ProxyAlreadyCheckedIn(record)
    } else {
        LedgerError::AlreadyCheckedIn(record)
    }
}

/// Whether a hall peer counts as having collected the hall's papers.
fn peer_has_reported(peer: &DutyRecord) -> bool {
    peer.checkin_time.is_some()
        || matches!(
            peer.status,
            DutyStatus::Reported | DutyStatus::ProxyReported
        )
        || peer.reported_staff_name.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 4).unwrap()
    }

    fn now() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 30, 0).unwrap()
    }

    fn later() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 15, 0).unwrap()
    }

    fn record(id: &str, mobile: &str, hall: &str, name: &str) -> DutyRecord {
        DutyRecord {
            id: id.to_string(),
            duty_date: date(),
            hall_no: hall.to_string(),
            mobile_number: mobile.to_string(),
            assigned_staff_name: name.to_string(),
            reported_staff_name: None,
            checkin_time: None,
            submission_time: None,
            status: DutyStatus::Assigned,
            dept: None,
        }
    }

    fn ledger_with(records: Vec<DutyRecord>) -> (DutyLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.seed(records);
        (DutyLedger::new(store.clone()), store)
    }

    #[tokio::test]
    async fn unknown_mobile_fails_every_operation() {
        let (ledger, _) = ledger_with(vec![]);

        assert!(matches!(
            ledger.check_in("9990001", date(), now()).await,
            Err(LedgerError::AssignmentNotFound { .. })
        ));
        assert!(matches!(
            ledger
                .proxy_check_in("9990001", "S. Iyer", date(), now())
                .await,
            Err(LedgerError::AssignmentNotFound { .. })
        ));
        assert!(matches!(
            ledger.submit("9990001", date(), now()).await,
            Err(LedgerError::AssignmentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn lookup_not_found_is_a_normal_outcome() {
        let (ledger, _) = ledger_with(vec![]);
        assert!(ledger.lookup("9990001", date()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_check_in_reports_the_assignee() {
        let (ledger, _) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        let updated = ledger.check_in("9990001", date(), now()).await.unwrap();
        assert_eq!(updated.status, DutyStatus::Reported);
        assert_eq!(updated.reported_staff_name.as_deref(), Some("A. Rao"));
        assert_eq!(updated.checkin_time, Some(now()));
        assert!(updated.submission_time.is_none());
    }

    #[tokio::test]
    async fn second_check_in_is_redirected_not_remutated() {
        let (ledger, store) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger.check_in("9990001", date(), now()).await.unwrap();
        let err = ledger.check_in("9990001", date(), later()).await.unwrap_err();

        let LedgerError::AlreadyCheckedIn(current) = err else {
            panic!("expected AlreadyCheckedIn, got {err:?}");
        };
        // The original check-in time survives the retry.
        assert_eq!(current.checkin_time, Some(now()));
        assert_eq!(store.get("r-1").unwrap().checkin_time, Some(now()));
    }

    #[tokio::test]
    async fn check_in_after_proxy_redirects_to_submission() {
        let (ledger, _) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger
            .proxy_check_in("9990001", "S. Iyer", date(), now())
            .await
            .unwrap();

        let err = ledger.check_in("9990001", date(), later()).await.unwrap_err();
        assert!(matches!(err, LedgerError::ProxyAlreadyCheckedIn(_)));
    }

    #[tokio::test]
    async fn check_in_after_submission_is_terminal() {
        let (ledger, _) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger.check_in("9990001", date(), now()).await.unwrap();
        ledger.submit("9990001", date(), later()).await.unwrap();

        let err = ledger.check_in("9990001", date(), later()).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySubmitted(_)));
    }

    #[tokio::test]
    async fn hall_lock_turns_away_second_staff_member() {
        let (ledger, _) = ledger_with(vec![
            record("r-1", "9990001", "5", "A. Rao"),
            record("r-2", "9990002", "5", "B. Kumar"),
        ]);

        ledger.check_in("9990001", date(), now()).await.unwrap();

        let err = ledger.check_in("9990002", date(), later()).await.unwrap_err();
        let LedgerError::HallAlreadyServiced(rec) = err else {
            panic!("expected HallAlreadyServiced, got {err:?}");
        };
        // The turned-away caller's own record is untouched.
        assert_eq!(rec.mobile_number, "9990002");
        assert!(rec.checkin_time.is_none());
    }

    #[tokio::test]
    async fn hall_lock_ignores_other_halls_and_unreported_peers() {
        let (ledger, _) = ledger_with(vec![
            record("r-1", "9990001", "5", "A. Rao"),
            record("r-2", "9990002", "5", "B. Kumar"),
            record("r-3", "9990003", "6", "C. Das"),
        ]);

        // A checked-in peer in hall 6 does not lock hall 5.
        ledger.check_in("9990003", date(), now()).await.unwrap();
        ledger.check_in("9990001", date(), now()).await.unwrap();

        // But the hall-5 peer is now locked out.
        assert!(matches!(
            ledger.check_in("9990002", date(), later()).await,
            Err(LedgerError::HallAlreadyServiced(_))
        ));
    }

    #[tokio::test]
    async fn hall_lock_counts_proxy_reported_peers() {
        let (ledger, _) = ledger_with(vec![
            record("r-1", "9990001", "5", "A. Rao"),
            record("r-2", "9990002", "5", "B. Kumar"),
        ]);

        ledger
            .proxy_check_in("9990001", "S. Iyer", date(), now())
            .await
            .unwrap();

        assert!(matches!(
            ledger.check_in("9990002", date(), later()).await,
            Err(LedgerError::HallAlreadyServiced(_))
        ));
    }

    #[tokio::test]
    async fn proxy_preserves_the_absent_staffs_mobile_number() {
        let (ledger, store) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        let updated = ledger
            .proxy_check_in("9990001", "S. Iyer", date(), now())
            .await
            .unwrap();

        assert_eq!(updated.mobile_number, "9990001");
        assert_eq!(updated.reported_staff_name.as_deref(), Some("S. Iyer"));
        assert_eq!(updated.status, DutyStatus::ProxyReported);
        assert_eq!(updated.checkin_time, Some(now()));

        // Subsequent lookups still key on the absent staff's number.
        let found = ledger.lookup("9990001", date()).await.unwrap().unwrap();
        assert_eq!(found.id, "r-1");
        assert_eq!(store.get("r-1").unwrap().mobile_number, "9990001");
    }

    #[tokio::test]
    async fn first_proxy_wins_the_slot() {
        let (ledger, _) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger
            .proxy_check_in("9990001", "S. Iyer", date(), now())
            .await
            .unwrap();

        let err = ledger
            .proxy_check_in("9990001", "T. Menon", date(), later())
            .await
            .unwrap_err();
        let LedgerError::ProxySlotTaken(current) = err else {
            panic!("expected ProxySlotTaken, got {err:?}");
        };
        assert_eq!(current.reported_staff_name.as_deref(), Some("S. Iyer"));
    }

    #[tokio::test]
    async fn proxy_may_take_over_a_self_checked_in_duty() {
        let (ledger, _) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger.check_in("9990001", date(), now()).await.unwrap();
        let updated = ledger
            .proxy_check_in("9990001", "S. Iyer", date(), later())
            .await
            .unwrap();

        assert_eq!(updated.status, DutyStatus::ProxyReported);
        assert_eq!(updated.reported_staff_name.as_deref(), Some("S. Iyer"));
        assert_eq!(updated.checkin_time, Some(later()));
    }

    #[tokio::test]
    async fn submit_succeeds_after_proxy_check_in() {
        let (ledger, _) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger
            .proxy_check_in("9990001", "S. Iyer", date(), now())
            .await
            .unwrap();
        let updated = ledger.submit("9990001", date(), later()).await.unwrap();

        assert_eq!(updated.status, DutyStatus::Submitted);
        assert_eq!(updated.submission_time, Some(later()));
        // Still recorded as a proxy fulfilment.
        assert!(updated.is_proxy());
    }

    #[tokio::test]
    async fn second_submit_does_not_change_the_submission_time() {
        let (ledger, store) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        ledger.check_in("9990001", date(), now()).await.unwrap();
        ledger.submit("9990001", date(), later()).await.unwrap();

        let err = ledger
            .submit("9990001", date(), NaiveTime::from_hms_opt(13, 0, 0).unwrap())
            .await
            .unwrap_err();
        let LedgerError::AlreadySubmitted(current) = err else {
            panic!("expected AlreadySubmitted, got {err:?}");
        };
        assert_eq!(current.submission_time, Some(later()));
        assert_eq!(store.get("r-1").unwrap().submission_time, Some(later()));
    }

    #[tokio::test]
    async fn records_on_another_date_do_not_interfere() {
        let mut yesterday = record("r-0", "9990001", "5", "A. Rao");
        yesterday.duty_date = NaiveDate::from_ymd_opt(2024, 8, 3).unwrap();
        yesterday.checkin_time = Some(now());
        yesterday.status = DutyStatus::Reported;
        yesterday.reported_staff_name = Some("A. Rao".to_string());

        let (ledger, _) = ledger_with(vec![yesterday, record("r-1", "9990001", "5", "A. Rao")]);

        // Yesterday's check-in for the same hall does not lock today.
        let updated = ledger.check_in("9990001", date(), now()).await.unwrap();
        assert_eq!(updated.id, "r-1");
        assert_eq!(updated.status, DutyStatus::Reported);
    }

    #[tokio::test]
    async fn roster_is_ordered_by_hall() {
        let (ledger, _) = ledger_with(vec![
            record("r-1", "9990001", "7", "A. Rao"),
            record("r-2", "9990002", "2", "B. Kumar"),
        ]);

        let halls: Vec<String> = ledger
            .roster(date())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.hall_no)
            .collect();
        assert_eq!(halls, vec!["2", "7"]);
    }

    #[tokio::test]
    async fn status_and_time_nullity_stay_consistent_through_the_lifecycle() {
        let (ledger, store) = ledger_with(vec![record("r-1", "9990001", "5", "A. Rao")]);

        let assert_invariants = |rec: &DutyRecord| {
            let checkin_expected = matches!(
                rec.status,
                DutyStatus::Reported | DutyStatus::ProxyReported | DutyStatus::Submitted
            );
            assert_eq!(rec.checkin_time.is_some(), checkin_expected);
            assert_eq!(
                rec.submission_time.is_some(),
                rec.status == DutyStatus::Submitted
            );
        };

        assert_invariants(&store.get("r-1").unwrap());
        ledger.check_in("9990001", date(), now()).await.unwrap();
        assert_invariants(&store.get("r-1").unwrap());
        ledger.submit("9990001", date(), later()).await.unwrap();
        assert_invariants(&store.get("r-1").unwrap());
    }
}
