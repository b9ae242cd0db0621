//! Attendance reports.
//!
//! Summaries are computed over all of a user's records. The recent-window
//! filter only narrows the list of records shown alongside them.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

use crate::model::{AttendanceRecord, AttendanceStatus, UserProfile};
use crate::store::RecordStore;

/// Counts of records by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    /// Records marked present.
    pub present: usize,
    /// Records marked absent.
    pub absent: usize,
    /// Records marked late.
    pub late: usize,
    /// All records.
    pub total: usize,
}

impl AttendanceSummary {
    /// Tally `records` by status.
    #[must_use]
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, record| {
            match record.status {
                AttendanceStatus::Present => acc.present += 1,
                AttendanceStatus::Absent => acc.absent += 1,
                AttendanceStatus::Late => acc.late += 1,
            }
            acc.total += 1;
            acc
        })
    }

    /// Share of records marked present, as a percentage. Zero when there
    /// are no records.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn attendance_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.present as f64 / self.total as f64 * 100.0
        }
    }

    /// The rate rendered with one decimal place.
    #[must_use]
    pub fn rate_display(&self) -> String {
        format!("{:.1}%", self.attendance_rate())
    }
}

/// Records no older than `days` days before `now`. `days == 0` keeps all.
#[must_use]
pub fn within_last_days(
    records: &[AttendanceRecord],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<AttendanceRecord> {
    let cutoff = (days > 0)
        .then(|| TimeDelta::try_days(i64::from(days)))
        .flatten()
        .and_then(|window| now.checked_sub_signed(window));

    match cutoff {
        Some(cutoff) => records
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect(),
        None => records.to_vec(),
    }
}

/// Records for the attendance listing, optionally narrowed to one user
/// and one calendar day in the store's zone.
#[must_use]
pub fn attendance_listing(
    store: &RecordStore,
    user_id: Option<&str>,
    date: Option<NaiveDate>,
) -> Vec<AttendanceRecord> {
    match (user_id, date) {
        (None, None) => store.list_attendance(),
        (Some(user_id), None) => store.attendance_for_user(user_id),
        (user_id, Some(date)) => {
            let mut records = store.attendance_on_date(date);
            if let Some(user_id) = user_id {
                records.retain(|r| r.user_id == user_id);
            }
            records
        }
    }
}

/// The most recently marked record.
#[must_use]
pub fn last_attendance(records: &[AttendanceRecord]) -> Option<&AttendanceRecord> {
    records.iter().max_by_key(|r| r.timestamp)
}

/// Profile fields shown on a dashboard. The face payload is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    /// Profile id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Department or team.
    pub department: String,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

impl From<&UserProfile> for ProfileSummary {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            department: user.department.clone(),
            created_at: user.created_at,
        }
    }
}

/// One user's attendance overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDashboard {
    /// The user.
    pub user: ProfileSummary,
    /// Counts over all of the user's records.
    pub summary: AttendanceSummary,
    /// Percentage of records marked present.
    pub attendance_rate: f64,
    /// The most recently marked record.
    pub last_attendance: Option<AttendanceRecord>,
    /// Window applied to `records`, in days. Zero means all.
    pub window_days: u32,
    /// Records within the window, newest first.
    pub records: Vec<AttendanceRecord>,
}

/// Build the dashboard for `user_id`, or `None` if the user is unknown.
#[must_use]
pub fn dashboard(store: &RecordStore, user_id: &str, days: u32) -> Option<UserDashboard> {
    let user = store.get_user(user_id)?;
    let all = store.attendance_for_user(user_id);
    let summary = AttendanceSummary::from_records(&all);

    let mut records = within_last_days(&all, days, store.now());
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Some(UserDashboard {
        user: ProfileSummary::from(&user),
        summary,
        attendance_rate: summary.attendance_rate(),
        last_attendance: last_attendance(&all).cloned(),
        window_days: days,
        records,
    })
}
