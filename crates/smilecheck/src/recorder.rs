//! The attendance recorder.
//!
//! A successful face match is the only trigger that writes attendance: the
//! recorder marks the matched user `present` for today. Absence is never
//! written; it is simply the lack of a record. Because the store overwrites
//! same-day records, repeated triggers are idempotent per day.
//!
//! The recorder also carries the state of one scanning session, which
//! decides whether captured frames are considered at all.

use tracing::{info, warn};

use crate::error::Result;
use crate::matcher::{ExactMatcher, FaceMatcher};
use crate::model::{AttendanceRecord, AttendanceStatus, FacePayload, UserProfile};
use crate::store::RecordStore;

/// Where a scanning session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Not scanning; captured frames are ignored.
    #[default]
    Idle,
    /// Waiting for a frame that matches a registered profile.
    Scanning,
    /// A profile was recognized. `record` is `None` only if the profile
    /// vanished between matching and marking.
    Recognized {
        /// The recognized profile.
        user: UserProfile,
        /// Today's record after marking.
        record: Option<AttendanceRecord>,
    },
    /// A simulated recognition found no registered profiles.
    NoUsersRegistered,
}

/// The outcome of one recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    /// The recognized profile.
    pub user: UserProfile,
    /// Today's record after marking.
    pub record: Option<AttendanceRecord>,
}

/// Turns match events into attendance marks.
#[derive(Debug)]
pub struct AttendanceRecorder<M = ExactMatcher> {
    matcher: M,
    state: ScanState,
}

impl AttendanceRecorder {
    /// Create an idle recorder using exact payload matching.
    #[must_use]
    pub fn new() -> Self {
        Self::with_matcher(ExactMatcher)
    }
}

impl Default for AttendanceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: FaceMatcher> AttendanceRecorder<M> {
    /// Create an idle recorder using `matcher`.
    #[must_use]
    pub fn with_matcher(matcher: M) -> Self {
        Self {
            matcher,
            state: ScanState::Idle,
        }
    }

    /// The current session state.
    #[must_use]
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Check if frames are currently being considered.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    /// Begin a new session, discarding any previous result.
    pub fn start(&mut self) {
        self.state = ScanState::Scanning;
    }

    /// Return to idle, discarding any previous result.
    pub fn reset(&mut self) {
        self.state = ScanState::Idle;
    }

    /// Mark `user` present for today.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the mark.
    pub fn record_match(
        &self,
        store: &mut RecordStore,
        user: &UserProfile,
    ) -> Result<Option<AttendanceRecord>> {
        let record = store.mark_attendance(&user.id, AttendanceStatus::Present)?;
        match &record {
            Some(record) => info!(
                user_id = %user.id,
                name = %user.name,
                record_id = %record.id,
                "attendance marked"
            ),
            None => warn!(user_id = %user.id, "matched user no longer registered"),
        }
        Ok(record)
    }

    /// Consider one captured frame.
    ///
    /// Frames are ignored unless the session is scanning. On the first match
    /// the session leaves the scanning state, so later frames are ignored
    /// too, and the matched user is marked present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the mark. The session
    /// still records the recognition.
    pub fn handle_capture(
        &mut self,
        store: &mut RecordStore,
        payload: &FacePayload,
    ) -> Result<Option<Recognition>> {
        if !self.is_scanning() {
            return Ok(None);
        }
        let Some(user) = store.find_user_with(&self.matcher, payload) else {
            return Ok(None);
        };
        info!(user_id = %user.id, name = %user.name, "face recognized");
        self.finish(store, user).map(Some)
    }

    /// Treat the first registered user as recognized.
    ///
    /// Ends the session with [`ScanState::NoUsersRegistered`] when the store
    /// has no profiles. Does nothing unless scanning.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the mark.
    pub fn simulate_recognition(&mut self, store: &mut RecordStore) -> Result<Option<Recognition>> {
        if !self.is_scanning() {
            return Ok(None);
        }
        let Some(user) = store.list_users().into_iter().next() else {
            warn!("no users registered; register at least one user before scanning");
            self.state = ScanState::NoUsersRegistered;
            return Ok(None);
        };
        info!(user_id = %user.id, name = %user.name, "simulated recognition");
        self.finish(store, user).map(Some)
    }

    fn finish(&mut self, store: &mut RecordStore, user: UserProfile) -> Result<Recognition> {
        self.state = ScanState::Recognized {
            user: user.clone(),
            record: None,
        };
        let record = self.record_match(store, &user)?;
        self.state = ScanState::Recognized {
            user: user.clone(),
            record: record.clone(),
        };
        Ok(Recognition { user, record })
    }
}
