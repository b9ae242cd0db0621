//! The record store.
//!
//! [`RecordStore`] owns every user profile and attendance record. It is an
//! explicitly constructed object with an injected persistence backend, clock
//! and time zone; callers only ever receive cloned snapshots.
//!
//! Every mutation rewrites both collections wholesale into two slots of the
//! backend. Loading is forgiving: missing slots mean empty collections, and
//! unreadable or corrupt slots are logged and treated as missing.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock, Zone};
use crate::error::Result;
use crate::matcher::{ExactMatcher, FaceMatcher};
use crate::model::{
    new_id, AttendanceRecord, AttendanceStatus, FacePayload, NewUser, UserProfile, UserUpdate,
};
use crate::storage::{KeyValueStore, MemoryStore};

/// Slot holding the serialized user profiles.
pub const USERS_SLOT: &str = "smilecheck_users";

/// Slot holding the serialized attendance records.
pub const ATTENDANCE_SLOT: &str = "smilecheck_attendance";

/// In-process store of user profiles and attendance records.
#[derive(Debug)]
pub struct RecordStore {
    backend: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    zone: Zone,
    users: Vec<UserProfile>,
    attendance: Vec<AttendanceRecord>,
}

impl RecordStore {
    /// Load a store from `backend`, using the system clock and local time.
    #[must_use]
    pub fn open(backend: impl KeyValueStore + 'static) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock), Zone::Local)
    }

    /// Load a store with an explicit clock and calendar zone.
    #[must_use]
    pub fn with_clock(
        backend: impl KeyValueStore + 'static,
        clock: Arc<dyn Clock>,
        zone: Zone,
    ) -> Self {
        let backend: Box<dyn KeyValueStore> = Box::new(backend);
        let (users, attendance) = load_collections(backend.as_ref());
        info!(
            location = %backend.location(),
            users = users.len(),
            records = attendance.len(),
            %zone,
            "record store loaded"
        );
        Self {
            backend,
            clock,
            zone,
            users,
            attendance,
        }
    }

    /// An empty store backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(MemoryStore::new())
    }

    /// The calendar zone used to decide "today".
    #[must_use]
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// The current instant according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the store's zone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.zone.date_of(self.clock.now())
    }

    /// Where the backend keeps its slots.
    #[must_use]
    pub fn location(&self) -> String {
        self.backend.location()
    }

    // === Users ===

    /// All profiles in insertion order.
    #[must_use]
    pub fn list_users(&self) -> Vec<UserProfile> {
        self.users.clone()
    }

    /// Look up a profile by id.
    #[must_use]
    pub fn get_user(&self, id: &str) -> Option<UserProfile> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    /// Look up a profile by exact email address.
    #[must_use]
    pub fn find_user_by_email(&self, email: &str) -> Option<UserProfile> {
        self.users.iter().find(|u| u.email == email).cloned()
    }

    /// Register a new profile.
    ///
    /// Assigns a fresh id and creation timestamp, then persists. Email
    /// uniqueness is not checked here; see
    /// [`registration::register`](crate::registration::register).
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails. The profile stays in memory.
    pub fn add_user(&mut self, user: NewUser) -> Result<UserProfile> {
        let mut id = new_id();
        while self.users.iter().any(|u| u.id == id) {
            id = new_id();
        }

        let profile = UserProfile {
            id,
            name: user.name,
            email: user.email,
            department: user.department,
            face: user.face,
            created_at: self.clock.now_millis(),
        };
        debug!(
            user_id = %profile.id,
            fingerprint = %profile.face.short_fingerprint(),
            "adding user"
        );
        self.users.push(profile.clone());
        self.persist()?;
        Ok(profile)
    }

    /// Merge `update` into the profile with `id`.
    ///
    /// Returns `None` without persisting if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn update_user(&mut self, id: &str, update: UserUpdate) -> Result<Option<UserProfile>> {
        let Some(profile) = self.users.iter_mut().find(|u| u.id == id) else {
            debug!(user_id = id, "update for unknown user");
            return Ok(None);
        };
        update.apply_to(profile);
        let updated = profile.clone();
        self.persist()?;
        Ok(Some(updated))
    }

    /// Remove a profile and every attendance record that references it.
    ///
    /// Returns `false` without persisting if no profile had that id.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn delete_user(&mut self, id: &str) -> Result<bool> {
        let before = self.users.len();
        self.users.retain(|u| u.id != id);
        if self.users.len() == before {
            return Ok(false);
        }

        let records_before = self.attendance.len();
        self.attendance.retain(|r| r.user_id != id);
        info!(
            user_id = id,
            records_removed = records_before - self.attendance.len(),
            "user deleted"
        );
        self.persist()?;
        Ok(true)
    }

    // === Attendance ===

    /// All attendance records in insertion order.
    #[must_use]
    pub fn list_attendance(&self) -> Vec<AttendanceRecord> {
        self.attendance.clone()
    }

    /// Records belonging to one user.
    #[must_use]
    pub fn attendance_for_user(&self, user_id: &str) -> Vec<AttendanceRecord> {
        self.attendance
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Records whose timestamp falls on `date` in the store's zone.
    ///
    /// Timestamps carry millisecond precision, so this is the inclusive
    /// window `[00:00:00.000, 23:59:59.999]` of that day.
    #[must_use]
    pub fn attendance_on_date(&self, date: NaiveDate) -> Vec<AttendanceRecord> {
        self.attendance
            .iter()
            .filter(|r| self.zone.date_of(r.timestamp) == date)
            .cloned()
            .collect()
    }

    /// Mark `user_id` with `status` for today.
    ///
    /// Overwrites the status and timestamp of today's record if one exists,
    /// otherwise appends a new record. Returns `None` and changes nothing if
    /// the user is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn mark_attendance(
        &mut self,
        user_id: &str,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>> {
        if !self.users.iter().any(|u| u.id == user_id) {
            debug!(user_id, "mark for unknown user");
            return Ok(None);
        }

        let now = self.clock.now_millis();
        let today = self.zone.date_of(now);
        let position = self
            .attendance
            .iter()
            .position(|r| r.user_id == user_id && self.zone.date_of(r.timestamp) == today);

        let record = if let Some(index) = position {
            let existing = &mut self.attendance[index];
            existing.status = status;
            existing.timestamp = now;
            debug!(record_id = %existing.id, %status, "attendance overwritten");
            existing.clone()
        } else {
            let record = AttendanceRecord {
                id: new_id(),
                user_id: user_id.to_string(),
                timestamp: now,
                status,
            };
            debug!(record_id = %record.id, %status, "attendance created");
            self.attendance.push(record.clone());
            record
        };

        self.persist()?;
        Ok(Some(record))
    }

    // === Matching ===

    /// The first profile whose face payload equals `payload` byte for byte.
    #[must_use]
    pub fn find_user_by_face(&self, payload: &FacePayload) -> Option<UserProfile> {
        self.find_user_with(&ExactMatcher, payload)
    }

    /// Run an arbitrary matcher over the registered profiles.
    #[must_use]
    pub fn find_user_with(
        &self,
        matcher: &dyn FaceMatcher,
        payload: &FacePayload,
    ) -> Option<UserProfile> {
        matcher.find(&self.users, payload).cloned()
    }

    // === Housekeeping ===

    /// Summary counts for status output.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_users: self.users.len(),
            total_records: self.attendance.len(),
            oldest_record: self.attendance.iter().map(|r| r.timestamp).min(),
            newest_record: self.attendance.iter().map(|r| r.timestamp).max(),
        }
    }

    /// Write both collections to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn persist(&mut self) -> Result<()> {
        let users = serde_json::to_string(&self.users)?;
        let attendance = serde_json::to_string(&self.attendance)?;
        self.backend
            .set_all(&[(USERS_SLOT, &users), (ATTENDANCE_SLOT, &attendance)])?;
        debug!(
            users = self.users.len(),
            records = self.attendance.len(),
            "record store persisted"
        );
        Ok(())
    }
}

/// Statistics about the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of registered profiles.
    pub total_users: usize,
    /// Number of attendance records.
    pub total_records: usize,
    /// Timestamp of the oldest record.
    pub oldest_record: Option<DateTime<Utc>>,
    /// Timestamp of the newest record.
    pub newest_record: Option<DateTime<Utc>>,
}

fn load_collections(backend: &dyn KeyValueStore) -> (Vec<UserProfile>, Vec<AttendanceRecord>) {
    let loaded = read_slot::<UserProfile>(backend, USERS_SLOT).and_then(|users| {
        read_slot::<AttendanceRecord>(backend, ATTENDANCE_SLOT).map(|records| (users, records))
    });
    match loaded {
        Ok(collections) => collections,
        Err(e) => {
            warn!("Error loading stored records, starting empty: {e}");
            (Vec::new(), Vec::new())
        }
    }
}

fn read_slot<T: DeserializeOwned>(backend: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    match backend.get(key)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn create_test_store() -> (RecordStore, Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(morning()));
        let backend = MemoryStore::new();
        let store = RecordStore::with_clock(backend.clone(), clock.clone(), Zone::utc());
        (store, clock, backend)
    }

    fn new_user(name: &str, face: &[u8]) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            department: "Engineering".to_string(),
            face: FacePayload::from(face),
        }
    }

    #[test]
    fn test_empty_store() {
        let store = RecordStore::in_memory();
        assert!(store.list_users().is_empty());
        assert!(store.list_attendance().is_empty());
        assert_eq!(store.location(), ":memory:");
    }

    #[test]
    fn test_add_user_assigns_id_and_timestamp() {
        let (mut store, _, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"ada")).unwrap();

        assert!(!ada.id.is_empty());
        assert_eq!(ada.created_at, morning());
        assert_eq!(store.get_user(&ada.id), Some(ada));
    }

    #[test]
    fn test_ids_are_unique() {
        let (mut store, _, _) = create_test_store();
        let mut ids = std::collections::HashSet::new();
        for i in 0..50 {
            let user = store.add_user(new_user(&format!("U{i}"), b"x")).unwrap();
            assert!(ids.insert(user.id));
        }
    }

    #[test]
    fn test_list_users_keeps_insertion_order() {
        let (mut store, _, _) = create_test_store();
        store.add_user(new_user("Ada", b"a")).unwrap();
        store.add_user(new_user("Grace", b"g")).unwrap();
        store.add_user(new_user("Linus", b"l")).unwrap();

        let names: Vec<String> = store.list_users().into_iter().map(|u| u.name).collect();
        assert_eq!(names, ["Ada", "Grace", "Linus"]);
    }

    #[test]
    fn test_add_user_allows_duplicate_email() {
        let (mut store, _, _) = create_test_store();
        store.add_user(new_user("Ada", b"a")).unwrap();
        store.add_user(new_user("Ada", b"b")).unwrap();
        assert_eq!(store.list_users().len(), 2);
    }

    #[test]
    fn test_snapshots_are_detached() {
        let (mut store, _, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();

        let mut snapshot = store.list_users();
        snapshot[0].name = "Mallory".to_string();
        snapshot.clear();

        assert_eq!(store.get_user(&ada.id).unwrap().name, "Ada");
    }

    #[test]
    fn test_update_user_merges_fields() {
        let (mut store, _, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();

        let updated = store
            .update_user(
                &ada.id,
                UserUpdate {
                    email: Some("countess@example.com".to_string()),
                    ..UserUpdate::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.email, "countess@example.com");
        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.id, ada.id);
        assert_eq!(updated.created_at, ada.created_at);
        assert_eq!(store.get_user(&ada.id), Some(updated));
    }

    #[test]
    fn test_update_unknown_user() {
        let (mut store, _, backend) = create_test_store();
        let result = store
            .update_user(
                "missing",
                UserUpdate {
                    name: Some("x".to_string()),
                    ..UserUpdate::default()
                },
            )
            .unwrap();
        assert!(result.is_none());
        assert!(backend.is_empty().unwrap());
    }

    #[test]
    fn test_mark_unknown_user_mutates_nothing() {
        let (mut store, _, backend) = create_test_store();
        store.add_user(new_user("Ada", b"a")).unwrap();
        let before = backend.get(ATTENDANCE_SLOT).unwrap();

        let result = store
            .mark_attendance("nobody", AttendanceStatus::Present)
            .unwrap();

        assert!(result.is_none());
        assert!(store.list_attendance().is_empty());
        assert_eq!(backend.get(ATTENDANCE_SLOT).unwrap(), before);
    }

    #[test]
    fn test_mark_twice_same_day_overwrites() {
        let (mut store, clock, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();

        let first = store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap()
            .unwrap();
        clock.advance(Duration::hours(3));
        let second = store
            .mark_attendance(&ada.id, AttendanceStatus::Late)
            .unwrap()
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, AttendanceStatus::Late);
        assert_eq!(second.timestamp, morning() + Duration::hours(3));

        let records = store.attendance_for_user(&ada.id);
        assert_eq!(records, vec![second]);
    }

    #[test]
    fn test_mark_on_different_days_creates_two_records() {
        let (mut store, clock, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();

        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();
        clock.advance(Duration::days(1));
        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();

        let records = store.attendance_for_user(&ada.id);
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn test_day_boundary_follows_zone() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 21, 30, 0).unwrap(),
        ));
        let mut store = RecordStore::with_clock(
            MemoryStore::new(),
            clock.clone(),
            Zone::parse("+03:00").unwrap(),
        );
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();

        // 21:30Z is already 00:30 on the 5th at +03:00.
        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();
        clock.advance(Duration::hours(2));
        store
            .mark_attendance(&ada.id, AttendanceStatus::Late)
            .unwrap();

        assert_eq!(store.attendance_for_user(&ada.id).len(), 1);
        assert_eq!(store.today(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_attendance_on_date_boundaries() {
        let (mut store, clock, _) = create_test_store();
        let users: Vec<UserProfile> = (0..4)
            .map(|i| store.add_user(new_user(&format!("U{i}"), b"x")).unwrap())
            .collect();

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        let stamps = [
            start - Duration::milliseconds(1),
            start,
            end,
            end + Duration::milliseconds(1),
        ];

        for (user, at) in users.iter().zip(stamps) {
            clock.set(at);
            store
                .mark_attendance(&user.id, AttendanceStatus::Present)
                .unwrap();
        }

        let on_day: Vec<String> = store
            .attendance_on_date(day)
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(on_day, vec![users[1].id.clone(), users[2].id.clone()]);
    }

    #[test]
    fn test_delete_user_cascades() {
        let (mut store, _, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();
        let grace = store.add_user(new_user("Grace", b"g")).unwrap();
        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();
        let kept = store
            .mark_attendance(&grace.id, AttendanceStatus::Late)
            .unwrap()
            .unwrap();

        assert!(store.delete_user(&ada.id).unwrap());

        assert!(store.get_user(&ada.id).is_none());
        assert!(store.attendance_for_user(&ada.id).is_empty());
        assert_eq!(store.list_attendance(), vec![kept]);
        assert!(store.get_user(&grace.id).is_some());
    }

    #[test]
    fn test_delete_unknown_user() {
        let (mut store, _, _) = create_test_store();
        store.add_user(new_user("Ada", b"a")).unwrap();
        assert!(!store.delete_user("missing").unwrap());
        assert_eq!(store.list_users().len(), 1);
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let (mut store, clock, backend) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"\x00\xffraw")).unwrap();
        let grace = store.add_user(new_user("Grace", b"g")).unwrap();
        clock.advance(Duration::milliseconds(1234));
        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();
        store
            .mark_attendance(&grace.id, AttendanceStatus::Late)
            .unwrap();

        let reloaded = RecordStore::with_clock(backend, clock, Zone::utc());
        assert_eq!(reloaded.list_users(), store.list_users());
        assert_eq!(reloaded.list_attendance(), store.list_attendance());
    }

    #[test]
    fn test_corrupt_users_slot_falls_back_to_empty() {
        crate::logging::init_test_logging();
        let backend = MemoryStore::with_slots([
            (USERS_SLOT, "{not json"),
            (ATTENDANCE_SLOT, "[]"),
        ]);
        let store = RecordStore::open(backend);
        assert!(store.list_users().is_empty());
        assert!(store.list_attendance().is_empty());
    }

    #[test]
    fn test_corrupt_attendance_slot_empties_both() {
        crate::logging::init_test_logging();
        let (mut store, _, backend) = create_test_store();
        store.add_user(new_user("Ada", b"a")).unwrap();
        let mut writer = backend.clone();
        writer
            .set(ATTENDANCE_SLOT, r#"[{"id":"r","userId":"u","timestamp":"yesterday","status":"present"}]"#)
            .unwrap();

        let reloaded = RecordStore::open(backend);
        assert!(reloaded.list_users().is_empty());
        assert!(reloaded.list_attendance().is_empty());
    }

    #[test]
    fn test_loads_iso_timestamps() {
        let users = r#"[{"id":"u1","name":"Ada","email":"ada@example.com","department":"Eng","faceData":"YWRh","createdAt":"2024-03-01T08:15:30.250Z"}]"#;
        let records = r#"[{"id":"r1","userId":"u1","timestamp":"2024-03-04T09:00:00.000Z","status":"late"}]"#;
        let store = RecordStore::open(MemoryStore::with_slots([
            (USERS_SLOT, users),
            (ATTENDANCE_SLOT, records),
        ]));

        let ada = store.get_user("u1").unwrap();
        assert_eq!(
            ada.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 30).unwrap() + Duration::milliseconds(250)
        );
        assert_eq!(ada.face, FacePayload::from(&b"ada"[..]));
        assert_eq!(store.list_attendance()[0].status, AttendanceStatus::Late);
    }

    #[test]
    fn test_find_user_by_face() {
        let (mut store, _, _) = create_test_store();
        store.add_user(new_user("Ada", b"face-ada")).unwrap();
        let grace = store.add_user(new_user("Grace", b"face-grace")).unwrap();

        assert_eq!(
            store.find_user_by_face(&FacePayload::from(&b"face-grace"[..])),
            Some(grace)
        );
        assert!(store
            .find_user_by_face(&FacePayload::from(&b"face-gra"[..]))
            .is_none());
        assert!(store
            .find_user_by_face(&FacePayload::from(&b"unknown"[..]))
            .is_none());
    }

    #[test]
    fn test_find_user_by_email() {
        let (mut store, _, _) = create_test_store();
        let ada = store.add_user(new_user("Ada", b"a")).unwrap();
        assert_eq!(store.find_user_by_email("ada@example.com"), Some(ada));
        assert!(store.find_user_by_email("ADA@example.com").is_none());
    }

    #[test]
    fn test_stats() {
        let (mut store, clock, _) = create_test_store();
        assert_eq!(store.stats().total_records, 0);
        assert!(store.stats().oldest_record.is_none());

        let ada = store.add_user(new_user("Ada", b"a")).unwrap();
        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();
        clock.advance(Duration::days(2));
        store
            .mark_attendance(&ada.id, AttendanceStatus::Present)
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.oldest_record, Some(morning()));
        assert_eq!(stats.newest_record, Some(morning() + Duration::days(2)));
    }

    #[test]
    fn test_every_mutation_writes_both_slots() {
        let (mut store, _, backend) = create_test_store();
        store.add_user(new_user("Ada", b"a")).unwrap();

        assert!(backend.get(USERS_SLOT).unwrap().is_some());
        assert_eq!(backend.get(ATTENDANCE_SLOT).unwrap().as_deref(), Some("[]"));
    }
}
