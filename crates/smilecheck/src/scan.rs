//! The scanning loop.
//!
//! While a session is scanning, a frame is captured on a fixed interval and
//! handed to the recorder. In demo mode a one-shot timer also fires a
//! simulated recognition. Both timers live inside [`run_scan`] and are
//! dropped with it; after a [`ScanHandle`] stop has been observed no frame
//! is captured and nothing is marked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::camera::{CameraGuard, FrameSource};
use crate::error::Result;
use crate::matcher::FaceMatcher;
use crate::model::{AttendanceRecord, UserProfile};
use crate::recorder::{AttendanceRecorder, Recognition, ScanState};
use crate::store::RecordStore;

/// Timing of a scanning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Interval between captured frames.
    pub capture_interval: Duration,
    /// Delay before a simulated recognition, if enabled.
    pub simulate_after: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            capture_interval: Duration::from_millis(2000),
            simulate_after: None,
        }
    }
}

/// How a scanning session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A profile was recognized and marked.
    Recognized {
        /// The recognized profile.
        user: UserProfile,
        /// Today's record after marking.
        record: Option<AttendanceRecord>,
    },
    /// A simulated recognition found no registered profiles.
    NoUsersRegistered,
    /// The session was stopped before anything was recognized.
    Cancelled,
}

impl From<Recognition> for ScanOutcome {
    fn from(recognition: Recognition) -> Self {
        Self::Recognized {
            user: recognition.user,
            record: recognition.record,
        }
    }
}

/// A cloneable handle that stops a running scan.
#[derive(Debug, Clone, Default)]
pub struct ScanHandle {
    stop_signal: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ScanHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the scan to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Clear the stop signal so the handle can drive another scan.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    async fn stopped(&self) {
        while !self.should_stop() {
            self.wake.notified().await;
        }
    }
}

/// Run one scanning session to completion.
///
/// Acquires `source` for the duration of the session and releases it on
/// every exit path, including errors. The recorder is started on entry; it
/// is reset to idle if the session is cancelled.
///
/// # Errors
///
/// Returns an error if the camera cannot be acquired, a frame cannot be
/// captured, or a mark cannot be persisted.
pub async fn run_scan<M: FaceMatcher>(
    store: &mut RecordStore,
    recorder: &mut AttendanceRecorder<M>,
    source: &mut dyn FrameSource,
    options: &ScanOptions,
    handle: &ScanHandle,
) -> Result<ScanOutcome> {
    if handle.should_stop() {
        return Ok(ScanOutcome::Cancelled);
    }

    let mut camera = CameraGuard::acquire(source)?;
    recorder.start();
    info!(
        source = camera.name(),
        interval_ms = u64::try_from(options.capture_interval.as_millis()).unwrap_or(u64::MAX),
        simulated = options.simulate_after.is_some(),
        "scanning started"
    );

    let mut ticker = interval_at(
        Instant::now() + options.capture_interval,
        options.capture_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let simulate_after = options.simulate_after;
    let simulation = async move {
        match simulate_after {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(simulation);
    let mut simulation_fired = false;

    loop {
        tokio::select! {
            biased;

            () = handle.stopped() => {
                info!("scanning cancelled");
                recorder.reset();
                return Ok(ScanOutcome::Cancelled);
            }

            () = &mut simulation, if !simulation_fired => {
                simulation_fired = true;
                if handle.should_stop() {
                    recorder.reset();
                    return Ok(ScanOutcome::Cancelled);
                }
                if let Some(recognition) = recorder.simulate_recognition(store)? {
                    return Ok(recognition.into());
                }
                if recorder.state() == &ScanState::NoUsersRegistered {
                    return Ok(ScanOutcome::NoUsersRegistered);
                }
            }

            _ = ticker.tick() => {
                if handle.should_stop() {
                    recorder.reset();
                    return Ok(ScanOutcome::Cancelled);
                }
                let frame = camera.snapshot()?;
                if let Some(recognition) = recorder.handle_capture(store, &frame)? {
                    return Ok(recognition.into());
                }
                debug!(fingerprint = %frame.short_fingerprint(), "no match");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::ReplaySource;
    use crate::model::{FacePayload, NewUser};

    fn fast() -> ScanOptions {
        ScanOptions {
            capture_interval: Duration::from_millis(5),
            simulate_after: None,
        }
    }

    fn store_with_user(face: &[u8]) -> (RecordStore, UserProfile) {
        let mut store = RecordStore::in_memory();
        let user = store
            .add_user(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                department: "Engineering".to_string(),
                face: FacePayload::from(face),
            })
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_matching_frame_marks_once() {
        let (mut store, ada) = store_with_user(b"ada");
        let mut recorder = AttendanceRecorder::new();
        let mut source = ReplaySource::from_frames(vec![
            FacePayload::from(&b"stranger"[..]),
            FacePayload::from(&b"ada"[..]),
        ]);

        let outcome = run_scan(
            &mut store,
            &mut recorder,
            &mut source,
            &fast(),
            &ScanHandle::new(),
        )
        .await
        .unwrap();

        match outcome {
            ScanOutcome::Recognized { user, record } => {
                assert_eq!(user, ada);
                assert!(record.is_some());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(source.frames_taken(), 2);
        assert!(!source.is_active());
        assert_eq!(store.list_attendance().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let (mut store, _) = store_with_user(b"ada");
        let mut recorder = AttendanceRecorder::new();
        let mut source = ReplaySource::from_frames(vec![FacePayload::from(&b"ada"[..])]);
        let handle = ScanHandle::new();
        handle.stop();

        let outcome = run_scan(&mut store, &mut recorder, &mut source, &fast(), &handle)
            .await
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(source.frames_taken(), 0);
        assert!(store.list_attendance().is_empty());
    }

    #[tokio::test]
    async fn test_stop_while_scanning() {
        let (mut store, _) = store_with_user(b"ada");
        let mut recorder = AttendanceRecorder::new();
        let mut source = ReplaySource::from_frames(vec![FacePayload::from(&b"stranger"[..])]);
        let handle = ScanHandle::new();

        let stopper = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            stopper.stop();
        });

        let outcome = run_scan(&mut store, &mut recorder, &mut source, &fast(), &handle)
            .await
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(recorder.state(), &ScanState::Idle);
        assert!(!source.is_active());
        assert!(store.list_attendance().is_empty());
    }

    #[tokio::test]
    async fn test_simulated_recognition() {
        let (mut store, ada) = store_with_user(b"ada");
        let mut recorder = AttendanceRecorder::new();
        let mut source = ReplaySource::from_frames(vec![FacePayload::from(&b"stranger"[..])]);
        let options = ScanOptions {
            capture_interval: Duration::from_secs(60),
            simulate_after: Some(Duration::from_millis(5)),
        };

        let outcome = run_scan(
            &mut store,
            &mut recorder,
            &mut source,
            &options,
            &ScanHandle::new(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ScanOutcome::Recognized { ref user, .. } if *user == ada));
        assert_eq!(source.frames_taken(), 0);
    }

    #[tokio::test]
    async fn test_simulation_without_users() {
        let mut store = RecordStore::in_memory();
        let mut recorder = AttendanceRecorder::new();
        let mut source = ReplaySource::from_frames(vec![FacePayload::from(&b"x"[..])]);
        let options = ScanOptions {
            capture_interval: Duration::from_secs(60),
            simulate_after: Some(Duration::from_millis(5)),
        };

        let outcome = run_scan(
            &mut store,
            &mut recorder,
            &mut source,
            &options,
            &ScanHandle::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ScanOutcome::NoUsersRegistered);
        assert!(store.list_attendance().is_empty());
    }

    #[tokio::test]
    async fn test_camera_failure_leaves_store_untouched() {
        let (mut store, _) = store_with_user(b"ada");
        let mut recorder = AttendanceRecorder::new();
        let mut source = ReplaySource::from_frames(Vec::new());

        let err = run_scan(
            &mut store,
            &mut recorder,
            &mut source,
            &fast(),
            &ScanHandle::new(),
        )
        .await
        .unwrap_err();

        assert!(err.is_camera_error());
        assert!(!recorder.is_scanning());
        assert!(store.list_attendance().is_empty());
    }

    #[test]
    fn test_handle_stop_and_reset() {
        let handle = ScanHandle::new();
        let clone = handle.clone();
        assert!(!handle.should_stop());

        handle.stop();
        assert!(clone.should_stop());

        clone.reset();
        assert!(!handle.should_stop());
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.capture_interval, Duration::from_millis(2000));
        assert!(options.simulate_after.is_none());
    }
}
