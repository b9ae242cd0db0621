//! `smilecheck` - Face-matched attendance tracking
//!
//! This library keeps user profiles and per-day attendance records in a
//! persistent record store, matches captured face payloads against the
//! registered profiles, and turns matches into attendance marks.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod camera;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod recorder;
pub mod registration;
pub mod report;
pub mod scan;
pub mod storage;
pub mod store;

pub use camera::{CameraGuard, FrameSource, ReplaySource};
pub use clock::{Clock, ManualClock, SystemClock, Zone};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use matcher::{ExactMatcher, FaceMatcher};
pub use model::{
    AttendanceRecord, AttendanceStatus, FacePayload, NewUser, UserProfile, UserUpdate,
};
pub use recorder::{AttendanceRecorder, Recognition, ScanState};
pub use registration::{register, Registration};
pub use report::{AttendanceSummary, UserDashboard};
pub use scan::{run_scan, ScanHandle, ScanOptions, ScanOutcome};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use store::{RecordStore, StoreStats};
