//! Core record types for smilecheck.
//!
//! This module defines the user profiles and attendance records owned by the
//! [`RecordStore`](crate::store::RecordStore), together with the opaque face
//! payload used by the matcher. Field names serialize in camelCase so that
//! the persisted blobs keep the `faceData` / `createdAt` / `userId` shape.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Attendance status of a user for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// The user was recognized on time.
    #[default]
    Present,
    /// The user was explicitly recorded as absent.
    Absent,
    /// The user arrived late.
    Late,
}

impl AttendanceStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 3] = [Self::Present, Self::Absent, Self::Late];

    /// The lowercase name used in storage and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown attendance status: {s}"))
    }
}

/// An opaque captured face image.
///
/// Matching is byte-for-byte equality. The payload serializes as standard
/// base64 text.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct FacePayload(Vec<u8>);

impl FacePayload {
    /// Wrap raw image bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// BLAKE3 hex digest of the payload, safe to put in logs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        blake3::hash(&self.0).to_hex().to_string()
    }

    /// Abbreviated fingerprint for human-readable output.
    #[must_use]
    pub fn short_fingerprint(&self) -> String {
        let mut fingerprint = self.fingerprint();
        fingerprint.truncate(12);
        fingerprint
    }
}

impl fmt::Debug for FacePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacePayload")
            .field("len", &self.0.len())
            .field("fingerprint", &self.short_fingerprint())
            .finish()
    }
}

impl From<Vec<u8>> for FacePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for FacePayload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for FacePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for FacePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A registered identity with its face payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Opaque unique identifier assigned by the store.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address, unique across profiles by registration convention.
    pub email: String,
    /// Department or team.
    pub department: String,
    /// The captured face image used for matching.
    #[serde(rename = "faceData")]
    pub face: FacePayload,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

/// Profile fields supplied by the caller when adding a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Department or team.
    pub department: String,
    /// The captured face image.
    pub face: FacePayload,
}

/// A partial update to a profile. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New department.
    pub department: Option<String>,
    /// New face image.
    pub face: Option<FacePayload>,
}

impl UserUpdate {
    /// Check if the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.department.is_none()
            && self.face.is_none()
    }

    /// Merge the present fields into `profile`.
    pub fn apply_to(self, profile: &mut UserProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(email) = self.email {
            profile.email = email;
        }
        if let Some(department) = self.department {
            profile.department = department;
        }
        if let Some(face) = self.face {
            profile.face = face;
        }
    }
}

/// One user's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Opaque unique identifier assigned by the store.
    pub id: String,
    /// The profile this record belongs to.
    pub user_id: String,
    /// When the record was last marked.
    pub timestamp: DateTime<Utc>,
    /// Status recorded by the last mark.
    pub status: AttendanceStatus,
}

/// Generate a fresh opaque identifier.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
