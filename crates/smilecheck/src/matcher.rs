//! Mock face recognition.
//!
//! [`ExactMatcher`] stands in for a real recognizer: a captured payload
//! matches a profile only if the bytes are identical. There is no feature
//! extraction and no similarity threshold.

use tracing::trace;

use crate::model::{FacePayload, UserProfile};

/// Decides which profile, if any, a captured face payload belongs to.
pub trait FaceMatcher: Send + Sync + std::fmt::Debug {
    /// Return the matching profile from `profiles`, or `None`.
    fn find<'a>(&self, profiles: &'a [UserProfile], payload: &FacePayload)
        -> Option<&'a UserProfile>;
}

/// Byte-for-byte payload equality, first match in profile order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl FaceMatcher for ExactMatcher {
    fn find<'a>(
        &self,
        profiles: &'a [UserProfile],
        payload: &FacePayload,
    ) -> Option<&'a UserProfile> {
        let found = profiles.iter().find(|profile| profile.face == *payload);
        trace!(
            fingerprint = %payload.short_fingerprint(),
            candidates = profiles.len(),
            matched = found.is_some(),
            "exact face match"
        );
        found
    }
}
