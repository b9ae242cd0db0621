//! The registration flow.
//!
//! The store accepts any profile it is given. Checks for required fields, a
//! captured face image, and email uniqueness happen here, before the store
//! is touched.

use tracing::info;

use crate::error::{Error, Result};
use crate::model::{FacePayload, NewUser, UserProfile};
use crate::store::RecordStore;

/// Registration form input as collected from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Department or team.
    pub department: String,
    /// The captured face image, if one was taken.
    pub face: Option<FacePayload>,
}

impl Registration {
    /// Check the form against the current store contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFaceImage`] if no usable image was captured,
    /// [`Error::MissingField`] for the first blank field, or
    /// [`Error::DuplicateEmail`] if the email is already registered.
    pub fn validate(&self, store: &RecordStore) -> Result<()> {
        if self.face.as_ref().map_or(true, FacePayload::is_empty) {
            return Err(Error::MissingFaceImage);
        }
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("department", &self.department),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingField { field });
            }
        }
        if store.find_user_by_email(&self.email).is_some() {
            return Err(Error::DuplicateEmail {
                email: self.email.clone(),
            });
        }
        Ok(())
    }
}

/// Validate `form` and add the profile to `store`.
///
/// # Errors
///
/// Returns a validation error without touching the store, or a persistence
/// error from [`RecordStore::add_user`].
pub fn register(store: &mut RecordStore, form: Registration) -> Result<UserProfile> {
    form.validate(store)?;
    let Registration {
        name,
        email,
        department,
        face,
    } = form;
    let face = face.ok_or(Error::MissingFaceImage)?;

    let profile = store.add_user(NewUser {
        name,
        email,
        department,
        face,
    })?;
    info!(user_id = %profile.id, name = %profile.name, "user registered");
    Ok(profile)
}
