//! User profiles and the attendance list.
//!
//! A profile is the root of its entity group. Conferences created by the
//! user hang below it; the attendance list references conferences by key,
//! in registration order.

use serde::{Deserialize, Serialize};

use crate::key::EntityKey;
use crate::types::{Identity, UserId};

/// Tee shirt size preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
}

impl TeeShirtSize {
    /// Stable string form, used for storage columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            TeeShirtSize::NotSpecified => "NOT_SPECIFIED",
            TeeShirtSize::Xs => "XS",
            TeeShirtSize::S => "S",
            TeeShirtSize::M => "M",
            TeeShirtSize::L => "L",
            TeeShirtSize::Xl => "XL",
            TeeShirtSize::Xxl => "XXL",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_SPECIFIED" => Some(TeeShirtSize::NotSpecified),
            "XS" => Some(TeeShirtSize::Xs),
            "S" => Some(TeeShirtSize::S),
            "M" => Some(TeeShirtSize::M),
            "L" => Some(TeeShirtSize::L),
            "XL" => Some(TeeShirtSize::Xl),
            "XXL" => Some(TeeShirtSize::Xxl),
            _ => None,
        }
    }
}

/// Caller-supplied profile fields. Absent fields leave the current value
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

/// A user profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identity, immutable after creation.
    user_id: UserId,
    /// Display attribute, mutable via [`Profile::update`].
    display_name: String,
    /// Immutable after creation.
    main_email: String,
    /// Mutable via [`Profile::update`].
    tee_shirt_size: TeeShirtSize,
    /// Conference keys in registration order. A key appears at most once.
    conference_keys_to_attend: Vec<EntityKey>,
}

impl Profile {
    /// Create a profile with explicit attributes and an empty attendance
    /// list.
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        main_email: impl Into<String>,
        tee_shirt_size: TeeShirtSize,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            main_email: main_email.into(),
            tee_shirt_size,
            conference_keys_to_attend: Vec::new(),
        }
    }

    /// An in-memory default profile for an identity that has never saved
    /// one. Not persisted by this call.
    ///
    /// The display name defaults to the local part of the email address,
    /// so `lemoncake@example.com` becomes `lemoncake`.
    pub fn or_default(existing: Option<Profile>, identity: &Identity) -> Profile {
        existing.unwrap_or_else(|| {
            Self::new(
                identity.user_id.clone(),
                default_display_name(&identity.email),
                identity.email.clone(),
                TeeShirtSize::NotSpecified,
            )
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn main_email(&self) -> &str {
        &self.main_email
    }

    pub fn tee_shirt_size(&self) -> TeeShirtSize {
        self.tee_shirt_size
    }

    /// This profile's entity key (an entity-group root).
    pub fn key(&self) -> EntityKey {
        EntityKey::profile(&self.user_id)
    }

    /// Conference keys the user attends, in registration order.
    pub fn conference_keys_to_attend(&self) -> &[EntityKey] {
        &self.conference_keys_to_attend
    }

    /// Whether the user is registered for the given conference.
    pub fn attends(&self, key: &EntityKey) -> bool {
        self.conference_keys_to_attend.contains(key)
    }

    /// Append a conference key to the attendance list.
    ///
    /// Returns false (and leaves the list untouched) if the key is already
    /// present, preserving the at-most-once invariant.
    pub fn add_attendance(&mut self, key: EntityKey) -> bool {
        if self.attends(&key) {
            return false;
        }
        self.conference_keys_to_attend.push(key);
        true
    }

    /// Remove a conference key from the attendance list.
    ///
    /// Returns false if the key was not present.
    pub fn remove_attendance(&mut self, key: &EntityKey) -> bool {
        let before = self.conference_keys_to_attend.len();
        self.conference_keys_to_attend.retain(|k| k != key);
        before != self.conference_keys_to_attend.len()
    }

    /// Apply the mutable fields of a form.
    ///
    /// Only fields that are present and differ from the current value are
    /// applied. Returns whether anything changed, so callers can skip a
    /// needless write. The attendance list is never touched here.
    pub fn update(&mut self, form: &ProfileForm) -> bool {
        let mut changed = false;
        if let Some(name) = &form.display_name {
            if name != &self.display_name {
                self.display_name = name.clone();
                changed = true;
            }
        }
        if let Some(size) = form.tee_shirt_size {
            if size != self.tee_shirt_size {
                self.tee_shirt_size = size;
                changed = true;
            }
        }
        changed
    }

    /// Rebuild a profile from stored parts. For store backends.
    pub fn from_parts(
        user_id: UserId,
        display_name: String,
        main_email: String,
        tee_shirt_size: TeeShirtSize,
        conference_keys_to_attend: Vec<EntityKey>,
    ) -> Self {
        Self {
            user_id,
            display_name,
            main_email,
            tee_shirt_size,
            conference_keys_to_attend,
        }
    }
}

/// The local part of an email address, before the `@`.
fn default_display_name(email: &str) -> &str {
    match email.find('@') {
        Some(at) => &email[..at],
        None => email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new("user-1", "lemoncake@example.com")
    }

    #[test]
    fn test_default_display_name_from_email() {
        let profile = Profile::or_default(None, &identity());
        assert_eq!(profile.display_name(), "lemoncake");
        assert_eq!(profile.main_email(), "lemoncake@example.com");
        assert_eq!(profile.tee_shirt_size(), TeeShirtSize::NotSpecified);
    }

    #[test]
    fn test_or_default_keeps_existing() {
        let existing = Profile::new(
            UserId::new("user-1"),
            "Lemon",
            "lemoncake@example.com",
            TeeShirtSize::M,
        );
        let profile = Profile::or_default(Some(existing.clone()), &identity());
        assert_eq!(profile, existing);
    }

    #[test]
    fn test_update_applies_only_changed_fields() {
        let mut profile = Profile::or_default(None, &identity());

        // Same values: no change reported.
        let unchanged = ProfileForm {
            display_name: Some("lemoncake".to_string()),
            tee_shirt_size: Some(TeeShirtSize::NotSpecified),
        };
        assert!(!profile.update(&unchanged));

        // Absent fields leave values alone.
        assert!(!profile.update(&ProfileForm::default()));

        let form = ProfileForm {
            display_name: None,
            tee_shirt_size: Some(TeeShirtSize::L),
        };
        assert!(profile.update(&form));
        assert_eq!(profile.display_name(), "lemoncake");
        assert_eq!(profile.tee_shirt_size(), TeeShirtSize::L);
    }

    #[test]
    fn test_attendance_at_most_once() {
        let mut profile = Profile::or_default(None, &identity());
        let key = EntityKey::conference(&UserId::new("organizer"), 1);

        assert!(profile.add_attendance(key.clone()));
        assert!(!profile.add_attendance(key.clone()));
        assert_eq!(profile.conference_keys_to_attend().len(), 1);

        assert!(profile.remove_attendance(&key));
        assert!(!profile.remove_attendance(&key));
        assert!(profile.conference_keys_to_attend().is_empty());
    }

    #[test]
    fn test_attendance_preserves_registration_order() {
        let mut profile = Profile::or_default(None, &identity());
        let org = UserId::new("organizer");
        let keys: Vec<_> = (1..=3).map(|i| EntityKey::conference(&org, i)).collect();
        for key in &keys {
            profile.add_attendance(key.clone());
        }
        assert_eq!(profile.conference_keys_to_attend(), keys.as_slice());
    }

    #[test]
    fn test_tee_shirt_size_string_roundtrip() {
        for size in [
            TeeShirtSize::NotSpecified,
            TeeShirtSize::Xs,
            TeeShirtSize::S,
            TeeShirtSize::M,
            TeeShirtSize::L,
            TeeShirtSize::Xl,
            TeeShirtSize::Xxl,
        ] {
            assert_eq!(TeeShirtSize::parse(size.as_str()), Some(size));
        }
        assert_eq!(TeeShirtSize::parse("HUGE"), None);
    }
}
