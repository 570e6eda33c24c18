//! Conference records and seat accounting.
//!
//! A conference is created as a child of its organizer's profile key, which
//! puts both records in one entity group and lets a registration update
//! them atomically. `seats_available` is the only field mutated after
//! creation, and only through [`Conference::book_seats`] and
//! [`Conference::release_seats`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CapacityError;
use crate::key::EntityKey;
use crate::types::UserId;

/// Caller-supplied conference attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceForm {
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub topics: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_attendees: u32,
}

/// A conference record.
///
/// Descriptive attributes are immutable once created; only the seat counter
/// changes, and the invariant `seats_available <= max_attendees` holds in
/// every reachable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    /// Store-allocated id, scoped under the organizer profile.
    id: u64,
    /// The organizer's profile key: this conference's ancestor and the
    /// root of its entity group.
    parent: EntityKey,
    /// Denormalized copy of the ancestor's id.
    organizer_user_id: UserId,
    name: String,
    description: Option<String>,
    city: Option<String>,
    topics: Vec<String>,
    /// Month of the start date (1-12), when a start date was given.
    month: Option<u32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    max_attendees: u32,
    seats_available: u32,
}

impl Conference {
    /// Build a new conference from a form, with every seat available.
    pub fn new(id: u64, organizer: UserId, form: ConferenceForm) -> Self {
        Self {
            id,
            parent: EntityKey::profile(&organizer),
            organizer_user_id: organizer,
            name: form.name,
            description: form.description,
            city: form.city,
            topics: form.topics,
            month: form.start_date.map(|d| d.month()),
            start_date: form.start_date,
            end_date: form.end_date,
            max_attendees: form.max_attendees,
            seats_available: form.max_attendees,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The organizer's profile key (entity-group root).
    pub fn parent(&self) -> &EntityKey {
        &self.parent
    }

    pub fn organizer_user_id(&self) -> &UserId {
        &self.organizer_user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn max_attendees(&self) -> u32 {
        self.max_attendees
    }

    pub fn seats_available(&self) -> u32 {
        self.seats_available
    }

    /// This conference's entity key, a descendant of its organizer's
    /// profile key.
    pub fn key(&self) -> EntityKey {
        EntityKey::conference(&self.organizer_user_id, self.id)
    }

    /// Book `n` seats.
    ///
    /// Fails without mutating when fewer than `n` seats remain, so the
    /// counter can never go negative.
    pub fn book_seats(&mut self, n: u32) -> Result<(), CapacityError> {
        if self.seats_available < n {
            return Err(CapacityError {
                requested: n,
                available: self.seats_available,
            });
        }
        self.seats_available -= n;
        Ok(())
    }

    /// Release `n` seats, saturating at `max_attendees`.
    ///
    /// The cap protects the counter against a double release.
    pub fn release_seats(&mut self, n: u32) {
        self.seats_available = self
            .seats_available
            .saturating_add(n)
            .min(self.max_attendees);
    }

    /// One-line human summary, used in confirmation notifications.
    pub fn summary(&self) -> String {
        match self.city.as_deref() {
            Some(city) => format!("{} ({}), {} seats", self.name, city, self.max_attendees),
            None => format!("{}, {} seats", self.name, self.max_attendees),
        }
    }

    /// Rebuild a conference from stored parts. For store backends.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: u64,
        organizer: UserId,
        name: String,
        description: Option<String>,
        city: Option<String>,
        topics: Vec<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        max_attendees: u32,
        seats_available: u32,
    ) -> Self {
        Self {
            id,
            parent: EntityKey::profile(&organizer),
            organizer_user_id: organizer,
            name,
            description,
            city,
            topics,
            month: start_date.map(|d| d.month()),
            start_date,
            end_date,
            max_attendees,
            seats_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(max: u32) -> ConferenceForm {
        ConferenceForm {
            name: "RustConf".to_string(),
            city: Some("Portland".to_string()),
            topics: vec!["rust".to_string()],
            start_date: NaiveDate::from_ymd_opt(2026, 9, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 12),
            max_attendees: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_starts_with_all_seats() {
        let conf = Conference::new(1, UserId::new("org"), form(25));
        assert_eq!(conf.seats_available(), 25);
        assert_eq!(conf.max_attendees(), 25);
        assert_eq!(conf.month(), Some(9));
    }

    #[test]
    fn test_key_is_descendant_of_organizer() {
        let organizer = UserId::new("org");
        let conf = Conference::new(5, organizer.clone(), form(10));
        assert_eq!(conf.key().parent(), Some(EntityKey::profile(&organizer)));
        assert_eq!(conf.parent(), &EntityKey::profile(&organizer));
    }

    #[test]
    fn test_book_seats_decrements() {
        let mut conf = Conference::new(1, UserId::new("org"), form(2));
        conf.book_seats(1).unwrap();
        assert_eq!(conf.seats_available(), 1);
        conf.book_seats(1).unwrap();
        assert_eq!(conf.seats_available(), 0);
    }

    #[test]
    fn test_book_seats_fails_when_full() {
        let mut conf = Conference::new(1, UserId::new("org"), form(1));
        conf.book_seats(1).unwrap();
        let err = conf.book_seats(1).unwrap_err();
        assert_eq!(err.requested, 1);
        assert_eq!(err.available, 0);
        // Failed booking leaves the counter untouched.
        assert_eq!(conf.seats_available(), 0);
    }

    #[test]
    fn test_release_seats_caps_at_max() {
        let mut conf = Conference::new(1, UserId::new("org"), form(3));
        conf.book_seats(1).unwrap();
        conf.release_seats(1);
        assert_eq!(conf.seats_available(), 3);
        // Double release must not exceed the cap.
        conf.release_seats(1);
        assert_eq!(conf.seats_available(), 3);
    }

    #[test]
    fn test_month_absent_without_start_date() {
        let mut f = form(5);
        f.start_date = None;
        let conf = Conference::new(1, UserId::new("org"), f);
        assert_eq!(conf.month(), None);
    }
}
