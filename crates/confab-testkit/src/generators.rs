//! Proptest generators for property-based testing.

use proptest::prelude::*;

use confab_core::{
    ConferenceForm, EntityKey, Identity, ProfileForm, TeeShirtSize, UserId,
};

/// Generate a plausible user name.
pub fn user_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a UserId.
pub fn user_id() -> impl Strategy<Value = UserId> {
    user_name().prop_map(UserId::new)
}

/// Generate an identity with an email derived from the name.
pub fn identity() -> impl Strategy<Value = Identity> {
    user_name().prop_map(|name| {
        let email = format!("{}@example.com", name);
        Identity::new(name, email)
    })
}

/// Generate a tee shirt size.
pub fn tee_shirt_size() -> impl Strategy<Value = TeeShirtSize> {
    prop_oneof![
        Just(TeeShirtSize::NotSpecified),
        Just(TeeShirtSize::Xs),
        Just(TeeShirtSize::S),
        Just(TeeShirtSize::M),
        Just(TeeShirtSize::L),
        Just(TeeShirtSize::Xl),
        Just(TeeShirtSize::Xxl),
    ]
}

/// Generate a profile form with optional fields.
pub fn profile_form() -> impl Strategy<Value = ProfileForm> {
    (
        prop::option::of("[A-Za-z ]{1,24}"),
        prop::option::of(tee_shirt_size()),
    )
        .prop_map(|(display_name, tee_shirt_size)| ProfileForm {
            display_name,
            tee_shirt_size,
        })
}

/// Generate a conference form with bounded capacity.
pub fn conference_form(max_seats: u32) -> impl Strategy<Value = ConferenceForm> {
    (
        "[A-Za-z][A-Za-z0-9 ]{0,23}",
        prop::option::of("[A-Za-z ]{1,16}"),
        prop::collection::vec("[a-z]{2,10}", 0..4),
        0..=max_seats,
    )
        .prop_map(|(name, city, topics, max_attendees)| ConferenceForm {
            name,
            city,
            topics,
            max_attendees,
            ..Default::default()
        })
}

/// Generate a conference key under a random organizer.
pub fn conference_key() -> impl Strategy<Value = EntityKey> {
    (user_id(), 1u64..10_000).prop_map(|(organizer, id)| EntityKey::conference(&organizer, id))
}

/// One step of a registration workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOp {
    /// Register attendee `0..pool` for the conference.
    Register(usize),
    /// Unregister attendee `0..pool` from the conference.
    Unregister(usize),
}

/// Generate a workload of register/unregister steps over a pool of
/// attendees.
pub fn registration_ops(pool: usize, len: usize) -> impl Strategy<Value = Vec<RegistrationOp>> {
    prop::collection::vec(
        prop_oneof![
            (0..pool).prop_map(RegistrationOp::Register),
            (0..pool).prop_map(RegistrationOp::Unregister),
        ],
        0..=len,
    )
}
