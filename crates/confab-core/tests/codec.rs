//! Property tests for the entity key codec.

use confab_core::{EntityKey, EntityKind, KeyId, PathElement};
use proptest::prelude::*;

fn key_id() -> impl Strategy<Value = KeyId> {
    prop_oneof![
        "[a-zA-Z0-9._-]{1,24}".prop_map(KeyId::Name),
        (1u64..=u64::MAX).prop_map(KeyId::Numeric),
    ]
}

fn entity_kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![Just(EntityKind::Profile), Just(EntityKind::Conference)]
}

fn entity_key() -> impl Strategy<Value = EntityKey> {
    prop::collection::vec(
        (entity_kind(), key_id()).prop_map(|(kind, id)| PathElement { kind, id }),
        1..=4,
    )
    .prop_map(|path| EntityKey::from_path(path).expect("non-empty path"))
}

proptest! {
    #[test]
    fn decode_encode_roundtrip(key in entity_key()) {
        let encoded = key.encode();
        let decoded = EntityKey::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, key);
    }

    #[test]
    fn encoding_is_deterministic(key in entity_key()) {
        prop_assert_eq!(key.encode(), key.clone().encode());
    }

    #[test]
    fn decode_rejects_arbitrary_hex(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let input = hex::encode(&bytes);
        // Either it fails, or the input happened to be a canonical key and
        // must round-trip exactly.
        if let Ok(key) = EntityKey::decode(&input) {
            prop_assert_eq!(key.encode(), input);
        }
    }
}
