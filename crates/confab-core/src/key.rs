//! Addressable entity keys.
//!
//! An [`EntityKey`] is the only way to reference a record from outside its
//! owning transaction. It encodes a kind, an id, and the ancestor chain that
//! places the record in its entity group. The printable form is opaque:
//! deterministic CBOR wrapped in lowercase hex, with no ordering semantics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MalformedKeyError;
use crate::types::UserId;

/// The kind of record a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A user profile, keyed by user id.
    Profile,
    /// A conference, keyed by a store-allocated numeric id under its
    /// organizer's profile.
    Conference,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Profile => write!(f, "Profile"),
            EntityKind::Conference => write!(f, "Conference"),
        }
    }
}

/// The id component of a path element: either a caller-supplied name or a
/// store-allocated numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyId {
    /// String name (profiles use the user id).
    Name(String),
    /// Numeric id (conferences use store-allocated ids).
    Numeric(u64),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Name(s) => write!(f, "{}", s),
            KeyId::Numeric(n) => write!(f, "{}", n),
        }
    }
}

/// One element of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: EntityKind,
    pub id: KeyId,
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An addressable key: a non-empty path of elements.
///
/// The last element names the entity itself; preceding elements are its
/// ancestor chain, root first. Two keys are equal iff their paths are equal.
/// Keys are stable for an entity's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    path: Vec<PathElement>,
}

impl EntityKey {
    /// Build a key from a raw path.
    ///
    /// Fails when the path is empty; everything else is a valid key.
    pub fn from_path(path: Vec<PathElement>) -> Result<Self, MalformedKeyError> {
        if path.is_empty() {
            return Err(MalformedKeyError::EmptyPath);
        }
        Ok(Self { path })
    }

    /// The key of a user's profile. Profiles are entity-group roots.
    pub fn profile(user_id: &UserId) -> Self {
        Self {
            path: vec![PathElement {
                kind: EntityKind::Profile,
                id: KeyId::Name(user_id.as_str().to_string()),
            }],
        }
    }

    /// The key of a conference: a child of its organizer's profile.
    pub fn conference(organizer: &UserId, id: u64) -> Self {
        Self {
            path: vec![
                PathElement {
                    kind: EntityKind::Profile,
                    id: KeyId::Name(organizer.as_str().to_string()),
                },
                PathElement {
                    kind: EntityKind::Conference,
                    id: KeyId::Numeric(id),
                },
            ],
        }
    }

    /// The kind of the addressed entity (last path element).
    pub fn kind(&self) -> EntityKind {
        // from_path and the constructors guarantee a non-empty path
        self.path[self.path.len() - 1].kind
    }

    /// The id of the addressed entity (last path element).
    pub fn id(&self) -> &KeyId {
        &self.path[self.path.len() - 1].id
    }

    /// The full path, root first.
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// The ancestor chain, root first (empty for a root entity).
    pub fn ancestors(&self) -> &[PathElement] {
        &self.path[..self.path.len() - 1]
    }

    /// The parent key, if the entity has an ancestor.
    pub fn parent(&self) -> Option<EntityKey> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// The root of this key's entity group.
    pub fn root(&self) -> EntityKey {
        Self {
            path: vec![self.path[0].clone()],
        }
    }

    /// View this key as a profile reference: the user id, when the key
    /// addresses a root profile.
    pub fn as_profile(&self) -> Option<UserId> {
        match self.path.as_slice() {
            [PathElement {
                kind: EntityKind::Profile,
                id: KeyId::Name(name),
            }] => Some(UserId::new(name.clone())),
            _ => None,
        }
    }

    /// View this key as a conference reference: `(organizer, id)`, when the
    /// key addresses a conference under a profile.
    pub fn as_conference(&self) -> Option<(UserId, u64)> {
        match self.path.as_slice() {
            [PathElement {
                kind: EntityKind::Profile,
                id: KeyId::Name(organizer),
            }, PathElement {
                kind: EntityKind::Conference,
                id: KeyId::Numeric(id),
            }] => Some((UserId::new(organizer.clone()), *id)),
            _ => None,
        }
    }

    /// Require the addressed entity to be of the given kind.
    pub fn expect_kind(&self, expected: EntityKind) -> Result<&Self, MalformedKeyError> {
        let got = self.kind();
        if got != expected {
            return Err(MalformedKeyError::WrongKind { expected, got });
        }
        Ok(self)
    }

    /// Encode to the opaque printable form.
    ///
    /// Deterministic: equal keys always encode to equal strings, so
    /// `decode(encode(k)) == k` for every valid key.
    pub fn encode(&self) -> String {
        let mut buf = Vec::new();
        // Serialization of a Vec<PathElement> into a fresh buffer cannot fail.
        if ciborium::into_writer(&self.path, &mut buf).is_err() {
            buf.clear();
        }
        hex::encode(buf)
    }

    /// Decode from the opaque printable form.
    pub fn decode(s: &str) -> Result<Self, MalformedKeyError> {
        let bytes = hex::decode(s)?;
        let path: Vec<PathElement> = ciborium::from_reader(bytes.as_slice())
            .map_err(|e| MalformedKeyError::Payload(e.to_string()))?;
        let key = Self::from_path(path)?;
        // A canonical key re-encodes to the exact input; anything else had
        // trailing or non-canonical bytes.
        if key.encode() != s.to_ascii_lowercase() {
            return Err(MalformedKeyError::NonCanonical);
        }
        Ok(key)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", elem)?;
        }
        Ok(())
    }
}
