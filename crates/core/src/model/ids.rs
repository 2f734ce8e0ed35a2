use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Wire shape accepted for opaque identifiers.
///
/// The remote platform emits numeric ids in most payloads but string ids in
/// some (SIS-backed or sharded installations), so both forms are accepted and
/// normalized to their decimal/string representation.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Unsigned(value) => value.to_string(),
            RawId::Signed(value) => value.to_string(),
            RawId::Text(value) => value,
        }
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value.to_string())
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

opaque_id!(
    /// Identifier of the collection a report is built for (a course).
    CollectionId
);
opaque_id!(
    /// Identifier of a roster entity (a participant).
    EntityId
);
opaque_id!(
    /// Identifier of a group of work items (a module).
    GroupId
);
opaque_id!(
    /// Identifier of a single trackable item inside a group.
    LeafItemId
);
