use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;

/// Identifiers carried by Cucumber messages.
///
/// Producers mint these (usually UUIDs or counters). We never parse them,
/// we only compare and index by them, so each is a transparent string
/// newtype that can be looked up by `&str`.
macro_rules! message_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

message_id!(
    /// Id of a Gherkin AST node: step, scenario, background, rule, examples or table row.
    AstNodeId
);
message_id!(PickleId);
message_id!(PickleStepId);
message_id!(TestCaseId);
message_id!(TestStepId);
message_id!(TestCaseStartedId);
message_id!(StepDefinitionId);
message_id!(HookId);

/// Report-local anchor for headings.
///
/// Derived from stable parts (document uri, AST node id) so that links into a
/// report survive re-rendering the same message stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub String);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hex characters kept from the digest. Short enough to read, long enough
/// that collisions inside one report are not a concern.
const ANCHOR_HEX_LEN: usize = 12;

impl AnchorId {
    pub fn from_parts(parts: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut hex = hash_hex(parts);
        hex.truncate(ANCHOR_HEX_LEN);
        Self(format!("pv-{hex}"))
    }
}

fn hash_hex(parts: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let mut hasher = Sha256::new();
    for (i, p) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(p.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn anchor_is_deterministic() {
        let a = AnchorId::from_parts(["features/flight.feature", "scenario-1"]);
        let b = AnchorId::from_parts(["features/flight.feature", "scenario-1"]);
        assert_eq!(a, b);
        assert!(a.0.starts_with("pv-"));
        assert_eq!(a.0.len(), 3 + ANCHOR_HEX_LEN);
    }

    #[test]
    fn anchor_separates_parts() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = AnchorId::from_parts(["ab", "c"]);
        let b = AnchorId::from_parts(["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn ids_index_by_str() {
        let mut map: HashMap<PickleStepId, u32> = HashMap::new();
        map.insert(PickleStepId::new("ps-1"), 7);
        assert_eq!(map.get("ps-1"), Some(&7));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = TestStepId::from("ts-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ts-9\"");
        let back: TestStepId = serde_json::from_str("\"ts-9\"").unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn anchor_has_fixed_shape(parts in prop::collection::vec("[ -~]{0,40}", 0..5)) {
            let a = AnchorId::from_parts(&parts);
            prop_assert_eq!(a.0.len(), 3 + ANCHOR_HEX_LEN);
            prop_assert!(a.0[3..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
