use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id!(
    /// The opaque, process-unique identity a client presents when joining.
    OdId
);

opaque_id!(
    /// Opaque name of a map room; the only spatial partition in the system.
    MapId
);

opaque_id!(MonsterId);

opaque_id!(
    /// Server-minted ground item id. Consumable at most once.
    ItemId
);

impl MapId {
    /// Party-quest maps skip monster respawn and elite promotion.
    pub fn is_party_quest(&self) -> bool {
        self.0.starts_with("pq")
    }

    /// Maps on which neither shiny rolls nor elite promotion may happen.
    pub fn is_promotion_excluded(&self) -> bool {
        self.0.starts_with("dewdrop") || self.0.starts_with("pq")
    }
}

impl MonsterId {
    /// Builds the `m_<n>` id from the process-wide monster counter.
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("m_{seq}"))
    }
}

/// `droppedBy` sentinel carried by monster-minted ground items.
pub const MONSTER_DROPPER: &str = "__monster__";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_prefixes() {
        assert!(MapId::from("pq_stage1").is_party_quest());
        assert!(MapId::from("pq_stage1").is_promotion_excluded());
        assert!(MapId::from("dewdrop_meadow").is_promotion_excluded());
        assert!(!MapId::from("dewdrop_meadow").is_party_quest());
        assert!(!MapId::from("henesys").is_promotion_excluded());
    }

    #[test]
    fn monster_seq_format() {
        assert_eq!(MonsterId::from_seq(7).as_str(), "m_7");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = OdId::from("p_123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p_123\"");
    }
}
