//! Case and activity identity types.
//!
//! Cases are identified by the external case identifier string. Activities are
//! interned into dense [`ActivityId`]s by the activity index so that sequences,
//! graph nodes and action spaces can be compared without string hashing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthetic event prepended to every case.
pub const START_ACTIVITY: &str = "Start";

/// Name of the synthetic event appended to every case.
pub const END_ACTIVITY: &str = "End";

/// External case identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl CaseId {
    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CaseId {
    fn from(id: &str) -> Self {
        CaseId(id.to_string())
    }
}

impl From<String> for CaseId {
    fn from(id: String) -> Self {
        CaseId(id)
    }
}

/// Dense interned activity identifier.
///
/// Ids `0` and `1` are reserved for the `Start` and `End` boundary markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub u32);

impl ActivityId {
    /// The synthetic `Start` marker.
    pub const START: ActivityId = ActivityId(0);
    /// The synthetic `End` marker.
    pub const END: ActivityId = ActivityId(1);

    /// Whether this id is one of the two boundary markers.
    pub fn is_boundary(self) -> bool {
        self == Self::START || self == Self::END
    }

    /// Index into dense per-activity tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_ids() {
        assert!(ActivityId::START.is_boundary());
        assert!(ActivityId::END.is_boundary());
        assert!(!ActivityId(2).is_boundary());
        assert_eq!(ActivityId(7).index(), 7);
    }

    #[test]
    fn test_case_id_ordering_is_lexicographic() {
        let mut ids = vec![CaseId::from("c10"), CaseId::from("c2"), CaseId::from("c1")];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["c1", "c10", "c2"]);
    }

    #[test]
    fn test_case_id_serializes_transparently() {
        let json = serde_json::to_string(&CaseId::from("case-1")).unwrap();
        assert_eq!(json, r#""case-1""#);
    }
}
