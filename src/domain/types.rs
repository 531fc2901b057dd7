//! Shared domain enumerations aligned with indexed document values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Director,
    Actor,
    Writer,
}

impl PersonRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonRole::Director => "director",
            PersonRole::Actor => "actor",
            PersonRole::Writer => "writer",
        }
    }
}

/// Direction applied to the caller-supplied sort field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn is_descending(self) -> bool {
        matches!(self, SortOrder::Desc)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_role_serializes_lowercase() {
        let json = serde_json::to_string(&PersonRole::Director).expect("serialize role");
        assert_eq!(json, "\"director\"");
        assert_eq!(PersonRole::Writer.as_str(), "writer");
    }

    #[test]
    fn sort_order_round_trips_descending_flag() {
        assert!(SortOrder::from_descending(true).is_descending());
        assert_eq!(SortOrder::from_descending(false), SortOrder::Asc);
        assert_eq!(SortOrder::Desc.as_str(), "desc");
    }
}
