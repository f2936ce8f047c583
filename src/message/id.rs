use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Adapter-scoped handle of one message inside a folder.
///
/// Only unique within its folder and only meaningful to the adapter that produced it. The engine
/// never assumes an ordering between identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.0.fmt(f)
    }
}

impl From<u32> for MessageId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ids_display_like_strings() {
        assert_eq!(MessageId::from(42).to_string(), "42");
        assert_eq!(MessageId::from(42), MessageId::from("42"));
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&MessageId::from("a b")).unwrap();
        assert_eq!(json, "\"a b\"");
    }
}
