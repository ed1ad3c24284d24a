use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A raw key/value metric. Values are stored as text regardless of their source type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: String,
}

impl Metric {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Display) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_stringified() {
        assert_eq!(Metric::new("score", 42).value, "42");
        assert_eq!(Metric::new("ratio", 0.5).value, "0.5");
        assert_eq!(Metric::new("hint_used", true).value, "true");
        assert_eq!(Metric::new("mode", "hard").value, "hard");
    }
}
