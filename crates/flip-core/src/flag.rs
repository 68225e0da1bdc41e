//! Flag value and evaluation context models
//!
//! Defines the core data structures: FlagValue, FlagChange, and Context.
//! Values are serialized untagged so they travel as plain JSON scalars.

use serde::{Deserialize, Serialize};

/// A feature flag value: boolean, string variation, or structured payload
///
/// Deserialization tries the variants in order, so a bare JSON boolean
/// becomes `Bool`, a bare string becomes `Str`, and anything else
/// (numbers, arrays, objects, null) lands in `Json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
    Json(serde_json::Value),
}

impl FlagValue {
    /// Truthiness used to pick the enable or disable action endpoint
    ///
    /// Non-empty strings and non-null payloads count as truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Str(s) => !s.is_empty(),
            FlagValue::Json(v) => match v {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Null => false,
                _ => true,
            },
        }
    }

    /// The boolean value, if this is a boolean flag
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The string variation, if this is a string flag
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Str(s) => write!(f, "{}", s),
            FlagValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        FlagValue::Bool(b)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        FlagValue::Str(s.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(s: String) -> Self {
        FlagValue::Str(s)
    }
}

/// A remote-originated change notification for one flag key
#[derive(Debug, Clone, PartialEq)]
pub struct FlagChange {
    /// Flag key that changed
    pub key: String,
    /// New value
    pub current: FlagValue,
    /// Value before the change, when the provider knows it
    pub previous: Option<FlagValue>,
}

impl FlagChange {
    pub fn new(key: impl Into<String>, current: FlagValue, previous: Option<FlagValue>) -> Self {
        Self {
            key: key.into(),
            current,
            previous,
        }
    }
}

/// Evaluation context sent to the flag service
///
/// Matches the reference deployment's user context shape: a stable key
/// plus a location used for region-based targeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Context {
    #[serde(default = "default_kind")]
    pub kind: String,
    pub key: String,
    #[serde(default = "default_location")]
    pub location: String,
}

impl Context {
    /// Context for a known user key and location
    pub fn new(key: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            kind: default_kind(),
            key: key.into(),
            location: location.into(),
        }
    }

    /// Context for a region switch
    ///
    /// Region switches re-identify with a synthetic per-region key, the
    /// way the reference deployment does.
    pub fn for_region(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            kind: default_kind(),
            key: format!("user-{}", region),
            location: region,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new("anonymous", default_location())
    }
}

fn default_kind() -> String {
    "user".to_string()
}

fn default_location() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(FlagValue::Bool(true).is_truthy());
        assert!(!FlagValue::Bool(false).is_truthy());
        assert!(FlagValue::Str("SOC 2".into()).is_truthy());
        assert!(!FlagValue::Str(String::new()).is_truthy());
        assert!(!FlagValue::Json(serde_json::Value::Null).is_truthy());
        assert!(FlagValue::Json(serde_json::json!({"tier": "pro"})).is_truthy());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(FlagValue::Bool(true).as_bool(), Some(true));
        assert_eq!(FlagValue::Str("GDPR".into()).as_str(), Some("GDPR"));
        assert_eq!(FlagValue::Bool(true).as_str(), None);
        assert_eq!(FlagValue::Str("GDPR".into()).as_bool(), None);
    }

    #[test]
    fn test_untagged_deserialization() {
        let b: FlagValue = serde_json::from_str("true").unwrap();
        assert_eq!(b, FlagValue::Bool(true));

        let s: FlagValue = serde_json::from_str("\"CCPA\"").unwrap();
        assert_eq!(s, FlagValue::Str("CCPA".to_string()));

        let j: FlagValue = serde_json::from_str("{\"limit\": 5}").unwrap();
        assert_eq!(j, FlagValue::Json(serde_json::json!({"limit": 5})));
    }

    #[test]
    fn test_serializes_as_bare_scalar() {
        let json = serde_json::to_string(&FlagValue::Bool(false)).unwrap();
        assert_eq!(json, "false");

        let json = serde_json::to_string(&FlagValue::Str("SOC 2".into())).unwrap();
        assert_eq!(json, "\"SOC 2\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(FlagValue::Bool(true).to_string(), "true");
        assert_eq!(FlagValue::Str("GDPR".into()).to_string(), "GDPR");
    }

    #[test]
    fn test_context_for_region() {
        let ctx = Context::for_region("Europe");
        assert_eq!(ctx.kind, "user");
        assert_eq!(ctx.key, "user-Europe");
        assert_eq!(ctx.location, "Europe");
    }

    #[test]
    fn test_context_serialization() {
        let ctx = Context::new("user-abc123", "California");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"kind\":\"user\""));
        assert!(json.contains("\"location\":\"California\""));

        let parsed: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ctx);
    }
}
