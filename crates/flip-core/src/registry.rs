//! Flag binding registry
//!
//! Maps each flag key to its default value and the pair of action
//! endpoints used to enable or disable the flag upstream. Built once from
//! static configuration; bindings are immutable after registration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::NotFound;
use crate::flag::FlagValue;

/// A flag binding: key, default, and the enable/disable action endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Binding {
    /// Flag key, unique per binding
    pub flag: String,
    /// Fallback value used before readiness or when the remote has no value
    #[serde(default = "default_flag_value")]
    pub default: FlagValue,
    /// Endpoint called to turn the flag on
    pub enable_url: String,
    /// Endpoint called to turn the flag off
    pub disable_url: String,
}

impl Binding {
    pub fn new(
        flag: impl Into<String>,
        default: FlagValue,
        enable_url: impl Into<String>,
        disable_url: impl Into<String>,
    ) -> Self {
        Self {
            flag: flag.into(),
            default,
            enable_url: enable_url.into(),
            disable_url: disable_url.into(),
        }
    }

    /// Pick the action endpoint for a desired value by its truthiness
    pub fn endpoint_for(&self, desired: &FlagValue) -> &str {
        if desired.is_truthy() {
            &self.enable_url
        } else {
            &self.disable_url
        }
    }
}

fn default_flag_value() -> FlagValue {
    FlagValue::Bool(false)
}

/// Registry of flag bindings, keyed by flag key
///
/// Iteration yields bindings in registration order.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
    index: HashMap<String, usize>,
}

impl BindingRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured bindings
    pub fn from_bindings(bindings: impl IntoIterator<Item = Binding>) -> Self {
        let mut registry = Self::new();
        for binding in bindings {
            registry.register(binding);
        }
        registry
    }

    /// Register a binding
    ///
    /// Re-registering an existing flag key replaces the previous binding
    /// in place; configuration is the single source of bindings, so the
    /// last definition wins.
    pub fn register(&mut self, binding: Binding) {
        match self.index.get(&binding.flag) {
            Some(&pos) => self.bindings[pos] = binding,
            None => {
                self.index.insert(binding.flag.clone(), self.bindings.len());
                self.bindings.push(binding);
            }
        }
    }

    /// Look up the binding for a flag key
    ///
    /// Unknown keys are an error the caller must surface, never ignore.
    pub fn resolve(&self, flag: &str) -> Result<&Binding, NotFound> {
        self.index
            .get(flag)
            .map(|&pos| &self.bindings[pos])
            .ok_or_else(|| NotFound::new(flag))
    }

    /// Iterate bindings in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_binding(flag: &str) -> Binding {
        Binding::new(
            flag,
            FlagValue::Bool(false),
            format!("https://triggers.test/{}/on", flag),
            format!("https://triggers.test/{}/off", flag),
        )
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = BindingRegistry::new();
        registry.register(demo_binding("release-laptop-life-remaining"));

        let binding = registry.resolve("release-laptop-life-remaining").unwrap();
        assert_eq!(binding.flag, "release-laptop-life-remaining");
        assert_eq!(binding.default, FlagValue::Bool(false));
    }

    #[test]
    fn test_resolve_unknown_flag() {
        let registry = BindingRegistry::new();
        let err = registry.resolve("release-unknown").unwrap_err();
        assert_eq!(err.flag, "release-unknown");
        assert!(err.to_string().contains("release-unknown"));
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = BindingRegistry::new();
        registry.register(demo_binding("release-a"));
        registry.register(demo_binding("release-b"));

        let mut replacement = demo_binding("release-a");
        replacement.default = FlagValue::Bool(true);
        registry.register(replacement);

        assert_eq!(registry.len(), 2);
        let binding = registry.resolve("release-a").unwrap();
        assert_eq!(binding.default, FlagValue::Bool(true));

        // Registration order is preserved across replacement
        let keys: Vec<&str> = registry.iter().map(|b| b.flag.as_str()).collect();
        assert_eq!(keys, vec!["release-a", "release-b"]);
    }

    #[test]
    fn test_endpoint_selection() {
        let binding = demo_binding("release-a");
        assert!(binding.endpoint_for(&FlagValue::Bool(true)).ends_with("/on"));
        assert!(binding
            .endpoint_for(&FlagValue::Bool(false))
            .ends_with("/off"));
        // Non-boolean variations select by truthiness
        assert!(binding
            .endpoint_for(&FlagValue::Str("GDPR".into()))
            .ends_with("/on"));
        assert!(binding
            .endpoint_for(&FlagValue::Str(String::new()))
            .ends_with("/off"));
    }

    #[test]
    fn test_from_bindings() {
        let registry = BindingRegistry::from_bindings(vec![
            demo_binding("release-a"),
            demo_binding("release-b"),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert!(registry.resolve("release-b").is_ok());
    }

    #[test]
    fn test_binding_toml_deserialization() {
        let toml = r#"
            flag = "release-marketing-security-report"
            enable_url = "http://localhost:4000/api/toggle"
            disable_url = "http://localhost:4000/api/toggle"
        "#;
        let binding: Binding = toml::from_str(toml).unwrap();
        assert_eq!(binding.flag, "release-marketing-security-report");
        // Default value falls back to boolean false
        assert_eq!(binding.default, FlagValue::Bool(false));
    }
}
