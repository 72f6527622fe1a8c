//! Dependency completeness checks.
//!
//! Runs once per start, synchronously, before any application hook, so a
//! missing service is reported at boot instead of deep inside a request.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::registry::{ServiceKey, ServiceRegistry};

/// The registry cannot satisfy its declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("the following service dependencies are not registered: {}", join(.0))]
    MissingDependencies(Vec<ServiceKey>),
}

impl ConfigurationError {
    pub fn missing(&self) -> &[ServiceKey] {
        match self {
            Self::MissingDependencies(keys) => keys,
        }
    }
}

fn join(keys: &[ServiceKey]) -> String {
    keys.iter()
        .map(ServiceKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Declared-but-unresolved service keys.
pub fn missing_dependencies(registry: &ServiceRegistry) -> BTreeSet<ServiceKey> {
    registry.unresolved().cloned().collect()
}

/// Fail with every missing key when any declared dependency is unresolved.
pub fn assert_complete(registry: &ServiceRegistry) -> Result<(), ConfigurationError> {
    let missing = missing_dependencies(registry);
    if missing.is_empty() {
        return Ok(());
    }

    tracing::error!(count = missing.len(), "Missing service dependencies");
    Err(ConfigurationError::MissingDependencies(
        missing.into_iter().collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_registry_passes() {
        let mut registry = ServiceRegistry::new();
        registry.declare_key(ServiceKey::named("db"));
        registry.register_named(ServiceKey::named("db"), std::sync::Arc::new(1u8));

        assert!(missing_dependencies(&registry).is_empty());
        assert_eq!(assert_complete(&registry), Ok(()));
    }

    #[test]
    fn test_empty_registry_passes() {
        assert!(assert_complete(&ServiceRegistry::new()).is_ok());
    }

    #[test]
    fn test_lists_every_missing_key() {
        let mut registry = ServiceRegistry::new();
        for name in ["mailer", "cache", "db"] {
            registry.declare_key(ServiceKey::named(name));
        }
        registry.register_named(ServiceKey::named("present"), std::sync::Arc::new(()));

        let err = assert_complete(&registry).unwrap_err();
        let names: Vec<_> = err.missing().iter().map(ServiceKey::as_str).collect();
        assert_eq!(names, vec!["cache", "db", "mailer"]);
        assert_eq!(
            err.to_string(),
            "the following service dependencies are not registered: cache, db, mailer"
        );
    }
}
