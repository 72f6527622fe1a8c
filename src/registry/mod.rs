//! Explicit service registry.
//!
//! # Data Flow
//! ```text
//! Application::compose
//!     → declare / register services
//!     → validator.rs (set difference: declared − resolved)
//!     → registry frozen, handed to start/stop read-only
//! ```
//!
//! # Design Decisions
//! - Keys are type names or explicit names, ordered for deterministic reports
//! - Declaring never clobbers a resolved slot
//! - Instances are shared as `Arc<T>`

pub mod validator;

use std::any::{type_name, Any};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use validator::{assert_complete, missing_dependencies, ConfigurationError};

/// Identifier of a service in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceKey(Cow<'static, str>);

impl ServiceKey {
    /// Key derived from a type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(type_name::<T>()))
    }

    /// Key with an explicit name, for several instances of one type.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Services that need other services to be present at start.
pub trait Requires {
    fn requires() -> Vec<ServiceKey>;
}

enum Slot {
    Unresolved,
    Resolved(Arc<dyn Any + Send + Sync>),
}

/// Mapping from service key to a resolved instance or an unresolved marker.
#[derive(Default)]
pub struct ServiceRegistry {
    slots: BTreeMap<ServiceKey, Slot>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `T` as required without providing it.
    pub fn declare<T: ?Sized + 'static>(&mut self) {
        self.declare_key(ServiceKey::of::<T>());
    }

    pub fn declare_key(&mut self, key: ServiceKey) {
        self.slots.entry(key).or_insert(Slot::Unresolved);
    }

    /// Register an instance under its type key.
    pub fn register<T: Send + Sync + 'static>(&mut self, instance: T) -> Arc<T> {
        let instance = Arc::new(instance);
        self.register_arc(instance.clone());
        instance
    }

    pub fn register_arc<T: Send + Sync + 'static>(&mut self, instance: Arc<T>) {
        self.register_named(ServiceKey::of::<T>(), instance);
    }

    pub fn register_named<T: Send + Sync + 'static>(&mut self, key: ServiceKey, instance: Arc<T>) {
        tracing::trace!(service = %key, "Service registered");
        self.slots.insert(key, Slot::Resolved(instance));
    }

    /// Register an instance and declare everything it requires.
    pub fn register_dependent<T>(&mut self, instance: T) -> Arc<T>
    where
        T: Requires + Send + Sync + 'static,
    {
        for key in T::requires() {
            self.declare_key(key);
        }
        self.register(instance)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_named(&ServiceKey::of::<T>())
    }

    pub fn get_named<T: Send + Sync + 'static>(&self, key: &ServiceKey) -> Option<Arc<T>> {
        match self.slots.get(key)? {
            Slot::Resolved(instance) => instance.clone().downcast::<T>().ok(),
            Slot::Unresolved => None,
        }
    }

    /// Like [`get`](Self::get), failing with a configuration error.
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ConfigurationError> {
        self.get::<T>()
            .ok_or_else(|| ConfigurationError::MissingDependencies(vec![ServiceKey::of::<T>()]))
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn is_resolved(&self, key: &ServiceKey) -> bool {
        matches!(self.slots.get(key), Some(Slot::Resolved(_)))
    }

    /// All known keys, resolved or not.
    pub fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.slots.keys()
    }

    pub(crate) fn unresolved(&self) -> impl Iterator<Item = &ServiceKey> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Unresolved))
            .map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(key, slot)| {
                (key.as_str(), matches!(slot, Slot::Resolved(_)))
            }))
            .finish()
    }
}
