//! Component lifetime definitions.

/// Component lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use autowire::{Container, DefinitionBuilder, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Request;
///
/// let container = Container::new();
/// container.register("clock", DefinitionBuilder::<Clock>::new(|_| Ok(Clock)).build()).unwrap();
/// container
///     .register("request", DefinitionBuilder::<Request>::new(|_| Ok(Request)).prototype().build())
///     .unwrap();
///
/// // Singleton: same instance on every lookup
/// let c1 = container.get::<Clock>().unwrap();
/// let c2 = container.get::<Clock>().unwrap();
/// assert!(Arc::ptr_eq(&c1, &c2));
///
/// // Prototype: fresh instance on every lookup
/// let r1 = container.get::<Request>().unwrap();
/// let r2 = container.get::<Request>().unwrap();
/// assert!(!Arc::ptr_eq(&r1, &r2));
/// assert_eq!(container.definition("request").unwrap().lifetime(), Lifetime::Prototype);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// Single instance per container, created at most once and cached
    ///
    /// Singletons are created on first request, or eagerly by
    /// `pre_instantiate_singletons` unless marked lazy. The same instance is
    /// shared across all threads.
    #[default]
    Singleton,
    /// New instance per resolution, never cached
    ///
    /// Prototype components are never pre-instantiated and never appear as
    /// live instances in a candidate set unless the match itself needs them.
    Prototype,
}

impl Lifetime {
    /// Returns true for [`Lifetime::Singleton`].
    pub fn is_singleton(self) -> bool {
        self == Lifetime::Singleton
    }
}
