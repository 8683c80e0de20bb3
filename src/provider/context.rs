//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which carries the
//! per-call resolution state into constructors.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptors::DependencyDescriptor;
use crate::error::DiResult;
use crate::internal::CreationStack;
use crate::key::TypeKey;
use crate::provider::{typed_map, view_as_trait, Container, Resolved};
use crate::registration::AnyArc;
use crate::traits::Resolver;

/// Context passed to constructors for resolving their dependencies.
///
/// It knows which component is being built (so that component is not
/// offered to itself) and which components are already under construction
/// on this call chain (so cycles fail fast with the full path).
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container
///     .register(
///         "db",
///         DefinitionBuilder::<Database>::new(|_| Ok(Database { url: "postgres://localhost".into() })).build(),
///     )
///     .unwrap();
/// container
///     .register(
///         "users",
///         DefinitionBuilder::<UserService>::new(|ctx| {
///             assert_eq!(ctx.requesting_name(), Some("users"));
///             Ok(UserService { db: ctx.get::<Database>()? })
///         })
///         .build(),
///     )
///     .unwrap();
///
/// let users = container.get::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    container: &'a Container,
    stack: &'a CreationStack,
    requesting: Option<&'a str>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(container: &'a Container, stack: &'a CreationStack, requesting: Option<&'a str>) -> Self {
        ResolverContext {
            container,
            stack,
            requesting,
        }
    }

    /// Same call chain, now building `name`.
    pub(crate) fn for_component<'b>(&'b self, name: &'b str) -> ResolverContext<'b> {
        ResolverContext {
            container: self.container,
            stack: self.stack,
            requesting: Some(name),
        }
    }

    /// Same call chain, continued in another (ancestor) container.
    pub(crate) fn in_container<'b>(&'b self, container: &'b Container) -> ResolverContext<'b> {
        ResolverContext {
            container,
            stack: self.stack,
            requesting: self.requesting,
        }
    }

    pub(crate) fn stack(&self) -> &'a CreationStack {
        self.stack
    }

    /// Name of the component whose constructor is running, if any.
    pub fn requesting_name(&self) -> Option<&str> {
        self.requesting
    }

    /// The container resolving on this context.
    pub fn container(&self) -> &Container {
        self.container
    }

    /// Whether `name` is under construction on this call chain or, through
    /// a deferred handle, further up the current thread.
    pub fn is_in_creation(&self, name: &str) -> bool {
        self.stack.contains(name) || self.container.inner.in_creation.contains(name)
    }

    /// Number of components currently under construction on this call chain.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Name to implementation of trait `T`, leaving out components under
    /// construction on this call chain.
    pub fn components_of_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<IndexMap<String, Arc<T>>> {
        let views = self.container.components_in(TypeKey::of::<T>(), self)?;
        typed_map(Some(Resolved::Map(views)), view_as_trait::<T>)
    }
}

impl Resolver for ResolverContext<'_> {
    fn resolve(&self, descriptor: &DependencyDescriptor) -> DiResult<Option<Resolved>> {
        self.container.resolve_dependency_in(descriptor, self.requesting, self)
    }

    fn get_component(&self, name: &str) -> DiResult<AnyArc> {
        self.container.get_component_in(name, self)
    }

    fn get_component_as(&self, name: &str, key: TypeKey) -> DiResult<AnyArc> {
        let raw = self.container.get_component_in(name, self)?;
        self.container.cast_view(name, &raw, key)
    }
}
