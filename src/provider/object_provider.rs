//! Lookup handles injected for provider and supplier injection points.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::DependencyDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::CreationStack;
use crate::provider::resolved::{typed_single, view_as, view_as_trait};
use crate::provider::{ComponentStream, Container, Resolved, ResolverContext};

/// Handle resolving the wrapped requirement on demand.
///
/// Every call runs a fresh resolution against the container, so the
/// handle observes components registered after it was injected.
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, DependencyDescriptor, Resolved, Resolver, Wrapper};
///
/// struct Clock;
///
/// let container = Container::new();
/// let descriptor = DependencyDescriptor::single::<Clock>().wrapped(Wrapper::Provider);
/// let Some(Resolved::Provider(provider)) = container.resolve(&descriptor).unwrap() else {
///     panic!("expected a provider");
/// };
/// assert!(provider.get_if_available().unwrap().is_none());
///
/// container.register("clock", DefinitionBuilder::<Clock>::new(|_| Ok(Clock)).build()).unwrap();
/// assert!(provider.get_typed::<Clock>().is_ok());
/// ```
#[derive(Clone)]
pub struct ObjectProvider {
    container: Container,
    descriptor: DependencyDescriptor,
    requesting: Option<String>,
}

impl ObjectProvider {
    pub(crate) fn new(container: Container, descriptor: DependencyDescriptor, requesting: Option<String>) -> Self {
        ObjectProvider {
            container,
            descriptor,
            requesting,
        }
    }

    /// The requirement this handle resolves.
    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.descriptor
    }

    fn run(&self, descriptor: &DependencyDescriptor) -> DiResult<Option<Resolved>> {
        let stack = CreationStack::default();
        let requesting = self.requesting.as_deref();
        let ctx = ResolverContext::new(&self.container, &stack, requesting);
        self.container.resolve_dependency_in(descriptor, requesting, &ctx)
    }

    /// Resolves the requirement as mandatory.
    pub fn get_object(&self) -> DiResult<Resolved> {
        self.run(&self.descriptor.clone().required(true))?.ok_or_else(|| {
            DiError::no_match(
                self.descriptor.dependency_type().display_name(),
                "no component available for provider",
            )
        })
    }

    /// Resolves the requirement, `None` when nothing matches.
    pub fn get_if_available(&self) -> DiResult<Option<Resolved>> {
        self.run(&self.descriptor.clone().required(false))
    }

    /// Like [`get_if_available`](Self::get_if_available), but ambiguity also
    /// yields `None`.
    pub fn get_if_unique(&self) -> DiResult<Option<Resolved>> {
        match self.get_if_available() {
            Err(
                DiError::NoUniqueCandidate { .. } | DiError::AmbiguousPrimary { .. } | DiError::AmbiguousPriority { .. },
            ) => Ok(None),
            other => other,
        }
    }

    /// Resolves honouring the injection point's own required-ness.
    pub fn get(&self) -> DiResult<Option<Resolved>> {
        if self.descriptor.is_required() {
            self.get_object().map(Some)
        } else {
            self.get_if_available()
        }
    }

    /// All matching instances in candidate order.
    pub fn stream(&self) -> DiResult<ComponentStream> {
        self.stream_with(false)
    }

    /// All matching instances sorted by order value.
    pub fn ordered_stream(&self) -> DiResult<ComponentStream> {
        self.stream_with(true)
    }

    fn stream_with(&self, ordered: bool) -> DiResult<ComponentStream> {
        let element = self.descriptor.dependency_type();
        match self.run(&self.descriptor.as_stream(ordered))? {
            Some(Resolved::Stream(stream)) => Ok(stream),
            _ => Ok(ComponentStream::empty(element)),
        }
    }

    pub fn get_typed<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let resolved = self.get_object()?;
        typed_single(Some(resolved), view_as::<T>)?.ok_or_else(|| self.nothing())
    }

    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let resolved = self.get_object()?;
        typed_single(Some(resolved), view_as_trait::<T>)?.ok_or_else(|| self.nothing())
    }

    pub fn get_if_available_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        typed_single(self.get_if_available()?, view_as_trait::<T>)
    }

    pub fn get_if_unique_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        typed_single(self.get_if_unique()?, view_as_trait::<T>)
    }

    fn nothing(&self) -> DiError {
        DiError::no_match(self.descriptor.dependency_type().display_name(), "resolved to nothing")
    }
}

impl fmt::Debug for ObjectProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProvider")
            .field("target_type", &self.descriptor.dependency_type())
            .field("required", &self.descriptor.is_required())
            .field("requesting", &self.requesting)
            .finish()
    }
}
