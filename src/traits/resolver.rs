//! Resolver trait for typed component lookup.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptors::DependencyDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::provider::{
    mismatch, typed_many, typed_map, typed_single, view_as, view_as_trait, ComponentStream, Resolved, TypedStream,
};
use crate::registration::AnyArc;

/// Typed resolution on top of descriptor-based resolution.
///
/// Implementors supply the three erased operations; everything else is
/// provided. Both [`Container`](crate::Container) and
/// [`ResolverContext`](crate::ResolverContext) implement this trait, so the
/// same calls work from application code and from inside constructors.
///
/// Concrete types come back as the stored `Arc<T>`. Trait types are resolved
/// through the `_trait` variants, which unwrap the `Arc<Arc<dyn I>>` view.
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Plugin: Send + Sync {
///     fn name(&self) -> &str;
/// }
///
/// struct Audit;
/// impl Plugin for Audit {
///     fn name(&self) -> &str { "audit" }
/// }
///
/// struct Metrics;
/// impl Plugin for Metrics {
///     fn name(&self) -> &str { "metrics" }
/// }
///
/// let container = Container::new();
/// container
///     .register("audit", DefinitionBuilder::<Audit>::new(|_| Ok(Audit)).implements::<dyn Plugin>(|c| c).order(2).build())
///     .unwrap();
/// container
///     .register("metrics", DefinitionBuilder::<Metrics>::new(|_| Ok(Metrics)).implements::<dyn Plugin>(|c| c).order(1).build())
///     .unwrap();
///
/// let plugins = container.get_all_trait::<dyn Plugin>().unwrap();
/// let names: Vec<_> = plugins.iter().map(|p| p.name()).collect();
/// assert_eq!(names, ["metrics", "audit"]);
///
/// let by_name = container.get_map_trait::<dyn Plugin>().unwrap();
/// assert!(by_name.contains_key("audit"));
///
/// assert!(container.get_trait::<dyn Plugin>().is_err()); // two candidates, no tie-break
/// ```
pub trait Resolver {
    /// Resolves an injection point. `Ok(None)` only for non-required ones.
    fn resolve(&self, descriptor: &DependencyDescriptor) -> DiResult<Option<Resolved>>;

    /// Raw instance of the component called `name` (`&name` for a factory itself).
    fn get_component(&self, name: &str) -> DiResult<AnyArc>;

    /// The component called `name` as a view of `key`.
    fn get_component_as(&self, name: &str, key: TypeKey) -> DiResult<AnyArc>;

    /// Resolves the unique `T` component.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let resolved = self.resolve(&DependencyDescriptor::single::<T>())?;
        typed_single(resolved, view_as::<T>)?.ok_or_else(|| unresolved::<T>())
    }

    /// Resolves the unique implementation of trait `T`.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let resolved = self.resolve(&DependencyDescriptor::single::<T>())?;
        typed_single(resolved, view_as_trait::<T>)?.ok_or_else(|| unresolved::<T>())
    }

    /// `None` when no `T` component exists. Ambiguity is still an error.
    fn get_optional<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        typed_single(self.resolve(&DependencyDescriptor::single::<T>().optional())?, view_as::<T>)
    }

    fn get_optional_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        typed_single(self.resolve(&DependencyDescriptor::single::<T>().optional())?, view_as_trait::<T>)
    }

    /// The component called `name`, as `T`.
    fn get_named<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let view = self.get_component_as(name, TypeKey::of::<T>())?;
        view_as::<T>(view).ok_or_else(|| mismatch::<T>(name))
    }

    fn get_named_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let view = self.get_component_as(name, TypeKey::of::<T>())?;
        view_as_trait::<T>(view).ok_or_else(|| mismatch::<T>(name))
    }

    /// Every `T` component, sorted by order value. Empty when there is none.
    fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        typed_many(self.resolve(&DependencyDescriptor::list::<T>().optional())?, view_as::<T>)
    }

    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        typed_many(self.resolve(&DependencyDescriptor::list::<T>().optional())?, view_as_trait::<T>)
    }

    /// Component name to implementation of trait `T`, in registration order.
    fn get_map_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<IndexMap<String, Arc<T>>> {
        typed_map(self.resolve(&DependencyDescriptor::map::<T>().optional())?, view_as_trait::<T>)
    }

    /// Single-use sequence of implementations of trait `T`, created as consumed.
    fn stream_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<TypedStream<T>> {
        Ok(stream_of(self.resolve(&DependencyDescriptor::stream::<T>())?, TypeKey::of::<T>()).typed_trait())
    }

    /// Like [`stream_trait`](Self::stream_trait), sorted by order value.
    fn ordered_stream_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<TypedStream<T>> {
        Ok(stream_of(self.resolve(&DependencyDescriptor::ordered_stream::<T>())?, TypeKey::of::<T>()).typed_trait())
    }

    /// Resolves `T`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the component cannot be resolved.
    fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves trait `T`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the component cannot be resolved.
    fn get_required_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }
}

fn unresolved<T: ?Sized>() -> DiError {
    DiError::no_match(std::any::type_name::<T>(), "resolution produced no instance")
}

fn stream_of(resolved: Option<Resolved>, key: TypeKey) -> ComponentStream {
    match resolved {
        Some(Resolved::Stream(stream)) => stream,
        _ => ComponentStream::empty(key),
    }
}
