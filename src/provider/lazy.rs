//! Deferred resolution for lazy injection points.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::descriptors::{DependencyDescriptor, DependencyShape};
use crate::error::{DiError, DiResult};
use crate::internal::CreationStack;
use crate::key::TypeKey;
use crate::provider::resolved::{typed_many, typed_map, typed_single, view_as, view_as_trait};
use crate::provider::{Container, Resolved, ResolverContext};
use crate::registration::AnyArc;
use crate::traits::TargetSource;

#[derive(Clone)]
enum Target {
    Single(AnyArc),
    Many(Vec<AnyArc>),
    Map(IndexMap<String, AnyArc>),
}

impl Target {
    fn into_resolved(self) -> Resolved {
        match self {
            Target::Single(view) => Resolved::Single(view),
            Target::Many(views) => Resolved::Many(views),
            Target::Map(views) => Resolved::Map(views),
        }
    }
}

struct LazyState {
    container: Container,
    descriptor: DependencyDescriptor,
    requesting: Option<String>,
    target: OnceCell<Target>,
}

/// Stand-in for a dependency that is resolved on first use.
///
/// Creating the proxy never fails. The first call to [`resolve`](Self::resolve)
/// (or any typed accessor) runs full resolution and caches the target for the
/// proxy's lifetime; failures are not cached. When nothing matches, a
/// multi-valued injection point gets an empty collection or map, and a
/// single-valued one fails with `NoMatchingComponent`. Stream targets are
/// materialized into a list.
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, DependencyDescriptor, Resolved, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// static CREATED: AtomicUsize = AtomicUsize::new(0);
///
/// struct Heavy;
///
/// let container = Container::new();
/// container
///     .register(
///         "heavy",
///         DefinitionBuilder::<Heavy>::new(|_| {
///             CREATED.fetch_add(1, Ordering::SeqCst);
///             Ok(Heavy)
///         })
///         .lazy()
///         .build(),
///     )
///     .unwrap();
///
/// let Some(Resolved::Lazy(proxy)) = container.resolve(&DependencyDescriptor::single::<Heavy>().lazy()).unwrap() else {
///     panic!("expected a lazy proxy");
/// };
/// assert_eq!(CREATED.load(Ordering::SeqCst), 0);
///
/// proxy.get::<Heavy>().unwrap();
/// assert_eq!(CREATED.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct LazyProxy {
    state: Arc<LazyState>,
}

impl LazyProxy {
    pub(crate) fn new(container: Container, descriptor: DependencyDescriptor, requesting: Option<String>) -> Self {
        LazyProxy {
            state: Arc::new(LazyState {
                container,
                descriptor: descriptor.without_lazy(),
                requesting,
                target: OnceCell::new(),
            }),
        }
    }

    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.state.descriptor
    }

    /// Whether the target has been resolved already.
    pub fn is_resolved(&self) -> bool {
        self.state.target.get().is_some()
    }

    /// Resolves the target on first use, then returns the cached one.
    pub fn resolve(&self) -> DiResult<Resolved> {
        self.state
            .target
            .get_or_try_init(|| self.load())
            .map(|target| target.clone().into_resolved())
    }

    fn load(&self) -> DiResult<Target> {
        let state = &self.state;
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(&state.container, &stack, state.requesting.as_deref());
        let resolved = state
            .container
            .do_resolve(&state.descriptor, state.requesting.as_deref(), &ctx)?;
        tracing::trace!(target = %state.descriptor.dependency_type(), "resolved lazy injection point");
        match resolved {
            Some(resolved) => self.materialize(resolved),
            None => self.surrogate(),
        }
    }

    fn materialize(&self, resolved: Resolved) -> DiResult<Target> {
        match resolved {
            Resolved::Single(view) => Ok(Target::Single(view)),
            Resolved::Many(views) => Ok(Target::Many(views)),
            Resolved::Map(views) => Ok(Target::Map(views)),
            Resolved::Stream(stream) => Ok(Target::Many(stream.collect::<DiResult<Vec<_>>>()?)),
            Resolved::Optional(Some(inner)) => self.materialize(*inner),
            Resolved::Optional(None) => self.surrogate(),
            Resolved::Lazy(inner) => self.materialize(inner.resolve()?),
            Resolved::Provider(_) | Resolved::Supplier(_) => Err(DiError::no_match(
                self.state.descriptor.dependency_type().display_name(),
                "provider wrappers cannot be resolved lazily",
            )),
        }
    }

    fn surrogate(&self) -> DiResult<Target> {
        let descriptor = &self.state.descriptor;
        match descriptor.shape() {
            DependencyShape::Single => Err(DiError::no_match(
                descriptor.dependency_type().display_name(),
                "optional dependency not present for lazy injection point",
            )),
            DependencyShape::Map { .. } => Ok(Target::Map(IndexMap::new())),
            DependencyShape::Array { .. } | DependencyShape::Collection { .. } | DependencyShape::Stream { .. } => {
                Ok(Target::Many(Vec::new()))
            }
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.required(typed_single(Some(self.resolve()?), view_as::<T>)?)
    }

    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.required(typed_single(Some(self.resolve()?), view_as_trait::<T>)?)
    }

    pub fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        typed_many(Some(self.resolve()?), view_as_trait::<T>)
    }

    pub fn get_map_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<IndexMap<String, Arc<T>>> {
        typed_map(Some(self.resolve()?), view_as_trait::<T>)
    }

    fn required<T: ?Sized>(&self, value: Option<Arc<T>>) -> DiResult<Arc<T>> {
        value.ok_or_else(|| {
            DiError::no_match(
                self.state.descriptor.dependency_type().display_name(),
                "lazy target resolved to nothing",
            )
        })
    }
}

impl TargetSource for LazyProxy {
    fn target_type(&self) -> TypeKey {
        self.state.descriptor.dependency_type()
    }

    fn target(&self) -> DiResult<AnyArc> {
        match self.resolve()? {
            Resolved::Single(view) => Ok(view),
            other => Err(DiError::no_match(
                self.target_type().display_name(),
                format!("lazy target is a {}, not a single component", other.kind()),
            )),
        }
    }
}

impl fmt::Debug for LazyProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProxy")
            .field("target_type", &self.state.descriptor.dependency_type())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Container {
    /// Lazy injection point: a proxy from the registered factory for the
    /// target type, or a [`LazyProxy`] handle. A factory that fails to build
    /// its proxy leaves the injection point with the plain handle.
    pub(crate) fn build_lazy(&self, descriptor: &DependencyDescriptor, requesting: Option<&str>) -> Resolved {
        let proxy = LazyProxy::new(self.clone(), descriptor.clone(), requesting.map(str::to_string));
        let factory = match descriptor.shape() {
            DependencyShape::Single => self
                .inner
                .proxy_factories
                .read()
                .get(&descriptor.dependency_type())
                .cloned(),
            _ => None,
        };
        let Some(factory) = factory else {
            return Resolved::Lazy(proxy);
        };
        match factory.create_proxy(Arc::new(proxy.clone())) {
            Ok(view) => Resolved::Single(view),
            Err(e) => {
                tracing::warn!(
                    target = %descriptor.dependency_type(),
                    error = %e,
                    "proxy factory failed, injecting a lazy handle instead"
                );
                Resolved::Lazy(proxy)
            }
        }
    }
}
