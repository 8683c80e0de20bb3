//! The container: definitions, singletons and dependency resolution.
//!
//! This module contains the [`Container`] type and the resolution pipeline it
//! drives: candidate search, tie-breaking, multi-value assembly and lazy
//! deferral.

mod candidates;
mod context;
mod lazy;
mod multi;
mod object_provider;
mod resolved;
mod tie_break;

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::config::ContainerConfig;
use crate::descriptors::{DependencyDescriptor, Wrapper};
use crate::error::{DiError, DiResult};
use crate::internal::{CreationStack, CreationTracker, FastMap};
use crate::key::TypeKey;
use crate::observer::{DiObserver, Observers};
use crate::registration::{
    is_null, AnyArc, ComponentDefinition, FactoryHandle, InstanceHook, Instantiation, SingletonInstance,
    TypeBinding,
};
use crate::registry::{Registered, Registry};
use crate::traits::{ComponentFactory, DefinitionSource, OrderSource, ProxyFactory, Resolver};
use crate::value::{resolve_placeholders, SimpleTypeConverter, TypeConverter};

pub use candidates::{Candidate, CandidateSet};
pub use context::ResolverContext;
pub use lazy::LazyProxy;
pub use object_provider::ObjectProvider;
pub use resolved::{view_as, view_as_trait, ComponentStream, Resolved, TypedStream};

pub(crate) use resolved::{mismatch, typed_many, typed_map, typed_single};

/// A component found by type, together with its name.
#[derive(Clone)]
pub struct NamedComponent<T: ?Sized> {
    name: String,
    instance: Arc<T>,
}

impl<T: ?Sized> NamedComponent<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    pub fn into_instance(self) -> Arc<T> {
        self.instance
    }
}

impl<T: ?Sized> fmt::Debug for NamedComponent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedComponent").field("name", &self.name).finish()
    }
}

/// Dependency-injection container.
///
/// The `Container` owns the definition registry and the singleton cache, and
/// resolves injection points described by [`DependencyDescriptor`]s. It can be
/// cloned cheaply (it uses `Arc` internally) and shared across threads; every
/// clone sees the same registry and singletons.
///
/// Containers may form a hierarchy with [`Container::with_parent`]: a lookup
/// that finds nothing locally continues in the parent, and type scans include
/// ancestor components not shadowed by a local name.
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// struct Welcome { greeter: Arc<dyn Greeter> }
///
/// let container = Container::new();
/// container
///     .register("english", DefinitionBuilder::<English>::new(|_| Ok(English)).implements::<dyn Greeter>(|c| c).build())
///     .unwrap();
/// container
///     .register(
///         "welcome",
///         DefinitionBuilder::<Welcome>::new(|ctx| Ok(Welcome { greeter: ctx.get_trait::<dyn Greeter>()? })).build(),
///     )
///     .unwrap();
/// container.pre_instantiate_singletons().unwrap();
///
/// assert_eq!(container.get::<Welcome>().unwrap().greeter.greet(), "hello");
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) config: ContainerConfig,
    pub(crate) registry: Registry,
    pub(crate) parent: Option<Container>,
    // Raw instances; a factory component stores its `FactoryHandle`
    pub(crate) singletons: RwLock<FastMap<String, AnyArc>>,
    pub(crate) products: RwLock<FastMap<String, AnyArc>>,
    pub(crate) product_types: RwLock<FastMap<String, Vec<TypeBinding>>>,
    pub(crate) manual: RwLock<IndexMap<String, SingletonInstance>>,
    pub(crate) resolvable: RwLock<IndexMap<TypeKey, AnyArc>>,
    pub(crate) creation_lock: ReentrantMutex<()>,
    pub(crate) in_creation: CreationTracker,
    pub(crate) creation_order: Mutex<Vec<String>>,
    pub(crate) observers: Observers,
    pub(crate) converter: RwLock<Arc<dyn TypeConverter>>,
    pub(crate) proxy_factories: RwLock<FastMap<TypeKey, Arc<dyn ProxyFactory>>>,
    pub(crate) order_source: RwLock<Option<Arc<dyn OrderSource>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self::build(config, None)
    }

    /// A child container. Lookups that miss locally continue in `parent`.
    pub fn with_parent(parent: &Container) -> Self {
        Self::build(parent.config().clone(), Some(parent.clone()))
    }

    /// A child container with its own configuration.
    pub fn with_parent_and_config(parent: &Container, config: ContainerConfig) -> Self {
        Self::build(config, Some(parent.clone()))
    }

    fn build(config: ContainerConfig, parent: Option<Container>) -> Self {
        Container {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(config.allow_definition_overriding),
                config,
                parent,
                singletons: RwLock::new(FastMap::default()),
                products: RwLock::new(FastMap::default()),
                product_types: RwLock::new(FastMap::default()),
                manual: RwLock::new(IndexMap::new()),
                resolvable: RwLock::new(IndexMap::new()),
                creation_lock: ReentrantMutex::new(()),
                in_creation: CreationTracker::default(),
                creation_order: Mutex::new(Vec::new()),
                observers: Observers::default(),
                converter: RwLock::new(Arc::new(SimpleTypeConverter)),
                proxy_factories: RwLock::new(FastMap::default()),
                order_source: RwLock::new(None),
            }),
        }
    }

    #[inline]
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    // ----- definitions -----

    /// Registers `definition` under `name`, subject to the override policy.
    ///
    /// Replacing a definition, or defining a name that already has a
    /// singleton, resets that name and every definition inheriting from it.
    pub fn register(&self, name: impl Into<String>, definition: ComponentDefinition) -> DiResult<()> {
        let name = name.into();
        let had_singleton = self.contains_singleton(&name);
        let outcome = self.inner.registry.register(&name, definition)?;
        if outcome == Registered::Replaced || had_singleton {
            self.reset_definition(&name);
        }
        Ok(())
    }

    /// Registers every definition the source supplies; returns how many.
    pub fn load_definitions(&self, source: &dyn DefinitionSource) -> DiResult<usize> {
        let definitions = source.definitions()?;
        let count = definitions.len();
        for (name, definition) in definitions {
            self.register(name, definition)?;
        }
        tracing::debug!(count, "loaded definitions");
        Ok(count)
    }

    /// Removes a definition, resetting its descendants and destroying its singleton.
    pub fn remove(&self, name: &str) -> DiResult<()> {
        let name = self.inner.registry.canonical_name(name);
        if !self.inner.registry.contains(&name) {
            return Err(DiError::NotFound(name));
        }
        // Descendants still merge against the parent while they are disposed
        self.reset_definition(&name);
        self.inner.registry.remove(&name)?;
        Ok(())
    }

    /// Merged view of a definition, looked up in ancestors when not local.
    pub fn definition(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        let canonical = self.inner.registry.canonical_name(name);
        if self.inner.registry.contains(&canonical) {
            return self.inner.registry.merged(&canonical);
        }
        match &self.inner.parent {
            Some(parent) => parent.definition(name),
            None => Err(DiError::NotFound(name.to_string())),
        }
    }

    /// The definition as registered, before merging with its parent.
    pub fn raw_definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.inner.registry.raw(&self.inner.registry.canonical_name(name))
    }

    /// Whether `name` (or the name it aliases) has a local definition.
    pub fn contains_definition(&self, name: &str) -> bool {
        self.inner.registry.contains(&self.inner.registry.canonical_name(name))
    }

    /// Local definition names in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.registry.names().to_vec()
    }

    pub fn definition_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn register_alias(&self, name: &str, alias: &str) -> DiResult<()> {
        self.inner.registry.register_alias(name, alias)
    }

    pub fn remove_alias(&self, alias: &str) -> DiResult<()> {
        self.inner.registry.remove_alias(alias)
    }

    /// Every alias resolving to `name`, directly or through a chain.
    pub fn aliases(&self, name: &str) -> Vec<String> {
        self.inner.registry.aliases_of(&self.inner.registry.canonical_name(name))
    }

    /// Snapshots the name list and enables the type index cache.
    pub fn freeze(&self) {
        self.inner.registry.freeze();
        tracing::debug!(definitions = self.inner.registry.len(), "configuration frozen");
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.registry.is_frozen()
    }

    /// Destroys the singleton of `name` and of every definition inheriting
    /// from it, and drops cached metadata.
    pub(crate) fn reset_definition(&self, name: &str) {
        let mut pending = vec![name.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            self.destroy_singleton(&current);
            pending.extend(self.inner.registry.children_of(&current));
        }
        self.inner.registry.invalidate();
    }

    // ----- singletons -----

    /// Registers a ready-made instance under `name`.
    pub fn register_singleton(&self, name: impl Into<String>, singleton: SingletonInstance) -> DiResult<()> {
        let name = name.into();
        {
            let _creation = self.inner.creation_lock.lock();
            if self.contains_singleton(&name) {
                return Err(DiError::DuplicateDefinition {
                    name,
                    existing: "singleton instance".to_string(),
                });
            }
            self.inner.manual.write().insert(name.clone(), singleton);
        }
        self.inner.registry.types.clear();
        tracing::debug!(component = %name, "registered singleton instance");
        Ok(())
    }

    /// Whether a singleton instance (created or registered) exists locally.
    pub fn contains_singleton(&self, name: &str) -> bool {
        let name = self.inner.registry.canonical_name(name);
        self.inner.singletons.read().contains_key(&name) || self.inner.manual.read().contains_key(&name)
    }

    /// Any local trace of `name`: definition, alias or singleton.
    pub(crate) fn contains_local(&self, name: &str) -> bool {
        let registry = &self.inner.registry;
        registry.contains(name) || registry.is_alias(name) || self.contains_singleton(name)
    }

    /// Drops the singleton of `name`, running its dispose hook.
    pub fn destroy_singleton(&self, name: &str) {
        let name = self.inner.registry.canonical_name(name);
        let hook = self.dispose_hook_of(&name);
        self.destroy_singleton_with(&name, hook);
    }

    fn dispose_hook_of(&self, name: &str) -> Option<InstanceHook> {
        if !self.inner.registry.contains(name) {
            return None;
        }
        self.inner.registry.merged(name).ok().and_then(|merged| merged.dispose_hook.clone())
    }

    fn destroy_singleton_with(&self, name: &str, hook: Option<InstanceHook>) {
        let instance = {
            let _creation = self.inner.creation_lock.lock();
            self.inner.products.write().remove(name);
            self.inner.product_types.write().remove(name);
            self.inner.creation_order.lock().retain(|n| n != name);
            let manual = self.inner.manual.write().shift_remove(name).map(|m| m.instance);
            self.inner.singletons.write().remove(name).or(manual)
        };
        let Some(instance) = instance else {
            return;
        };
        self.inner.registry.types.clear();
        if let Some(hook) = hook {
            hook(&instance);
        }
        tracing::debug!(component = name, "destroyed singleton");
    }

    /// Destroys every singleton, most recently created first.
    pub fn destroy_singletons(&self) {
        let created: Vec<String> = self.inner.creation_order.lock().iter().rev().cloned().collect();
        for name in created {
            self.destroy_singleton(&name);
        }
        let manual: Vec<String> = self.inner.manual.read().keys().rev().cloned().collect();
        for name in manual {
            self.destroy_singleton(&name);
        }
        self.inner.singletons.write().clear();
        self.inner.products.write().clear();
        self.inner.product_types.write().clear();
    }

    /// Creates every non-lazy singleton in registration order, then runs the
    /// post-singleton callbacks in the same order.
    pub fn pre_instantiate_singletons(&self) -> DiResult<()> {
        let names = self.inner.registry.names();
        tracing::debug!(definitions = names.len(), "pre-instantiating singletons");

        for name in names.iter() {
            let merged = self.inner.registry.merged(name)?;
            if merged.is_abstract() || !merged.is_singleton() || merged.is_lazy_init() {
                continue;
            }
            if merged.is_factory_component() {
                let factory = self.get_factory(name)?;
                if factory.is_eager_init() {
                    self.get_component(name)?;
                }
            } else {
                self.get_component(name)?;
            }
        }

        for name in names.iter() {
            let Some(instance) = self.inner.singletons.read().get(name.as_str()).cloned() else {
                continue;
            };
            let hook = self.inner.registry.merged(name)?.smart_init_hook.clone();
            if let Some(hook) = hook {
                tracing::trace!(component = %name, "running post-singleton callback");
                hook(&instance);
            }
        }
        tracing::debug!("pre-instantiation finished");
        Ok(())
    }

    // ----- collaborators -----

    /// Registers a container-intrinsic value injectable as `T` without a definition.
    pub fn register_resolvable_dependency<T: Send + Sync + 'static>(&self, value: Arc<T>) {
        self.inner.resolvable.write().insert(TypeKey::of::<T>(), value);
    }

    /// Like [`register_resolvable_dependency`](Self::register_resolvable_dependency) for trait types.
    pub fn register_resolvable_trait<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        self.inner.resolvable.write().insert(TypeKey::of::<T>(), Arc::new(value));
    }

    /// Lazy single-valued injection points of type `T` get proxies from `factory`.
    pub fn register_proxy_factory<T: ?Sized + 'static>(&self, factory: Arc<dyn ProxyFactory>) {
        self.inner.proxy_factories.write().insert(TypeKey::of::<T>(), factory);
    }

    pub fn set_order_source(&self, source: Arc<dyn OrderSource>) {
        *self.inner.order_source.write() = Some(source);
    }

    pub fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.inner.converter.write() = converter;
    }

    pub fn add_observer(&self, observer: Arc<dyn DiObserver>) {
        self.inner.observers.add(observer);
    }

    // ----- resolution -----

    /// Resolves an injection point on behalf of `requesting`.
    pub fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> DiResult<Option<Resolved>> {
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, requesting);
        self.resolve_dependency_in(descriptor, requesting, &ctx)
    }

    /// Wrappers first, then the lazy short-circuit, then general resolution.
    pub(crate) fn resolve_dependency_in(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<Option<Resolved>> {
        match descriptor.wrapper() {
            Wrapper::Optional => {
                let inner = descriptor.unwrapped().required(false);
                let resolved = self.resolve_dependency_in(&inner, requesting, ctx)?;
                return Ok(Some(Resolved::Optional(resolved.map(Box::new))));
            }
            Wrapper::Provider => {
                let provider = ObjectProvider::new(self.clone(), descriptor.unwrapped(), requesting.map(str::to_string));
                return Ok(Some(Resolved::Provider(provider)));
            }
            Wrapper::Supplier => {
                let provider = ObjectProvider::new(self.clone(), descriptor.unwrapped(), requesting.map(str::to_string));
                return Ok(Some(Resolved::Supplier(provider)));
            }
            Wrapper::None => {}
        }
        if descriptor.is_lazy() {
            return Ok(Some(self.build_lazy(descriptor, requesting)));
        }
        self.do_resolve(descriptor, requesting, ctx)
    }

    /// Literal conversion, then multi-value shapes, then a single candidate.
    pub(crate) fn do_resolve(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<Option<Resolved>> {
        if let Some(raw) = descriptor.literal_value() {
            let expanded = resolve_placeholders(raw, &self.config().properties)?;
            let converter = self.inner.converter.read().clone();
            let value = converter.convert(&expanded, descriptor.dependency_type())?;
            return Ok(Some(Resolved::Single(value)));
        }
        if let Some(multiple) = self.resolve_multiple_in(descriptor, requesting, ctx)? {
            return Ok(Some(multiple));
        }
        self.resolve_single(descriptor, requesting, ctx)
    }

    fn resolve_single(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<Option<Resolved>> {
        let required = descriptor.dependency_type();
        let candidates = self.find_candidates_in(requesting, required, descriptor, ctx)?;
        if candidates.is_empty() {
            if descriptor.is_required() {
                return Err(self.diagnose_missing(descriptor));
            }
            return Ok(None);
        }

        let chosen = if candidates.len() > 1 {
            match self.pick_one(&candidates, descriptor)? {
                Some(name) => name,
                None if descriptor.is_required() || !descriptor.shape().is_multi_valued() => {
                    return Err(DiError::NoUniqueCandidate {
                        type_name: required.display_name().to_string(),
                        candidates: candidates.name_list(),
                    });
                }
                None => return Ok(None),
            }
        } else {
            match candidates.names().next() {
                Some(name) => name.to_string(),
                None => return Ok(None),
            }
        };

        let view = match candidates.get(&chosen) {
            Some(Candidate::Instance { view, .. }) => Some(view.clone()),
            Some(Candidate::Deferred(_)) => {
                let raw = self.get_component_in(&chosen, ctx)?;
                if is_null(&raw) {
                    None
                } else {
                    Some(self.cast_view(&chosen, &raw, required)?)
                }
            }
            Some(Candidate::Absent) | None => None,
        };
        match view {
            Some(view) => Ok(Some(Resolved::Single(view))),
            None if descriptor.is_required() => Err(DiError::no_match(
                required.display_name(),
                format!("component '{chosen}' produced no instance"),
            )),
            None => Ok(None),
        }
    }

    /// `TypeMismatch` when a definition declares the type but its live
    /// instance is not one; `NoMatchingComponent` otherwise.
    fn diagnose_missing(&self, descriptor: &DependencyDescriptor) -> DiError {
        let key = descriptor.dependency_type();
        for name in self.inner.registry.names().iter() {
            let Ok(merged) = self.inner.registry.merged(name) else {
                continue;
            };
            let Some(binding) = merged.binding_for(key) else {
                continue;
            };
            if let Some(instance) = self.inner.singletons.read().get(name.as_str()) {
                if !is_null(instance) && binding.cast(instance).is_none() {
                    return DiError::TypeMismatch {
                        name: name.clone(),
                        expected: key.display_name().to_string(),
                        actual: self.actual_type_name(name),
                    };
                }
            }
        }
        let reason = if descriptor.qualifiers().is_empty() {
            "expected at least one component that qualifies as autowire candidate"
        } else {
            "no component carries the required qualifiers"
        };
        DiError::no_match(key.display_name(), reason)
    }

    /// A single component of `T` with its name, chosen by primary flag or priority.
    pub fn resolve_named<T: Send + Sync + 'static>(&self) -> DiResult<NamedComponent<T>> {
        let (name, view) = self.resolve_named_key(TypeKey::of::<T>())?;
        let instance = view_as::<T>(view).ok_or_else(|| mismatch::<T>(&name))?;
        Ok(NamedComponent { name, instance })
    }

    pub fn resolve_named_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<NamedComponent<T>> {
        let (name, view) = self.resolve_named_key(TypeKey::of::<T>())?;
        let instance = view_as_trait::<T>(view).ok_or_else(|| mismatch::<T>(&name))?;
        Ok(NamedComponent { name, instance })
    }

    fn resolve_named_key(&self, key: TypeKey) -> DiResult<(String, AnyArc)> {
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, None);
        let descriptor = DependencyDescriptor::of_type(key);

        let mut names = self.names_for_type_in(key, true, true, &ctx)?.to_vec();
        if names.len() > 1 {
            let mut eligible = Vec::with_capacity(names.len());
            for name in names {
                if self.is_autowire_candidate(&name, &descriptor)? {
                    eligible.push(name);
                }
            }
            names = eligible;
        }

        let chosen = match names.as_slice() {
            [] => {
                return match &self.inner.parent {
                    Some(parent) => parent.resolve_named_key(key),
                    None => Err(DiError::no_match(key.display_name(), "no component of this type")),
                };
            }
            [single] => single.clone(),
            _ => {
                let mut set = CandidateSet::new(key);
                for name in &names {
                    set.insert(name, Candidate::Deferred(key));
                }
                let winner = match self.determine_primary(&set)? {
                    Some(primary) => Some(primary),
                    None => self.determine_highest_priority(&set)?,
                };
                winner.ok_or_else(|| DiError::NoUniqueCandidate {
                    type_name: key.display_name().to_string(),
                    candidates: names.clone(),
                })?
            }
        };
        let raw = self.get_component_in(&chosen, &ctx)?;
        let view = self.cast_view(&chosen, &raw, key)?;
        Ok((chosen, view))
    }

    /// Name to instance of every `T` component, ancestors included.
    pub fn components_of_type<T: Send + Sync + 'static>(&self) -> DiResult<IndexMap<String, Arc<T>>> {
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, None);
        typed_map(Some(Resolved::Map(self.components_in(TypeKey::of::<T>(), &ctx)?)), view_as::<T>)
    }

    pub fn components_of_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<IndexMap<String, Arc<T>>> {
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, None);
        typed_map(Some(Resolved::Map(self.components_in(TypeKey::of::<T>(), &ctx)?)), view_as_trait::<T>)
    }

    /// Views of every component injectable as `key`, skipping those under
    /// construction on this call chain.
    pub(crate) fn components_in(&self, key: TypeKey, ctx: &ResolverContext<'_>) -> DiResult<IndexMap<String, AnyArc>> {
        let mut result = IndexMap::new();
        for name in self.names_including_ancestors(key, true, true, ctx)? {
            if ctx.is_in_creation(&name) {
                tracing::trace!(component = %name, "skipping component currently in creation");
                continue;
            }
            let raw = match self.get_component_in(&name, ctx) {
                Ok(raw) => raw,
                Err(DiError::Circular(path)) => {
                    tracing::trace!(component = %name, ?path, "skipping component currently in creation");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !is_null(&raw) {
                let view = self.cast_view(&name, &raw, key)?;
                result.insert(name, view);
            }
        }
        Ok(result)
    }

    /// The factory behind a factory component; `name` may carry the `&` prefix.
    pub fn get_factory(&self, name: &str) -> DiResult<Arc<dyn ComponentFactory>> {
        let bare = name.strip_prefix('&').unwrap_or(name);
        let raw = self.get_component(&format!("&{bare}"))?;
        raw.downcast_ref::<FactoryHandle>()
            .map(|handle| handle.0.clone())
            .ok_or_else(|| DiError::TypeMismatch {
                name: bare.to_string(),
                expected: "component factory".to_string(),
                actual: self.actual_type_name(bare),
            })
    }

    /// View of the component named `name` as `key`, `None` when it produced nothing.
    pub(crate) fn view_of_named(&self, name: &str, key: TypeKey) -> DiResult<Option<AnyArc>> {
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, None);
        let raw = self.get_component_in(name, &ctx)?;
        if is_null(&raw) {
            return Ok(None);
        }
        self.cast_view(name, &raw, key).map(Some)
    }

    // ----- instances -----

    /// Raw instance of `name`: manual singletons, then created singletons,
    /// then the local definition, then ancestors. A `&` prefix asks for a
    /// factory component itself rather than its product.
    pub(crate) fn get_component_in(&self, name: &str, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        let (factory_deref, bare) = match name.strip_prefix('&') {
            Some(bare) => (true, bare),
            None => (false, name),
        };
        let canonical = self.inner.registry.canonical_name(bare);

        if let Some(manual) = self.inner.manual.read().get(&canonical) {
            if factory_deref {
                return Err(DiError::TypeMismatch {
                    name: canonical.clone(),
                    expected: "component factory".to_string(),
                    actual: manual.impl_type.display_name().to_string(),
                });
            }
            return Ok(manual.instance.clone());
        }

        let existing = self.inner.singletons.read().get(&canonical).cloned();
        let raw = match existing {
            Some(raw) => raw,
            None if self.inner.registry.contains(&canonical) => {
                let merged = self.inner.registry.merged(&canonical)?;
                if merged.is_abstract() {
                    return Err(DiError::validation(&canonical, "abstract definition cannot be instantiated"));
                }
                if merged.is_singleton() {
                    self.singleton(&canonical, &merged, ctx)?
                } else {
                    self.create(&canonical, &merged, ctx)?
                }
            }
            None => {
                return match &self.inner.parent {
                    Some(parent) => parent.get_component_in(name, &ctx.in_container(parent)),
                    None => Err(DiError::NotFound(bare.to_string())),
                };
            }
        };
        self.product_of(&canonical, raw, factory_deref)
    }

    fn singleton(&self, name: &str, merged: &ComponentDefinition, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        let _creation = self.inner.creation_lock.lock();
        // Double-checked: another thread may have finished while we waited
        if let Some(existing) = self.inner.singletons.read().get(name) {
            return Ok(existing.clone());
        }
        let instance = self.create(name, merged, ctx)?;
        self.inner.singletons.write().insert(name.to_string(), instance.clone());
        self.inner.creation_order.lock().push(name.to_string());
        tracing::debug!(component = name, "created singleton");
        Ok(instance)
    }

    fn create(&self, name: &str, merged: &ComponentDefinition, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        let _entered = ctx.stack().enter(name, self.config().max_resolution_depth)?;
        let _tracked = self.inner.in_creation.enter(name)?;
        let observers = &self.inner.observers;
        let started = observers.has_observers().then(|| {
            observers.resolving(name);
            Instant::now()
        });

        let child = ctx.for_component(name);
        match self.instantiate(name, merged, &child) {
            Ok(instance) => {
                if let Some(handle) = instance.downcast_ref::<FactoryHandle>() {
                    self.inner
                        .product_types
                        .write()
                        .insert(name.to_string(), handle.0.product_bindings());
                }
                if let Some(started) = started {
                    observers.resolved(name, started.elapsed());
                }
                Ok(instance)
            }
            Err(e) => {
                if started.is_some() {
                    observers.creation_failed(name, &e);
                }
                Err(DiError::creating(name, e))
            }
        }
    }

    fn instantiate(&self, name: &str, merged: &ComponentDefinition, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        match &merged.instantiation {
            Some(Instantiation::Constructor(ctor)) => ctor(ctx),
            Some(Instantiation::FactoryMethod { factory, method }) => {
                let host = self.get_component_in(factory, ctx)?;
                method(&host, ctx)
            }
            None => Err(DiError::validation(name, "definition has no instantiation strategy")),
        }
    }

    /// The product of a factory component unless the factory itself was asked for.
    fn product_of(&self, name: &str, raw: AnyArc, factory_deref: bool) -> DiResult<AnyArc> {
        let Some(handle) = raw.downcast_ref::<FactoryHandle>().cloned() else {
            if factory_deref {
                return Err(DiError::TypeMismatch {
                    name: name.to_string(),
                    expected: "component factory".to_string(),
                    actual: self.actual_type_name(name),
                });
            }
            return Ok(raw);
        };
        if factory_deref {
            return Ok(raw);
        }
        if !handle.0.is_singleton() {
            return handle.0.create().map_err(|e| DiError::creating(name, e));
        }
        if let Some(product) = self.inner.products.read().get(name) {
            return Ok(product.clone());
        }
        let _creation = self.inner.creation_lock.lock();
        if let Some(product) = self.inner.products.read().get(name) {
            return Ok(product.clone());
        }
        let product = handle.0.create().map_err(|e| DiError::creating(name, e))?;
        self.inner.products.write().insert(name.to_string(), product.clone());
        Ok(product)
    }

    /// Converts a raw instance of `name` to its view as `key`.
    pub(crate) fn cast_view(&self, name: &str, raw: &AnyArc, key: TypeKey) -> DiResult<AnyArc> {
        let name = self.inner.registry.canonical_name(name.strip_prefix('&').unwrap_or(name));
        if let Some(view) = self.binding_of(&name, key).and_then(|binding| binding.cast(raw)) {
            return Ok(view);
        }
        if Any::type_id(&**raw) == key.type_id() {
            return Ok(raw.clone());
        }
        Err(DiError::TypeMismatch {
            expected: key.display_name().to_string(),
            actual: self.actual_type_name(&name),
            name,
        })
    }

    fn binding_of(&self, name: &str, key: TypeKey) -> Option<TypeBinding> {
        if let Some(manual) = self.inner.manual.read().get(name) {
            return manual.binding_for(key).cloned();
        }
        if self.inner.registry.contains(name) {
            let merged = self.inner.registry.merged(name).ok()?;
            let declared = merged.binding_for(key).cloned();
            if declared.is_some() || !merged.is_factory_component() {
                return declared;
            }
            return self
                .inner
                .product_types
                .read()
                .get(name)
                .and_then(|bindings| bindings.iter().find(|b| b.key() == key).cloned());
        }
        self.inner.parent.as_ref().and_then(|parent| parent.binding_of(name, key))
    }

    fn actual_type_name(&self, name: &str) -> String {
        if let Some(manual) = self.inner.manual.read().get(name) {
            return manual.impl_type.display_name().to_string();
        }
        match self.definition(name).ok().and_then(|d| d.impl_type()) {
            Some(key) => key.display_name().to_string(),
            None => "<unknown>".to_string(),
        }
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Container Debug ===\n");
        s.push_str("Definitions:\n");
        for name in self.inner.registry.names().iter() {
            match self.inner.registry.merged(name) {
                Ok(merged) => s.push_str(&format!("  {name}: {merged}\n")),
                Err(e) => s.push_str(&format!("  {name}: <unmergeable: {e}>\n")),
            }
            let aliases = self.inner.registry.aliases_of(name);
            if !aliases.is_empty() {
                s.push_str(&format!("    aliases: {}\n", aliases.join(", ")));
            }
        }
        s.push_str("Singletons:\n");
        for name in self.inner.creation_order.lock().iter() {
            s.push_str(&format!("  {name}\n"));
        }
        for (name, manual) in self.inner.manual.read().iter() {
            s.push_str(&format!("  {name} (manual): {}\n", manual.impl_type));
        }
        s
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons.read().len())
            .field("manual_singletons", &self.inner.manual.read().len())
            .field("frozen", &self.inner.registry.is_frozen())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl Resolver for Container {
    fn resolve(&self, descriptor: &DependencyDescriptor) -> DiResult<Option<Resolved>> {
        self.resolve_dependency(descriptor, None)
    }

    fn get_component(&self, name: &str) -> DiResult<AnyArc> {
        let stack = CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, None);
        self.get_component_in(name, &ctx)
    }

    fn get_component_as(&self, name: &str, key: TypeKey) -> DiResult<AnyArc> {
        let raw = self.get_component(name)?;
        self.cast_view(name, &raw, key)
    }
}
