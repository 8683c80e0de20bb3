//! Component definitions and the builders that produce them.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::descriptors::Qualifier;
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::traits::{ComponentFactory, Dispose, SmartInitializingSingleton};

// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Builds a component instance, resolving its own dependencies through the context.
pub type Constructor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Builds a component by calling a method on another (factory) component.
pub type FactoryMethod =
    Arc<dyn for<'a> Fn(&AnyArc, &ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

type CastFn = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;
pub(crate) type InstanceHook = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// Marker instance for a component that intentionally produced nothing.
///
/// Multi-value injection filters these out; single-valued injection treats them
/// as "no match".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullComponent;

/// Returns true when the instance is the [`NullComponent`] marker.
#[inline]
pub fn is_null(instance: &AnyArc) -> bool {
    instance.is::<NullComponent>()
}

/// A type a component can be injected as, together with the view conversion.
///
/// Concrete bindings hand the stored `Arc<C>` out unchanged. Trait bindings
/// wrap the upcast `Arc<dyn I>` once more (`Arc<Arc<dyn I>>`) so the result
/// can still travel as `dyn Any`.
#[derive(Clone)]
pub struct TypeBinding {
    key: TypeKey,
    cast: CastFn,
}

impl TypeBinding {
    /// Binding for the concrete type itself.
    pub fn concrete<C: Send + Sync + 'static>() -> Self {
        TypeBinding {
            key: TypeKey::of::<C>(),
            cast: Arc::new(|instance: &AnyArc| {
                if instance.is::<C>() {
                    Some(instance.clone())
                } else {
                    None
                }
            }),
        }
    }

    /// Binding for an interface `I` implemented by `C`.
    pub fn upcast<C, I>(upcast: fn(Arc<C>) -> Arc<I>) -> Self
    where
        C: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        TypeBinding {
            key: TypeKey::of::<I>(),
            cast: Arc::new(move |instance: &AnyArc| {
                instance
                    .clone()
                    .downcast::<C>()
                    .ok()
                    .map(|concrete| Arc::new(upcast(concrete)) as AnyArc)
            }),
        }
    }

    /// Binding whose view is produced by an arbitrary conversion.
    pub fn custom<F>(key: TypeKey, cast: F) -> Self
    where
        F: Fn(&AnyArc) -> Option<AnyArc> + Send + Sync + 'static,
    {
        TypeBinding {
            key,
            cast: Arc::new(cast),
        }
    }

    /// The type this binding satisfies.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Converts a raw instance to this binding's view, or `None` if it does not fit.
    pub fn cast(&self, instance: &AnyArc) -> Option<AnyArc> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeBinding").field(&self.key).finish()
    }
}

/// Precomputed selection metadata supplied by the definition source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentMetadata {
    /// Qualifiers narrowing which injection points this component satisfies
    pub qualifiers: Vec<Qualifier>,
    /// Explicit position in ordered multi-value injection (lower = earlier)
    pub order: Option<i32>,
    /// Tie-break ordinal (lower = higher precedence)
    pub priority: Option<i32>,
}

impl ComponentMetadata {
    /// Order value used when sorting multi-value injection, falling back to priority.
    pub fn effective_order(&self) -> Option<i32> {
        self.order.or(self.priority)
    }
}

/// Who produced a definition. Higher roles are framework machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// User-defined component
    #[default]
    Application = 0,
    /// Supporting part of a larger configuration
    Support = 1,
    /// Entirely internal framework component
    Infrastructure = 2,
}

#[derive(Clone)]
pub(crate) enum Instantiation {
    Constructor(Constructor),
    FactoryMethod { factory: String, method: FactoryMethod },
}

impl Instantiation {
    fn same_as(&self, other: &Instantiation) -> bool {
        match (self, other) {
            (Instantiation::Constructor(a), Instantiation::Constructor(b)) => Arc::ptr_eq(a, b),
            (
                Instantiation::FactoryMethod { factory: fa, method: ma },
                Instantiation::FactoryMethod { factory: fb, method: mb },
            ) => fa == fb && Arc::ptr_eq(ma, mb),
            _ => false,
        }
    }
}

/// Wrapper stored as the raw instance of a factory component.
#[derive(Clone)]
pub(crate) struct FactoryHandle(pub(crate) Arc<dyn ComponentFactory>);

/// Metadata describing how to construct or obtain one named component.
///
/// Definitions are immutable once registered. A definition naming a parent
/// inherits every attribute it leaves unset; the container caches the merged
/// view and rebuilds it whenever the registry changes.
#[derive(Clone, Default)]
pub struct ComponentDefinition {
    pub(crate) bindings: Option<Vec<TypeBinding>>,
    pub(crate) impl_type: Option<TypeKey>,
    pub(crate) lifetime: Option<Lifetime>,
    pub(crate) lazy_init: Option<bool>,
    pub(crate) primary: bool,
    pub(crate) is_abstract: bool,
    pub(crate) instantiation: Option<Instantiation>,
    pub(crate) factory_component: bool,
    pub(crate) role: Role,
    pub(crate) metadata: Option<ComponentMetadata>,
    pub(crate) autowire_candidate: bool,
    pub(crate) parent_name: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) dispose_hook: Option<InstanceHook>,
    pub(crate) smart_init_hook: Option<InstanceHook>,
    pub(crate) description: Option<String>,
}

impl ComponentDefinition {
    /// A definition inheriting everything from `parent` until overridden.
    pub fn child_of(parent: impl Into<String>) -> Self {
        ComponentDefinition {
            parent_name: Some(parent.into()),
            autowire_candidate: true,
            ..Default::default()
        }
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_lazy_init(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_metadata(mut self, metadata: ComponentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.lifetime().is_singleton()
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_autowire_candidate(&self) -> bool {
        self.autowire_candidate
    }

    pub fn is_factory_component(&self) -> bool {
        self.factory_component
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    /// Name of the component whose factory method produces this one.
    pub fn factory_name(&self) -> Option<&str> {
        match &self.instantiation {
            Some(Instantiation::FactoryMethod { factory, .. }) => Some(factory),
            _ => None,
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn impl_type(&self) -> Option<TypeKey> {
        self.impl_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn metadata(&self) -> &ComponentMetadata {
        static EMPTY: ComponentMetadata = ComponentMetadata {
            qualifiers: Vec::new(),
            order: None,
            priority: None,
        };
        self.metadata.as_ref().unwrap_or(&EMPTY)
    }

    /// Declared type bindings; empty while the type is still unresolved.
    pub fn bindings(&self) -> &[TypeBinding] {
        self.bindings.as_deref().unwrap_or(&[])
    }

    /// True once the definition knows what it can be injected as.
    pub fn has_resolved_type(&self) -> bool {
        self.bindings.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn binding_for(&self, key: TypeKey) -> Option<&TypeBinding> {
        self.bindings().iter().find(|b| b.key() == key)
    }

    /// Structural checks run at registration time.
    pub(crate) fn validate(&self, name: &str) -> DiResult<()> {
        if name.trim().is_empty() {
            return Err(DiError::validation(name, "component name must not be empty"));
        }
        if self.instantiation.is_none() && !self.is_abstract && self.parent_name.is_none() {
            return Err(DiError::validation(
                name,
                "definition has no constructor, factory method or parent to inherit one from",
            ));
        }
        if self.parent_name.as_deref() == Some(name) {
            return Err(DiError::validation(name, "definition cannot be its own parent"));
        }
        if let Some(alias) = self.aliases.iter().find(|a| a.as_str() == name || a.trim().is_empty()) {
            return Err(DiError::validation(name, format!("invalid alias '{alias}'")));
        }
        Ok(())
    }

    /// Produces the merged view of `self` on top of an already merged parent.
    ///
    /// Attributes the child leaves unset are inherited; the abstract flag and
    /// aliases always belong to the child.
    pub(crate) fn merged_onto(&self, parent: &ComponentDefinition) -> ComponentDefinition {
        let inherits_instantiation = self.instantiation.is_none();
        ComponentDefinition {
            bindings: self.bindings.clone().or_else(|| parent.bindings.clone()),
            impl_type: self.impl_type.or(parent.impl_type),
            lifetime: self.lifetime.or(parent.lifetime),
            lazy_init: self.lazy_init.or(parent.lazy_init),
            primary: self.primary,
            is_abstract: self.is_abstract,
            instantiation: self.instantiation.clone().or_else(|| parent.instantiation.clone()),
            factory_component: if inherits_instantiation {
                parent.factory_component
            } else {
                self.factory_component
            },
            role: self.role,
            metadata: self.metadata.clone().or_else(|| parent.metadata.clone()),
            autowire_candidate: self.autowire_candidate,
            parent_name: self.parent_name.clone(),
            aliases: self.aliases.clone(),
            dispose_hook: self.dispose_hook.clone().or_else(|| parent.dispose_hook.clone()),
            smart_init_hook: self.smart_init_hook.clone().or_else(|| parent.smart_init_hook.clone()),
            description: self.description.clone().or_else(|| parent.description.clone()),
        }
    }

    /// Whether two definitions describe the same component.
    pub(crate) fn is_equivalent(&self, other: &ComponentDefinition) -> bool {
        let same_instantiation = match (&self.instantiation, &other.instantiation) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        };
        same_instantiation
            && self.impl_type == other.impl_type
            && self.lifetime == other.lifetime
            && self.lazy_init == other.lazy_init
            && self.primary == other.primary
            && self.is_abstract == other.is_abstract
            && self.role == other.role
            && self.metadata == other.metadata
            && self.autowire_candidate == other.autowire_candidate
            && self.parent_name == other.parent_name
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("impl_type", &self.impl_type)
            .field("bindings", &self.bindings)
            .field("lifetime", &self.lifetime())
            .field("lazy_init", &self.is_lazy_init())
            .field("primary", &self.primary)
            .field("abstract", &self.is_abstract)
            .field("factory_component", &self.factory_component)
            .field("factory_name", &self.factory_name())
            .field("role", &self.role)
            .field("metadata", &self.metadata)
            .field("parent", &self.parent_name)
            .finish()
    }
}

impl fmt::Display for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={}; lifetime={:?}; abstract={}; lazy={}; primary={}; role={:?}; parent={}",
            self.impl_type.map(|t| t.display_name()).unwrap_or("<unresolved>"),
            self.lifetime(),
            self.is_abstract,
            self.is_lazy_init(),
            self.primary,
            self.role,
            self.parent_name.as_deref().unwrap_or("<none>"),
        )
    }
}

/// Typed builder for a [`ComponentDefinition`] producing `C`.
///
/// # Examples
///
/// ```rust
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
/// let container = Container::new();
/// container
///     .register(
///         "english",
///         DefinitionBuilder::<English>::new(|_| Ok(English))
///             .implements::<dyn Greeter>(|c| c)
///             .primary()
///             .build(),
///     )
///     .unwrap();
///
/// let greeter = container.get_trait::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub struct DefinitionBuilder<C> {
    definition: ComponentDefinition,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> DefinitionBuilder<C> {
    /// Starts a definition whose instances are built by `ctor`.
    pub fn new<F>(ctor: F) -> Self
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<C> + Send + Sync + 'static,
    {
        let ctor: Constructor = Arc::new(move |ctx: &ResolverContext<'_>| ctor(ctx).map(|c| Arc::new(c) as AnyArc));
        Self::with_instantiation(Instantiation::Constructor(ctor))
    }

    /// Starts a definition whose constructor may decide to produce nothing.
    pub fn new_optional<F>(ctor: F) -> Self
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Option<C>> + Send + Sync + 'static,
    {
        let ctor: Constructor = Arc::new(move |ctx: &ResolverContext<'_>| {
            Ok(match ctor(ctx)? {
                Some(c) => Arc::new(c) as AnyArc,
                None => Arc::new(NullComponent) as AnyArc,
            })
        });
        Self::with_instantiation(Instantiation::Constructor(ctor))
    }

    /// Starts a definition produced by a method on the component named `factory`.
    pub fn factory_method<Fac, F>(factory: impl Into<String>, method: F) -> Self
    where
        Fac: Send + Sync + 'static,
        F: for<'a> Fn(&Fac, &ResolverContext<'a>) -> DiResult<C> + Send + Sync + 'static,
    {
        let factory = factory.into();
        let factory_name = factory.clone();
        let method: FactoryMethod = Arc::new(move |instance: &AnyArc, ctx: &ResolverContext<'_>| {
            let typed = instance.downcast_ref::<Fac>().ok_or_else(|| DiError::TypeMismatch {
                name: factory_name.clone(),
                expected: std::any::type_name::<Fac>().to_string(),
                actual: "<other>".to_string(),
            })?;
            method(typed, ctx).map(|c| Arc::new(c) as AnyArc)
        });
        Self::with_instantiation(Instantiation::FactoryMethod { factory, method })
    }

    fn with_instantiation(instantiation: Instantiation) -> Self {
        DefinitionBuilder {
            definition: ComponentDefinition {
                bindings: Some(vec![TypeBinding::concrete::<C>()]),
                impl_type: Some(TypeKey::of::<C>()),
                instantiation: Some(instantiation),
                autowire_candidate: true,
                ..Default::default()
            },
            _marker: PhantomData,
        }
    }

    /// Declares that `C` can be injected wherever `I` is required.
    pub fn implements<I>(mut self, upcast: fn(Arc<C>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.push_binding(TypeBinding::upcast::<C, I>(upcast));
        self
    }

    /// Called on the instance once every eager singleton exists.
    pub fn smart_initializing(mut self) -> Self
    where
        C: SmartInitializingSingleton,
    {
        self.definition.smart_init_hook = Some(Arc::new(|instance: &AnyArc| {
            if let Some(c) = instance.downcast_ref::<C>() {
                c.after_singletons_instantiated();
            }
        }));
        self
    }

    /// Called on the singleton when it is destroyed.
    pub fn disposable(mut self) -> Self
    where
        C: Dispose,
    {
        self.definition.dispose_hook = Some(Arc::new(|instance: &AnyArc| {
            if let Some(c) = instance.downcast_ref::<C>() {
                c.dispose();
            }
        }));
        self
    }
}

impl<F: ComponentFactory> DefinitionBuilder<F> {
    /// Starts a factory component: the container hands out what `F` produces,
    /// and `&name` yields the factory itself.
    ///
    /// The product type stays unresolved until declared with [`produces`](Self::produces)
    /// or discovered by instantiating the factory during an eager type scan.
    pub fn factory_component<Ctor>(ctor: Ctor) -> Self
    where
        Ctor: for<'a> Fn(&ResolverContext<'a>) -> DiResult<F> + Send + Sync + 'static,
    {
        let ctor: Constructor = Arc::new(move |ctx: &ResolverContext<'_>| {
            let factory = ctor(ctx)?;
            Ok(Arc::new(FactoryHandle(Arc::new(factory))) as AnyArc)
        });
        DefinitionBuilder {
            definition: ComponentDefinition {
                bindings: None,
                impl_type: Some(TypeKey::of::<F>()),
                instantiation: Some(Instantiation::Constructor(ctor)),
                factory_component: true,
                autowire_candidate: true,
                ..Default::default()
            },
            _marker: PhantomData,
        }
    }

    /// Declares a product type up front so type scans need not create the factory.
    pub fn produces(mut self, binding: TypeBinding) -> Self {
        self.push_binding(binding);
        self
    }
}

impl<C> DefinitionBuilder<C> {
    fn push_binding(&mut self, binding: TypeBinding) {
        let bindings = self.definition.bindings.get_or_insert_with(Vec::new);
        bindings.retain(|b| b.key() != binding.key());
        bindings.push(binding);
    }

    fn metadata_mut(&mut self) -> &mut ComponentMetadata {
        self.definition.metadata.get_or_insert_with(ComponentMetadata::default)
    }

    pub fn primary(mut self) -> Self {
        self.definition.primary = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.metadata_mut().priority = Some(priority);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.metadata_mut().order = Some(order);
        self
    }

    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.metadata_mut().qualifiers.push(qualifier);
        self
    }

    pub fn lazy(mut self) -> Self {
        self.definition.lazy_init = Some(true);
        self
    }

    pub fn prototype(self) -> Self {
        self.lifetime(Lifetime::Prototype)
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.definition.lifetime = Some(lifetime);
        self
    }

    /// Marks the definition as a template: never instantiated, only inherited from.
    pub fn make_abstract(mut self) -> Self {
        self.definition.is_abstract = true;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.definition.role = role;
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.definition.parent_name = Some(parent.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.definition.aliases.push(alias.into());
        self
    }

    /// Excludes the component from by-type candidate searches.
    pub fn not_autowire_candidate(mut self) -> Self {
        self.definition.autowire_candidate = false;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = Some(description.into());
        self
    }

    pub fn build(self) -> ComponentDefinition {
        self.definition
    }
}

/// A ready-made instance registered directly under a name.
///
/// Manual singletons have no definition: they are never primary, never merged,
/// and are consulted after definitions in type scans.
#[derive(Clone)]
pub struct SingletonInstance {
    pub(crate) instance: AnyArc,
    pub(crate) bindings: Vec<TypeBinding>,
    pub(crate) metadata: ComponentMetadata,
    pub(crate) impl_type: TypeKey,
}

impl SingletonInstance {
    pub fn new<C: Send + Sync + 'static>(value: Arc<C>) -> Self {
        SingletonInstance {
            instance: value,
            bindings: vec![TypeBinding::concrete::<C>()],
            metadata: ComponentMetadata::default(),
            impl_type: TypeKey::of::<C>(),
        }
    }

    pub fn implements<C, I>(mut self, upcast: fn(Arc<C>) -> Arc<I>) -> Self
    where
        C: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        self.bindings.push(TypeBinding::upcast::<C, I>(upcast));
        self
    }

    pub fn with_metadata(mut self, metadata: ComponentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn binding_for(&self, key: TypeKey) -> Option<&TypeBinding> {
        self.bindings.iter().find(|b| b.key() == key)
    }
}

impl fmt::Debug for SingletonInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonInstance")
            .field("impl_type", &self.impl_type)
            .field("bindings", &self.bindings)
            .field("metadata", &self.metadata)
            .finish()
    }
}
