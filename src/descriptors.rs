//! Dependency descriptors: what an injection point requires.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::key::TypeKey;

/// Qualifier kind used when none is given explicitly.
pub const DEFAULT_QUALIFIER: &str = "qualifier";

/// Metadata narrowing which candidates satisfy an injection point.
///
/// A qualifier without a value matches any candidate carrying a qualifier of
/// the same kind. A default-kind qualifier with a value also matches a
/// candidate whose name or alias equals that value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub struct Qualifier {
    pub kind: String,
    pub value: Option<String>,
}

impl Qualifier {
    /// Default-kind qualifier with a value, e.g. `Qualifier::named("primaryDb")`.
    pub fn named(value: impl Into<String>) -> Self {
        Qualifier {
            kind: DEFAULT_QUALIFIER.to_string(),
            value: Some(value.into()),
        }
    }

    /// Marker qualifier of a custom kind.
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Qualifier {
            kind: kind.into(),
            value: None,
        }
    }

    pub fn with_value(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Qualifier {
            kind: kind.into(),
            value: Some(value.into()),
        }
    }

    pub fn is_default_kind(&self) -> bool {
        self.kind == DEFAULT_QUALIFIER
    }
}

/// Collection flavour of a collection-shaped injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Ordered sequence, duplicates kept
    List,
    /// Duplicate instances (by pointer identity) collapsed
    Set,
}

/// Generic shape of an injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyShape {
    Single,
    Array { element: TypeKey },
    Collection { element: TypeKey, kind: CollectionKind },
    Map { key: TypeKey, value: TypeKey },
    Stream { element: TypeKey, ordered: bool },
}

impl DependencyShape {
    /// Array, collection and map shapes. Streams are multi-value but are not
    /// subject to the multi-value fallback rules.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            DependencyShape::Array { .. } | DependencyShape::Collection { .. } | DependencyShape::Map { .. }
        )
    }

    /// Element (or map value) type driving the candidate search.
    pub fn element(&self) -> Option<TypeKey> {
        match *self {
            DependencyShape::Single => None,
            DependencyShape::Array { element }
            | DependencyShape::Collection { element, .. }
            | DependencyShape::Stream { element, .. } => Some(element),
            DependencyShape::Map { value, .. } => Some(value),
        }
    }
}

/// Wrapper around the injection point's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrapper {
    #[default]
    None,
    /// `Option<T>`: absence is `None`, never an error
    Optional,
    /// Deferred lookup handle with availability queries
    Provider,
    /// Deferred handle whose `get()` honours the descriptor's required-ness
    Supplier,
}

/// The requirement at one injection point.
///
/// # Examples
///
/// ```rust
/// use autowire::{DependencyDescriptor, DependencyShape, Qualifier};
///
/// trait Repo: Send + Sync {}
///
/// let single = DependencyDescriptor::single::<dyn Repo>()
///     .qualified(Qualifier::named("users"))
///     .named("repo");
/// assert!(single.is_required());
/// assert_eq!(single.dependency_name(), Some("repo"));
///
/// let all = DependencyDescriptor::list::<dyn Repo>().optional();
/// assert!(all.shape().is_multi_valued());
/// assert!(!all.is_required());
/// ```
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    dependency_type: TypeKey,
    shape: DependencyShape,
    wrapper: Wrapper,
    required: bool,
    eager: bool,
    lazy: bool,
    qualifiers: Vec<Qualifier>,
    dependency_name: Option<String>,
    literal: Option<String>,
    nesting_level: usize,
    pub(crate) fallback_match: bool,
    pub(crate) multi_element: bool,
    pub(crate) excludes_owner: bool,
}

impl DependencyDescriptor {
    fn with_shape(dependency_type: TypeKey, shape: DependencyShape) -> Self {
        DependencyDescriptor {
            dependency_type,
            shape,
            wrapper: Wrapper::None,
            required: true,
            eager: true,
            lazy: false,
            qualifiers: Vec::new(),
            dependency_name: None,
            literal: None,
            nesting_level: 1,
            fallback_match: false,
            multi_element: false,
            excludes_owner: false,
        }
    }

    /// A single value of type `key`.
    pub fn of_type(key: TypeKey) -> Self {
        Self::with_shape(key, DependencyShape::Single)
    }

    pub fn single<T: ?Sized + 'static>() -> Self {
        Self::of_type(TypeKey::of::<T>())
    }

    /// All `T` components as `Vec<Arc<T>>`.
    pub fn list<T: ?Sized + 'static>() -> Self {
        Self::with_shape(
            TypeKey::of::<Vec<Arc<T>>>(),
            DependencyShape::Collection {
                element: TypeKey::of::<T>(),
                kind: CollectionKind::List,
            },
        )
    }

    /// All distinct `T` instances.
    pub fn set<T: ?Sized + 'static>() -> Self {
        Self::with_shape(
            TypeKey::of::<Vec<Arc<T>>>(),
            DependencyShape::Collection {
                element: TypeKey::of::<T>(),
                kind: CollectionKind::Set,
            },
        )
    }

    /// All `T` components as `Box<[Arc<T>]>`.
    pub fn array<T: ?Sized + 'static>() -> Self {
        Self::with_shape(
            TypeKey::of::<Box<[Arc<T>]>>(),
            DependencyShape::Array {
                element: TypeKey::of::<T>(),
            },
        )
    }

    /// Name to instance map of all `T` components.
    pub fn map<T: ?Sized + 'static>() -> Self {
        Self::map_keyed::<String, T>()
    }

    /// Map with an arbitrary key type. Only textual keys ever match.
    pub fn map_keyed<K: 'static, T: ?Sized + 'static>() -> Self {
        Self::with_shape(
            TypeKey::of::<IndexMap<K, Arc<T>>>(),
            DependencyShape::Map {
                key: TypeKey::of::<K>(),
                value: TypeKey::of::<T>(),
            },
        )
    }

    /// Single-use sequence of `T` instances in candidate order.
    pub fn stream<T: ?Sized + 'static>() -> Self {
        Self::stream_of(TypeKey::of::<T>(), false)
    }

    /// Single-use sequence of `T` instances sorted by order value.
    pub fn ordered_stream<T: ?Sized + 'static>() -> Self {
        Self::stream_of(TypeKey::of::<T>(), true)
    }

    pub(crate) fn stream_of(element: TypeKey, ordered: bool) -> Self {
        Self::with_shape(element, DependencyShape::Stream { element, ordered })
    }

    /// A literal value of type `T`, converted from `raw` after placeholder expansion.
    pub fn literal<T: 'static>(raw: impl Into<String>) -> Self {
        let mut descriptor = Self::single::<T>();
        descriptor.literal = Some(raw.into());
        descriptor
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Lazily resolved: the caller receives a deferred handle.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Allows type scans for this injection point to skip instantiating
    /// factory components just to learn their product type.
    pub fn not_eager(mut self) -> Self {
        self.eager = false;
        self
    }

    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// Field or parameter name used by the by-name tie-break.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.dependency_name = Some(name.into());
        self
    }

    pub fn wrapped(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        if wrapper == Wrapper::Optional {
            self.required = false;
        }
        self
    }

    pub fn dependency_type(&self) -> TypeKey {
        self.dependency_type
    }

    pub fn shape(&self) -> DependencyShape {
        self.shape
    }

    pub fn wrapper(&self) -> Wrapper {
        self.wrapper
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    pub fn dependency_name(&self) -> Option<&str> {
        self.dependency_name.as_deref()
    }

    pub fn literal_value(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn nesting_level(&self) -> usize {
        self.nesting_level
    }

    pub fn is_multi_element(&self) -> bool {
        self.multi_element
    }

    /// Whether the component owning this point is left out of its candidates,
    /// even as a last resort. Set for the elements of lists, maps and streams.
    pub fn excludes_owner(&self) -> bool {
        self.excludes_owner
    }

    pub fn is_fallback_match(&self) -> bool {
        self.fallback_match
    }

    /// Same injection point with the relaxed qualifier match enabled.
    pub(crate) fn for_fallback_match(&self) -> Self {
        let mut descriptor = self.clone();
        descriptor.fallback_match = true;
        descriptor
    }

    /// Descriptor for one element of a multi-value injection point.
    pub(crate) fn for_element(&self, element: TypeKey) -> Self {
        DependencyDescriptor {
            dependency_type: element,
            shape: DependencyShape::Single,
            wrapper: Wrapper::None,
            nesting_level: self.nesting_level + 1,
            multi_element: true,
            excludes_owner: true,
            lazy: false,
            ..self.clone()
        }
    }

    /// Descriptor for the elements of a stream. Unlike [`for_element`](Self::for_element)
    /// the stream shape is kept, so unordered streams stay lazy.
    pub(crate) fn for_stream_element(&self, element: TypeKey) -> Self {
        DependencyDescriptor {
            dependency_type: element,
            wrapper: Wrapper::None,
            nesting_level: self.nesting_level + 1,
            excludes_owner: true,
            lazy: false,
            ..self.clone()
        }
    }

    /// Stream over the same requirement, used by object providers.
    pub(crate) fn as_stream(&self, ordered: bool) -> Self {
        DependencyDescriptor {
            shape: DependencyShape::Stream {
                element: self.dependency_type,
                ordered,
            },
            wrapper: Wrapper::None,
            lazy: false,
            ..self.clone()
        }
    }

    /// The wrapped requirement, one nesting level down.
    pub(crate) fn unwrapped(&self) -> Self {
        DependencyDescriptor {
            wrapper: Wrapper::None,
            nesting_level: self.nesting_level + 1,
            ..self.clone()
        }
    }

    /// Same requirement without the lazy marker, used by deferred handles.
    pub(crate) fn without_lazy(&self) -> Self {
        DependencyDescriptor {
            lazy: false,
            ..self.clone()
        }
    }
}
