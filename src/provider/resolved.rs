//! Values produced by dependency resolution.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::provider::{Container, LazyProxy, ObjectProvider};
use crate::registration::AnyArc;

/// Outcome of resolving one injection point.
///
/// Instances are views: `Arc<T>` as `AnyArc` for concrete types and
/// `Arc<Arc<dyn I>>` for trait types. Use [`view_as`] or [`view_as_trait`]
/// to recover the typed handle.
pub enum Resolved {
    /// One instance
    Single(AnyArc),
    /// Array or collection elements, in injection order
    Many(Vec<AnyArc>),
    /// Component name to instance, in candidate order
    Map(IndexMap<String, AnyArc>),
    /// Single-use sequence
    Stream(ComponentStream),
    /// Deferred reference resolved on first use
    Lazy(LazyProxy),
    /// `Option<T>` injection point
    Optional(Option<Box<Resolved>>),
    /// Lookup handle with availability queries
    Provider(ObjectProvider),
    /// Lookup handle honouring the injection point's required-ness
    Supplier(ObjectProvider),
}

impl Resolved {
    /// The single instance, unwrapping `Optional`.
    pub fn into_single(self) -> Option<AnyArc> {
        match self {
            Resolved::Single(view) => Some(view),
            Resolved::Optional(inner) => inner.and_then(|r| r.into_single()),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resolved::Single(_) => "single",
            Resolved::Many(_) => "many",
            Resolved::Map(_) => "map",
            Resolved::Stream(_) => "stream",
            Resolved::Lazy(_) => "lazy",
            Resolved::Optional(_) => "optional",
            Resolved::Provider(_) => "provider",
            Resolved::Supplier(_) => "supplier",
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Many(items) => write!(f, "Resolved::Many({} items)", items.len()),
            Resolved::Map(items) => f.debug_tuple("Resolved::Map").field(&items.keys().collect::<Vec<_>>()).finish(),
            Resolved::Optional(inner) => f.debug_tuple("Resolved::Optional").field(inner).finish(),
            other => write!(f, "Resolved::{}", other.kind()),
        }
    }
}

/// Recovers a concrete view.
pub fn view_as<T: Send + Sync + 'static>(view: AnyArc) -> Option<Arc<T>> {
    view.downcast::<T>().ok()
}

/// Recovers a trait (or otherwise unsized) view.
pub fn view_as_trait<T: ?Sized + Send + Sync + 'static>(view: AnyArc) -> Option<Arc<T>> {
    view.downcast::<Arc<T>>().ok().map(|boxed| (*boxed).clone())
}

pub(crate) fn mismatch<T: ?Sized>(what: &str) -> DiError {
    DiError::TypeMismatch {
        name: what.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        actual: "<other>".to_string(),
    }
}

/// Converts a multi-value result to typed handles.
///
/// A component whose own type is the collection is returned as-is.
pub(crate) fn typed_many<T: ?Sized + Send + Sync + 'static>(
    resolved: Option<Resolved>,
    cast: fn(AnyArc) -> Option<Arc<T>>,
) -> DiResult<Vec<Arc<T>>> {
    match resolved {
        None => Ok(Vec::new()),
        Some(Resolved::Many(views)) => views
            .into_iter()
            .map(|v| cast(v).ok_or_else(|| mismatch::<T>("<element>")))
            .collect(),
        Some(Resolved::Single(view)) => view
            .downcast::<Vec<Arc<T>>>()
            .map(|list| (*list).clone())
            .map_err(|_| mismatch::<Vec<Arc<T>>>("<collection>")),
        Some(Resolved::Optional(inner)) => typed_many(inner.map(|b| *b), cast),
        Some(Resolved::Stream(stream)) => stream
            .map(|item| item.and_then(|v| cast(v).ok_or_else(|| mismatch::<T>("<element>"))))
            .collect(),
        Some(Resolved::Lazy(lazy)) => typed_many(Some(lazy.resolve()?), cast),
        Some(other) => Err(DiError::no_match(
            std::any::type_name::<T>(),
            format!("expected a collection, got {}", other.kind()),
        )),
    }
}

/// Converts a map result to typed handles.
pub(crate) fn typed_map<T: ?Sized + Send + Sync + 'static>(
    resolved: Option<Resolved>,
    cast: fn(AnyArc) -> Option<Arc<T>>,
) -> DiResult<IndexMap<String, Arc<T>>> {
    match resolved {
        None => Ok(IndexMap::new()),
        Some(Resolved::Map(views)) => views
            .into_iter()
            .map(|(name, v)| match cast(v) {
                Some(typed) => Ok((name, typed)),
                None => Err(mismatch::<T>(&name)),
            })
            .collect(),
        Some(Resolved::Single(view)) => view
            .downcast::<IndexMap<String, Arc<T>>>()
            .map(|map| (*map).clone())
            .map_err(|_| mismatch::<IndexMap<String, Arc<T>>>("<map>")),
        Some(Resolved::Optional(inner)) => typed_map(inner.map(|b| *b), cast),
        Some(Resolved::Lazy(lazy)) => typed_map(Some(lazy.resolve()?), cast),
        Some(other) => Err(DiError::no_match(
            std::any::type_name::<T>(),
            format!("expected a map, got {}", other.kind()),
        )),
    }
}

/// Converts a single-value result to a typed handle; `None` when absent.
pub(crate) fn typed_single<T: ?Sized + Send + Sync + 'static>(
    resolved: Option<Resolved>,
    cast: fn(AnyArc) -> Option<Arc<T>>,
) -> DiResult<Option<Arc<T>>> {
    let view = match resolved {
        None => return Ok(None),
        Some(Resolved::Lazy(lazy)) => return typed_single(Some(lazy.resolve()?), cast),
        Some(other) => match other.into_single() {
            Some(view) => view,
            None => return Ok(None),
        },
    };
    cast(view).map(Some).ok_or_else(|| mismatch::<T>("<resolved>"))
}

pub(crate) enum StreamItem {
    Ready(AnyArc),
    Deferred(String),
}

/// Finite, single-use sequence of matching instances.
///
/// Deferred entries are created as the stream is consumed. Components that
/// intentionally produced nothing are skipped. Once exhausted the stream
/// yields nothing more.
pub struct ComponentStream {
    container: Option<Container>,
    key: TypeKey,
    items: VecDeque<StreamItem>,
}

impl ComponentStream {
    pub(crate) fn new(container: Container, key: TypeKey, items: VecDeque<StreamItem>) -> Self {
        ComponentStream {
            container: Some(container),
            key,
            items,
        }
    }

    /// A stream that yields nothing.
    pub fn empty(key: TypeKey) -> Self {
        ComponentStream {
            container: None,
            key,
            items: VecDeque::new(),
        }
    }

    pub fn element_type(&self) -> TypeKey {
        self.key
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    /// Typed view over concrete elements.
    pub fn typed<T: Send + Sync + 'static>(self) -> TypedStream<T> {
        TypedStream::new(self, view_as::<T>)
    }

    /// Typed view over trait elements.
    pub fn typed_trait<T: ?Sized + Send + Sync + 'static>(self) -> TypedStream<T> {
        TypedStream::new(self, view_as_trait::<T>)
    }
}

impl Iterator for ComponentStream {
    type Item = DiResult<AnyArc>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.items.pop_front()? {
                StreamItem::Ready(view) => return Some(Ok(view)),
                StreamItem::Deferred(name) => {
                    let Some(container) = &self.container else {
                        continue;
                    };
                    match container.view_of_named(&name, self.key) {
                        Ok(Some(view)) => return Some(Ok(view)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
    }
}

impl fmt::Debug for ComponentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStream")
            .field("element", &self.key)
            .field("remaining", &self.items.len())
            .finish()
    }
}

/// [`ComponentStream`] yielding typed handles.
pub struct TypedStream<T: ?Sized> {
    inner: ComponentStream,
    cast: fn(AnyArc) -> Option<Arc<T>>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> TypedStream<T> {
    fn new(inner: ComponentStream, cast: fn(AnyArc) -> Option<Arc<T>>) -> Self {
        TypedStream {
            inner,
            cast,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Iterator for TypedStream<T> {
    type Item = DiResult<Arc<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let cast = self.cast;
        self.inner
            .next()
            .map(|item| item.and_then(|view| cast(view).ok_or_else(|| mismatch::<T>("<element>"))))
    }
}
