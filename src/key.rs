//! Type keys used to index component bindings.

use std::any::TypeId;
use std::fmt;

/// Key identifying a type a component can be injected as.
///
/// A key is either a concrete type (`Database`) or a trait object
/// (`dyn Greeter`). Both are `'static` and have a `TypeId`, so one key type
/// covers them; the name is kept for diagnostics only.
///
/// # Examples
///
/// ```rust
/// use autowire::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let concrete = TypeKey::of::<String>();
/// let abstract_ = TypeKey::of::<dyn Greeter>();
///
/// assert_eq!(concrete, TypeKey::of::<String>());
/// assert_ne!(concrete, abstract_);
/// assert!(concrete.is_textual());
/// assert!(abstract_.display_name().contains("Greeter"));
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`, which may be unsized (`dyn Trait`, `str`).
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` this key compares by.
    #[inline(always)]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Get the type name for display
    ///
    /// This is the `std::any::type_name` result and is not guaranteed to be
    /// stable across compiler versions.
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    /// Whether a map keyed by this type can be keyed by component name.
    pub fn is_textual(&self) -> bool {
        self.id == TypeId::of::<String>()
            || self.id == TypeId::of::<str>()
            || self.id == TypeId::of::<std::sync::Arc<str>>()
            || self.id == TypeId::of::<&'static str>()
    }
}

// Hot path: TypeId-only comparison (ignore string for performance)
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// Helper function for creating type keys
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> TypeKey {
    TypeKey::of::<T>()
}
