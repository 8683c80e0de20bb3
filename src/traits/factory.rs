//! Factory components: components that produce other components.

use crate::error::DiResult;
use crate::registration::{AnyArc, TypeBinding};

/// A component whose purpose is to produce another object.
///
/// Looking up a factory component by `name` yields its product; `&name`
/// yields the factory itself.
///
/// # Examples
///
/// ```
/// use autowire::{AnyArc, ComponentFactory, Container, DefinitionBuilder, DiResult, Resolver, TypeBinding};
/// use std::sync::Arc;
///
/// struct Connection { url: String }
///
/// struct ConnectionFactory { url: String }
///
/// impl ComponentFactory for ConnectionFactory {
///     fn create(&self) -> DiResult<AnyArc> {
///         Ok(Arc::new(Connection { url: self.url.clone() }))
///     }
///     fn product_bindings(&self) -> Vec<TypeBinding> {
///         vec![TypeBinding::concrete::<Connection>()]
///     }
/// }
///
/// let container = Container::new();
/// container
///     .register(
///         "connection",
///         DefinitionBuilder::<ConnectionFactory>::factory_component(|_| {
///             Ok(ConnectionFactory { url: "db://main".into() })
///         })
///         .build(),
///     )
///     .unwrap();
///
/// let conn = container.get::<Connection>().unwrap();
/// assert_eq!(conn.url, "db://main");
/// assert!(container.get_factory("&connection").is_ok());
/// ```
pub trait ComponentFactory: Send + Sync + 'static {
    /// Produces the object. Returned as the raw instance (`Arc<P>` as `AnyArc`).
    fn create(&self) -> DiResult<AnyArc>;

    /// Types the product can be injected as.
    fn product_bindings(&self) -> Vec<TypeBinding>;

    /// Whether the product is created once and cached.
    fn is_singleton(&self) -> bool {
        true
    }

    /// Whether `pre_instantiate_singletons` should also create the product.
    fn is_eager_init(&self) -> bool {
        false
    }
}
