//! Lifecycle capabilities a component can opt into.

/// Release resources when the container destroys a singleton.
///
/// Registered with [`DefinitionBuilder::disposable`](crate::DefinitionBuilder::disposable).
/// Called once, from `remove`, `destroy_singleton` or `destroy_singletons`.
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, Dispose, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static CLOSED: AtomicBool = AtomicBool::new(false);
///
/// struct Pool;
/// impl Dispose for Pool {
///     fn dispose(&self) {
///         CLOSED.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container
///     .register("pool", DefinitionBuilder::<Pool>::new(|_| Ok(Pool)).disposable().build())
///     .unwrap();
/// container.get::<Pool>().unwrap();
/// container.destroy_singleton("pool");
/// assert!(CLOSED.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Callback run once every eager singleton exists.
///
/// Invoked by `pre_instantiate_singletons` in registration order, after the
/// whole eager pass has finished.
pub trait SmartInitializingSingleton: Send + Sync + 'static {
    fn after_singletons_instantiated(&self);
}
