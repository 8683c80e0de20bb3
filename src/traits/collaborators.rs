//! Contracts for the collaborators around the resolution core.

use std::sync::Arc;

use crate::error::DiResult;
use crate::key::TypeKey;
use crate::registration::{AnyArc, ComponentDefinition};

/// Supplies component definitions, e.g. from scanning or a configuration loader.
pub trait DefinitionSource {
    /// Definitions in the order they should be registered.
    fn definitions(&self) -> DiResult<Vec<(String, ComponentDefinition)>>;
}

/// Lazily supplies the real object behind a deferred reference.
pub trait TargetSource: Send + Sync {
    /// Type the target is injected as.
    fn target_type(&self) -> TypeKey;

    /// Resolves (or returns the cached) target view.
    fn target(&self) -> DiResult<AnyArc>;
}

/// Turns a target source into an object implementing the requested interface.
///
/// The returned value must be a view of the target type: `Arc<Arc<dyn I>>`
/// for trait targets, `Arc<T>` for concrete ones.
///
/// # Examples
///
/// ```
/// use autowire::{AnyArc, DiResult, ProxyFactory, TargetSource};
/// use std::sync::Arc;
///
/// trait Mailer: Send + Sync {
///     fn send(&self, to: &str) -> String;
/// }
///
/// struct DeferredMailer(Arc<dyn TargetSource>);
///
/// impl Mailer for DeferredMailer {
///     fn send(&self, to: &str) -> String {
///         match self.0.target() {
///             Ok(view) => match view.downcast::<Arc<dyn Mailer>>() {
///                 Ok(real) => real.send(to),
///                 Err(_) => "wrong target".to_string(),
///             },
///             Err(e) => e.to_string(),
///         }
///     }
/// }
///
/// struct MailerProxies;
///
/// impl ProxyFactory for MailerProxies {
///     fn create_proxy(&self, target: Arc<dyn TargetSource>) -> DiResult<AnyArc> {
///         let proxy: Arc<dyn Mailer> = Arc::new(DeferredMailer(target));
///         Ok(Arc::new(proxy))
///     }
/// }
/// ```
pub trait ProxyFactory: Send + Sync {
    fn create_proxy(&self, target: Arc<dyn TargetSource>) -> DiResult<AnyArc>;
}

/// Optionally yields an explicit order for a raw instance.
///
/// Consulted for multi-value ordering when the candidate's metadata carries
/// neither an order nor a priority.
pub trait OrderSource: Send + Sync {
    fn order_of(&self, instance: &AnyArc) -> Option<i32>;
}
