//! # autowire
//!
//! Dependency-injection resolution engine: given named component definitions
//! and injection points, decides which instance satisfies each point.
//!
//! ## Features
//!
//! - **Typed candidate resolution**: concrete and trait-object injection points
//! - **Qualifiers and tie-breaking**: primary flag, priority, then name match
//! - **Multi-value injection**: arrays, lists, sets, name-keyed maps and streams, ordered by metadata
//! - **Lazy injection**: deferred handles and pluggable proxy factories
//! - **Circular dependency detection**: fails fast with the full creation path
//! - **Container hierarchies**: child containers fall back to their parent
//! - **Thread-safe**: singletons are created exactly once under concurrent access
//!
//! ## Quick Start
//!
//! ```rust
//! use autowire::{Container, DefinitionBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register(
//!         "database",
//!         DefinitionBuilder::<Database>::new(|_| {
//!             Ok(Database { connection_string: "postgres://localhost".to_string() })
//!         })
//!         .build(),
//!     )
//!     .unwrap();
//! container
//!     .register(
//!         "userService",
//!         DefinitionBuilder::<UserService>::new(|ctx| Ok(UserService { db: ctx.get::<Database>()? })).build(),
//!     )
//!     .unwrap();
//!
//! container.pre_instantiate_singletons().unwrap();
//! let users = container.get_required::<UserService>();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Tie-breaking
//!
//! ```rust
//! use autowire::{Container, DefinitionBuilder, Resolver};
//!
//! trait Store: Send + Sync {
//!     fn id(&self) -> &'static str;
//! }
//!
//! struct Disk;
//! impl Store for Disk {
//!     fn id(&self) -> &'static str { "disk" }
//! }
//!
//! struct Memory;
//! impl Store for Memory {
//!     fn id(&self) -> &'static str { "memory" }
//! }
//!
//! let container = Container::new();
//! container
//!     .register("disk", DefinitionBuilder::<Disk>::new(|_| Ok(Disk)).implements::<dyn Store>(|c| c).build())
//!     .unwrap();
//! container
//!     .register(
//!         "memory",
//!         DefinitionBuilder::<Memory>::new(|_| Ok(Memory)).implements::<dyn Store>(|c| c).primary().build(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(container.get_trait::<dyn Store>().unwrap().id(), "memory");
//! ```
//!
//! ## Descriptors
//!
//! Every typed helper on [`Resolver`] builds a [`DependencyDescriptor`] and
//! calls [`Resolver::resolve`]. Build descriptors directly for qualifiers,
//! by-name fallback, wrappers, lazy points and literal values:
//!
//! ```rust
//! use autowire::{Container, ContainerConfig, DependencyDescriptor, Resolved, Resolver};
//!
//! let container = Container::with_config(ContainerConfig::default().with_property("server.port", "8080"));
//! let port = container.resolve(&DependencyDescriptor::literal::<u16>("${server.port}")).unwrap();
//! let Some(Resolved::Single(port)) = port else { panic!("expected a value") };
//! assert_eq!(*port.downcast::<u16>().unwrap(), 8080);
//! ```

// Module declarations
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod provider;
pub mod registration;
pub mod traits;
pub mod value;

// Internal modules
mod internal;
mod registry;

// Re-exports
pub use config::ContainerConfig;
pub use descriptors::{CollectionKind, DependencyDescriptor, DependencyShape, Qualifier, Wrapper, DEFAULT_QUALIFIER};
pub use error::{DiError, DiResult};
pub use key::{key_of_type, TypeKey};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver};
pub use provider::{
    view_as, view_as_trait, Candidate, CandidateSet, ComponentStream, Container, LazyProxy, NamedComponent,
    ObjectProvider, Resolved, ResolverContext, TypedStream,
};
pub use registration::{
    is_null, AnyArc, ComponentDefinition, ComponentMetadata, Constructor, DefinitionBuilder, FactoryMethod,
    NullComponent, Role, SingletonInstance, TypeBinding,
};
pub use traits::{
    ComponentFactory, DefinitionSource, Dispose, OrderSource, ProxyFactory, Resolver, SmartInitializingSingleton,
    TargetSource,
};
pub use value::{resolve_placeholders, SimpleTypeConverter, TypeConverter};
