//! Core traits for the container and its collaborators.

mod collaborators;
mod dispose;
mod factory;
mod resolver;

pub use collaborators::{DefinitionSource, OrderSource, ProxyFactory, TargetSource};
pub use dispose::{Dispose, SmartInitializingSingleton};
pub use factory::ComponentFactory;
pub use resolver::Resolver;
