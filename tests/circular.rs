use autowire::{Container, ContainerConfig, DefinitionBuilder, DependencyDescriptor, DiError, Resolved, Resolver, Wrapper};
use std::sync::Arc;

#[allow(dead_code)]
struct A(Arc<B>);
#[allow(dead_code)]
struct B(Arc<A>);

#[allow(dead_code)]
struct Node {
    next: Option<Arc<Node>>,
}

#[test]
fn test_circular_dependency_detection() {
    let container = Container::new();
    container
        .register("a", DefinitionBuilder::<A>::new(|ctx| Ok(A(ctx.get::<B>()?))).build())
        .unwrap();
    container
        .register("b", DefinitionBuilder::<B>::new(|ctx| Ok(B(ctx.get::<A>()?))).build())
        .unwrap();

    match container.get::<A>() {
        Err(DiError::Circular(path)) => {
            // Full path, re-entered name last
            assert_eq!(path, vec!["a", "b", "a"]);
        }
        Err(other) => panic!("expected Circular, got {other}"),
        Ok(_) => panic!("expected circular dependency error"),
    }

    // Nothing half-built was cached
    assert!(!container.contains_singleton("a"));
    assert!(!container.contains_singleton("b"));
}

#[test]
fn test_circular_through_prototypes() {
    let container = Container::new();
    container
        .register(
            "a",
            DefinitionBuilder::<A>::new(|ctx| Ok(A(ctx.get::<B>()?))).prototype().build(),
        )
        .unwrap();
    container
        .register(
            "b",
            DefinitionBuilder::<B>::new(|ctx| Ok(B(ctx.get::<A>()?))).prototype().build(),
        )
        .unwrap();

    assert!(matches!(container.get::<B>(), Err(DiError::Circular(path)) if path == ["b", "a", "b"]));
}

#[test]
fn test_self_dependency_by_name() {
    let container = Container::new();
    container
        .register(
            "node",
            DefinitionBuilder::<Node>::new(|ctx| {
                Ok(Node {
                    next: Some(ctx.get_named::<Node>("node")?),
                })
            })
            .build(),
        )
        .unwrap();

    assert!(matches!(container.get::<Node>(), Err(DiError::Circular(path)) if path == ["node", "node"]));
}

#[test]
fn test_depth_limit() {
    let container = Container::with_config(ContainerConfig::default().max_resolution_depth(3));
    for i in 0..10 {
        container
            .register(
                format!("n{i}"),
                DefinitionBuilder::<Node>::new(move |ctx| {
                    let next = if i < 9 {
                        Some(ctx.get_named::<Node>(&format!("n{}", i + 1))?)
                    } else {
                        None
                    };
                    Ok(Node { next })
                })
                .prototype()
                .build(),
            )
            .unwrap();
    }

    assert!(matches!(container.get_named::<Node>("n0"), Err(DiError::DepthExceeded(3))));
    // Short chains stay within the limit
    assert!(container.get_named::<Node>("n7").is_ok());
}

#[test]
fn test_failed_creation_is_not_cached() {
    let container = Container::new();
    container
        .register("a", DefinitionBuilder::<A>::new(|ctx| Ok(A(ctx.get::<B>()?))).build())
        .unwrap();

    // B is missing: the failure is reported with the component being created
    let err = container.get::<A>().err().unwrap();
    assert_eq!(err.component_name(), Some("a"));

    // A failing dependency surfaces as the root cause
    container
        .register(
            "b",
            DefinitionBuilder::<B>::new(|_| {
                Err(DiError::Validation {
                    name: "b".into(),
                    reason: "not yet".into(),
                })
            })
            .build(),
        )
        .unwrap();
    let err = container.get::<A>().err().unwrap();
    assert!(matches!(err.root_cause(), DiError::Validation { .. }));
    assert!(!container.contains_singleton("a"));
}

#[allow(dead_code)]
struct Front(Arc<Back>);
#[allow(dead_code)]
struct Back(Arc<Front>);

fn back_needs_front(container: &Container) {
    container
        .register("back", DefinitionBuilder::<Back>::new(|ctx| Ok(Back(ctx.get::<Front>()?))).build())
        .unwrap();
}

fn assert_front_back_cycle(container: &Container) {
    match container.get::<Front>() {
        Err(DiError::Circular(path)) => assert_eq!(path, vec!["front", "back", "front"]),
        Err(other) => panic!("expected Circular, got {other}"),
        Ok(_) => panic!("expected circular dependency error"),
    }
    assert!(!container.contains_singleton("front"));
    assert!(!container.contains_singleton("back"));
}

#[test]
fn test_cycle_through_provider_used_in_constructor() {
    let container = Container::new();
    container
        .register(
            "front",
            DefinitionBuilder::<Front>::new(|ctx| {
                let descriptor = DependencyDescriptor::single::<Back>().wrapped(Wrapper::Provider);
                match ctx.resolve(&descriptor)? {
                    Some(Resolved::Provider(provider)) => Ok(Front(provider.get_typed::<Back>()?)),
                    other => panic!("expected a provider, got {other:?}"),
                }
            })
            .build(),
        )
        .unwrap();
    back_needs_front(&container);

    assert_front_back_cycle(&container);
}

#[test]
fn test_cycle_through_supplier_used_in_constructor() {
    let container = Container::new();
    container
        .register(
            "front",
            DefinitionBuilder::<Front>::new(|ctx| {
                let descriptor = DependencyDescriptor::single::<Back>().wrapped(Wrapper::Supplier);
                match ctx.resolve(&descriptor)? {
                    Some(Resolved::Supplier(supplier)) => Ok(Front(supplier.get_typed::<Back>()?)),
                    other => panic!("expected a supplier, got {other:?}"),
                }
            })
            .build(),
        )
        .unwrap();
    back_needs_front(&container);

    assert_front_back_cycle(&container);
}

#[test]
fn test_cycle_through_lazy_proxy_used_in_constructor() {
    let container = Container::new();
    container
        .register(
            "front",
            DefinitionBuilder::<Front>::new(|ctx| match ctx.resolve(&DependencyDescriptor::single::<Back>().lazy())? {
                Some(Resolved::Lazy(proxy)) => Ok(Front(proxy.get::<Back>()?)),
                other => panic!("expected a lazy proxy, got {other:?}"),
            })
            .build(),
        )
        .unwrap();
    back_needs_front(&container);

    assert_front_back_cycle(&container);
}

#[test]
fn test_cycle_through_unordered_stream_used_in_constructor() {
    trait Listener: Send + Sync {}

    struct Hub {
        listeners: usize,
    }
    #[allow(dead_code)]
    struct Echo(Arc<Hub>);
    impl Listener for Echo {}

    let container = Container::new();
    container
        .register(
            "hub",
            DefinitionBuilder::<Hub>::new(|ctx| {
                let listeners = ctx.stream_trait::<dyn Listener>()?.collect::<Result<Vec<_>, _>>()?;
                Ok(Hub {
                    listeners: listeners.len(),
                })
            })
            .build(),
        )
        .unwrap();
    container
        .register(
            "echo",
            DefinitionBuilder::<Echo>::new(|ctx| Ok(Echo(ctx.get::<Hub>()?)))
                .implements::<dyn Listener>(|c| c)
                .build(),
        )
        .unwrap();

    match container.get::<Hub>() {
        Err(DiError::Circular(path)) => assert_eq!(path, vec!["hub", "echo", "hub"]),
        Err(other) => panic!("expected Circular, got {other}"),
        Ok(hub) => panic!("expected circular dependency error, hub saw {} listeners", hub.listeners),
    }
}

#[test]
fn test_deferred_handles_work_once_construction_finished() {
    let container = Container::new();
    container
        .register("node", DefinitionBuilder::<Node>::new(|_| Ok(Node { next: None })).build())
        .unwrap();
    let descriptor = DependencyDescriptor::single::<Node>().wrapped(Wrapper::Provider);
    let Some(Resolved::Provider(provider)) = container.resolve(&descriptor).unwrap() else {
        panic!("expected a provider");
    };

    // The same handle resolves repeatedly outside any constructor
    let first = provider.get_typed::<Node>().unwrap();
    let second = provider.get_typed::<Node>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
