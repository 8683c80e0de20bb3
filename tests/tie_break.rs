use autowire::{
    view_as_trait, Container, DefinitionBuilder, DependencyDescriptor, DiError, Resolved, Resolver,
};
use std::sync::Arc;

trait Store: Send + Sync {
    fn id(&self) -> &'static str;
}

struct Named(&'static str);

impl Store for Named {
    fn id(&self) -> &'static str {
        self.0
    }
}

fn store(id: &'static str) -> DefinitionBuilder<Named> {
    DefinitionBuilder::<Named>::new(move |_| Ok(Named(id))).implements::<dyn Store>(|c| c)
}

fn resolve_store(container: &Container, descriptor: &DependencyDescriptor) -> Arc<dyn Store> {
    match container.resolve(descriptor).unwrap() {
        Some(Resolved::Single(view)) => view_as_trait::<dyn Store>(view).unwrap(),
        other => panic!("expected a single store, got {other:?}"),
    }
}

#[test]
fn test_primary_wins_in_either_order() {
    let first = Container::new();
    first.register("a", store("a").build()).unwrap();
    first.register("b", store("b").primary().build()).unwrap();

    let second = Container::new();
    second.register("b", store("b").primary().build()).unwrap();
    second.register("a", store("a").build()).unwrap();

    assert_eq!(first.get_trait::<dyn Store>().unwrap().id(), "b");
    assert_eq!(second.get_trait::<dyn Store>().unwrap().id(), "b");
}

#[test]
fn test_by_name_fallback() {
    let container = Container::new();
    container.register("a", store("a").build()).unwrap();
    container.register("b", store("b").build()).unwrap();
    container.register("c", store("c").build()).unwrap();

    let descriptor = DependencyDescriptor::single::<dyn Store>().named("b");
    assert_eq!(resolve_store(&container, &descriptor).id(), "b");

    // Without a dependency name nothing decides
    match container.get_trait::<dyn Store>() {
        Err(DiError::NoUniqueCandidate { candidates, .. }) => assert_eq!(candidates, vec!["a", "b", "c"]),
        other => panic!("expected NoUniqueCandidate, got {:?}", other.map(|s| s.id())),
    }
}

#[test]
fn test_by_name_matches_alias() {
    let container = Container::new();
    container.register("a", store("a").build()).unwrap();
    container.register("b", store("b").alias("backup").build()).unwrap();

    let descriptor = DependencyDescriptor::single::<dyn Store>().named("backup");
    assert_eq!(resolve_store(&container, &descriptor).id(), "b");
}

#[test]
fn test_two_local_primaries_are_ambiguous() {
    let container = Container::new();
    container.register("a", store("a").primary().build()).unwrap();
    container.register("b", store("b").primary().build()).unwrap();

    match container.get_trait::<dyn Store>() {
        Err(DiError::AmbiguousPrimary { candidates, .. }) => assert_eq!(candidates, vec!["a", "b"]),
        other => panic!("expected AmbiguousPrimary, got {:?}", other.map(|s| s.id())),
    }
}

#[test]
fn test_lowest_priority_wins() {
    let container = Container::new();
    container.register("a", store("a").priority(5).build()).unwrap();
    container.register("b", store("b").priority(1).build()).unwrap();
    container.register("c", store("c").build()).unwrap();

    assert_eq!(container.get_trait::<dyn Store>().unwrap().id(), "b");
}

#[test]
fn test_priority_tie_is_ambiguous() {
    let container = Container::new();
    container.register("a", store("a").priority(1).build()).unwrap();
    container.register("b", store("b").priority(1).build()).unwrap();
    container.register("c", store("c").priority(2).build()).unwrap();

    match container.get_trait::<dyn Store>() {
        Err(DiError::AmbiguousPriority { priority, candidates, .. }) => {
            assert_eq!(priority, 1);
            assert_eq!(candidates, vec!["a", "b"]);
        }
        other => panic!("expected AmbiguousPriority, got {:?}", other.map(|s| s.id())),
    }
}

#[test]
fn test_primary_beats_priority() {
    let container = Container::new();
    container.register("a", store("a").priority(0).build()).unwrap();
    container.register("b", store("b").priority(10).primary().build()).unwrap();

    assert_eq!(container.get_trait::<dyn Store>().unwrap().id(), "b");
}

#[test]
fn test_local_primary_beats_parent_primary() {
    let parent = Container::new();
    parent.register("remote", store("remote").primary().build()).unwrap();

    let child = Container::with_parent(&parent);
    child.register("local", store("local").primary().build()).unwrap();

    assert_eq!(child.get_trait::<dyn Store>().unwrap().id(), "local");
    assert_eq!(parent.get_trait::<dyn Store>().unwrap().id(), "remote");
}

#[test]
fn test_parent_primary_beats_local_non_primary() {
    let parent = Container::new();
    parent.register("remote", store("remote").primary().build()).unwrap();

    let child = Container::with_parent(&parent);
    child.register("local", store("local").build()).unwrap();

    assert_eq!(child.get_trait::<dyn Store>().unwrap().id(), "remote");
}

#[test]
fn test_resolvable_dependency_wins_by_name_step() {
    let container = Container::new();
    container.register("a", store("a").build()).unwrap();
    container.register("b", store("b").build()).unwrap();
    container.register_resolvable_trait::<dyn Store>(Arc::new(Named("intrinsic")));

    assert_eq!(container.get_trait::<dyn Store>().unwrap().id(), "intrinsic");
}

#[test]
fn test_optional_single_still_reports_ambiguity() {
    let container = Container::new();
    container.register("a", store("a").build()).unwrap();
    container.register("b", store("b").build()).unwrap();

    assert!(matches!(
        container.get_optional_trait::<dyn Store>(),
        Err(DiError::NoUniqueCandidate { .. })
    ));
}

#[test]
fn test_resolve_named_reports_winner() {
    let container = Container::new();
    container.register("a", store("a").build()).unwrap();
    container.register("b", store("b").priority(3).build()).unwrap();

    let named = container.resolve_named_trait::<dyn Store>().unwrap();
    assert_eq!(named.name(), "b");
    assert_eq!(named.instance().id(), "b");

    let empty = Container::new();
    assert!(matches!(
        empty.resolve_named_trait::<dyn Store>(),
        Err(DiError::NoMatchingComponent { .. })
    ));
}

#[test]
fn test_resolve_named_skips_non_autowire_candidates() {
    let container = Container::new();
    container.register("hidden", store("hidden").not_autowire_candidate().build()).unwrap();
    container.register("visible", store("visible").build()).unwrap();

    let named = container.resolve_named_trait::<dyn Store>().unwrap();
    assert_eq!(named.name(), "visible");
    assert_eq!(container.get_trait::<dyn Store>().unwrap().id(), "visible");
}
