use autowire::{
    ComponentDefinition, Container, ContainerConfig, DefinitionBuilder, DefinitionSource, DependencyDescriptor,
    DiError, DiResult, Dispose, Lifetime, Resolver, Role,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Settings {
    level: u32,
}

fn settings(level: u32) -> ComponentDefinition {
    DefinitionBuilder::<Settings>::new(move |_| Ok(Settings { level })).build()
}

struct Tracked {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name);
    }
}

#[test]
fn test_register_then_lookup_returns_same_definition() {
    let container = Container::new();
    container.register("settings", settings(1)).unwrap();

    let raw = container.raw_definition("settings").unwrap();
    let merged = container.definition("settings").unwrap();
    assert!(Arc::ptr_eq(&raw, &merged));
    assert!(container.contains_definition("settings"));
    assert_eq!(container.definition_names(), vec!["settings"]);
    assert_eq!(container.definition_count(), 1);
}

#[test]
fn test_override_replaces_and_resets_singleton() {
    let container = Container::new();
    container.register("settings", settings(1)).unwrap();
    assert_eq!(container.get::<Settings>().unwrap().level, 1);

    container.register("settings", settings(2)).unwrap();
    assert!(!container.contains_singleton("settings"));
    assert_eq!(container.get::<Settings>().unwrap().level, 2);
    assert_eq!(container.definition_count(), 1);
}

#[test]
fn test_override_disallowed() {
    let container = Container::with_config(ContainerConfig::default().allow_definition_overriding(false));
    container.register("settings", settings(1)).unwrap();

    match container.register("settings", settings(2)) {
        Err(DiError::DuplicateDefinition { name, .. }) => assert_eq!(name, "settings"),
        other => panic!("expected DuplicateDefinition, got {other:?}"),
    }
    assert_eq!(container.get::<Settings>().unwrap().level, 1);
}

#[test]
fn test_lower_role_may_replace_framework_definition() {
    let container = Container::with_config(ContainerConfig::default().allow_definition_overriding(false));
    container
        .register(
            "settings",
            DefinitionBuilder::<Settings>::new(|_| Ok(Settings { level: 0 }))
                .role(Role::Infrastructure)
                .build(),
        )
        .unwrap();

    container.register("settings", settings(5)).unwrap();
    assert_eq!(container.get::<Settings>().unwrap().level, 5);
    assert_eq!(container.definition("settings").unwrap().role(), Role::Application);
}

#[test]
fn test_structurally_invalid_definitions() {
    let container = Container::new();

    assert!(matches!(container.register("", settings(1)), Err(DiError::Validation { .. })));
    assert!(matches!(
        container.register("orphan", ComponentDefinition::default()),
        Err(DiError::Validation { .. })
    ));
    assert!(matches!(
        container.register(
            "self",
            DefinitionBuilder::<Settings>::new(|_| Ok(Settings { level: 0 })).alias("self").build()
        ),
        Err(DiError::Validation { .. })
    ));
    assert_eq!(container.definition_count(), 0);
}

#[test]
fn test_remove_missing_is_not_found() {
    let container = Container::new();
    assert!(matches!(container.remove("ghost"), Err(DiError::NotFound(name)) if name == "ghost"));
}

#[test]
fn test_remove_parent_resets_descendants_and_disposes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let base_log = log.clone();
    let container = Container::new();
    container
        .register(
            "base",
            DefinitionBuilder::<Tracked>::new(move |_| {
                Ok(Tracked {
                    name: "instance",
                    log: base_log.clone(),
                })
            })
            .disposable()
            .build(),
        )
        .unwrap();
    container.register("child", ComponentDefinition::child_of("base")).unwrap();

    container.get_named::<Tracked>("base").unwrap();
    container.get_named::<Tracked>("child").unwrap();
    assert!(container.contains_singleton("child"));

    container.remove("base").unwrap();

    assert!(!container.contains_singleton("base"));
    assert!(!container.contains_singleton("child"));
    assert_eq!(log.lock().unwrap().len(), 2);
    assert!(!container.contains_definition("base"));
    assert!(matches!(container.get_named::<Tracked>("child"), Err(DiError::Validation { .. })));
}

#[test]
fn test_child_definition_inherits_from_abstract_template() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let container = Container::new();
    container
        .register(
            "template",
            DefinitionBuilder::<Settings>::new(move |_| {
                Ok(Settings {
                    level: counter.fetch_add(1, Ordering::SeqCst) as u32,
                })
            })
            .prototype()
            .make_abstract()
            .build(),
        )
        .unwrap();
    container
        .register("concrete", ComponentDefinition::child_of("template").with_primary(true))
        .unwrap();

    let merged = container.definition("concrete").unwrap();
    assert_eq!(merged.lifetime(), Lifetime::Prototype);
    assert!(merged.is_primary());
    assert!(!merged.is_abstract());

    // The template itself is never a candidate
    let a = container.get::<Settings>().unwrap();
    let b = container.get::<Settings>().unwrap();
    assert_ne!(a.level, b.level);

    assert!(matches!(
        container.get_named::<Settings>("template"),
        Err(DiError::Validation { .. })
    ));
    container.pre_instantiate_singletons().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_parent_is_reported_on_use() {
    let container = Container::new();
    container.register("child", ComponentDefinition::child_of("nowhere")).unwrap();

    assert!(matches!(container.definition("child"), Err(DiError::Validation { .. })));

    // A lenient type scan skips the broken definition, an eager one reports it
    let lenient = DependencyDescriptor::single::<Settings>().optional().not_eager();
    assert!(container.resolve(&lenient).unwrap().is_none());
    assert!(matches!(
        container.get_optional::<Settings>(),
        Err(DiError::Validation { .. })
    ));
}

#[test]
fn test_aliases_are_transitive_and_cycles_rejected() {
    let container = Container::new();
    container.register("settings", settings(3)).unwrap();
    container.register_alias("settings", "config").unwrap();
    container.register_alias("config", "cfg").unwrap();

    assert_eq!(container.get_named::<Settings>("cfg").unwrap().level, 3);
    assert_eq!(container.aliases("settings"), vec!["cfg", "config"]);

    assert!(matches!(
        container.register_alias("cfg", "settings"),
        Err(DiError::Validation { .. })
    ));
    assert!(matches!(
        container.register_alias("cfg", "config"),
        Err(DiError::Validation { .. })
    ));

    container.remove_alias("cfg").unwrap();
    assert!(matches!(container.get_named::<Settings>("cfg"), Err(DiError::NotFound(_))));
    assert!(matches!(container.remove_alias("cfg"), Err(DiError::NotFound(_))));
}

#[test]
fn test_freeze_and_implicit_unfreeze() {
    let container = Container::new();
    container.register("settings", settings(1)).unwrap();

    container.freeze();
    assert!(container.is_frozen());
    assert_eq!(container.get::<Settings>().unwrap().level, 1);

    container.register("other", DefinitionBuilder::<u8>::new(|_| Ok(1u8)).build()).unwrap();
    assert!(!container.is_frozen());
    assert_eq!(container.definition_names(), vec!["settings", "other"]);
}

#[test]
fn test_load_definitions_from_source() {
    struct Scanned;

    impl DefinitionSource for Scanned {
        fn definitions(&self) -> DiResult<Vec<(String, ComponentDefinition)>> {
            Ok(vec![
                ("settings".to_string(), settings(9)),
                ("flag".to_string(), DefinitionBuilder::<bool>::new(|_| Ok(true)).build()),
            ])
        }
    }

    let container = Container::new();
    assert_eq!(container.load_definitions(&Scanned).unwrap(), 2);
    assert_eq!(container.get::<Settings>().unwrap().level, 9);
    assert!(*container.get::<bool>().unwrap());
}

#[test]
fn test_destroy_singletons_in_reverse_creation_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::new();
    for name in ["first", "second", "third"] {
        let log = log.clone();
        container
            .register(
                name,
                DefinitionBuilder::<Tracked>::new(move |_| Ok(Tracked { name, log: log.clone() }))
                    .disposable()
                    .build(),
            )
            .unwrap();
    }

    container.get_named::<Tracked>("second").unwrap();
    container.get_named::<Tracked>("first").unwrap();
    container.get_named::<Tracked>("third").unwrap();

    container.destroy_singletons();
    assert_eq!(*log.lock().unwrap(), vec!["third", "first", "second"]);
    assert!(!container.contains_singleton("first"));

    // Definitions survive: instances are created again on demand
    container.get_named::<Tracked>("first").unwrap();
    assert!(container.contains_singleton("first"));
}
