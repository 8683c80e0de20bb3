use autowire::{
    AnyArc, Container, ContainerConfig, DefinitionBuilder, DependencyDescriptor, DiError, DiResult, Resolved,
    Resolver, SimpleTypeConverter, TypeConverter, TypeKey,
};
use std::sync::Arc;
use std::time::Duration;

fn literal<T: Send + Sync + 'static>(container: &Container, raw: &str) -> DiResult<Arc<T>> {
    match container.resolve(&DependencyDescriptor::literal::<T>(raw))? {
        Some(Resolved::Single(value)) => Ok(value.downcast::<T>().expect("converted to the requested type")),
        other => panic!("expected a single value, got {other:?}"),
    }
}

fn configured() -> Container {
    Container::with_config(
        ContainerConfig::default()
            .with_property("server.host", "localhost")
            .with_property("server.port", "8080")
            .with_property("feature.enabled", "on"),
    )
}

#[test]
fn test_literal_values_expand_placeholders() {
    let container = configured();

    assert_eq!(*literal::<u16>(&container, "${server.port}").unwrap(), 8080);
    assert!(*literal::<bool>(&container, "${feature.enabled}").unwrap());
    assert_eq!(
        literal::<String>(&container, "http://${server.host}:${server.port}/").unwrap().as_str(),
        "http://localhost:8080/"
    );
    assert_eq!(*literal::<u32>(&container, "${pool.size:16}").unwrap(), 16);
    assert_eq!(*literal::<i64>(&container, "-3").unwrap(), -3);
}

#[test]
fn test_unresolvable_placeholder_is_conversion_error() {
    let container = configured();
    match literal::<String>(&container, "${missing.key}") {
        Err(DiError::Conversion { reason, .. }) => assert!(reason.contains("missing.key")),
        other => panic!("expected Conversion, got {other:?}"),
    }
}

#[test]
fn test_unconvertible_value_is_conversion_error() {
    let container = configured();
    match literal::<u8>(&container, "${server.port}") {
        Err(DiError::Conversion { value, target, .. }) => {
            assert_eq!(value, "8080");
            assert_eq!(target, "u8");
        }
        other => panic!("expected Conversion, got {other:?}"),
    }
}

#[test]
fn test_literal_injected_into_constructor() {
    struct Server {
        port: u16,
    }

    let container = configured();
    container
        .register(
            "server",
            DefinitionBuilder::<Server>::new(|ctx| {
                let port = match ctx.resolve(&DependencyDescriptor::literal::<u16>("${server.port}"))? {
                    Some(Resolved::Single(value)) => value.downcast::<u16>().map(|p| *p).unwrap_or_default(),
                    _ => 0,
                };
                Ok(Server { port })
            })
            .build(),
        )
        .unwrap();

    assert_eq!(container.get::<Server>().unwrap().port, 8080);
}

#[test]
fn test_custom_converter_extends_simple_conversion() {
    struct DurationConverter;

    impl TypeConverter for DurationConverter {
        fn convert(&self, raw: &str, target: TypeKey) -> DiResult<AnyArc> {
            if target == TypeKey::of::<Duration>() {
                let secs = raw.trim().strip_suffix('s').unwrap_or(raw.trim());
                return secs
                    .parse::<u64>()
                    .map(|s| Arc::new(Duration::from_secs(s)) as AnyArc)
                    .map_err(|e| DiError::Conversion {
                        value: raw.to_string(),
                        target: "Duration".to_string(),
                        reason: e.to_string(),
                    });
            }
            SimpleTypeConverter.convert(raw, target)
        }
    }

    let container = Container::with_config(ContainerConfig::default().with_property("http.timeout", "30s"));
    assert!(literal::<Duration>(&container, "${http.timeout}").is_err());

    container.set_type_converter(Arc::new(DurationConverter));
    assert_eq!(
        *literal::<Duration>(&container, "${http.timeout}").unwrap(),
        Duration::from_secs(30)
    );
    assert_eq!(*literal::<u16>(&container, "443").unwrap(), 443);
}

#[test]
fn test_config_from_env() {
    std::env::set_var("AUTOWIRE_VALUES_TEST_ORDER_MULTI_VALUES", "false");
    std::env::set_var("AUTOWIRE_VALUES_TEST_SERVER_PORT", "9090");

    let config = ContainerConfig::from_env("autowire_values_test").unwrap();
    assert!(!config.order_multi_values);
    assert_eq!(config.property("server.port"), Some("9090"));

    let container = Container::with_config(config);
    assert_eq!(*literal::<u16>(&container, "${server.port}").unwrap(), 9090);

    std::env::remove_var("AUTOWIRE_VALUES_TEST_ORDER_MULTI_VALUES");
    std::env::remove_var("AUTOWIRE_VALUES_TEST_SERVER_PORT");
}

#[test]
fn test_config_from_env_rejects_bad_depth() {
    std::env::set_var("AUTOWIRE_BAD_DEPTH_TEST_MAX_RESOLUTION_DEPTH", "deep");
    let result = ContainerConfig::from_env("AUTOWIRE_BAD_DEPTH_TEST");
    std::env::remove_var("AUTOWIRE_BAD_DEPTH_TEST_MAX_RESOLUTION_DEPTH");

    assert!(matches!(result, Err(DiError::Conversion { .. })));
}

#[cfg(feature = "config")]
#[test]
fn test_config_from_json() {
    let config = ContainerConfig::from_json(
        r#"{
            "allow_definition_overriding": false,
            "max_resolution_depth": 8,
            "properties": { "server.port": "7070" }
        }"#,
    )
    .unwrap();
    assert!(!config.allow_definition_overriding);
    assert_eq!(config.max_resolution_depth, 8);

    let container = Container::with_config(config);
    assert_eq!(*literal::<u16>(&container, "${server.port}").unwrap(), 7070);

    assert!(matches!(
        ContainerConfig::from_json("{ not json"),
        Err(DiError::Conversion { .. })
    ));
}
