/// Property-based tests for registration and candidate selection
///
/// These tests check that the selection rules hold regardless of
/// registration order or the specific values involved.
use autowire::{Container, DefinitionBuilder, Resolver};
use proptest::prelude::*;
use std::sync::Arc;

trait Ranked: Send + Sync {
    fn index(&self) -> usize;
}

struct Item(usize);

impl Ranked for Item {
    fn index(&self) -> usize {
        self.0
    }
}

fn item(index: usize) -> DefinitionBuilder<Item> {
    DefinitionBuilder::<Item>::new(move |_| Ok(Item(index))).implements::<dyn Ranked>(|c| c)
}

fn order_and_primary() -> impl Strategy<Value = (Vec<usize>, usize)> {
    (2usize..7).prop_flat_map(|n| (Just((0..n).collect::<Vec<_>>()).prop_shuffle(), 0..n))
}

// Property: the primary candidate wins whatever the registration order
proptest! {
    #[test]
    fn primary_wins_regardless_of_order((order, primary) in order_and_primary()) {
        let container = Container::new();
        for &i in &order {
            let builder = item(i);
            let builder = if i == primary { builder.primary() } else { builder };
            container.register(format!("c{i}"), builder.build()).unwrap();
        }

        prop_assert_eq!(container.get_trait::<dyn Ranked>().unwrap().index(), primary);
    }
}

// Property: the unique lowest priority wins whatever the registration order
proptest! {
    #[test]
    fn lowest_priority_wins((order, winner) in order_and_primary()) {
        let container = Container::new();
        for &i in &order {
            let priority = if i == winner { -1 } else { i as i32 + 1 };
            container
                .register(format!("c{i}"), item(i).priority(priority).build())
                .unwrap();
        }

        prop_assert_eq!(container.get_trait::<dyn Ranked>().unwrap().index(), winner);
    }
}

// Property: registered definitions are returned unchanged, in registration order
proptest! {
    #[test]
    fn register_then_lookup(names in prop::collection::hash_set("[a-z]{1,12}", 1..12)) {
        let names: Vec<String> = names.into_iter().collect();
        let container = Container::new();
        for (i, name) in names.iter().enumerate() {
            container.register(name.as_str(), item(i).build()).unwrap();
        }

        prop_assert_eq!(container.definition_names(), names.clone());
        for (i, name) in names.iter().enumerate() {
            let raw = container.raw_definition(name).unwrap();
            let looked_up = container.definition(name).unwrap();
            prop_assert!(Arc::ptr_eq(&raw, &looked_up));
            prop_assert_eq!(container.get_named_trait::<dyn Ranked>(name).unwrap().index(), i);
        }
    }
}

// Property: collections are sorted by order value with a stable sort
proptest! {
    #[test]
    fn collections_sorted_by_order(orders in prop::collection::vec(prop::option::of(-20i32..20), 1..10)) {
        let container = Container::new();
        for (i, order) in orders.iter().enumerate() {
            let builder = item(i);
            let builder = match order {
                Some(order) => builder.order(*order),
                None => builder,
            };
            container.register(format!("c{i}"), builder.build()).unwrap();
        }

        let mut expected: Vec<usize> = (0..orders.len()).collect();
        expected.sort_by_key(|&i| orders[i].unwrap_or(i32::MAX));

        let actual: Vec<usize> = container
            .get_all_trait::<dyn Ranked>()
            .unwrap()
            .iter()
            .map(|r| r.index())
            .collect();
        prop_assert_eq!(actual, expected);
    }
}

// Property: optional lookups mirror registration state
proptest! {
    #[test]
    fn optional_resolution_behavior(register in any::<bool>()) {
        let container = Container::new();
        if register {
            container.register("only", item(0).build()).unwrap();
        }

        let optional = container.get_optional_trait::<dyn Ranked>().unwrap();
        prop_assert_eq!(optional.is_some(), register);
        prop_assert_eq!(container.get_trait::<dyn Ranked>().is_ok(), register);
        prop_assert_eq!(container.get_all_trait::<dyn Ranked>().unwrap().len(), usize::from(register));
    }
}
