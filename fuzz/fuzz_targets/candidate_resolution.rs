#![no_main]

use autowire::{Container, DefinitionBuilder, DiError, Resolver};
use libfuzzer_sys::fuzz_target;

trait Handler: Send + Sync {
    fn id(&self) -> usize;
}

struct Fixed(usize);

impl Handler for Fixed {
    fn id(&self) -> usize {
        self.0
    }
}

// Each 4-byte chunk describes one candidate: primary flag, priority, order
// and whether it is a prototype. Single resolution either picks a valid
// winner or reports one of the selection errors.
fuzz_target!(|data: &[u8]| {
    let container = Container::new();
    let mut specs = Vec::new();

    for (i, chunk) in data.chunks_exact(4).take(16).enumerate() {
        let primary = chunk[0] % 4 == 0;
        let priority = (chunk[1] % 3 != 0).then_some(chunk[1] as i32 % 5);
        let order = (chunk[2] % 2 == 0).then_some(chunk[2] as i32 - 128);

        let mut builder = DefinitionBuilder::<Fixed>::new(move |_| Ok(Fixed(i))).implements::<dyn Handler>(|c| c);
        if primary {
            builder = builder.primary();
        }
        if let Some(priority) = priority {
            builder = builder.priority(priority);
        }
        if let Some(order) = order {
            builder = builder.order(order);
        }
        if chunk[3] % 2 == 0 {
            builder = builder.prototype();
        }
        container.register(format!("h{i}"), builder.build()).unwrap();
        specs.push((primary, priority));
    }

    match container.get_trait::<dyn Handler>() {
        Ok(winner) => {
            let (primary, _) = specs[winner.id()];
            let primaries = specs.iter().filter(|(p, _)| *p).count();
            if primaries == 1 {
                assert!(primary);
            }
        }
        Err(DiError::NoMatchingComponent { .. }) => assert!(specs.is_empty()),
        Err(DiError::NoUniqueCandidate { .. })
        | Err(DiError::AmbiguousPrimary { .. })
        | Err(DiError::AmbiguousPriority { .. }) => assert!(specs.len() > 1),
        Err(other) => panic!("unexpected error: {other}"),
    }

    let all = container.get_all_trait::<dyn Handler>().unwrap();
    assert_eq!(all.len(), specs.len());
});
