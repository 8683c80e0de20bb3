#![no_main]

use autowire::{ComponentDefinition, Container, DefinitionBuilder, DiError, Resolver};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn name(byte: u8) -> &'static str {
    NAMES[byte as usize % NAMES.len()]
}

// Arbitrary sequences of registry operations must never panic, and lookups
// must agree with what was registered.
fuzz_target!(|data: &[u8]| {
    let container = Container::new();

    for op in data.chunks_exact(3) {
        let (first, second) = (name(op[1]), name(op[2]));
        match op[0] % 8 {
            0 => {
                let value = op[1] as u32;
                let _ = container.register(first, DefinitionBuilder::<u32>::new(move |_| Ok(value)).build());
            }
            1 => {
                let _ = container.register(first, ComponentDefinition::child_of(second));
            }
            2 => {
                let _ = container.register_alias(first, second);
            }
            3 => {
                let _ = container.remove_alias(first);
            }
            4 => {
                let _ = container.remove(first);
            }
            5 => match container.get_named::<u32>(first) {
                Ok(_) => assert!(container.contains_definition(first) || container.contains_singleton(first)),
                Err(DiError::NotFound(_)) => {}
                Err(_) => {}
            },
            6 => {
                let _ = container.get_all::<u32>();
                let _ = container.get_optional::<u32>();
            }
            _ => {
                if op[1] % 2 == 0 {
                    container.freeze();
                } else {
                    container.destroy_singletons();
                }
            }
        }
    }

    for name in container.definition_names() {
        assert!(container.raw_definition(&name).is_some());
    }
});
