//! Definition registry: names, definitions, aliases and the merged view cache.

pub(crate) mod type_index;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{DiError, DiResult};
use crate::internal::FastMap;
use crate::registration::ComponentDefinition;

pub(crate) use type_index::{NameList, TypeIndex};

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registered {
    New,
    Replaced,
}

/// Mapping from component name to definition.
///
/// Reads never block on each other. Writers are serialized by `writer`, and
/// the ordered name list is copy-on-write so a reader holding a snapshot never
/// observes a partial update.
pub(crate) struct Registry {
    allow_overriding: bool,
    definitions: RwLock<FastMap<String, Arc<ComponentDefinition>>>,
    names: RwLock<NameList>,
    frozen: RwLock<Option<NameList>>,
    aliases: RwLock<FastMap<String, String>>,
    merged: RwLock<FastMap<String, Arc<ComponentDefinition>>>,
    generation: AtomicU64,
    writer: Mutex<()>,
    pub(crate) types: TypeIndex,
}

impl Registry {
    pub(crate) fn new(allow_overriding: bool) -> Self {
        Registry {
            allow_overriding,
            definitions: RwLock::new(FastMap::default()),
            names: RwLock::new(Arc::new(Vec::new())),
            frozen: RwLock::new(None),
            aliases: RwLock::new(FastMap::default()),
            merged: RwLock::new(FastMap::default()),
            generation: AtomicU64::new(0),
            writer: Mutex::new(()),
            types: TypeIndex::default(),
        }
    }

    pub(crate) fn register(&self, name: &str, definition: ComponentDefinition) -> DiResult<Registered> {
        definition.validate(name)?;
        let _writer = self.writer.lock();

        if let Some(target) = self.aliases.read().get(name).cloned() {
            if !self.allow_overriding {
                return Err(DiError::DuplicateDefinition {
                    name: name.to_string(),
                    existing: format!("alias for '{target}'"),
                });
            }
            tracing::debug!(component = name, alias_of = %target, "definition replaces alias");
        }
        self.aliases.write().remove(name);

        let existing = self.definitions.read().get(name).cloned();
        let outcome = match existing {
            Some(existing) => {
                if !self.allow_overriding {
                    if existing.role() > definition.role() {
                        tracing::debug!(
                            component = name,
                            existing_role = ?existing.role(),
                            new_role = ?definition.role(),
                            "replacing framework-generated definition"
                        );
                    } else {
                        return Err(DiError::DuplicateDefinition {
                            name: name.to_string(),
                            existing: existing.to_string(),
                        });
                    }
                } else if existing.role() < definition.role() {
                    tracing::info!(
                        component = name,
                        existing = %existing,
                        replacement = %definition,
                        "overriding user-defined definition with a framework-generated one"
                    );
                } else if !definition.is_equivalent(&existing) {
                    tracing::debug!(
                        component = name,
                        existing = %existing,
                        replacement = %definition,
                        "overriding definition"
                    );
                } else {
                    tracing::trace!(component = name, "overriding definition with an equivalent one");
                }
                Registered::Replaced
            }
            None => Registered::New,
        };

        let own_aliases = definition.aliases().to_vec();
        self.definitions.write().insert(name.to_string(), Arc::new(definition));
        if outcome == Registered::New {
            // Readers iterating the name list always find the definition
            let mut names = (**self.names.read()).clone();
            names.push(name.to_string());
            *self.names.write() = Arc::new(names);
            *self.frozen.write() = None;
            tracing::debug!(component = name, "registered definition");
        }
        for alias in own_aliases {
            self.insert_alias(name, &alias)?;
        }
        self.invalidate();
        Ok(outcome)
    }

    pub(crate) fn remove(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        let _writer = self.writer.lock();
        if !self.definitions.read().contains_key(name) {
            return Err(DiError::NotFound(name.to_string()));
        }

        let names: Vec<String> = self.names.read().iter().filter(|n| *n != name).cloned().collect();
        *self.names.write() = Arc::new(names);
        *self.frozen.write() = None;
        let removed = self
            .definitions
            .write()
            .remove(name)
            .ok_or_else(|| DiError::NotFound(name.to_string()))?;
        self.invalidate();
        tracing::debug!(component = name, "removed definition");
        Ok(removed)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    pub(crate) fn raw(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.definitions.read().get(name).cloned()
    }

    /// Merged view of `name` with its parent chain, cached until the next mutation.
    pub(crate) fn merged(&self, name: &str) -> DiResult<Arc<ComponentDefinition>> {
        if let Some(merged) = self.merged.read().get(name) {
            return Ok(merged.clone());
        }
        let generation = self.generation.load(Ordering::Acquire);
        let mut chain = Vec::new();
        let merged = self.merge(name, &mut chain)?;

        let mut cache = self.merged.write();
        if self.generation.load(Ordering::Acquire) == generation {
            cache.insert(name.to_string(), merged.clone());
        }
        Ok(merged)
    }

    fn merge(&self, name: &str, chain: &mut Vec<String>) -> DiResult<Arc<ComponentDefinition>> {
        if let Some(merged) = self.merged.read().get(name) {
            return Ok(merged.clone());
        }
        let raw = self.raw(name).ok_or_else(|| DiError::NotFound(name.to_string()))?;
        let Some(parent) = raw.parent_name() else {
            return Ok(raw);
        };

        chain.push(name.to_string());
        let parent = self.canonical_name(parent);
        if chain.iter().any(|n| *n == parent) {
            return Err(DiError::validation(
                name,
                format!("circular parent chain through '{parent}'"),
            ));
        }
        let parent_view = self.merge(&parent, chain).map_err(|e| match e {
            DiError::NotFound(_) => {
                DiError::validation(name, format!("parent definition '{parent}' not found"))
            }
            other => other,
        })?;
        Ok(Arc::new(raw.merged_onto(&parent_view)))
    }

    /// Definition names in registration order.
    pub(crate) fn names(&self) -> NameList {
        if let Some(frozen) = self.frozen.read().as_ref() {
            return frozen.clone();
        }
        self.names.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.names.read().len()
    }

    pub(crate) fn freeze(&self) {
        let _writer = self.writer.lock();
        *self.frozen.write() = Some(self.names.read().clone());
        self.invalidate();
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.read().is_some()
    }

    /// Raw definitions naming `name` as their parent.
    pub(crate) fn children_of(&self, name: &str) -> Vec<String> {
        let definitions = self.definitions.read();
        self.names
            .read()
            .iter()
            .filter(|n| {
                definitions
                    .get(n.as_str())
                    .and_then(|d| d.parent_name())
                    .is_some_and(|p| p == name)
            })
            .cloned()
            .collect()
    }

    pub(crate) fn register_alias(&self, name: &str, alias: &str) -> DiResult<()> {
        let _writer = self.writer.lock();
        self.insert_alias(name, alias)?;
        self.invalidate();
        Ok(())
    }

    fn insert_alias(&self, name: &str, alias: &str) -> DiResult<()> {
        if alias.trim().is_empty() {
            return Err(DiError::validation(name, "alias must not be empty"));
        }
        if alias == name {
            self.aliases.write().remove(alias);
            return Ok(());
        }
        if self.definitions.read().contains_key(alias) {
            return Err(DiError::validation(
                alias,
                format!("cannot alias '{name}': a definition with this name exists"),
            ));
        }
        if let Some(existing) = self.aliases.read().get(alias) {
            if existing == name {
                return Ok(());
            }
            if !self.allow_overriding {
                return Err(DiError::validation(
                    alias,
                    format!("alias already registered for '{existing}'"),
                ));
            }
        }
        if self.chain_passes(name, alias) {
            return Err(DiError::validation(
                alias,
                format!("circular alias reference with '{name}'"),
            ));
        }
        self.aliases.write().insert(alias.to_string(), name.to_string());
        tracing::trace!(component = name, alias, "registered alias");
        Ok(())
    }

    pub(crate) fn remove_alias(&self, alias: &str) -> DiResult<()> {
        let _writer = self.writer.lock();
        self.aliases
            .write()
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| DiError::NotFound(alias.to_string()))?;
        self.invalidate();
        Ok(())
    }

    pub(crate) fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    /// Follows the alias chain to the name it finally designates.
    pub(crate) fn canonical_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut current = name;
        for _ in 0..=aliases.len() {
            match aliases.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        current.to_string()
    }

    fn chain_passes(&self, start: &str, target: &str) -> bool {
        let aliases = self.aliases.read();
        let mut current = start;
        for _ in 0..=aliases.len() {
            if current == target {
                return true;
            }
            match aliases.get(current) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// Every alias resolving to `name`, directly or through other aliases.
    pub(crate) fn aliases_of(&self, name: &str) -> Vec<String> {
        let candidates: Vec<String> = self.aliases.read().keys().cloned().collect();
        let mut found: Vec<String> = candidates
            .into_iter()
            .filter(|alias| self.canonical_name(alias) == name)
            .collect();
        found.sort();
        found
    }

    /// Drops merged views and the type index.
    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.merged.write().clear();
        self.types.clear();
        tracing::trace!("cleared merged definition and type caches");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::Lifetime;
    use crate::registration::{DefinitionBuilder, Role};

    struct Widget;

    fn widget() -> ComponentDefinition {
        DefinitionBuilder::<Widget>::new(|_| Ok(Widget)).build()
    }

    #[test]
    fn names_keep_registration_order_across_replacement() {
        let registry = Registry::new(true);
        registry.register("a", widget()).unwrap();
        registry.register("b", widget()).unwrap();
        assert_eq!(registry.register("a", widget()).unwrap(), Registered::Replaced);
        assert_eq!(*registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn duplicate_rejected_unless_replacing_framework_definition() {
        let registry = Registry::new(false);
        registry.register("a", widget()).unwrap();
        assert!(matches!(
            registry.register("a", widget()),
            Err(DiError::DuplicateDefinition { .. })
        ));

        let framework = DefinitionBuilder::<Widget>::new(|_| Ok(Widget))
            .role(Role::Infrastructure)
            .build();
        registry.register("infra", framework).unwrap();
        assert_eq!(registry.register("infra", widget()).unwrap(), Registered::Replaced);
    }

    #[test]
    fn snapshots_survive_later_writes() {
        let registry = Registry::new(true);
        registry.register("a", widget()).unwrap();
        registry.freeze();
        let snapshot = registry.names();
        assert!(registry.is_frozen());

        registry.register("b", widget()).unwrap();
        assert!(!registry.is_frozen());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.names().len(), 2);
    }

    #[test]
    fn merged_view_follows_parent_chain() {
        let registry = Registry::new(true);
        registry
            .register("base", DefinitionBuilder::<Widget>::new(|_| Ok(Widget)).prototype().make_abstract().build())
            .unwrap();
        registry.register("child", ComponentDefinition::child_of("base")).unwrap();

        let merged = registry.merged("child").unwrap();
        assert_eq!(merged.lifetime(), Lifetime::Prototype);
        assert!(!merged.is_abstract());
        assert_eq!(registry.children_of("base"), vec!["child".to_string()]);

        registry.register("orphan", ComponentDefinition::child_of("missing")).unwrap();
        assert!(matches!(registry.merged("orphan"), Err(DiError::Validation { .. })));
    }

    #[test]
    fn parent_cycles_are_rejected() {
        let registry = Registry::new(true);
        registry.register("a", ComponentDefinition::child_of("b")).unwrap();
        registry.register("b", ComponentDefinition::child_of("a")).unwrap();
        assert!(matches!(registry.merged("a"), Err(DiError::Validation { .. })));
    }

    #[test]
    fn aliases_chain_and_reject_cycles() {
        let registry = Registry::new(true);
        registry.register("db", widget()).unwrap();
        registry.register_alias("db", "database").unwrap();
        registry.register_alias("database", "store").unwrap();

        assert_eq!(registry.canonical_name("store"), "db");
        assert_eq!(registry.aliases_of("db"), vec!["database".to_string(), "store".to_string()]);
        assert!(matches!(
            registry.register_alias("store", "database"),
            Err(DiError::Validation { .. })
        ));
        assert!(matches!(
            registry.register_alias("store", "db"),
            Err(DiError::Validation { .. })
        ));
    }
}
