//! Cached type → component names lookups.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::internal::FastMap;
use crate::key::TypeKey;

/// Names matching a type, in registration order.
pub(crate) type NameList = Arc<Vec<String>>;

/// Derived index from requested type to matching component names.
///
/// Entries are only ever computed and inserted, never patched: any registry
/// mutation or change of frozen state clears the whole index. Two threads
/// racing to fill the same entry compute the same list, so the last write wins.
#[derive(Default)]
pub(crate) struct TypeIndex {
    all: RwLock<FastMap<TypeKey, NameList>>,
    singletons: RwLock<FastMap<TypeKey, NameList>>,
}

impl TypeIndex {
    fn table(&self, include_non_singletons: bool) -> &RwLock<FastMap<TypeKey, NameList>> {
        if include_non_singletons {
            &self.all
        } else {
            &self.singletons
        }
    }

    pub(crate) fn get(&self, key: TypeKey, include_non_singletons: bool) -> Option<NameList> {
        self.table(include_non_singletons).read().get(&key).cloned()
    }

    pub(crate) fn insert(&self, key: TypeKey, include_non_singletons: bool, names: NameList) {
        self.table(include_non_singletons).write().insert(key, names);
    }

    pub(crate) fn clear(&self) {
        self.all.write().clear();
        self.singletons.write().clear();
    }
}
