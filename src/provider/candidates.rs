//! Candidate search: type scans and the multi-pass eligibility filter.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptors::{DependencyDescriptor, DependencyShape, Qualifier};
use crate::error::DiResult;
use crate::key::TypeKey;
use crate::provider::{Container, ResolverContext};
use crate::registration::{is_null, AnyArc, ComponentDefinition, ComponentMetadata, FactoryHandle};
use crate::registry::NameList;

/// What the candidate search recorded for one component.
#[derive(Clone)]
pub enum Candidate {
    /// Live instance, raw and as a view of the required type
    Instance { raw: AnyArc, view: AnyArc },
    /// Not created yet; instantiated only if it wins
    Deferred(TypeKey),
    /// The component exists but intentionally produced nothing
    Absent,
}

impl Candidate {
    pub fn is_instance(&self) -> bool {
        matches!(self, Candidate::Instance { .. })
    }
}

/// Transient, insertion-ordered mapping from component name to candidate.
///
/// Never holds more than one entry per name.
#[derive(Clone)]
pub struct CandidateSet {
    required: TypeKey,
    entries: IndexMap<String, Candidate>,
    resolvable: Option<String>,
}

impl CandidateSet {
    pub(crate) fn new(required: TypeKey) -> Self {
        CandidateSet {
            required,
            entries: IndexMap::new(),
            resolvable: None,
        }
    }

    pub(crate) fn insert(&mut self, name: &str, candidate: Candidate) {
        self.entries.entry(name.to_string()).or_insert(candidate);
    }

    pub(crate) fn insert_resolvable(&mut self, name: String, view: AnyArc) {
        self.entries.insert(
            name.clone(),
            Candidate::Instance {
                raw: view.clone(),
                view,
            },
        );
        self.resolvable = Some(name);
    }

    pub fn required_type(&self) -> TypeKey {
        self.required
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Candidate)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `name` is the synthetic entry for a resolvable dependency.
    pub fn is_resolvable(&self, name: &str) -> bool {
        self.resolvable.as_deref() == Some(name)
    }

    pub(crate) fn into_entries(self) -> IndexMap<String, Candidate> {
        self.entries
    }

    pub(crate) fn name_list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Strict or relaxed qualifier match of one candidate.
///
/// Strict: every required qualifier is carried by the candidate (a required
/// qualifier without value accepts any value of its kind), or is a
/// default-kind qualifier naming the candidate or one of its aliases.
/// Relaxed additionally accepts a candidate carrying any qualifier of the
/// same kind, or named by the qualifier's value whatever its kind.
pub(crate) fn qualifiers_match(
    required: &[Qualifier],
    metadata: &ComponentMetadata,
    name: &str,
    aliases: &[String],
    fallback: bool,
) -> bool {
    required.iter().all(|q| {
        let carried = metadata
            .qualifiers
            .iter()
            .any(|c| c.kind == q.kind && (q.value.is_none() || c.value == q.value));
        if carried {
            return true;
        }
        let by_name = q
            .value
            .as_deref()
            .is_some_and(|v| v == name || aliases.iter().any(|a| a == v));
        if q.is_default_kind() && by_name {
            return true;
        }
        fallback && (by_name || metadata.qualifiers.iter().any(|c| c.kind == q.kind))
    })
}

impl Container {
    /// Candidate search for `required` on behalf of `requesting`.
    ///
    /// Passes run in order and stop at the first non-empty result: strict
    /// qualifier match excluding self references, relaxed match (for
    /// multi-valued targets only when the descriptor is qualified), then self
    /// references as a last resort for single-valued targets.
    pub fn find_candidates(
        &self,
        requesting: Option<&str>,
        required: TypeKey,
        descriptor: &DependencyDescriptor,
    ) -> DiResult<CandidateSet> {
        let stack = crate::internal::CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, requesting);
        self.find_candidates_in(requesting, required, descriptor, &ctx)
    }

    pub(crate) fn find_candidates_in(
        &self,
        requesting: Option<&str>,
        required: TypeKey,
        descriptor: &DependencyDescriptor,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<CandidateSet> {
        let allow_eager = descriptor.is_eager() && self.config().allow_eager_init_for_type_scan;
        let names = self.names_including_ancestors(required, true, allow_eager, ctx)?;
        let mut result = CandidateSet::new(required);

        if let Some(value) = self.inner.resolvable.read().get(&required) {
            result.insert_resolvable(format!("{}#resolvable", required.display_name()), value.clone());
        }

        for name in &names {
            if !self.is_self_reference(requesting, name) && self.is_autowire_candidate(name, descriptor)? {
                self.add_candidate_entry(&mut result, name, descriptor, required, ctx)?;
            }
        }

        if result.is_empty() {
            let multiple = required == descriptor.dependency_type() && descriptor.shape().is_multi_valued();
            let fallback = descriptor.for_fallback_match();
            for name in &names {
                if !self.is_self_reference(requesting, name)
                    && self.is_autowire_candidate(name, &fallback)?
                    && (!multiple || !descriptor.qualifiers().is_empty())
                {
                    self.add_candidate_entry(&mut result, name, descriptor, required, ctx)?;
                }
            }
            if result.is_empty() && !multiple {
                // Self references as a final pass, never re-including the owner of a multi-value point
                for name in &names {
                    if self.is_self_reference(requesting, name)
                        && (!descriptor.excludes_owner() || requesting != Some(name.as_str()))
                        && self.is_autowire_candidate(name, &fallback)?
                    {
                        self.add_candidate_entry(&mut result, name, descriptor, required, ctx)?;
                    }
                }
            }
        }

        tracing::trace!(
            required = %required,
            requesting = requesting.unwrap_or("<none>"),
            candidates = ?result.name_list(),
            "candidate search finished"
        );
        Ok(result)
    }

    fn add_candidate_entry(
        &self,
        result: &mut CandidateSet,
        name: &str,
        descriptor: &DependencyDescriptor,
        required: TypeKey,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<()> {
        if descriptor.is_multi_element() {
            let raw = self.get_component_in(name, ctx)?;
            if !is_null(&raw) {
                let view = self.cast_view(name, &raw, required)?;
                result.insert(name, Candidate::Instance { raw, view });
            }
            return Ok(());
        }

        let ordered_stream = matches!(descriptor.shape(), DependencyShape::Stream { ordered: true, .. });
        if self.contains_singleton(name) || ordered_stream {
            let raw = self.get_component_in(name, ctx)?;
            if is_null(&raw) {
                result.insert(name, Candidate::Absent);
            } else {
                let view = self.cast_view(name, &raw, required)?;
                result.insert(name, Candidate::Instance { raw, view });
            }
        } else {
            result.insert(name, Candidate::Deferred(required));
        }
        Ok(())
    }

    /// `candidate` is `requesting` itself, or is produced by a factory method on it.
    pub(crate) fn is_self_reference(&self, requesting: Option<&str>, candidate: &str) -> bool {
        let Some(requesting) = requesting else {
            return false;
        };
        if requesting == candidate {
            return true;
        }
        self.inner.registry.contains(candidate)
            && self
                .inner
                .registry
                .merged(candidate)
                .is_ok_and(|m| m.factory_name() == Some(requesting))
    }

    /// Autowire flag and qualifier check, delegating to the owning ancestor.
    pub(crate) fn is_autowire_candidate(&self, name: &str, descriptor: &DependencyDescriptor) -> DiResult<bool> {
        let metadata = if self.inner.registry.contains(name) {
            let merged = self.inner.registry.merged(name)?;
            if !merged.is_autowire_candidate() {
                return Ok(false);
            }
            merged.metadata().clone()
        } else if let Some(manual) = self.inner.manual.read().get(name) {
            manual.metadata.clone()
        } else if let Some(parent) = &self.inner.parent {
            return parent.is_autowire_candidate(name, descriptor);
        } else {
            return Ok(true);
        };
        if descriptor.qualifiers().is_empty() {
            return Ok(true);
        }
        let aliases = self.inner.registry.aliases_of(name);
        Ok(qualifiers_match(
            descriptor.qualifiers(),
            &metadata,
            name,
            &aliases,
            descriptor.is_fallback_match(),
        ))
    }

    /// Local names followed by ancestor names not shadowed locally.
    pub(crate) fn names_including_ancestors(
        &self,
        key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<Vec<String>> {
        let mut names = self.names_for_type_in(key, include_non_singletons, allow_eager_init, ctx)?.to_vec();
        if let Some(parent) = &self.inner.parent {
            let parent_ctx = ctx.in_container(parent);
            for name in parent.names_including_ancestors(key, include_non_singletons, allow_eager_init, &parent_ctx)? {
                if !names.contains(&name) && !self.contains_local(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Names of local components injectable as `key`, in registration order,
    /// followed by matching manual singletons.
    ///
    /// With `allow_eager_init`, factory components of undeclared product type
    /// are instantiated to learn it. Results are cached while the registry is
    /// frozen.
    pub fn names_for_type(
        &self,
        key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> DiResult<Vec<String>> {
        let stack = crate::internal::CreationStack::default();
        let ctx = ResolverContext::new(self, &stack, None);
        Ok(self.names_for_type_in(key, include_non_singletons, allow_eager_init, &ctx)?.to_vec())
    }

    pub(crate) fn names_for_type_in(
        &self,
        key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<NameList> {
        let registry = &self.inner.registry;
        let cacheable = allow_eager_init && registry.is_frozen();
        if cacheable {
            if let Some(hit) = registry.types.get(key, include_non_singletons) {
                return Ok(hit);
            }
        }
        let names = Arc::new(self.scan_names_for_type(key, include_non_singletons, allow_eager_init, ctx)?);
        if cacheable && registry.is_frozen() {
            registry.types.insert(key, include_non_singletons, names.clone());
        }
        Ok(names)
    }

    fn scan_names_for_type(
        &self,
        key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<Vec<String>> {
        let registry = &self.inner.registry;
        let mut result = Vec::new();

        for name in registry.names().iter() {
            let merged = match registry.merged(name) {
                Ok(merged) => merged,
                Err(e) if allow_eager_init => return Err(e),
                Err(e) => {
                    tracing::trace!(component = %name, error = %e, "skipping unmergeable definition in type scan");
                    continue;
                }
            };
            if merged.is_abstract() {
                continue;
            }
            if !allow_eager_init && self.requires_eager_init_for_type(&merged) {
                continue;
            }
            let matched = if merged.is_factory_component() {
                self.factory_product_matches(name, &merged, key, include_non_singletons, allow_eager_init, ctx)
            } else {
                (include_non_singletons || merged.is_singleton()) && self.definition_matches(name, &merged, key)
            };
            if matched {
                result.push(name.clone());
            }
        }

        for (name, manual) in self.inner.manual.read().iter() {
            if registry.contains(name) {
                continue;
            }
            if manual.binding_for(key).is_some_and(|b| b.cast(&manual.instance).is_some()) {
                result.push(name.clone());
            }
        }
        Ok(result)
    }

    /// Existing singletons are checked by instance, everything else by declaration.
    fn definition_matches(&self, name: &str, merged: &ComponentDefinition, key: TypeKey) -> bool {
        let Some(binding) = merged.binding_for(key) else {
            return false;
        };
        match self.inner.singletons.read().get(name) {
            Some(instance) => !is_null(instance) && binding.cast(instance).is_some(),
            None => true,
        }
    }

    fn factory_product_matches(
        &self,
        name: &str,
        merged: &ComponentDefinition,
        key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
        ctx: &ResolverContext<'_>,
    ) -> bool {
        let known = self.inner.product_types.read().get(name).cloned();
        let bindings = if merged.has_resolved_type() {
            merged.bindings().to_vec()
        } else if let Some(known) = known {
            known
        } else if allow_eager_init && !ctx.is_in_creation(name) {
            if let Err(e) = self.get_component_in(&format!("&{name}"), ctx) {
                tracing::trace!(component = name, error = %e, "could not determine factory product type");
                return false;
            }
            self.inner.product_types.read().get(name).cloned().unwrap_or_default()
        } else {
            return false;
        };

        let singleton_product = match self.inner.singletons.read().get(name) {
            Some(raw) => raw.downcast_ref::<FactoryHandle>().is_some_and(|h| h.0.is_singleton()),
            None => merged.is_singleton(),
        };
        (include_non_singletons || singleton_product) && bindings.iter().any(|b| b.key() == key)
    }

    /// A factory-method definition hosted on a factory component not yet created.
    fn requires_eager_init_for_type(&self, merged: &ComponentDefinition) -> bool {
        let Some(factory) = merged.factory_name() else {
            return false;
        };
        let factory = self.inner.registry.canonical_name(factory);
        !self.contains_singleton(&factory)
            && self
                .inner
                .registry
                .merged(&factory)
                .is_ok_and(|f| f.is_factory_component())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(qualifiers: Vec<Qualifier>) -> ComponentMetadata {
        ComponentMetadata {
            qualifiers,
            ..Default::default()
        }
    }

    #[test]
    fn unqualified_descriptor_matches_everything() {
        assert!(qualifiers_match(&[], &ComponentMetadata::default(), "a", &[], false));
    }

    #[test]
    fn default_qualifier_matches_name_or_alias() {
        let none = ComponentMetadata::default();
        let q = [Qualifier::named("mainDb")];
        assert!(qualifiers_match(&q, &none, "mainDb", &[], false));
        assert!(qualifiers_match(&q, &none, "db1", &["mainDb".to_string()], false));
        assert!(!qualifiers_match(&q, &none, "db2", &[], false));
    }

    #[test]
    fn custom_kind_needs_carried_qualifier_unless_relaxed() {
        let q = [Qualifier::with_value("region", "eu")];
        let eu = tagged(vec![Qualifier::with_value("region", "eu")]);
        let us = tagged(vec![Qualifier::with_value("region", "us")]);
        let marker = [Qualifier::of_kind("region")];

        assert!(qualifiers_match(&q, &eu, "x", &[], false));
        assert!(!qualifiers_match(&q, &us, "x", &[], false));
        assert!(qualifiers_match(&q, &us, "x", &[], true));
        assert!(qualifiers_match(&marker, &us, "x", &[], false));
        assert!(!qualifiers_match(&q, &ComponentMetadata::default(), "eu2", &[], true));
        assert!(qualifiers_match(&q, &ComponentMetadata::default(), "eu", &[], true));
    }
}
