//! Picking one winner among several candidates.

use crate::descriptors::DependencyDescriptor;
use crate::error::{DiError, DiResult};
use crate::provider::{CandidateSet, Container};
use crate::registration::ComponentMetadata;

impl Container {
    /// Primary flag, then lowest priority, then resolvable value or name match.
    ///
    /// `Ok(None)` means no rule applied; the caller decides whether that is
    /// an ambiguity error.
    pub fn pick_one(&self, candidates: &CandidateSet, descriptor: &DependencyDescriptor) -> DiResult<Option<String>> {
        if let Some(primary) = self.determine_primary(candidates)? {
            return Ok(Some(primary));
        }
        if let Some(highest) = self.determine_highest_priority(candidates)? {
            return Ok(Some(highest));
        }
        let dependency_name = descriptor.dependency_name();
        let by_name = candidates
            .names()
            .find(|name| candidates.is_resolvable(name) || self.matches_dependency_name(name, dependency_name));
        Ok(by_name.map(str::to_string))
    }

    /// The single primary candidate. A local primary beats one defined only
    /// in an ancestor; two local primaries are an error.
    pub(crate) fn determine_primary(&self, candidates: &CandidateSet) -> DiResult<Option<String>> {
        let mut primary: Option<&str> = None;
        for name in candidates.names() {
            if candidates.is_resolvable(name) || !self.is_primary(name) {
                continue;
            }
            match primary {
                None => primary = Some(name),
                Some(current) => {
                    let candidate_local = self.contains_definition(name);
                    let current_local = self.contains_definition(current);
                    if candidate_local && current_local {
                        return Err(DiError::AmbiguousPrimary {
                            type_name: candidates.required_type().display_name().to_string(),
                            candidates: candidates.name_list(),
                        });
                    } else if candidate_local {
                        primary = Some(name);
                    }
                }
            }
        }
        Ok(primary.map(str::to_string))
    }

    /// The single candidate with the lowest priority value. Candidates
    /// without a priority take no part.
    pub(crate) fn determine_highest_priority(&self, candidates: &CandidateSet) -> DiResult<Option<String>> {
        let prioritized: Vec<(&str, i32)> = candidates
            .names()
            .filter(|name| !candidates.is_resolvable(name))
            .filter_map(|name| self.metadata_of(name).priority.map(|p| (name, p)))
            .collect();
        let Some(lowest) = prioritized.iter().map(|(_, p)| *p).min() else {
            return Ok(None);
        };
        let winners: Vec<&str> = prioritized
            .iter()
            .filter(|(_, p)| *p == lowest)
            .map(|(name, _)| *name)
            .collect();
        match winners.as_slice() {
            [single] => Ok(Some(single.to_string())),
            _ => Err(DiError::AmbiguousPriority {
                type_name: candidates.required_type().display_name().to_string(),
                priority: lowest,
                candidates: winners.iter().map(|n| n.to_string()).collect(),
            }),
        }
    }

    fn matches_dependency_name(&self, candidate: &str, dependency_name: Option<&str>) -> bool {
        let Some(wanted) = dependency_name else {
            return false;
        };
        candidate == wanted || self.aliases_including_ancestors(candidate).iter().any(|a| a == wanted)
    }

    /// Primary flag of the definition, looked up where it is defined.
    pub(crate) fn is_primary(&self, name: &str) -> bool {
        if self.inner.registry.contains(name) {
            return self.inner.registry.merged(name).is_ok_and(|m| m.is_primary());
        }
        match &self.inner.parent {
            Some(parent) if !self.contains_local(name) => parent.is_primary(name),
            _ => false,
        }
    }

    /// Selection metadata of a definition or manual singleton.
    pub(crate) fn metadata_of(&self, name: &str) -> ComponentMetadata {
        if self.inner.registry.contains(name) {
            return self
                .inner
                .registry
                .merged(name)
                .map(|m| m.metadata().clone())
                .unwrap_or_default();
        }
        if let Some(manual) = self.inner.manual.read().get(name) {
            return manual.metadata.clone();
        }
        match &self.inner.parent {
            Some(parent) => parent.metadata_of(name),
            None => ComponentMetadata::default(),
        }
    }

    fn aliases_including_ancestors(&self, name: &str) -> Vec<String> {
        let mut aliases = self.inner.registry.aliases_of(name);
        if let Some(parent) = &self.inner.parent {
            aliases.extend(parent.aliases_including_ancestors(name));
        }
        aliases
    }
}
