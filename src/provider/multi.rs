//! Array, collection, map and stream injection points.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptors::{CollectionKind, DependencyDescriptor, DependencyShape};
use crate::error::DiResult;
use crate::provider::resolved::StreamItem;
use crate::provider::{Candidate, CandidateSet, ComponentStream, Container, Resolved, ResolverContext};
use crate::registration::{is_null, AnyArc};

struct Element {
    name: String,
    raw: AnyArc,
    view: AnyArc,
}

impl Container {
    /// Resolves a multi-value shape; `Ok(None)` when it is not one or nothing matched.
    ///
    /// Streams always resolve, possibly to an empty sequence.
    pub(crate) fn resolve_multiple_in(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
        ctx: &ResolverContext<'_>,
    ) -> DiResult<Option<Resolved>> {
        match descriptor.shape() {
            DependencyShape::Single => Ok(None),
            DependencyShape::Stream { element, ordered } => {
                let element_descriptor = descriptor.for_stream_element(element);
                let candidates = self.find_candidates_in(requesting, element, &element_descriptor, ctx)?;
                let items: VecDeque<StreamItem> = if ordered {
                    let mut elements = self.instantiate_all(candidates, ctx)?;
                    self.sort_by_order(&mut elements);
                    elements.into_iter().map(|e| StreamItem::Ready(e.view)).collect()
                } else {
                    candidates
                        .into_entries()
                        .into_iter()
                        .filter_map(|(name, candidate)| match candidate {
                            Candidate::Instance { view, .. } => Some(StreamItem::Ready(view)),
                            Candidate::Deferred(_) => Some(StreamItem::Deferred(name)),
                            Candidate::Absent => None,
                        })
                        .collect()
                };
                Ok(Some(Resolved::Stream(ComponentStream::new(self.clone(), element, items))))
            }
            DependencyShape::Array { element } | DependencyShape::Collection { element, .. } => {
                let candidates =
                    self.find_candidates_in(requesting, element, &descriptor.for_element(element), ctx)?;
                if candidates.is_empty() {
                    return Ok(None);
                }
                let mut elements = self.instantiate_all(candidates, ctx)?;
                if let DependencyShape::Collection { kind: CollectionKind::Set, .. } = descriptor.shape() {
                    let mut seen = HashSet::new();
                    elements.retain(|e| seen.insert(Arc::as_ptr(&e.raw) as *const () as usize));
                }
                if self.config().order_multi_values && elements.len() > 1 {
                    self.sort_by_order(&mut elements);
                }
                Ok(Some(Resolved::Many(elements.into_iter().map(|e| e.view).collect())))
            }
            DependencyShape::Map { key, value } => {
                if !key.is_textual() {
                    tracing::trace!(key = %key, "map injection point with non-textual key never matches");
                    return Ok(None);
                }
                let candidates = self.find_candidates_in(requesting, value, &descriptor.for_element(value), ctx)?;
                if candidates.is_empty() {
                    return Ok(None);
                }
                let map: IndexMap<String, AnyArc> = self
                    .instantiate_all(candidates, ctx)?
                    .into_iter()
                    .map(|e| (e.name, e.view))
                    .collect();
                Ok(Some(Resolved::Map(map)))
            }
        }
    }

    fn instantiate_all(&self, candidates: CandidateSet, ctx: &ResolverContext<'_>) -> DiResult<Vec<Element>> {
        let required = candidates.required_type();
        let mut elements = Vec::with_capacity(candidates.len());
        for (name, candidate) in candidates.into_entries() {
            match candidate {
                Candidate::Instance { raw, view } => elements.push(Element { name, raw, view }),
                Candidate::Deferred(_) => {
                    let raw = self.get_component_in(&name, ctx)?;
                    if is_null(&raw) {
                        continue;
                    }
                    let view = self.cast_view(&name, &raw, required)?;
                    elements.push(Element { name, raw, view });
                }
                Candidate::Absent => {}
            }
        }
        Ok(elements)
    }

    /// Stable ascending sort; components without an order value go last.
    fn sort_by_order(&self, elements: &mut Vec<Element>) {
        let mut keyed: Vec<(i32, Element)> = elements
            .drain(..)
            .map(|e| (self.order_value(&e.name, &e.raw).unwrap_or(i32::MAX), e))
            .collect();
        keyed.sort_by_key(|(order, _)| *order);
        elements.extend(keyed.into_iter().map(|(_, e)| e));
    }

    /// Metadata order, then metadata priority, then the configured order source.
    ///
    /// The primary flag never takes part in ordering.
    pub fn order_value(&self, name: &str, raw: &AnyArc) -> Option<i32> {
        self.metadata_of(name).effective_order().or_else(|| {
            self.inner
                .order_source
                .read()
                .as_ref()
                .and_then(|source| source.order_of(raw))
        })
    }
}
