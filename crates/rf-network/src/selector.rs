//! Criterion-driven narrowing of catalog candidates for one blueprint
//! vertex.
//!
//! A selector starts with every catalog entry as a candidate and applies
//! criteria one at a time. Template criteria are decided against the
//! entry's fixed properties without instantiating anything; interface
//! criteria are decided against the entry's declared accepts/provides
//! sets; everything else instantiates the candidate lazily and asks the
//! instance itself, which doubles as configuration of the eventual
//! survivor.

use rf_components::interfaces::{HAS_ACCEPTING_INTERFACE, HAS_PROVIDING_INTERFACE};
use rf_components::{CatalogEntry, ComponentCatalog, ComponentHandle, InterfaceKind};
use rf_core::{Criterion, CriterionOutcome, RfResult, check_template_properties};

/// One surviving candidate: its catalog entry plus the instance created
/// once runtime criteria got involved.
struct Candidate {
    entry: CatalogEntry,
    instance: Option<ComponentHandle>,
}

impl Candidate {
    fn new(entry: CatalogEntry) -> Self {
        Self {
            entry,
            instance: None,
        }
    }

    /// Evaluate one criterion, instantiating only when the decision needs
    /// the component's runtime knowledge.
    fn meets(&mut self, instance_name: &str, criterion: &Criterion) -> RfResult<bool> {
        match check_template_properties(self.entry.template_properties(), criterion)? {
            CriterionOutcome::Satisfied => Ok(true),
            CriterionOutcome::Failed => Ok(false),
            CriterionOutcome::Unknown => match criterion.key.as_str() {
                HAS_ACCEPTING_INTERFACE => {
                    Ok(interface_subset(&criterion.values, self.entry.accepts()))
                }
                HAS_PROVIDING_INTERFACE => {
                    Ok(interface_subset(&criterion.values, self.entry.provides()))
                }
                _ => {
                    let instance = self
                        .instance
                        .get_or_insert_with(|| self.entry.instantiate(instance_name));
                    Ok(instance.borrow_mut().meets_criterion(criterion))
                }
            },
        }
    }
}

/// Every named interface must appear in the declared set. Names matching
/// no known interface never match a declaration either, so they eliminate
/// the candidate rather than erroring.
fn interface_subset(names: &[String], declared: &[InterfaceKind]) -> bool {
    names.iter().all(|name| {
        InterfaceKind::from_name(name).is_some_and(|kind| declared.contains(&kind))
    })
}

/// Narrows the catalog down to the one component class satisfying every
/// criterion applied for a blueprint vertex.
pub struct ComponentSelector {
    instance_name: String,
    candidates: Vec<Candidate>,
}

impl ComponentSelector {
    /// A fresh selector holding every catalog entry as a candidate, in
    /// catalog order.
    pub fn new(instance_name: impl Into<String>, catalog: &ComponentCatalog) -> Self {
        Self {
            instance_name: instance_name.into(),
            candidates: catalog
                .entries()
                .iter()
                .cloned()
                .map(Candidate::new)
                .collect(),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Surviving candidate count. Never increases; zero is absorbing.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Class names of the surviving candidates, in catalog order.
    pub fn candidate_classes(&self) -> Vec<&'static str> {
        self.candidates
            .iter()
            .map(|candidate| candidate.entry.class_name())
            .collect()
    }

    /// Apply one criterion, dropping every candidate that fails it.
    ///
    /// Eliminated candidates are destroyed immediately and never return.
    /// Fails only on malformed criteria (multi-valued against a template
    /// key); the candidate set is untouched in that case.
    pub fn add_criterion(&mut self, criterion: &Criterion) -> RfResult<()> {
        let mut verdicts = Vec::with_capacity(self.candidates.len());
        for candidate in &mut self.candidates {
            verdicts.push(candidate.meets(&self.instance_name, criterion)?);
        }
        let mut verdicts = verdicts.into_iter();
        self.candidates.retain(|_| verdicts.next().unwrap_or(false));
        tracing::debug!(
            component = %self.instance_name,
            key = %criterion.key,
            remaining = self.candidates.len(),
            "criterion applied"
        );
        Ok(())
    }

    /// Require that candidates accept connections of `kind`.
    pub fn require_accepting_interface(&mut self, kind: InterfaceKind) -> RfResult<()> {
        self.add_criterion(&Criterion::single(HAS_ACCEPTING_INTERFACE, kind.name()))
    }

    /// Require that candidates provide connections of `kind`.
    pub fn require_providing_interface(&mut self, kind: InterfaceKind) -> RfResult<()> {
        self.add_criterion(&Criterion::single(HAS_PROVIDING_INTERFACE, kind.name()))
    }

    /// The class name of the winner, once resolution is unique.
    pub fn resolved_class(&self) -> Option<&'static str> {
        match self.candidates.as_slice() {
            [only] => Some(only.entry.class_name()),
            _ => None,
        }
    }

    /// The resolved component instance.
    ///
    /// `Some` only when exactly one candidate remains; the instance is
    /// created on demand if template criteria alone decided the selection.
    /// Ambiguous and exhausted selectors return `None`.
    pub fn component(&mut self) -> Option<ComponentHandle> {
        if self.candidates.len() != 1 {
            return None;
        }
        let candidate = &mut self.candidates[0];
        if candidate.instance.is_none() {
            candidate.instance = Some(candidate.entry.instantiate(&self.instance_name));
        }
        candidate.instance.clone()
    }
}
