//! Composite Classifier
//!
//! Groups named [`HysteresisClassifier`]s and answers AND-composed questions
//! about them. The `changing_*` queries are edge-triggered: they hold only on
//! the update where the whole condition becomes true, not on every update
//! where it stays true.

use indexmap::IndexMap;

use super::classifier::HysteresisClassifier;
use crate::error::ClassifierError;

/// Named collection of independent classifiers.
#[derive(Debug, Default)]
pub struct CompositeClassifier {
    members: IndexMap<String, HysteresisClassifier>,
}

impl CompositeClassifier {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the member called `key`.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        classifier: HysteresisClassifier,
    ) -> Option<HysteresisClassifier> {
        self.members.insert(key.into(), classifier)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, classifier: HysteresisClassifier) -> Self {
        self.insert(key, classifier);
        self
    }

    /// The member called `key`.
    pub fn get(&self, key: &str) -> Option<&HysteresisClassifier> {
        self.members.get(key)
    }

    /// Member names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Update every member.
    ///
    /// A failing member does not stop the others. The first error, in
    /// insertion order, is returned after all members have been updated.
    pub fn update(&mut self, delta_time: f64) -> Result<(), ClassifierError> {
        let mut first_error = None;
        for classifier in self.members.values_mut() {
            if let Err(error) = classifier.update(delta_time) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn member(&self, key: &str) -> Result<&HysteresisClassifier, ClassifierError> {
        self.members
            .get(key)
            .ok_or_else(|| ClassifierError::UnknownMember(key.to_owned()))
    }

    /// Whether every named member is currently in the requested state.
    pub fn is(&self, query: &[(&str, &str)]) -> Result<bool, ClassifierError> {
        for &(key, state) in query {
            if !self.member(key)?.is(state)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every named member is now in the requested state and at least
    /// one of them just got there.
    pub fn changing_to(&self, query: &[(&str, &str)]) -> Result<bool, ClassifierError> {
        self.edge(query, HysteresisClassifier::is)
    }

    /// Whether every named member was in the requested state before the
    /// latest update and at least one of them just left it.
    pub fn changing_from(&self, query: &[(&str, &str)]) -> Result<bool, ClassifierError> {
        self.edge(query, HysteresisClassifier::was)
    }

    fn edge<F>(&self, query: &[(&str, &str)], holds: F) -> Result<bool, ClassifierError>
    where
        F: Fn(&HysteresisClassifier, &str) -> Result<bool, ClassifierError>,
    {
        let mut any_changed = false;
        for &(key, state) in query {
            let member = self.member(key)?;
            if !holds(member, state)? {
                return Ok(false);
            }
            any_changed |= member.changed()?;
        }
        Ok(any_changed)
    }
}
