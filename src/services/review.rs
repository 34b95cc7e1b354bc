//! Review service — accept/reject board for suggested draft edits.
//!
//! DESIGN
//! ======
//! Suggestions keep seed order and are indexed by id for in-place decision
//! updates. Accept and reject overwrite each other (last write wins), so a
//! suggestion always holds exactly one decision. At most one suggestion is
//! expanded at a time.
//!
//! Operations on unknown ids are silent no-ops; the hosting view only ever
//! issues ids it rendered.
//!
//! TRADE-OFFS
//! ==========
//! Accepted edits are batched, never applied on accept. `regenerate()` hands
//! the batch to whatever drafting collaborator the host wires up.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::state::{AcceptedEdit, Decision, ReviewSummary, Suggestion};

#[derive(Debug, Clone, Default)]
pub struct ReviewBoard {
    suggestions: Vec<Suggestion>,
    index: HashMap<String, usize>,
    expanded: Option<usize>,
}

impl ReviewBoard {
    /// Build a board from seed suggestions, keeping each seeded decision.
    /// The first occurrence of a duplicated id wins the index slot.
    #[must_use]
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        let mut index = HashMap::with_capacity(suggestions.len());
        for (position, suggestion) in suggestions.iter().enumerate() {
            index.entry(suggestion.id.clone()).or_insert(position);
        }
        Self { suggestions, index, expanded: None }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Suggestion> {
        self.index.get(id).map(|&position| &self.suggestions[position])
    }

    #[must_use]
    pub fn decision(&self, id: &str) -> Option<Decision> {
        self.get(id).map(|suggestion| suggestion.decision)
    }

    pub fn accept(&mut self, id: &str) {
        self.decide(id, Decision::Accepted);
    }

    pub fn reject(&mut self, id: &str) {
        self.decide(id, Decision::Rejected);
    }

    /// Expand `id`, or collapse it when it is already expanded. Expanding one
    /// suggestion collapses any other.
    pub fn toggle_expanded(&mut self, id: &str) {
        let Some(&position) = self.index.get(id) else {
            debug!(suggestion = id, "review: toggle ignored for unknown suggestion");
            return;
        };
        self.expanded = if self.expanded == Some(position) { None } else { Some(position) };
    }

    #[must_use]
    pub fn expanded(&self) -> Option<&Suggestion> {
        self.expanded.map(|position| &self.suggestions[position])
    }

    #[must_use]
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded().is_some_and(|suggestion| suggestion.id == id)
    }

    #[must_use]
    pub fn summary(&self) -> ReviewSummary {
        let mut summary = ReviewSummary::default();
        for suggestion in &self.suggestions {
            summary.record(suggestion.decision);
        }
        summary
    }

    /// Accepted share of all suggestions, rounded half up. Zero for an empty
    /// board.
    #[must_use]
    pub fn completion_percent(&self) -> u8 {
        let total = self.suggestions.len();
        if total == 0 {
            return 0;
        }
        let accepted = self.summary().accepted;
        let percent = (accepted * 200 + total) / (total * 2);
        u8::try_from(percent).unwrap_or(100)
    }

    #[must_use]
    pub fn accepted_edits(&self) -> Vec<AcceptedEdit> {
        self.suggestions
            .iter()
            .filter(|suggestion| suggestion.decision == Decision::Accepted)
            .map(AcceptedEdit::from)
            .collect()
    }

    /// Release the accepted batch for regeneration. The board itself is not
    /// changed.
    #[must_use]
    pub fn regenerate(&self) -> Vec<AcceptedEdit> {
        let edits = self.accepted_edits();
        info!(edits = edits.len(), "review: regeneration requested");
        edits
    }

    fn decide(&mut self, id: &str, decision: Decision) {
        let Some(&position) = self.index.get(id) else {
            debug!(suggestion = id, %decision, "review: decision ignored for unknown suggestion");
            return;
        };
        let suggestion = &mut self.suggestions[position];
        if suggestion.decision != decision {
            info!(suggestion = id, from = %suggestion.decision, to = %decision, "review: decision changed");
            suggestion.decision = decision;
        }
    }
}

#[cfg(test)]
#[path = "review_test.rs"]
mod tests;
