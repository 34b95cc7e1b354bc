//! Suggested edits to a generated draft and the reviewer's decision on each.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tax,
    Clause,
    Structure,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Important,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// Tri-state reviewer outcome. Accept and reject overwrite each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl Decision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One proposed edit. `decision` carries the seeded value until the board
/// changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(alias = "type")]
    pub category: Category,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(alias = "beforeText")]
    pub before_text: String,
    #[serde(alias = "afterText")]
    pub after_text: String,
    pub impact: Impact,
    /// Model confidence, 0 to 100.
    pub confidence: u8,
    #[serde(default, alias = "timeToImplement")]
    pub time_to_implement: String,
    #[serde(default)]
    pub decision: Decision,
}

/// An accepted before/after pair queued for the next draft regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedEdit {
    pub suggestion_id: String,
    pub before_text: String,
    pub after_text: String,
}

impl From<&Suggestion> for AcceptedEdit {
    fn from(suggestion: &Suggestion) -> Self {
        Self {
            suggestion_id: suggestion.id.clone(),
            before_text: suggestion.before_text.clone(),
            after_text: suggestion.after_text.clone(),
        }
    }
}

/// Decision counts over a full suggestion set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl ReviewSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.pending
    }

    pub(crate) fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Pending => self.pending += 1,
            Decision::Accepted => self.accepted += 1,
            Decision::Rejected => self.rejected += 1,
        }
    }
}
