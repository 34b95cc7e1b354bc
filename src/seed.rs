//! Seed data — the stage plan and suggestion list a workspace starts from.
//!
//! DESIGN
//! ======
//! `SeedSet::builtin()` carries the will-drafting demo fixtures. Hosts can
//! swap in their own set from JSON; field names accept both snake_case and
//! the camelCase used by the original fixtures. Every loaded set passes
//! `validate()` before use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::{Category, Decision, Impact, Severity, StageSeed, Suggestion};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid seed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("seed set has no stages")]
    NoStages,
    #[error("{kind} at position {position} has an empty id")]
    EmptyId { kind: &'static str, position: usize },
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("suggestion {id} confidence {confidence} exceeds 100")]
    ConfidenceOutOfRange { id: String, confidence: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSet {
    pub stages: Vec<StageSeed>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl SeedSet {
    /// Parse and validate a seed set from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed input or any validation error.
    pub fn from_json_str(raw: &str) -> Result<Self, SeedError> {
        let seeds: Self = serde_json::from_str(raw)?;
        seeds.validate()?;
        Ok(seeds)
    }

    /// Read, parse, and validate a seed file.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read, otherwise as
    /// [`SeedSet::from_json_str`].
    pub fn from_path(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&raw)
    }

    /// # Errors
    ///
    /// Returns the first problem found: no stages, an empty or duplicate id,
    /// or a confidence above 100.
    pub fn validate(&self) -> Result<(), SeedError> {
        if self.stages.is_empty() {
            return Err(SeedError::NoStages);
        }
        check_ids("stage", self.stages.iter().map(|stage| stage.id.as_str()))?;
        check_ids("suggestion", self.suggestions.iter().map(|s| s.id.as_str()))?;

        if let Some(bad) = self.suggestions.iter().find(|s| s.confidence > 100) {
            return Err(SeedError::ConfidenceOutOfRange { id: bad.id.clone(), confidence: bad.confidence });
        }
        Ok(())
    }

    /// The will-drafting demo fixtures: five generation stages and four
    /// suggestions, `ai-2` pre-accepted.
    #[must_use]
    pub fn builtin() -> Self {
        Self { stages: builtin_stages(), suggestions: builtin_suggestions() }
    }
}

fn check_ids<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<(), SeedError> {
    let mut seen = HashSet::new();
    for (position, id) in ids.enumerate() {
        if id.trim().is_empty() {
            return Err(SeedError::EmptyId { kind, position });
        }
        if !seen.insert(id) {
            return Err(SeedError::DuplicateId { kind, id: id.to_owned() });
        }
    }
    Ok(())
}

// =============================================================================
// BUILT-IN FIXTURES
// =============================================================================

fn stage(id: &str, title: &str, description: &str, duration_ms: u64, details: [&str; 4]) -> StageSeed {
    StageSeed {
        id: id.to_owned(),
        title: title.to_owned(),
        description: description.to_owned(),
        duration_ms,
        detail_lines: details.iter().map(|line| (*line).to_owned()).collect(),
    }
}

fn builtin_stages() -> Vec<StageSeed> {
    vec![
        stage(
            "analysis",
            "Client Data Analysis",
            "Analyzing consultation notes and client information",
            3000,
            [
                "Processing 47 data points from consultation",
                "Identifying estate complexity: Medium",
                "Extracting key relationships and beneficiaries",
                "Analyzing tax implications",
            ],
        ),
        stage(
            "structure",
            "Document Structure Planning",
            "Determining optimal will structure and clauses",
            2500,
            [
                "Selecting appropriate will template",
                "Planning clause sequence and dependencies",
                "Identifying required legal provisions",
                "Structuring gift distributions",
            ],
        ),
        stage(
            "drafting",
            "Clause Generation",
            "Generating personalized legal clauses",
            4000,
            [
                "Drafting testator declaration",
                "Creating executor appointment clauses",
                "Generating specific gift provisions",
                "Composing residuary estate clauses",
            ],
        ),
        stage(
            "validation",
            "Legal Compliance Check",
            "Validating against legal requirements and precedents",
            2000,
            [
                "Checking compliance with Wills Act 1837",
                "Validating against 2,847 precedent cases",
                "Ensuring proper witnessing requirements",
                "Verifying tax optimization opportunities",
            ],
        ),
        stage(
            "review",
            "Quality Assurance",
            "Final review and optimization suggestions",
            1500,
            [
                "Generating improvement suggestions",
                "Checking for potential ambiguities",
                "Optimizing language clarity",
                "Preparing review notes",
            ],
        ),
    ]
}

fn builtin_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion {
            id: "ai-1".into(),
            category: Category::Tax,
            title: "Inheritance Tax Optimization".into(),
            description: "The estate value may exceed the nil-rate band. Consider adding a charitable donation \
                          clause to reduce IHT liability."
                .into(),
            severity: Severity::Important,
            before_text: "I GIVE, DEVISE AND BEQUEATH all the rest, residue and remainder of my estate to be \
                          divided equally between my children Emily Thompson and Oliver Thompson."
                .into(),
            after_text: "I GIVE £50,000 to Cancer Research UK (Charity Registration Number 1089464), and I GIVE, \
                         DEVISE AND BEQUEATH all the rest, residue and remainder of my estate to be divided \
                         equally between my children Emily Thompson and Oliver Thompson."
                .into(),
            impact: Impact::High,
            confidence: 94,
            time_to_implement: "2 minutes".into(),
            decision: Decision::Pending,
        },
        Suggestion {
            id: "ai-2".into(),
            category: Category::Clause,
            title: "Digital Assets Provision".into(),
            description: "Consider adding provisions for digital assets including online accounts, \
                          cryptocurrency, and digital media collections."
                .into(),
            severity: Severity::Info,
            before_text: "[No digital assets clause present]".into(),
            after_text: "I GIVE to my Executors full power and authority to access, manage, and distribute my \
                         digital assets including but not limited to online accounts, social media profiles, \
                         digital photographs, cryptocurrency holdings, and any other digital property or data."
                .into(),
            impact: Impact::Medium,
            confidence: 88,
            time_to_implement: "1 minute".into(),
            decision: Decision::Accepted,
        },
        Suggestion {
            id: "ai-3".into(),
            category: Category::Structure,
            title: "Trust Structure for Minors".into(),
            description: "Given the age conditions for your children, a formal trust structure might provide \
                          better protection and tax efficiency."
                .into(),
            severity: Severity::Warning,
            before_text: "To receive upon reaching age 25".into(),
            after_text: "To be held in trust until reaching age 25, with power for Trustees to advance income \
                         and capital for education, maintenance, and benefit"
                .into(),
            impact: Impact::High,
            confidence: 91,
            time_to_implement: "5 minutes".into(),
            decision: Decision::Pending,
        },
        Suggestion {
            id: "ai-4".into(),
            category: Category::Legal,
            title: "Survivorship Clause Enhancement".into(),
            description: "Add a 30-day survivorship clause to prevent complications if beneficiaries die \
                          shortly after the testator."
                .into(),
            severity: Severity::Warning,
            before_text: "To Emily Thompson (Daughter) - 40%".into(),
            after_text: "To Emily Thompson (Daughter), provided she survives me by 30 days - 40%".into(),
            impact: Impact::Medium,
            confidence: 96,
            time_to_implement: "1 minute".into(),
            decision: Decision::Pending,
        },
    ]
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
