use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Arguments of a `think` tool call as sent by the client, before validation.
///
/// Optional fields stay `Option` so that an absent flag and an explicit
/// `false` remain distinguishable. Integers are signed so that `0` and negative
/// values reach the validation checks instead of failing inside the
/// deserializer.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtArgs {
    /// Your current thinking step.
    pub thought: String,

    /// Whether another thought step is needed.
    pub next_thought_needed: bool,

    /// Current thought number.
    #[schemars(range(min = 1))]
    pub thought_number: i64,

    /// Estimated total thoughts needed.
    #[schemars(range(min = 1))]
    pub total_thoughts: i64,

    /// Whether this revises previous thinking.
    #[serde(default)]
    pub is_revision: Option<bool>,

    /// Which thought is being reconsidered.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub revises_thought: Option<i64>,

    /// Branching point thought number.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub branch_from_thought: Option<i64>,

    /// Branch identifier.
    #[serde(default)]
    pub branch_id: Option<String>,

    /// If more thoughts are needed beyond the current estimate.
    #[serde(default)]
    pub needs_more_thoughts: Option<bool>,

    /// Keys outside the recognized set. Collected rather than dropped so the
    /// closed-schema check can name them.
    #[serde(flatten)]
    #[schemars(skip)]
    pub unknown_fields: BTreeMap<String, Value>,
}

/// A single validated step of the thinking session.
///
/// Only [`ThoughtArgs::validate`] builds these, so every record held by a
/// session satisfies the cross-field rules (`totalThoughts >= thoughtNumber`,
/// `revisesThought` present iff `isRevision`, `branchId` implies
/// `branchFromThought`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtRecord {
    thought: String,
    thought_number: u32,
    total_thoughts: u32,
    next_thought_needed: bool,
    is_revision: Option<bool>,
    revises_thought: Option<u32>,
    branch_from_thought: Option<u32>,
    branch_id: Option<String>,
    needs_more_thoughts: Option<bool>,
}

impl ThoughtRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        thought: String,
        thought_number: u32,
        total_thoughts: u32,
        next_thought_needed: bool,
        is_revision: Option<bool>,
        revises_thought: Option<u32>,
        branch_from_thought: Option<u32>,
        branch_id: Option<String>,
        needs_more_thoughts: Option<bool>,
    ) -> Self {
        Self {
            thought,
            thought_number,
            total_thoughts,
            next_thought_needed,
            is_revision,
            revises_thought,
            branch_from_thought,
            branch_id,
            needs_more_thoughts,
        }
    }

    pub fn thought(&self) -> &str {
        &self.thought
    }

    pub fn thought_number(&self) -> u32 {
        self.thought_number
    }

    pub fn total_thoughts(&self) -> u32 {
        self.total_thoughts
    }

    pub fn next_thought_needed(&self) -> bool {
        self.next_thought_needed
    }

    /// `true` only when the caller explicitly flagged the thought as a
    /// revision; absent and `false` both read as `false`.
    pub fn is_revision(&self) -> bool {
        self.is_revision.unwrap_or(false)
    }

    /// The flag exactly as submitted.
    pub fn is_revision_flag(&self) -> Option<bool> {
        self.is_revision
    }

    pub fn revises_thought(&self) -> Option<u32> {
        self.revises_thought
    }

    /// The main-sequence position this thought revises. `None` unless the
    /// thought is a revision.
    pub fn revision_target(&self) -> Option<u32> {
        if self.is_revision() {
            self.revises_thought
        } else {
            None
        }
    }

    pub fn branch_from_thought(&self) -> Option<u32> {
        self.branch_from_thought
    }

    pub fn branch_id(&self) -> Option<&str> {
        self.branch_id.as_deref()
    }

    /// `(branch_id, branch_from_thought)` when the thought names both, which
    /// is what makes it a branch thought. A bare `branchFromThought` is not
    /// enough, and neither is an empty `branchId`.
    pub fn branch(&self) -> Option<(&str, u32)> {
        match (self.branch_id.as_deref(), self.branch_from_thought) {
            (Some(branch_id), Some(origin)) if !branch_id.is_empty() => Some((branch_id, origin)),
            _ => None,
        }
    }

    pub fn needs_more_thoughts(&self) -> bool {
        self.needs_more_thoughts.unwrap_or(false)
    }
}
