//! Validation gate between raw tool arguments and [`ThoughtRecord`].
//!
//! The checks run in a fixed order and the first violation wins. None of them
//! has side effects, so a rejected thought never reaches the session.

use serde_json::Value;
use thiserror::Error;

use crate::thought::ThoughtArgs;
use crate::thought::ThoughtRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not an object, a required field is missing, or a field has the wrong
    /// JSON type.
    #[error("{reason}")]
    Malformed { reason: String },

    #[error("thought must not be empty")]
    EmptyThought,

    #[error("thoughtNumber must be at least 1 (got {thought_number})")]
    ThoughtNumberTooSmall { thought_number: i64 },

    #[error("totalThoughts must be at least 1 (got {total_thoughts})")]
    TotalThoughtsTooSmall { total_thoughts: i64 },

    #[error(
        "totalThoughts ({total_thoughts}) must be at least as large as thoughtNumber ({thought_number})"
    )]
    TotalThoughtsBelowThoughtNumber {
        total_thoughts: i64,
        thought_number: i64,
    },

    #[error("revisesThought must be set when isRevision is true")]
    RevisesThoughtMissing,

    #[error("revisesThought must be at least 1 (got {revises_thought})")]
    RevisesThoughtTooSmall { revises_thought: i64 },

    #[error("revisesThought can only be set when isRevision is true")]
    RevisesThoughtWithoutRevision,

    #[error("branchId requires branchFromThought to be set")]
    BranchIdWithoutOrigin,

    #[error("branchFromThought must be at least 1 (got {branch_from_thought})")]
    BranchFromThoughtTooSmall { branch_from_thought: i64 },

    #[error("unrecognized field(s): {}", fields.join(", "))]
    UnknownFields { fields: Vec<String> },

    #[error("{field} is too large (got {value})")]
    NumberOutOfRange { field: &'static str, value: i64 },
}

impl ValidationError {
    /// Stable name of the rule that rejected the input.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "well_formed",
            Self::EmptyThought => "thought_not_empty",
            Self::ThoughtNumberTooSmall { .. } => "thought_number_positive",
            Self::TotalThoughtsTooSmall { .. } | Self::TotalThoughtsBelowThoughtNumber { .. } => {
                "total_thoughts_covers_thought_number"
            }
            Self::RevisesThoughtMissing
            | Self::RevisesThoughtTooSmall { .. }
            | Self::RevisesThoughtWithoutRevision => "revision_target_paired",
            Self::BranchIdWithoutOrigin
            | Self::BranchFromThoughtTooSmall { .. } => "branch_origin_paired",
            Self::UnknownFields { .. } => "known_fields_only",
            Self::NumberOutOfRange { .. } => "number_in_range",
        }
    }
}

pub type ValidationCheck = fn(&ThoughtArgs) -> Result<(), ValidationError>;

/// The gate's checks in evaluation order.
pub const VALIDATION_CHECKS: &[(&str, ValidationCheck)] = &[
    ("thought_not_empty", check_thought_not_empty),
    ("thought_number_positive", check_thought_number_positive),
    (
        "total_thoughts_covers_thought_number",
        check_total_thoughts_covers_thought_number,
    ),
    ("revision_target_paired", check_revision_target_paired),
    ("branch_origin_paired", check_branch_origin_paired),
    ("known_fields_only", check_known_fields_only),
];

/// Parses raw `think` arguments and runs them through the gate.
pub fn validate_thought(arguments: Value) -> Result<ThoughtRecord, ValidationError> {
    let args: ThoughtArgs =
        serde_json::from_value(arguments).map_err(|err| ValidationError::Malformed {
            reason: err.to_string(),
        })?;
    args.validate()
}

impl ThoughtArgs {
    pub fn validate(self) -> Result<ThoughtRecord, ValidationError> {
        for (_, check) in VALIDATION_CHECKS {
            check(&self)?;
        }

        let ThoughtArgs {
            thought,
            next_thought_needed,
            thought_number,
            total_thoughts,
            is_revision,
            revises_thought,
            branch_from_thought,
            branch_id,
            needs_more_thoughts,
            unknown_fields: _,
        } = self;

        Ok(ThoughtRecord::new(
            thought,
            to_u32("thoughtNumber", thought_number)?,
            to_u32("totalThoughts", total_thoughts)?,
            next_thought_needed,
            is_revision,
            revises_thought
                .map(|value| to_u32("revisesThought", value))
                .transpose()?,
            branch_from_thought
                .map(|value| to_u32("branchFromThought", value))
                .transpose()?,
            branch_id,
            needs_more_thoughts,
        ))
    }
}

fn to_u32(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| ValidationError::NumberOutOfRange { field, value })
}

pub fn check_thought_not_empty(args: &ThoughtArgs) -> Result<(), ValidationError> {
    if args.thought.is_empty() {
        return Err(ValidationError::EmptyThought);
    }
    Ok(())
}

pub fn check_thought_number_positive(args: &ThoughtArgs) -> Result<(), ValidationError> {
    if args.thought_number < 1 {
        return Err(ValidationError::ThoughtNumberTooSmall {
            thought_number: args.thought_number,
        });
    }
    Ok(())
}

pub fn check_total_thoughts_covers_thought_number(
    args: &ThoughtArgs,
) -> Result<(), ValidationError> {
    if args.total_thoughts < 1 {
        return Err(ValidationError::TotalThoughtsTooSmall {
            total_thoughts: args.total_thoughts,
        });
    }
    if args.total_thoughts < args.thought_number {
        return Err(ValidationError::TotalThoughtsBelowThoughtNumber {
            total_thoughts: args.total_thoughts,
            thought_number: args.thought_number,
        });
    }
    Ok(())
}

pub fn check_revision_target_paired(args: &ThoughtArgs) -> Result<(), ValidationError> {
    match (args.is_revision.unwrap_or(false), args.revises_thought) {
        (true, None) => Err(ValidationError::RevisesThoughtMissing),
        (true, Some(revises_thought)) if revises_thought < 1 => {
            Err(ValidationError::RevisesThoughtTooSmall { revises_thought })
        }
        (false, Some(_)) => Err(ValidationError::RevisesThoughtWithoutRevision),
        _ => Ok(()),
    }
}

pub fn check_branch_origin_paired(args: &ThoughtArgs) -> Result<(), ValidationError> {
    if args.branch_id.is_some() && args.branch_from_thought.is_none() {
        return Err(ValidationError::BranchIdWithoutOrigin);
    }
    if let Some(branch_from_thought) = args.branch_from_thought
        && branch_from_thought < 1
    {
        return Err(ValidationError::BranchFromThoughtTooSmall {
            branch_from_thought,
        });
    }
    Ok(())
}

pub fn check_known_fields_only(args: &ThoughtArgs) -> Result<(), ValidationError> {
    if args.unknown_fields.is_empty() {
        return Ok(());
    }
    Err(ValidationError::UnknownFields {
        fields: args.unknown_fields.keys().cloned().collect(),
    })
}
