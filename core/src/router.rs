//! Decides how each validated thought mutates the session and applies it.

use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::error::SessionError;
use crate::error::SubmitError;
use crate::session::SessionState;
use crate::thought::ThoughtRecord;
use crate::validation::validate_thought;

/// Where a thought goes, given the current main-sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Names both `branchId` and `branchFromThought`; the main sequence is
    /// left alone.
    Branch {
        branch_id: &'a str,
        branch_from_thought: u32,
    },
    /// Overwrite the one-based `position` and drop everything after it.
    Revise { position: usize },
    /// Append to the main sequence. `revision_fallback` is set when the
    /// thought was a revision whose target does not exist yet.
    Append { revision_fallback: bool },
}

/// First match wins: branch, then in-range revision, then append.
pub fn classify(record: &ThoughtRecord, main_len: usize) -> Route<'_> {
    if let Some((branch_id, branch_from_thought)) = record.branch() {
        return Route::Branch {
            branch_id,
            branch_from_thought,
        };
    }

    match record.revision_target() {
        Some(target) => {
            let position = usize::try_from(target).unwrap_or(usize::MAX);
            if position <= main_len {
                Route::Revise { position }
            } else {
                Route::Append {
                    revision_fallback: true,
                }
            }
        }
        None => Route::Append {
            revision_fallback: false,
        },
    }
}

/// The mutation a thought caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThoughtOutcome {
    Appended {
        position: usize,
        revision_fallback: bool,
    },
    Revised {
        position: usize,
        /// Thoughts removed from the main sequence, counting the overwritten
        /// one.
        discarded: usize,
    },
    Branched {
        branch_id: String,
        position: usize,
        created: bool,
    },
}

/// Acknowledgement returned to the caller of [`ThoughtRouter::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtReceipt {
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub outcome: ThoughtOutcome,
}

/// Sole writer of the [`SessionState`].
///
/// Each call to [`ThoughtRouter::route`] reads the main-sequence length and
/// applies its mutation under the same `&mut self` borrow, so no other
/// reader or writer can observe the session in between.
#[derive(Debug, Default)]
pub struct ThoughtRouter {
    session: SessionState,
}

impl ThoughtRouter {
    pub fn new(session: SessionState) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Validates raw `think` arguments and routes the resulting thought. A
    /// failure at either step leaves the session untouched.
    pub fn submit(&mut self, arguments: Value) -> Result<ThoughtReceipt, SubmitError> {
        let record = validate_thought(arguments)?;
        let thought_number = record.thought_number();
        let total_thoughts = record.total_thoughts();
        let outcome = self.route(record)?;
        Ok(ThoughtReceipt {
            thought_number,
            total_thoughts,
            outcome,
        })
    }

    pub fn route(&mut self, record: ThoughtRecord) -> Result<ThoughtOutcome, SessionError> {
        match classify(&record, self.session.main_sequence().len()) {
            Route::Branch {
                branch_id,
                branch_from_thought,
            } => {
                let branch_id = branch_id.to_string();
                debug!(
                    branch_id = %branch_id,
                    branch_from_thought, "appending thought to branch"
                );
                let append = self.session.append_branch(branch_id.clone(), record);
                Ok(ThoughtOutcome::Branched {
                    branch_id,
                    position: append.position,
                    created: append.created,
                })
            }
            Route::Revise { position } => {
                let discarded = self.session.replace_main_from(position, record)?;
                debug!(
                    position,
                    discarded = discarded.len(),
                    "revised main-sequence thought"
                );
                Ok(ThoughtOutcome::Revised {
                    position,
                    discarded: discarded.len(),
                })
            }
            Route::Append { revision_fallback } => {
                if revision_fallback {
                    info!(
                        revises_thought = record.revises_thought(),
                        main_len = self.session.main_sequence().len(),
                        "revision target is past the end of the main sequence; appending"
                    );
                }
                let position = self.session.append_main(record);
                debug!(position, "appended thought to main sequence");
                Ok(ThoughtOutcome::Appended {
                    position,
                    revision_fallback,
                })
            }
        }
    }

    /// The thought that `outcome` placed, if it is still present.
    pub fn thought(&self, outcome: &ThoughtOutcome) -> Option<&ThoughtRecord> {
        match outcome {
            ThoughtOutcome::Appended { position, .. } | ThoughtOutcome::Revised { position, .. } => {
                nth(self.session.main_sequence(), *position)
            }
            ThoughtOutcome::Branched {
                branch_id,
                position,
                ..
            } => nth(self.session.branch(branch_id).ok()?, *position),
        }
    }
}

fn nth(records: &[ThoughtRecord], position: usize) -> Option<&ThoughtRecord> {
    position.checked_sub(1).and_then(|index| records.get(index))
}
