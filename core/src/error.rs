use thiserror::Error;

use crate::validation::ValidationError;

/// Misuse of the session API. The router never triggers these for validated
/// input; seeing one means a caller bypassed it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(
        "cannot replace main-sequence position {position}: the main sequence holds {len} thought(s)"
    )]
    PositionOutOfRange { position: usize, len: usize },
}

/// A read query named a branch the session has never seen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Branch '{branch_id}' not found")]
pub struct BranchNotFound {
    pub branch_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
