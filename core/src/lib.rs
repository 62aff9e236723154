//! Session state machine for sequential thinking: validates thought records
//! and routes them into a main sequence, revisions and named branches.

mod error;
mod router;
mod session;
mod summary;
mod thought;
pub mod validation;
pub mod views;

pub use error::BranchNotFound;
pub use error::SessionError;
pub use error::SubmitError;
pub use router::Route;
pub use router::ThoughtOutcome;
pub use router::ThoughtReceipt;
pub use router::ThoughtRouter;
pub use router::classify;
pub use session::Branch;
pub use session::BranchAppend;
pub use session::SessionId;
pub use session::SessionSnapshot;
pub use session::SessionState;
pub use summary::ThoughtSummary;
pub use summary::summarize;
pub use thought::ThoughtArgs;
pub use thought::ThoughtRecord;
pub use validation::ValidationError;
pub use validation::validate_thought;
