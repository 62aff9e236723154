//! Read-only projections of a session served to clients.

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::session::SessionState;
use crate::thought::ThoughtRecord;

/// One entry of the branch overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchInfo<'a> {
    pub branch_id: &'a str,
    /// Origin declared by the branch's first thought.
    pub branch_from_thought: u32,
    pub thoughts: &'a [ThoughtRecord],
    pub created_at: DateTime<Utc>,
}

/// Every branch in creation order.
pub fn branch_overview(session: &SessionState) -> Vec<BranchInfo<'_>> {
    session
        .branches()
        .map(|(branch_id, branch)| BranchInfo {
            branch_id,
            // A branch only exists once a thought naming an origin created it.
            branch_from_thought: branch.origin().unwrap_or_default(),
            thoughts: branch.thoughts(),
            created_at: branch.created_at(),
        })
        .collect()
}
