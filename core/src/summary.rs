use serde::Serialize;

use crate::session::SessionState;
use crate::thought::ThoughtRecord;

/// Aggregate view of a session. Borrowed from the session and rebuilt by
/// every call to [`summarize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThoughtSummary<'a> {
    /// Records across the main sequence and every branch.
    pub total_thoughts: usize,
    pub main_branch_thoughts: usize,
    /// Branch identifiers in creation order.
    pub branches: Vec<&'a str>,
    /// Surviving records flagged as revisions. Truncated revisions are gone
    /// and not counted.
    pub revisions_count: usize,
    /// `false` for an empty main sequence.
    pub is_complete: bool,
    pub last_thought: Option<&'a ThoughtRecord>,
}

pub fn summarize(session: &SessionState) -> ThoughtSummary<'_> {
    let main = session.main_sequence();
    let all_records = || {
        main.iter()
            .chain(session.branches().flat_map(|(_, branch)| branch.thoughts()))
    };

    let last_thought = main.last();
    ThoughtSummary {
        total_thoughts: all_records().count(),
        main_branch_thoughts: main.len(),
        branches: session.branches().map(|(branch_id, _)| branch_id).collect(),
        revisions_count: all_records().filter(|r| r.is_revision()).count(),
        is_complete: last_thought.is_some_and(|last| !last.next_thought_needed()),
        last_thought,
    }
}
