//! Session-wide thought state: the main sequence and the named branches.

use std::fmt::Display;

use chrono::DateTime;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use serde::Serializer;
use uuid::Uuid;

use crate::error::BranchNotFound;
use crate::error::SessionError;
use crate::thought::ThoughtRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    uuid: Uuid,
}

impl SessionId {
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
        }
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.uuid)
    }
}

/// An alternative line of thought, created by the first thought that names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    created_at: DateTime<Utc>,
    thoughts: Vec<ThoughtRecord>,
}

impl Branch {
    fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            thoughts: Vec::new(),
        }
    }

    /// Main-sequence position this branch forks from, as declared by its
    /// first thought. Later thoughts declaring a different origin do not
    /// change it.
    pub fn origin(&self) -> Option<u32> {
        self.thoughts
            .first()
            .and_then(ThoughtRecord::branch_from_thought)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn thoughts(&self) -> &[ThoughtRecord] {
        &self.thoughts
    }
}

/// Result of [`SessionState::append_branch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchAppend {
    /// One-based position of the new thought inside its branch.
    pub position: usize,
    /// Whether this thought created the branch.
    pub created: bool,
}

/// The single thinking session served by the process.
///
/// Mutation goes through the router; everything else gets `&SessionState` or
/// a [`SessionSnapshot`]. Sequences are plain vectors, so positions are always
/// contiguous from 1.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: SessionId,
    main_sequence: Vec<ThoughtRecord>,
    branches: IndexMap<String, Branch>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            main_sequence: Vec::new(),
            branches: IndexMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn main_sequence(&self) -> &[ThoughtRecord] {
        &self.main_sequence
    }

    /// Branches in creation order.
    pub fn branches(&self) -> impl Iterator<Item = (&str, &Branch)> {
        self.branches
            .iter()
            .map(|(branch_id, branch)| (branch_id.as_str(), branch))
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn branch(&self, branch_id: &str) -> Result<&[ThoughtRecord], BranchNotFound> {
        self.branches
            .get(branch_id)
            .map(Branch::thoughts)
            .ok_or_else(|| BranchNotFound {
                branch_id: branch_id.to_string(),
            })
    }

    /// Appends to the main sequence and returns the new one-based position.
    pub fn append_main(&mut self, record: ThoughtRecord) -> usize {
        self.main_sequence.push(record);
        self.touch();
        self.main_sequence.len()
    }

    /// Overwrites the thought at one-based `position` and drops everything
    /// after it. Returns the dropped thoughts, the overwritten one first.
    pub fn replace_main_from(
        &mut self,
        position: usize,
        record: ThoughtRecord,
    ) -> Result<Vec<ThoughtRecord>, SessionError> {
        let len = self.main_sequence.len();
        if position == 0 || position > len {
            return Err(SessionError::PositionOutOfRange { position, len });
        }

        let discarded = self.main_sequence.split_off(position - 1);
        self.main_sequence.push(record);
        self.touch();
        Ok(discarded)
    }

    pub fn append_branch(
        &mut self,
        branch_id: impl Into<String>,
        record: ThoughtRecord,
    ) -> BranchAppend {
        let now = Utc::now();
        let branch_id = branch_id.into();
        let created = !self.branches.contains_key(&branch_id);
        let branch = self
            .branches
            .entry(branch_id)
            .or_insert_with(|| Branch::new(now));
        branch.thoughts.push(record);
        let position = branch.thoughts.len();
        self.updated_at = now;
        BranchAppend { position, created }
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            session_id: self.id,
            main_thoughts: &self.main_sequence,
            branches: &self.branches,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Read-only view of the whole session, borrowed from [`SessionState`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionSnapshot<'a> {
    pub session_id: SessionId,
    pub main_thoughts: &'a [ThoughtRecord],
    #[serde(serialize_with = "serialize_branch_thoughts")]
    pub branches: &'a IndexMap<String, Branch>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_branch_thoughts<S>(
    branches: &&IndexMap<String, Branch>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(
        branches
            .iter()
            .map(|(branch_id, branch)| (branch_id, &branch.thoughts)),
    )
}
