//! # Member Directory Gateway
//!
//! The engine's only view of the member store. The store itself is owned by
//! another service; the engine reads snapshots and issues one narrow write:
//! set a member's category.
//!
//! [`InMemoryDirectory`] backs tests, the CLI, and API deployments without a
//! configured remote directory. The HTTP implementation lives in the
//! `memcat-directory` crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use memcat_core::{Category, MemberId, MemberSnapshot};
use parking_lot::RwLock;

/// Errors reported by a member directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// The directory does not know this member.
    #[error("member not found: {0}")]
    NotFound(MemberId),

    /// The directory refused the write for this member.
    #[error("category update rejected for member {member_id}: {reason}")]
    Rejected { member_id: MemberId, reason: String },

    /// The directory could not be reached or answered unexpectedly.
    #[error("member directory unavailable: {0}")]
    Unavailable(String),
}

/// Read snapshots from, and write categories to, the member store.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Snapshot every member.
    async fn list_members(&self) -> Result<Vec<MemberSnapshot>, DirectoryError>;

    /// Snapshot the given members. Ids the directory does not know are
    /// omitted from the result; the caller decides how to report them.
    async fn get_members(&self, ids: &[MemberId]) -> Result<Vec<MemberSnapshot>, DirectoryError>;

    /// Set one member's category.
    async fn set_category(&self, member_id: &MemberId, category: &Category)
        -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// InMemoryDirectory
// ---------------------------------------------------------------------------

/// Process-local member store keyed by member id.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    members: RwLock<BTreeMap<MemberId, MemberSnapshot>>,
}

impl InMemoryDirectory {
    pub fn new(members: impl IntoIterator<Item = MemberSnapshot>) -> Self {
        let members = members.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self {
            members: RwLock::new(members),
        }
    }

    /// Load members from a JSON array of snapshots.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let members: Vec<MemberSnapshot> = serde_json::from_str(json)?;
        Ok(Self::new(members))
    }

    /// Current snapshot of one member.
    pub fn member(&self, id: &str) -> Option<MemberSnapshot> {
        self.members.read().get(id).cloned()
    }

    /// Every member, ordered by id.
    pub fn snapshot(&self) -> Vec<MemberSnapshot> {
        self.members.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

#[async_trait]
impl MemberDirectory for InMemoryDirectory {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn list_members(&self) -> Result<Vec<MemberSnapshot>, DirectoryError> {
        Ok(self.snapshot())
    }

    async fn get_members(&self, ids: &[MemberId]) -> Result<Vec<MemberSnapshot>, DirectoryError> {
        let members = self.members.read();
        Ok(ids.iter().filter_map(|id| members.get(id).cloned()).collect())
    }

    async fn set_category(
        &self,
        member_id: &MemberId,
        category: &Category,
    ) -> Result<(), DirectoryError> {
        let mut members = self.members.write();
        let member = members
            .get_mut(member_id)
            .ok_or_else(|| DirectoryError::NotFound(member_id.clone()))?;
        member.category = category.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, category: &str) -> MemberSnapshot {
        MemberSnapshot::new(
            MemberId::new(id).unwrap(),
            id.to_uppercase(),
            Category::new(category).unwrap(),
        )
    }

    #[tokio::test]
    async fn set_category_updates_member() {
        let dir = InMemoryDirectory::new([snapshot("m1", "active")]);
        dir.set_category(&MemberId::new("m1").unwrap(), &Category::new("honorary").unwrap())
            .await
            .unwrap();
        assert_eq!(dir.member("m1").unwrap().category, "honorary");
    }

    #[tokio::test]
    async fn set_category_unknown_member() {
        let dir = InMemoryDirectory::default();
        let err = dir
            .set_category(&MemberId::new("ghost").unwrap(), &Category::new("x").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn get_members_skips_unknown_ids() {
        let dir = InMemoryDirectory::new([snapshot("m1", "active"), snapshot("m2", "active")]);
        let ids = [MemberId::new("m2").unwrap(), MemberId::new("m9").unwrap()];
        let found = dir.get_members(&ids).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m2");
    }

    #[test]
    fn from_json_parses_export() {
        let dir = InMemoryDirectory::from_json(
            r#"[{"id":"m1","name":"Ana","category":"active","senator_id":"S1"}]"#,
        )
        .unwrap();
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.member("m1").unwrap().senator_id(), Some("S1"));
    }
}
