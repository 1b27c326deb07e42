//! # Member Snapshot
//!
//! The subset of a member record the engine reads. Owned by the member
//! directory; the engine only holds a snapshot for the duration of one run.
//!
//! Profile attributes are kept as the raw strings the directory delivers.
//! Parsing happens inside the condition predicates so a malformed value
//! becomes a non-match for that rule instead of failing the whole snapshot.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::category::Category;
use crate::identity::MemberId;

/// Point-in-time view of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MemberSnapshot {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Current membership category.
    pub category: Category,
    /// Birth date, `YYYY-MM-DD` or RFC 3339.
    #[serde(default)]
    pub birth_date: Option<String>,
    /// Senate identifier; present only for senators.
    #[serde(default)]
    pub senator_id: Option<String>,
    /// When the member registered, RFC 3339 or `YYYY-MM-DD`.
    #[serde(default)]
    pub registered_at: Option<String>,
}

impl MemberSnapshot {
    /// Create a snapshot with no optional profile attributes.
    pub fn new(id: MemberId, name: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            category,
            birth_date: None,
            senator_id: None,
            registered_at: None,
        }
    }

    /// Builder: set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder: set the birth date.
    pub fn with_birth_date(mut self, birth_date: impl Into<String>) -> Self {
        self.birth_date = Some(birth_date.into());
        self
    }

    /// Builder: set the senator identifier.
    pub fn with_senator_id(mut self, senator_id: impl Into<String>) -> Self {
        self.senator_id = Some(senator_id.into());
        self
    }

    /// Builder: set the registration timestamp.
    pub fn with_registered_at(mut self, registered_at: impl Into<String>) -> Self {
        self.registered_at = Some(registered_at.into());
        self
    }

    /// The senator identifier, if present and not blank.
    pub fn senator_id(&self) -> Option<&str> {
        self.senator_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
