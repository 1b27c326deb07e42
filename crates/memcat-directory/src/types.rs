//! Wire types of the member directory REST API (camelCase JSON).

use memcat_core::{Category, MemberId, MemberSnapshot, ValidationError};
use serde::{Deserialize, Serialize};

/// Member record as returned by `GET /api/v1/members[/{id}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub category: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub senator_id: Option<String>,
    #[serde(default)]
    pub registered_at: Option<String>,
}

impl TryFrom<MemberRecord> for MemberSnapshot {
    type Error = ValidationError;

    fn try_from(record: MemberRecord) -> Result<Self, Self::Error> {
        Ok(MemberSnapshot {
            id: MemberId::new(record.id)?,
            name: record.name,
            email: record.email,
            category: Category::new(record.category)?,
            birth_date: record.birth_date,
            senator_id: record.senator_id,
            registered_at: record.registered_at,
        })
    }
}

/// Body of `PUT /api/v1/members/{id}/category`.
#[derive(Debug, Serialize)]
pub struct SetCategoryRequest<'a> {
    pub category: &'a str,
}
