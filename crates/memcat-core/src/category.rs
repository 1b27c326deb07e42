//! # Membership Category
//!
//! The classification the engine reads and rewrites (`active`, `honorary`,
//! `affiliate`, ...). Categories are deployment vocabulary, not a closed
//! enum, so they are carried as a validated string newtype.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Maximum length of a category name.
pub const MAX_CATEGORY_LEN: usize = 64;

/// A validated membership category name.
///
/// Trimmed on construction; never empty; at most [`MAX_CATEGORY_LEN`]
/// characters. Comparison is exact, so `Honorary` and `honorary` are
/// different categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String)]
pub struct Category(String);

impl Category {
    /// Create a validated category.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCategory`] for blank input and
    /// [`ValidationError::CategoryTooLong`] above [`MAX_CATEGORY_LEN`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if trimmed.chars().count() > MAX_CATEGORY_LEN {
            return Err(ValidationError::CategoryTooLong {
                value: trimmed.to_string(),
                max: MAX_CATEGORY_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the category name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Category {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Category {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        assert_eq!(Category::new("  honorary ").unwrap().as_str(), "honorary");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Category::new("").unwrap_err(), ValidationError::EmptyCategory);
        assert_eq!(Category::new(" \t").unwrap_err(), ValidationError::EmptyCategory);
    }

    #[test]
    fn rejects_overlong() {
        let err = Category::new("a".repeat(MAX_CATEGORY_LEN + 1)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::CategoryTooLong { max, .. } if max == MAX_CATEGORY_LEN
        ));
        assert!(Category::new("a".repeat(MAX_CATEGORY_LEN)).is_ok());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert_ne!(Category::new("Honorary").unwrap(), Category::new("honorary").unwrap());
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let c: Category = serde_json::from_str("\"affiliate\"").unwrap();
        assert_eq!(c, "affiliate");
        assert!(serde_json::from_str::<Category>("\"\"").is_err());
    }
}
