//! # memcat-core: Foundational Types for the Categorization Engine
//!
//! Domain primitives shared by every other crate in the workspace. It
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `MemberId`, `RuleId` and
//!    `Category` are validated at construction (including on
//!    deserialization). No bare strings cross crate boundaries.
//!
//! 2. **Closed condition set.** [`Condition`] is one enum; the evaluator
//!    matches on it exhaustively, so a new condition kind cannot be
//!    silently skipped.
//!
//! 3. **Lenient attribute parsing.** Member profile attributes stay raw
//!    strings in [`MemberSnapshot`]; [`temporal`] parses them into
//!    `Option`s at evaluation time.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `memcat-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod category;
pub mod error;
pub mod identity;
pub mod member;
pub mod rule;
pub mod temporal;

pub use category::Category;
pub use error::ValidationError;
pub use identity::{MemberId, RuleId};
pub use member::MemberSnapshot;
pub use rule::{Condition, Rule, CONDITION_CATALOGUE_VERSION};
