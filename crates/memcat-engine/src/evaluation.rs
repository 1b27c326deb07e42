//! # Rule Evaluator
//!
//! Decides whether a rule's condition holds for one member snapshot at one
//! evaluation instant.
//!
//! ## Determinism
//!
//! The evaluation instant comes from [`EvaluationContext`], captured once per
//! batch run and reused for every member. Given the same snapshot and the
//! same context, [`evaluate`] always returns the same [`Evaluation`].
//!
//! ## Missing Attributes
//!
//! A missing or unparseable attribute (no birth date, a birth date in the
//! future, a garbled registration timestamp) is a non-match, logged at
//! `debug`. It is never an error.

use chrono::{DateTime, Duration, Utc};
use memcat_core::temporal::{age_in_years, parse_date, parse_timestamp};
use memcat_core::{Category, Condition, MemberSnapshot, Rule};

/// The instant every rule in a run is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

/// Outcome of evaluating one rule against one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub matches: bool,
    /// Set when `matches` is true.
    pub target_category: Option<Category>,
    /// Human-readable trigger description, set when `matches` is true.
    pub reason: Option<String>,
}

impl Evaluation {
    fn no_match() -> Self {
        Self {
            matches: false,
            target_category: None,
            reason: None,
        }
    }

    fn matched(target: &Category, reason: String) -> Self {
        Self {
            matches: true,
            target_category: Some(target.clone()),
            reason: Some(reason),
        }
    }
}

/// Evaluate `rule` against `member` at `ctx.now`.
///
/// A member whose current category is outside `rule.applies_to` never
/// matches. Does not consult `rule.is_active`; activation is the caller's
/// filter.
pub fn evaluate(rule: &Rule, member: &MemberSnapshot, ctx: &EvaluationContext) -> Evaluation {
    if !rule.is_eligible(&member.category) {
        tracing::debug!(
            member_id = %member.id,
            rule_id = %rule.id,
            category = %member.category,
            "member category not eligible for rule"
        );
        return Evaluation::no_match();
    }
    let reason = match rule.condition {
        Condition::HasSenatorId => has_senator_id(member),
        Condition::AgeAtLeast { years } => age_at_least(member, years, ctx),
        Condition::AgeBelow { years } => age_below(member, years, ctx),
        Condition::IsNewRegistration { within_days } => {
            is_new_registration(member, within_days, ctx)
        }
    };
    match reason {
        Some(reason) => Evaluation::matched(&rule.target_category, reason),
        None => Evaluation::no_match(),
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------
//
// Each returns the reason string on a match and `None` otherwise.

fn has_senator_id(member: &MemberSnapshot) -> Option<String> {
    member
        .senator_id()
        .map(|id| format!("senator id {id} present"))
}

fn member_age(member: &MemberSnapshot, ctx: &EvaluationContext) -> Option<u32> {
    let Some(raw) = member.birth_date.as_deref() else {
        tracing::debug!(member_id = %member.id, "no birth date, age condition not met");
        return None;
    };
    let Some(birth) = parse_date(raw) else {
        tracing::debug!(member_id = %member.id, birth_date = raw, "unparseable birth date");
        return None;
    };
    let age = age_in_years(birth, ctx.now.date_naive());
    if age.is_none() {
        tracing::debug!(
            member_id = %member.id,
            birth_date = raw,
            "birth date after evaluation instant"
        );
    }
    age
}

fn age_at_least(member: &MemberSnapshot, years: u32, ctx: &EvaluationContext) -> Option<String> {
    let age = member_age(member, ctx)?;
    (age >= years).then(|| format!("age {age} ≥ {years}"))
}

fn age_below(member: &MemberSnapshot, years: u32, ctx: &EvaluationContext) -> Option<String> {
    let age = member_age(member, ctx)?;
    (age < years).then(|| format!("age {age} < {years}"))
}

fn is_new_registration(
    member: &MemberSnapshot,
    within_days: u32,
    ctx: &EvaluationContext,
) -> Option<String> {
    let Some(raw) = member.registered_at.as_deref() else {
        tracing::debug!(member_id = %member.id, "no registration timestamp");
        return None;
    };
    let Some(registered) = parse_timestamp(raw) else {
        tracing::debug!(
            member_id = %member.id,
            registered_at = raw,
            "unparseable registration timestamp"
        );
        return None;
    };
    let elapsed = ctx.now.signed_duration_since(registered);
    if elapsed < Duration::zero() {
        tracing::debug!(member_id = %member.id, registered_at = raw, "registration in the future");
        return None;
    }
    (elapsed <= Duration::days(i64::from(within_days))).then(|| {
        format!(
            "registered {} days ago (≤ {within_days})",
            elapsed.num_days()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use memcat_core::{MemberId, RuleId};
    use proptest::prelude::*;

    fn ctx(y: i32, m: u32, d: u32) -> EvaluationContext {
        EvaluationContext::at(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn member() -> MemberSnapshot {
        MemberSnapshot::new(
            MemberId::new("m1").unwrap(),
            "Ana",
            Category::new("active").unwrap(),
        )
    }

    fn rule(condition: Condition, target: &str) -> Rule {
        Rule::new(
            RuleId::new("r").unwrap(),
            "rule",
            condition,
            Category::new(target).unwrap(),
            1,
        )
    }

    #[test]
    fn senator_match_carries_id_in_reason() {
        let r = rule(Condition::HasSenatorId, "honorary");
        let eval = evaluate(&r, &member().with_senator_id("S1"), &ctx(2026, 1, 1));
        assert!(eval.matches);
        assert_eq!(eval.target_category.unwrap(), "honorary");
        assert_eq!(eval.reason.as_deref(), Some("senator id S1 present"));

        let eval = evaluate(&r, &member(), &ctx(2026, 1, 1));
        assert_eq!(eval, Evaluation::no_match());
    }

    #[test]
    fn age_boundary_39_vs_40() {
        let r = rule(Condition::AgeAtLeast { years: 40 }, "affiliate");
        let m = member().with_birth_date("1986-10-17");
        assert!(!evaluate(&r, &m, &ctx(2026, 10, 16)).matches);
        let eval = evaluate(&r, &m, &ctx(2026, 10, 17));
        assert!(eval.matches);
        assert_eq!(eval.reason.as_deref(), Some("age 40 ≥ 40"));
    }

    #[test]
    fn age_below_is_strict() {
        let r = rule(Condition::AgeBelow { years: 18 }, "youth");
        let m = member().with_birth_date("2008-06-01");
        assert!(evaluate(&r, &m, &ctx(2026, 5, 31)).matches);
        assert!(!evaluate(&r, &m, &ctx(2026, 6, 1)).matches);
    }

    #[test]
    fn missing_or_malformed_birth_date_never_matches() {
        let at_least = rule(Condition::AgeAtLeast { years: 1 }, "affiliate");
        let below = rule(Condition::AgeBelow { years: 150 }, "youth");
        for m in [
            member(),
            member().with_birth_date("not-a-date"),
            member().with_birth_date("2099-01-01"),
        ] {
            assert!(!evaluate(&at_least, &m, &ctx(2026, 1, 1)).matches);
            assert!(!evaluate(&below, &m, &ctx(2026, 1, 1)).matches);
        }
    }

    #[test]
    fn new_registration_window() {
        let r = rule(Condition::IsNewRegistration { within_days: 30 }, "provisional");
        let now = ctx(2026, 3, 31);

        let recent = member().with_registered_at("2026-03-28T12:00:00Z");
        let eval = evaluate(&r, &recent, &now);
        assert!(eval.matches);
        assert_eq!(eval.reason.as_deref(), Some("registered 3 days ago (≤ 30)"));

        let edge = member().with_registered_at("2026-03-01T12:00:00Z");
        assert!(evaluate(&r, &edge, &now).matches);

        let old = member().with_registered_at("2026-03-01T11:59:59Z");
        assert!(!evaluate(&r, &old, &now).matches);

        let future = member().with_registered_at("2026-04-02T00:00:00Z");
        assert!(!evaluate(&r, &future, &now).matches);

        let garbled = member().with_registered_at("last tuesday");
        assert!(!evaluate(&r, &garbled, &now).matches);
    }

    #[test]
    fn ineligible_category_never_matches() {
        let r = rule(Condition::HasSenatorId, "honorary")
            .with_applies_to([Category::new("active").unwrap()]);
        let mut m = member().with_senator_id("S1");
        assert!(evaluate(&r, &m, &ctx(2026, 1, 1)).matches);
        m.category = Category::new("affiliate").unwrap();
        assert!(!evaluate(&r, &m, &ctx(2026, 1, 1)).matches);
    }

    #[test]
    fn evaluation_ignores_active_flag() {
        let r = rule(Condition::HasSenatorId, "honorary").with_active(false);
        assert!(evaluate(&r, &member().with_senator_id("S9"), &ctx(2026, 1, 1)).matches);
    }

    proptest! {
        #[test]
        fn age_threshold_matches_iff_age_reached(
            threshold in 1u32..=120,
            age in 0u32..=130,
        ) {
            let now = ctx(2026, 10, 17);
            let birth_year = 2026 - i32::try_from(age).unwrap();
            let m = member().with_birth_date(format!("{birth_year}-10-17"));
            let at_least = rule(Condition::AgeAtLeast { years: threshold }, "affiliate");
            let below = rule(Condition::AgeBelow { years: threshold }, "youth");

            prop_assert_eq!(evaluate(&at_least, &m, &now).matches, age >= threshold);
            prop_assert_eq!(evaluate(&below, &m, &now).matches, age < threshold);
        }

        #[test]
        fn evaluation_is_deterministic(days_ago in 0i64..=400, window in 1u32..=365) {
            let now = ctx(2026, 10, 17);
            let registered = now.now - Duration::days(days_ago);
            let m = member().with_registered_at(registered.to_rfc3339());
            let r = rule(Condition::IsNewRegistration { within_days: window }, "provisional");
            let first = evaluate(&r, &m, &now);
            prop_assert_eq!(first.clone(), evaluate(&r, &m, &now));
            prop_assert_eq!(first.matches, days_ago <= i64::from(window));
        }
    }
}
