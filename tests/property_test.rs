//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use proptest::prelude::*;
use rust_decimal::Decimal;

use proclusive_workflow::domain::{
    commission::parse_currency, highest_badge, Application, ApplicationStatus, BadgeLevel,
    CommissionTerms, PointKey, PointStatus, ProfileId, ReferralStatus,
};

// ============================================================================
// Custom Strategies
// ============================================================================

fn arb_badge() -> impl Strategy<Value = BadgeLevel> {
    prop::sample::select(BadgeLevel::ALL.to_vec())
}

fn arb_referral_status() -> impl Strategy<Value = ReferralStatus> {
    prop::sample::select(ReferralStatus::FLOW.to_vec())
}

fn arb_point_status() -> impl Strategy<Value = PointStatus> {
    prop_oneof![
        Just(PointStatus::NotSubmitted),
        Just(PointStatus::Pending),
        Just(PointStatus::Verified),
        Just(PointStatus::Rejected),
    ]
}

/// Whole-cent amounts up to ten million dollars
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

// ============================================================================
// Badges
// ============================================================================

proptest! {
    #[test]
    fn highest_badge_has_max_priority(badges in prop::collection::vec(arb_badge(), 0..10)) {
        let best = highest_badge(&badges);
        let max = badges.iter().map(|b| b.priority()).max().unwrap_or(0);
        prop_assert_eq!(best.priority(), max);
        if max > 0 {
            prop_assert!(badges.contains(&best));
        } else {
            prop_assert_eq!(best, BadgeLevel::None);
        }
    }

    #[test]
    fn highest_badge_ignores_order(mut badges in prop::collection::vec(arb_badge(), 1..10)) {
        let forward = highest_badge(&badges).priority();
        badges.reverse();
        prop_assert_eq!(highest_badge(&badges).priority(), forward);
    }
}

// ============================================================================
// Referral status machine
// ============================================================================

proptest! {
    #[test]
    fn referral_accepts_only_its_successor(
        from in arb_referral_status(),
        to in arb_referral_status(),
    ) {
        let from_idx = ReferralStatus::FLOW.iter().position(|s| *s == from).unwrap();
        let to_idx = ReferralStatus::FLOW.iter().position(|s| *s == to).unwrap();
        prop_assert_eq!(from.can_transition_to(to), to_idx == from_idx + 1);
    }

    #[test]
    fn referral_status_parses_case_insensitively(
        status in arb_referral_status(),
        lower in any::<bool>(),
    ) {
        let text = if lower {
            status.as_str().to_ascii_lowercase()
        } else {
            status.as_str().to_string()
        };
        prop_assert_eq!(text.parse::<ReferralStatus>().unwrap(), status);
    }
}

// ============================================================================
// Approval precondition
// ============================================================================

proptest! {
    #[test]
    fn approval_blocked_iff_a_required_point_is_rejected(
        statuses in prop::collection::vec(arb_point_status(), 8),
        exempt in any::<bool>(),
    ) {
        let mut application = Application::new(ProfileId::new(), exempt);
        for (key, status) in PointKey::ALL.into_iter().zip(statuses.iter().copied()) {
            application.points.set(key, status);
        }

        let blocked = PointKey::TIER_ONE.into_iter().any(|key| {
            application.points.get(key) == PointStatus::Rejected
                && !(exempt && key == PointKey::WorkersComp)
        });
        prop_assert_eq!(!application.rejected_required_points().is_empty(), blocked);
        prop_assert_eq!(application.status, ApplicationStatus::Pending);
    }
}

// ============================================================================
// Commission
// ============================================================================

proptest! {
    #[test]
    fn standard_commission_is_two_and_a_half_percent(amount in arb_amount()) {
        let breakdown = CommissionTerms::Standard.breakdown(amount);
        prop_assert_eq!(breakdown.total, breakdown.referrer_amount + breakdown.platform_amount);
        prop_assert_eq!(breakdown.referrer_amount, (amount * Decimal::new(2, 2)).round_dp(2));
        prop_assert_eq!(breakdown.platform_amount, (amount * Decimal::new(5, 3)).round_dp(2));
        prop_assert!(breakdown.total <= amount);
    }

    #[test]
    fn formatted_amounts_parse_back(dollars in 0u64..100_000_000, cents in 0u32..100) {
        let mut grouped = String::new();
        let digits = dollars.to_string();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        let text = format!("${grouped}.{cents:02}");
        let expected = Decimal::new((dollars * 100 + cents as u64) as i64, 2);
        prop_assert_eq!(parse_currency(&text).unwrap(), expected);
    }

    #[test]
    fn custom_rate_outside_unit_interval_is_rejected(rate in -1000i64..3000) {
        let rate = Decimal::new(rate, 3);
        let accepted = CommissionTerms::custom(rate).is_ok();
        prop_assert_eq!(accepted, rate >= Decimal::ZERO && rate <= Decimal::ONE);
    }
}
