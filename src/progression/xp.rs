// ABOUTME: XP accrual with subscriber multiplier and multi-level carry-over
// ABOUTME: XpCurve trait so the engine tolerates any strictly increasing level curve
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # XP and Leveling
//!
//! XP awards are small relative to level thresholds, but the carry-over loop
//! still supports an award that spans several thresholds in one call.

use tracing::debug;

use crate::constants::xp_amounts;
use crate::models::user::UserProfile;
use crate::notifications::NotificationIntent;

/// The level curve collaborator.
///
/// Implementations must be strictly increasing in `level`; the engine makes
/// no other assumption about the curve's shape.
pub trait XpCurve: Send + Sync {
    /// XP required to advance from `level` to `level + 1`
    fn xp_for_next_level(&self, level: u32) -> u32;
}

/// Default linear curve: 100 XP for level 1, +50 per level thereafter
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultXpCurve;

impl XpCurve for DefaultXpCurve {
    fn xp_for_next_level(&self, level: u32) -> u32 {
        100 + level.saturating_sub(1) * 50
    }
}

/// Award XP to the profile, applying the subscriber multiplier and carrying
/// overflow across as many level-ups as it spans.
///
/// A zero base amount is a no-op. Returns the notification intents for the
/// XP toast and, when a threshold was crossed, the deferred level-up banner.
pub fn award_xp(
    profile: &mut UserProfile,
    curve: &dyn XpCurve,
    base_amount: u32,
    reason: &str,
) -> Vec<NotificationIntent> {
    if base_amount == 0 {
        return Vec::new();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // Safe: award amounts are small and the multiplier is a fixed positive constant
    let effective = if profile.is_subscribed {
        (f64::from(base_amount) * xp_amounts::SUBSCRIBER_MULTIPLIER).round() as u32
    } else {
        base_amount
    };

    let mut message = format!("+{effective} XP: {reason}");
    if profile.is_subscribed {
        message.push_str(" (Pro bonus x1.5!)");
    }

    let mut intents = vec![NotificationIntent::xp(message)];

    profile.xp += effective;
    let starting_level = profile.level;
    while profile.xp >= curve.xp_for_next_level(profile.level) {
        profile.xp -= curve.xp_for_next_level(profile.level);
        profile.level += 1;
    }

    if profile.level > starting_level {
        debug!(
            from = starting_level,
            to = profile.level,
            "level threshold crossed"
        );
        intents.push(NotificationIntent::level_up(format!(
            "🎉 LEVEL UP! You reached level {}!",
            profile.level
        )));
    }

    intents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_award_is_noop() {
        let mut profile = UserProfile::default();
        let intents = award_xp(&mut profile, &DefaultXpCurve, 0, "nothing");
        assert!(intents.is_empty());
        assert_eq!(profile.xp, 0);
        assert_eq!(profile.level, 1);
    }

    #[test]
    fn test_subscriber_multiplier_rounds() {
        let mut profile = UserProfile::default();
        profile.is_subscribed = true;
        award_xp(&mut profile, &DefaultXpCurve, 15, "meal logged");
        // 15 * 1.5 = 22.5, rounds to 23
        assert_eq!(profile.xp, 23);
    }

    #[test]
    fn test_single_level_up_carries_remainder() {
        let mut profile = UserProfile::default();
        profile.xp = 90;
        let intents = award_xp(&mut profile, &DefaultXpCurve, 20, "day complete");
        assert_eq!(profile.level, 2);
        assert_eq!(profile.xp, 10);
        assert!(intents
            .iter()
            .any(|i| i.kind == crate::notifications::NotificationKind::LevelUp));
    }

    #[test]
    fn test_multi_level_jump_in_one_award() {
        // Level 1 needs 100, level 2 needs 150; a 260 XP award from zero
        // crosses both and leaves 10.
        let mut profile = UserProfile::default();
        award_xp(&mut profile, &DefaultXpCurve, 260, "bulk import");
        assert_eq!(profile.level, 3);
        assert_eq!(profile.xp, 10);
        assert!(profile.xp < DefaultXpCurve.xp_for_next_level(profile.level));
    }

    #[test]
    fn test_any_strictly_increasing_curve_is_tolerated() {
        struct SteepCurve;
        impl XpCurve for SteepCurve {
            fn xp_for_next_level(&self, level: u32) -> u32 {
                level * level * 100
            }
        }

        let mut profile = UserProfile::default();
        award_xp(&mut profile, &SteepCurve, 450, "bonus");
        // Level 1 threshold 100 crossed (350 left), level 2 threshold 400 not.
        assert_eq!(profile.level, 2);
        assert_eq!(profile.xp, 350);
    }
}
