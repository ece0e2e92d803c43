// ABOUTME: Day completion handling: streak continuity, milestone bonuses, water streak
// ABOUTME: Perfect-day detection and load-time streak decay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Day Completion and Streaks
//!
//! A streak counts consecutive completed calendar days and breaks on any gap
//! day. Decay is a passive correction applied once per session load, not a
//! scheduled job.

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use crate::constants::xp_amounts;
use crate::models::user::UserProfile;
use crate::notifications::NotificationIntent;
use crate::progression::xp::{award_xp, XpCurve};

/// Inclusive tolerance band for a perfect macro ratio
const PERFECT_DAY_BAND: (f64, f64) = (0.95, 1.05);

/// Mark `today` as completed, updating streaks, water streak, and the
/// perfect-day counter.
///
/// No-op when `today` was already completed. The streak continues only when
/// the most recently completed day is exactly yesterday; any gap (including
/// the very first completion) starts a new streak of 1. One-time milestone
/// bonuses fire exactly when the new streak equals 3 and exactly when it
/// equals 7.
pub fn mark_day_completed(
    profile: &mut UserProfile,
    curve: &dyn XpCurve,
    today: NaiveDate,
) -> Vec<NotificationIntent> {
    if profile.completed_days.contains(&today) {
        return Vec::new();
    }

    let mut intents = award_xp(profile, curve, xp_amounts::DAY_COMPLETE, "Daily goal completed");

    let yesterday = today - Duration::days(1);
    let new_streak = if profile.last_completed_day() == Some(yesterday) {
        profile.streak + 1
    } else {
        1
    };

    if new_streak == 3 {
        intents.extend(award_xp(
            profile,
            curve,
            xp_amounts::STREAK_BONUS_3,
            "Bonus: 3-day streak!",
        ));
    }
    if new_streak == 7 {
        intents.extend(award_xp(
            profile,
            curve,
            xp_amounts::STREAK_BONUS_7,
            "Bonus: 7-day streak!",
        ));
    }

    profile.streak = new_streak;
    profile.completed_days.push(today);
    profile.completed_days.sort_unstable();

    if profile.water_liters >= profile.water_goal_liters {
        profile.water_streak += 1;
    } else {
        profile.water_streak = 0;
    }

    if is_perfect_day(profile) {
        profile.perfect_days_count += 1;
        info!(count = profile.perfect_days_count, "perfect day recorded");
    }

    debug!(streak = profile.streak, water_streak = profile.water_streak, %today, "day completed");
    intents
}

/// A perfect day requires every macro ratio within ±5% of goal, with all
/// four goals strictly positive (a zero goal disqualifies the check).
fn is_perfect_day(profile: &UserProfile) -> bool {
    profile.macros.readings().iter().all(|reading| {
        reading
            .ratio()
            .is_some_and(|ratio| (PERFECT_DAY_BAND.0..=PERFECT_DAY_BAND.1).contains(&ratio))
    })
}

/// Passive streak decay, evaluated once per session load.
///
/// When the latest completed day is strictly older than yesterday the user
/// skipped at least one full day, so both streaks reset to zero.
pub fn apply_streak_decay(profile: &mut UserProfile, today: NaiveDate) {
    let Some(last) = profile.last_completed_day() else {
        return;
    };
    if last < today - Duration::days(1) {
        debug!(%last, %today, "streak broken by gap day");
        profile.streak = 0;
        profile.water_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::xp::DefaultXpCurve;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile_with_days(days: &[NaiveDate], streak: u32) -> UserProfile {
        let mut profile = UserProfile::default();
        profile.completed_days = days.to_vec();
        profile.streak = streak;
        profile
    }

    #[test]
    fn test_first_completion_starts_streak_of_one() {
        let mut profile = UserProfile::default();
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert_eq!(profile.streak, 1);
        assert_eq!(profile.completed_days, vec![day(2024, 1, 1)]);
    }

    #[test]
    fn test_consecutive_day_extends_streak() {
        let mut profile = profile_with_days(&[day(2024, 1, 1)], 1);
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 2));
        assert_eq!(profile.streak, 2);
    }

    #[test]
    fn test_gap_day_resets_streak_to_one() {
        let mut profile = profile_with_days(&[day(2024, 1, 1)], 1);
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 3));
        assert_eq!(profile.streak, 1, "a gap day must not extend the streak");
    }

    #[test]
    fn test_already_completed_day_is_noop() {
        let mut profile = profile_with_days(&[day(2024, 1, 1)], 1);
        let xp_before = profile.xp;
        let intents = mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert!(intents.is_empty());
        assert_eq!(profile.xp, xp_before);
        assert_eq!(profile.completed_days.len(), 1);
    }

    #[test]
    fn test_streak_milestones_fire_exactly_at_three_and_seven() {
        let mut profile = UserProfile::default();
        let start = day(2024, 1, 1);
        let mut bonus_days = Vec::new();
        for offset in 0..8 {
            let xp_before_total = total_xp(&profile);
            mark_day_completed(&mut profile, &DefaultXpCurve, start + Duration::days(offset));
            let gained = total_xp(&profile) - xp_before_total;
            if gained > u64::from(xp_amounts::DAY_COMPLETE) {
                bonus_days.push(profile.streak);
            }
        }
        assert_eq!(bonus_days, vec![3, 7]);
    }

    // Total XP across levels under the default curve, for bonus detection
    fn total_xp(profile: &UserProfile) -> u64 {
        let mut total = u64::from(profile.xp);
        for level in 1..profile.level {
            total += u64::from(DefaultXpCurve.xp_for_next_level(level));
        }
        total
    }

    #[test]
    fn test_water_streak_tracks_goal() {
        let mut profile = UserProfile::default();
        profile.water_liters = 2.5;
        profile.water_goal_liters = 2.5;
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert_eq!(profile.water_streak, 1);

        profile.water_liters = 1.0;
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 2));
        assert_eq!(profile.water_streak, 0);
    }

    #[test]
    fn test_perfect_day_boundaries_inclusive() {
        let mut profile = UserProfile::default();
        for reading in [
            &mut profile.macros.calories,
            &mut profile.macros.carbs,
            &mut profile.macros.protein,
            &mut profile.macros.fat,
        ] {
            reading.goal = 1000.0;
            reading.current = 950.0; // exactly 95%
        }
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert_eq!(profile.perfect_days_count, 1);

        let mut profile = UserProfile::default();
        for reading in [
            &mut profile.macros.calories,
            &mut profile.macros.carbs,
            &mut profile.macros.protein,
            &mut profile.macros.fat,
        ] {
            reading.goal = 1000.0;
            reading.current = 1050.0; // exactly 105%
        }
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert_eq!(profile.perfect_days_count, 1);
    }

    #[test]
    fn test_perfect_day_rejected_just_outside_band() {
        let mut profile = UserProfile::default();
        for reading in [
            &mut profile.macros.calories,
            &mut profile.macros.carbs,
            &mut profile.macros.protein,
            &mut profile.macros.fat,
        ] {
            reading.goal = 1000.0;
            reading.current = 949.0; // 94.9%
        }
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert_eq!(profile.perfect_days_count, 0);
    }

    #[test]
    fn test_zero_goal_disqualifies_perfect_day() {
        let mut profile = UserProfile::default();
        for reading in [
            &mut profile.macros.calories,
            &mut profile.macros.carbs,
            &mut profile.macros.protein,
        ] {
            reading.goal = 1000.0;
            reading.current = 1000.0;
        }
        profile.macros.fat.goal = 0.0;
        profile.macros.fat.current = 0.0;
        mark_day_completed(&mut profile, &DefaultXpCurve, day(2024, 1, 1));
        assert_eq!(profile.perfect_days_count, 0);
    }

    #[test]
    fn test_decay_resets_after_gap() {
        let mut profile = profile_with_days(&[day(2024, 1, 1)], 4);
        profile.water_streak = 2;
        apply_streak_decay(&mut profile, day(2024, 1, 3));
        assert_eq!(profile.streak, 0);
        assert_eq!(profile.water_streak, 0);
    }

    #[test]
    fn test_decay_keeps_streak_when_yesterday_completed() {
        let mut profile = profile_with_days(&[day(2024, 1, 2)], 4);
        apply_streak_decay(&mut profile, day(2024, 1, 3));
        assert_eq!(profile.streak, 4);
    }
}
