// ABOUTME: Progression subsystem: XP and leveling, streaks, perfect days, achievements
// ABOUTME: Pure transforms over the profile, emitting notification intents
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Progression Engine
//!
//! XP accrual with a subscriber multiplier, level carry-over against a
//! pluggable curve, streak continuity with milestone bonuses, perfect-day
//! detection, and monotonic achievement unlocks. All functions are pure
//! profile transforms that return notification intents instead of owning
//! timers.

/// Achievement catalog and unlock evaluation
pub mod achievements;
/// Day completion, streaks, and decay
pub mod engine;
/// XP awards and the level curve trait
pub mod xp;

pub use achievements::{
    achievement_by_id, evaluate_unlocks, Achievement, AchievementContext, Criterion,
    ALL_ACHIEVEMENTS,
};
pub use engine::{apply_streak_decay, mark_day_completed};
pub use xp::{award_xp, DefaultXpCurve, XpCurve};
