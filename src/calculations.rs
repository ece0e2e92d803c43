// ABOUTME: Macro goal derivation from physiology, activity level, and diet difficulty
// ABOUTME: Mifflin-St Jeor BMR with activity factor and weight-goal adjustment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Macro Goal Calculation
//!
//! Deterministic derivation of daily macro goals. Runs at registration, on
//! any physiology change, and once at session load so stale stored goals are
//! migrated to the current formula.

use crate::models::user::{DietDifficulty, Gender, UserProfile};

/// Daily calorie adjustment toward the weight goal, in kcal
const GOAL_ADJUSTMENT_KCAL: f64 = 300.0;
/// Floor for the daily calorie goal
const MIN_CALORIES: f64 = 1200.0;
/// Share of calories allotted to fat
const FAT_CALORIE_SHARE: f64 = 0.25;

/// Calculated daily goals for the four tracked macros
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroGoals {
    /// kcal per day
    pub calories: f64,
    /// grams per day
    pub carbs: f64,
    /// grams per day
    pub protein: f64,
    /// grams per day
    pub fat: f64,
}

/// Derive daily macro goals from the profile's physiology.
///
/// Mifflin-St Jeor basal rate scaled by the activity factor, shifted by a
/// fixed amount toward the weight goal. Protein scales with body weight and
/// rises under athlete difficulty; fat takes a fixed calorie share; carbs
/// absorb the remainder.
#[must_use]
pub fn calculate_macro_goals(profile: &UserProfile) -> MacroGoals {
    let gender_term = match profile.gender {
        Gender::Male => 5.0,
        Gender::Female => -161.0,
        Gender::Other => -78.0,
    };
    let bmr = 10.0 * profile.weight_kg + 6.25 * profile.height_cm
        - 5.0 * f64::from(profile.age)
        + gender_term;

    let maintenance = bmr * profile.activity_level.factor();

    let adjustment = if profile.weight_goal_kg < profile.weight_kg {
        -GOAL_ADJUSTMENT_KCAL
    } else if profile.weight_goal_kg > profile.weight_kg {
        GOAL_ADJUSTMENT_KCAL
    } else {
        0.0
    };

    let calories = (maintenance + adjustment).max(MIN_CALORIES).round();

    let protein_per_kg = match profile.diet_difficulty {
        DietDifficulty::Normal => 1.8,
        DietDifficulty::Athlete => 2.2,
    };
    let protein = (profile.weight_kg * protein_per_kg).round();

    let fat = (calories * FAT_CALORIE_SHARE / 9.0).round();

    let carbs = ((calories - protein * 4.0 - fat * 9.0) / 4.0).max(0.0).round();

    MacroGoals {
        calories,
        carbs,
        protein,
        fat,
    }
}

/// Apply freshly calculated goals to the profile, preserving today's intake
pub fn apply_macro_goals(profile: &mut UserProfile) {
    let goals = calculate_macro_goals(profile);
    profile.macros.calories.goal = goals.calories;
    profile.macros.carbs.goal = goals.carbs;
    profile.macros.protein.goal = goals.protein;
    profile.macros.fat.goal = goals.fat;
}

/// Whether stored goals differ from what the current formula produces
#[must_use]
pub fn goals_are_stale(profile: &UserProfile) -> bool {
    let goals = calculate_macro_goals(profile);
    (profile.macros.calories.goal - goals.calories).abs() > f64::EPSILON
        || (profile.macros.carbs.goal - goals.carbs).abs() > f64::EPSILON
        || (profile.macros.protein.goal - goals.protein).abs() > f64::EPSILON
        || (profile.macros.fat.goal - goals.fat).abs() > f64::EPSILON
}
