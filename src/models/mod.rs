// ABOUTME: Domain model module with user, nutrition, and session document types
// ABOUTME: Re-exports the commonly used aggregates for convenient access
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! Domain models for the NutriBot core

/// Nutrition domain types: macros, meals, plans, recipes
pub mod nutrition;
/// The persisted session document
pub mod session;
/// The user profile aggregate and supporting enums
pub mod user;

pub use nutrition::{
    ActivityAnalysis, DailyPlan, FoodItem, MacroReading, MacroTotals, MacroTracker, Meal, Recipe,
};
pub use session::SessionDocument;
pub use user::{
    ActivityLevel, ActivityLog, BillingCycle, DietDifficulty, Gender, PlanKey, UserProfile,
    WeightEntry,
};
