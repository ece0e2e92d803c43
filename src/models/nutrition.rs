// ABOUTME: Nutrition domain models shared across the meal plan and tracking features
// ABOUTME: Macro tracker, food items, meals, daily plans, and recipes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tracked macro: today's intake against the calculated goal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MacroReading {
    /// Amount consumed today
    pub current: f64,
    /// Daily goal
    pub goal: f64,
}

impl MacroReading {
    /// Create a reading with a goal and zero intake
    #[must_use]
    pub const fn with_goal(goal: f64) -> Self {
        Self { current: 0.0, goal }
    }

    /// Intake as a fraction of goal, `None` when the goal is not positive.
    ///
    /// A zero goal disqualifies ratio-based checks rather than producing
    /// division artifacts.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        (self.goal > 0.0).then(|| self.current / self.goal)
    }
}

/// The four tracked macros
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MacroTracker {
    /// Calories in kcal
    pub calories: MacroReading,
    /// Carbohydrates in grams
    pub carbs: MacroReading,
    /// Protein in grams
    pub protein: MacroReading,
    /// Fat in grams
    pub fat: MacroReading,
}

impl Default for MacroTracker {
    fn default() -> Self {
        Self {
            calories: MacroReading::with_goal(2000.0),
            carbs: MacroReading::with_goal(250.0),
            protein: MacroReading::with_goal(150.0),
            fat: MacroReading::with_goal(70.0),
        }
    }
}

impl MacroTracker {
    /// Add a meal's totals to today's intake, rounding each macro
    pub fn log(&mut self, totals: &MacroTotals) {
        self.calories.current += totals.calories.round();
        self.carbs.current += totals.carbs.round();
        self.protein.current += totals.protein.round();
        self.fat.current += totals.fat.round();
    }

    /// Readings in a fixed order for ratio sweeps
    #[must_use]
    pub const fn readings(&self) -> [MacroReading; 4] {
        [self.calories, self.carbs, self.protein, self.fat]
    }
}

/// Absolute macro amounts, as returned by meal analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MacroTotals {
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

/// A single food item within a meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    /// Item name as shown to the user
    pub name: String,
    /// Portion description ("100 g", "1 cup")
    pub portion: String,
    /// Calories for the portion
    pub calories: f64,
}

/// A meal within a daily plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    /// Stable identifier used when swapping or regenerating a meal
    pub id: Uuid,
    /// Meal name ("Breakfast", "Post-workout snack")
    pub name: String,
    /// Suggested time of day, free-form ("07:30")
    pub time: String,
    /// Items composing the meal
    pub items: Vec<FoodItem>,
    /// Macro totals for the whole meal
    pub totals: MacroTotals,
}

/// One day of the meal plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPlan {
    /// Calendar day this plan applies to
    pub date: NaiveDate,
    /// Meals in serving order
    pub meals: Vec<Meal>,
}

impl DailyPlan {
    /// Sum of meal totals across the day
    #[must_use]
    pub fn day_totals(&self) -> MacroTotals {
        self.meals.iter().fold(MacroTotals::default(), |acc, meal| {
            MacroTotals {
                calories: acc.calories + meal.totals.calories,
                carbs: acc.carbs + meal.totals.carbs,
                protein: acc.protein + meal.totals.protein,
                fat: acc.fat + meal.totals.fat,
            }
        })
    }
}

/// A discovered recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable identifier, used for favorites
    pub id: Uuid,
    /// Recipe title
    pub title: String,
    /// Short description
    pub description: String,
    /// Ingredient lines
    pub ingredients: Vec<String>,
    /// Preparation steps
    pub steps: Vec<String>,
    /// Macro totals per serving
    pub totals: MacroTotals,
}

/// Result of parsing a free-text activity description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityAnalysis {
    /// Kind of activity recognized
    pub activity_type: String,
    /// Duration in minutes
    pub duration_minutes: u32,
    /// Estimated calories burned
    pub calories_burned: u32,
}
