// ABOUTME: Structural validation of AI output before it touches domain state
// ABOUTME: Repairs what is safely repairable and rejects the rest as malformed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Sanitizer
//!
//! The AI collaborator is not trusted to produce structurally sound domain
//! objects. Every plan, meal, recipe, and macro estimate passes through here
//! before domain state is updated; a `None` means the payload is rejected
//! and the operation fails as [`MalformedAiOutput`](crate::errors::ErrorCode::MalformedAiOutput).

use tracing::debug;
use uuid::Uuid;

use crate::models::nutrition::{DailyPlan, FoodItem, MacroTotals, Meal, Recipe};

/// Largest calorie value accepted for a single day or meal
const MAX_CALORIES: f64 = 20_000.0;

fn valid_amount(value: f64) -> bool {
    value.is_finite() && (0.0..=MAX_CALORIES).contains(&value)
}

/// Validate macro totals: every amount finite and non-negative
#[must_use]
pub fn sanitize_macro_totals(totals: MacroTotals) -> Option<MacroTotals> {
    let amounts = [totals.calories, totals.carbs, totals.protein, totals.fat];
    amounts.iter().all(|v| valid_amount(*v)).then_some(totals)
}

/// Validate and repair a single food item
fn sanitize_item(mut item: FoodItem) -> Option<FoodItem> {
    item.name = item.name.trim().to_owned();
    if item.name.is_empty() || !valid_amount(item.calories) {
        return None;
    }
    if item.portion.trim().is_empty() {
        item.portion = "1 portion".into();
    }
    Some(item)
}

/// Validate and repair one meal.
///
/// Items that fail validation are dropped; a meal with no surviving items is
/// rejected. A missing (nil) id is replaced so downstream swap operations
/// can address the meal.
#[must_use]
pub fn sanitize_meal(mut meal: Meal) -> Option<Meal> {
    meal.name = meal.name.trim().to_owned();
    if meal.name.is_empty() {
        return None;
    }
    if meal.id.is_nil() {
        meal.id = Uuid::new_v4();
    }

    let before = meal.items.len();
    let items = std::mem::take(&mut meal.items);
    meal.items = items.into_iter().filter_map(sanitize_item).collect();
    if meal.items.len() < before {
        debug!(meal = %meal.name, dropped = before - meal.items.len(), "dropped invalid food items");
    }
    if meal.items.is_empty() {
        return None;
    }

    meal.totals = sanitize_macro_totals(meal.totals)?;
    Some(meal)
}

/// Validate and repair one daily plan.
///
/// Meals that fail validation are dropped; a plan with no surviving meals is
/// rejected entirely.
#[must_use]
pub fn sanitize_daily_plan(mut plan: DailyPlan) -> Option<DailyPlan> {
    let meals = std::mem::take(&mut plan.meals);
    plan.meals = meals.into_iter().filter_map(sanitize_meal).collect();
    if plan.meals.is_empty() {
        debug!(date = %plan.date, "daily plan rejected: no valid meals");
        return None;
    }
    Some(plan)
}

/// Validate and repair one recipe
#[must_use]
pub fn sanitize_recipe(mut recipe: Recipe) -> Option<Recipe> {
    recipe.title = recipe.title.trim().to_owned();
    if recipe.title.is_empty() || recipe.ingredients.is_empty() {
        return None;
    }
    if recipe.id.is_nil() {
        recipe.id = Uuid::new_v4();
    }
    recipe.totals = sanitize_macro_totals(recipe.totals)?;
    Some(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(name: &str, calories: f64) -> FoodItem {
        FoodItem {
            name: name.into(),
            portion: "100 g".into(),
            calories,
        }
    }

    fn meal_with_items(items: Vec<FoodItem>) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: "Lunch".into(),
            time: "12:00".into(),
            items,
            totals: MacroTotals {
                calories: 500.0,
                carbs: 50.0,
                protein: 30.0,
                fat: 15.0,
            },
        }
    }

    #[test]
    fn test_invalid_items_are_dropped_not_fatal() {
        let meal = meal_with_items(vec![
            item("Rice", 200.0),
            item("", 100.0),
            item("Ghost", f64::NAN),
        ]);
        let sanitized = sanitize_meal(meal).unwrap();
        assert_eq!(sanitized.items.len(), 1);
        assert_eq!(sanitized.items[0].name, "Rice");
    }

    #[test]
    fn test_meal_with_no_valid_items_rejected() {
        let meal = meal_with_items(vec![item("", 100.0)]);
        assert!(sanitize_meal(meal).is_none());
    }

    #[test]
    fn test_nil_meal_id_replaced() {
        let mut meal = meal_with_items(vec![item("Rice", 200.0)]);
        meal.id = Uuid::nil();
        let sanitized = sanitize_meal(meal).unwrap();
        assert!(!sanitized.id.is_nil());
    }

    #[test]
    fn test_plan_rejected_when_all_meals_invalid() {
        let plan = DailyPlan {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            meals: vec![meal_with_items(vec![])],
        };
        assert!(sanitize_daily_plan(plan).is_none());
    }

    #[test]
    fn test_negative_macros_rejected() {
        let totals = MacroTotals {
            calories: -10.0,
            carbs: 0.0,
            protein: 0.0,
            fat: 0.0,
        };
        assert!(sanitize_macro_totals(totals).is_none());
    }

    #[test]
    fn test_recipe_requires_title_and_ingredients() {
        let recipe = Recipe {
            id: Uuid::nil(),
            title: "  ".into(),
            description: String::new(),
            ingredients: vec!["salt".into()],
            steps: Vec::new(),
            totals: MacroTotals::default(),
        };
        assert!(sanitize_recipe(recipe).is_none());
    }
}
