// ABOUTME: Session document stored as one blob per account by the persistence collaborator
// ABOUTME: Bundles the user profile with meal plans, favorites, and chat history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ai::ChatMessage;
use crate::models::nutrition::{DailyPlan, Recipe};
use crate::models::user::UserProfile;

/// Everything persisted for one account, written as a single document on
/// every state change (full overwrite, no incremental writes).
///
/// There is no schema version field; fields absent from an older stored
/// document pick up their defaults in [`SessionDocument::fill_missing_defaults`],
/// executed exactly once at load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDocument {
    /// The root profile aggregate
    pub profile: UserProfile,
    /// Meal plan, one entry per day
    pub meal_plan: BTreeMap<NaiveDate, DailyPlan>,
    /// Favorited daily plans, newest first
    pub favorite_plans: Vec<DailyPlan>,
    /// Favorited recipes, in insertion order
    pub favorite_recipes: Vec<Recipe>,
    /// Chat history with the assistant
    pub chat_messages: Vec<ChatMessage>,
    /// Last plan text pasted or received in chat, importable into the plan
    pub last_meal_plan_text: Option<String>,
}

impl SessionDocument {
    /// Create the document for a freshly registered profile
    #[must_use]
    pub fn for_profile(profile: UserProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// The single default-fill step executed at load.
    ///
    /// Serde defaults already cover absent fields; this repairs invariants
    /// defaults cannot express (ordering, minimum level).
    pub fn fill_missing_defaults(&mut self) {
        self.profile.normalize();
        for plan in self.favorite_plans.iter_mut() {
            plan.meals.retain(|meal| !meal.items.is_empty() || meal.totals.calories > 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_on_deserialize() {
        // A document written before favorites or chat existed
        let raw = r#"{ "profile": { "name": "Ana", "email": "ana@example.com" } }"#;
        let mut document: SessionDocument = serde_json::from_str(raw).unwrap();
        document.fill_missing_defaults();
        assert_eq!(document.profile.name, "Ana");
        assert!(document.favorite_plans.is_empty());
        assert!(document.chat_messages.is_empty());
        assert!(document.meal_plan.is_empty());
        assert_eq!(document.profile.level, 1);
    }
}
