// ABOUTME: Static entitlement catalog describing plans, features, limits, and periods
// ABOUTME: FeatureKey enum plus per-plan feature descriptors for basic and pro tiers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Entitlement Catalog
//!
//! Static description of which features each plan offers and at what limit.
//! Loaded once and never mutated; the gate consults it on every request.

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::user::PlanKey;

/// Reset period for a rate-limited feature
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimitPeriod {
    /// Counter resets at midnight
    Day,
    /// Counter resets on Monday
    Week,
}

/// Identifier for a rate-limited capability.
///
/// A closed enum rather than string keys: unknown keys are rejected at the
/// boundary instead of silently creating counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    // Daily-period features
    DailyPlanGenerations,
    DayRegenerations,
    ChatImports,
    MacroAdjustments,
    ProgressAnalyses,
    ChatInteractions,
    ItemSwaps,
    MealAnalysesText,
    MealAnalysesImage,
    // Weekly-period features
    WeeklyPlanGenerations,
    ShoppingLists,
    RecipeSearches,
    ImageGenerations,
}

impl FeatureKey {
    /// All feature keys, in catalog order
    pub const ALL: [Self; 13] = [
        Self::DailyPlanGenerations,
        Self::DayRegenerations,
        Self::ChatImports,
        Self::MacroAdjustments,
        Self::ProgressAnalyses,
        Self::ChatInteractions,
        Self::ItemSwaps,
        Self::MealAnalysesText,
        Self::MealAnalysesImage,
        Self::WeeklyPlanGenerations,
        Self::ShoppingLists,
        Self::RecipeSearches,
        Self::ImageGenerations,
    ];

    /// The reset period this feature's counter lives in
    #[must_use]
    pub const fn period(&self) -> LimitPeriod {
        match self {
            Self::DailyPlanGenerations
            | Self::DayRegenerations
            | Self::ChatImports
            | Self::MacroAdjustments
            | Self::ProgressAnalyses
            | Self::ChatInteractions
            | Self::ItemSwaps
            | Self::MealAnalysesText
            | Self::MealAnalysesImage => LimitPeriod::Day,
            Self::WeeklyPlanGenerations
            | Self::ShoppingLists
            | Self::RecipeSearches
            | Self::ImageGenerations => LimitPeriod::Week,
        }
    }

    /// Whether this key is one of the two plan-generation features covered
    /// by the first-use exemption
    #[must_use]
    pub const fn is_plan_generation(&self) -> bool {
        matches!(self, Self::DailyPlanGenerations | Self::WeeklyPlanGenerations)
    }

    /// Convert to the storage string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DailyPlanGenerations => "dailyPlanGenerations",
            Self::DayRegenerations => "dayRegenerations",
            Self::ChatImports => "chatImports",
            Self::MacroAdjustments => "macroAdjustments",
            Self::ProgressAnalyses => "progressAnalyses",
            Self::ChatInteractions => "chatInteractions",
            Self::ItemSwaps => "itemSwaps",
            Self::MealAnalysesText => "mealAnalysesText",
            Self::MealAnalysesImage => "mealAnalysesImage",
            Self::WeeklyPlanGenerations => "weeklyPlanGenerations",
            Self::ShoppingLists => "shoppingLists",
            Self::RecipeSearches => "recipeSearches",
            Self::ImageGenerations => "imageGenerations",
        }
    }
}

impl Display for FeatureKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| AppError::invalid_input(format!("Unknown feature key: {s}")))
    }
}

/// Usage limit for a feature within its period
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeatureLimit {
    /// At most this many uses per period
    Limited(u32),
    /// No cap; the ledger is not consulted
    Unlimited,
}

impl FeatureLimit {
    /// The bounded value, if any
    #[must_use]
    pub const fn bound(&self) -> Option<u32> {
        match self {
            Self::Limited(limit) => Some(*limit),
            Self::Unlimited => None,
        }
    }
}

/// How one plan treats one feature
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureDescriptor {
    /// Whether the feature exists at all on this plan
    pub available: bool,
    /// Per-period cap when available
    pub limit: FeatureLimit,
    /// User-facing label, surfaced in denials and upsell prompts
    pub label: &'static str,
}

impl FeatureDescriptor {
    const fn limited(limit: u32, label: &'static str) -> Self {
        Self {
            available: true,
            limit: FeatureLimit::Limited(limit),
            label,
        }
    }

    const fn unlimited(label: &'static str) -> Self {
        Self {
            available: true,
            limit: FeatureLimit::Unlimited,
            label,
        }
    }

    const fn unavailable(label: &'static str) -> Self {
        Self {
            available: false,
            limit: FeatureLimit::Limited(0),
            label,
        }
    }
}

/// User-facing labels, shared by both plans
mod labels {
    pub const DAILY_PLAN: &str = "Daily plan generation";
    pub const DAY_REGEN: &str = "Day regeneration";
    pub const CHAT_IMPORT: &str = "Chat plan import";
    pub const MACRO_ADJUST: &str = "Macro adjustment";
    pub const PROGRESS: &str = "Progress analysis";
    pub const CHAT: &str = "Chat interactions";
    pub const SWAPS: &str = "Item swaps";
    pub const MEAL_TEXT: &str = "Meal analysis (text)";
    pub const MEAL_IMAGE: &str = "Meal analysis (photo)";
    pub const WEEKLY_PLAN: &str = "Weekly plan generation";
    pub const SHOPPING: &str = "Shopping list";
    pub const RECIPES: &str = "Recipe search";
    pub const IMAGES: &str = "Image generation";
}

/// One subscription plan: feature availability and limits
#[derive(Debug, Clone)]
pub struct Plan {
    /// Plan identity
    pub key: PlanKey,
    features: HashMap<FeatureKey, FeatureDescriptor>,
}

impl Plan {
    /// The free tier: restricted limits, image and progress features absent
    #[must_use]
    pub fn basic() -> Self {
        let features = HashMap::from([
            (
                FeatureKey::DailyPlanGenerations,
                FeatureDescriptor::limited(1, labels::DAILY_PLAN),
            ),
            (
                FeatureKey::DayRegenerations,
                FeatureDescriptor::limited(1, labels::DAY_REGEN),
            ),
            (
                FeatureKey::ChatImports,
                FeatureDescriptor::limited(1, labels::CHAT_IMPORT),
            ),
            (
                FeatureKey::MacroAdjustments,
                FeatureDescriptor::limited(1, labels::MACRO_ADJUST),
            ),
            (
                FeatureKey::ProgressAnalyses,
                FeatureDescriptor::unavailable(labels::PROGRESS),
            ),
            (
                FeatureKey::ChatInteractions,
                FeatureDescriptor::limited(10, labels::CHAT),
            ),
            (
                FeatureKey::ItemSwaps,
                FeatureDescriptor::limited(3, labels::SWAPS),
            ),
            (
                FeatureKey::MealAnalysesText,
                FeatureDescriptor::limited(2, labels::MEAL_TEXT),
            ),
            (
                FeatureKey::MealAnalysesImage,
                FeatureDescriptor::unavailable(labels::MEAL_IMAGE),
            ),
            (
                FeatureKey::WeeklyPlanGenerations,
                FeatureDescriptor::limited(1, labels::WEEKLY_PLAN),
            ),
            (
                FeatureKey::ShoppingLists,
                FeatureDescriptor::limited(1, labels::SHOPPING),
            ),
            (
                FeatureKey::RecipeSearches,
                FeatureDescriptor::limited(3, labels::RECIPES),
            ),
            (
                FeatureKey::ImageGenerations,
                FeatureDescriptor::unavailable(labels::IMAGES),
            ),
        ]);
        Self {
            key: PlanKey::Basic,
            features,
        }
    }

    /// The paid tier: everything available, chat and swaps uncapped
    #[must_use]
    pub fn pro() -> Self {
        let features = HashMap::from([
            (
                FeatureKey::DailyPlanGenerations,
                FeatureDescriptor::limited(5, labels::DAILY_PLAN),
            ),
            (
                FeatureKey::DayRegenerations,
                FeatureDescriptor::limited(10, labels::DAY_REGEN),
            ),
            (
                FeatureKey::ChatImports,
                FeatureDescriptor::unlimited(labels::CHAT_IMPORT),
            ),
            (
                FeatureKey::MacroAdjustments,
                FeatureDescriptor::limited(10, labels::MACRO_ADJUST),
            ),
            (
                FeatureKey::ProgressAnalyses,
                FeatureDescriptor::limited(3, labels::PROGRESS),
            ),
            (
                FeatureKey::ChatInteractions,
                FeatureDescriptor::unlimited(labels::CHAT),
            ),
            (
                FeatureKey::ItemSwaps,
                FeatureDescriptor::unlimited(labels::SWAPS),
            ),
            (
                FeatureKey::MealAnalysesText,
                FeatureDescriptor::limited(10, labels::MEAL_TEXT),
            ),
            (
                FeatureKey::MealAnalysesImage,
                FeatureDescriptor::limited(5, labels::MEAL_IMAGE),
            ),
            (
                FeatureKey::WeeklyPlanGenerations,
                FeatureDescriptor::limited(3, labels::WEEKLY_PLAN),
            ),
            (
                FeatureKey::ShoppingLists,
                FeatureDescriptor::limited(5, labels::SHOPPING),
            ),
            (
                FeatureKey::RecipeSearches,
                FeatureDescriptor::limited(20, labels::RECIPES),
            ),
            (
                FeatureKey::ImageGenerations,
                FeatureDescriptor::limited(10, labels::IMAGES),
            ),
        ]);
        Self {
            key: PlanKey::Pro,
            features,
        }
    }

    /// Look up the descriptor for a feature on this plan
    #[must_use]
    pub fn feature(&self, key: FeatureKey) -> Option<&FeatureDescriptor> {
        self.features.get(&key)
    }
}

/// The full plan catalog, loaded once at startup
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    basic: Plan,
    pro: Plan,
}

impl PlanCatalog {
    /// Build the catalog
    #[must_use]
    pub fn new() -> Self {
        Self {
            basic: Plan::basic(),
            pro: Plan::pro(),
        }
    }

    /// Resolve a plan by key
    #[must_use]
    pub fn plan(&self, key: PlanKey) -> &Plan {
        match key {
            PlanKey::Basic => &self.basic,
            PlanKey::Pro => &self.pro,
        }
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_described_on_every_plan() {
        let catalog = PlanCatalog::new();
        for plan_key in [PlanKey::Basic, PlanKey::Pro] {
            let plan = catalog.plan(plan_key);
            for key in FeatureKey::ALL {
                assert!(
                    plan.feature(key).is_some(),
                    "{plan_key} missing descriptor for {key}"
                );
            }
        }
    }

    #[test]
    fn test_pro_dominates_basic() {
        let catalog = PlanCatalog::new();
        for key in FeatureKey::ALL {
            let basic = catalog.plan(PlanKey::Basic).feature(key).unwrap();
            let pro = catalog.plan(PlanKey::Pro).feature(key).unwrap();
            assert!(pro.available, "pro must offer {key}");
            if basic.available {
                match (basic.limit, pro.limit) {
                    (FeatureLimit::Limited(b), FeatureLimit::Limited(p)) => {
                        assert!(p >= b, "pro limit for {key} below basic")
                    }
                    (FeatureLimit::Unlimited, FeatureLimit::Limited(_)) => {
                        panic!("pro caps {key} where basic does not")
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_basic_excludes_upsell_features() {
        let catalog = PlanCatalog::new();
        for key in [
            FeatureKey::ProgressAnalyses,
            FeatureKey::MealAnalysesImage,
            FeatureKey::ImageGenerations,
        ] {
            assert!(!catalog.plan(PlanKey::Basic).feature(key).unwrap().available);
        }
    }

    #[test]
    fn test_feature_key_string_roundtrip() {
        for key in FeatureKey::ALL {
            assert_eq!(key.as_str().parse::<FeatureKey>().unwrap(), key);
        }
        assert!("mystery".parse::<FeatureKey>().is_err());
    }

    #[test]
    fn test_serde_uses_camel_case_keys() {
        let json = serde_json::to_string(&FeatureKey::DailyPlanGenerations).unwrap();
        assert_eq!(json, "\"dailyPlanGenerations\"");
    }
}
