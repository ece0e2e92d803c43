// ABOUTME: Achievement catalog with typed unlock criteria and monotonic evaluation
// ABOUTME: Unlocks process in catalog order with one staggered XP award per unlock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Achievements
//!
//! The catalog is static; unlock evaluation runs after any profile mutation.
//! Unlocked ids are never removed and an already-unlocked achievement is
//! never re-evaluated for reward. Popups are staggered through intent delays
//! so they do not visually collide.

use serde::Serialize;
use tracing::info;

use crate::models::user::UserProfile;
use crate::notifications::NotificationIntent;
use crate::progression::xp::{award_xp, XpCurve};

/// Typed unlock predicate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// First successful AI plan generation
    PlanGenerated,
    /// Streak of at least this many days
    StreakAtLeast(u32),
    /// Water streak of at least this many days
    WaterStreakAtLeast(u32),
    /// At least this many completed days overall
    CompletedDaysAtLeast(u32),
    /// At least this many perfect days
    PerfectDaysAtLeast(u32),
    /// Reached at least this level
    LevelAtLeast(u32),
    /// Lifetime recipe searches at least this many
    RecipesGeneratedAtLeast(u32),
    /// At least this many favorited recipes (externally supplied count)
    FavoriteRecipesAtLeast(u32),
    /// At least this many logged activities
    ActivitiesLoggedAtLeast(u32),
    /// Athlete mode activated at least once
    AthleteModeUsed,
}

/// Auxiliary counts supplied by the session, outside the profile itself
#[derive(Debug, Clone, Copy, Default)]
pub struct AchievementContext {
    /// Number of favorited recipes
    pub favorite_recipes: usize,
}

impl Criterion {
    /// Evaluate this predicate against the current profile
    #[must_use]
    pub fn is_met(&self, profile: &UserProfile, context: &AchievementContext) -> bool {
        match *self {
            Self::PlanGenerated => profile.has_generated_plan,
            Self::StreakAtLeast(n) => profile.streak >= n,
            Self::WaterStreakAtLeast(n) => profile.water_streak >= n,
            Self::CompletedDaysAtLeast(n) => profile.completed_days.len() >= n as usize,
            Self::PerfectDaysAtLeast(n) => profile.perfect_days_count >= n,
            Self::LevelAtLeast(n) => profile.level >= n,
            Self::RecipesGeneratedAtLeast(n) => profile.total_recipes_generated >= n,
            Self::FavoriteRecipesAtLeast(n) => context.favorite_recipes >= n as usize,
            Self::ActivitiesLoggedAtLeast(n) => profile.activity_logs.len() >= n as usize,
            Self::AthleteModeUsed => profile.athlete_mode_used,
        }
    }
}

/// One achievement in the catalog
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Achievement {
    /// Stable identifier stored on the profile
    pub id: &'static str,
    /// Display title
    pub title: &'static str,
    /// Display description
    pub description: &'static str,
    /// XP granted on unlock
    pub xp_reward: u32,
    /// Unlock predicate
    pub criterion: Criterion,
}

/// The full achievement catalog, in evaluation order
pub const ALL_ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first-plan",
        title: "Meal Architect",
        description: "Generate your first AI meal plan",
        xp_reward: 25,
        criterion: Criterion::PlanGenerated,
    },
    Achievement {
        id: "streak-3",
        title: "Warming Up",
        description: "Complete your goal 3 days in a row",
        xp_reward: 50,
        criterion: Criterion::StreakAtLeast(3),
    },
    Achievement {
        id: "streak-7",
        title: "Full Week",
        description: "Complete your goal 7 days in a row",
        xp_reward: 100,
        criterion: Criterion::StreakAtLeast(7),
    },
    Achievement {
        id: "streak-30",
        title: "Iron Discipline",
        description: "Complete your goal 30 days in a row",
        xp_reward: 400,
        criterion: Criterion::StreakAtLeast(30),
    },
    Achievement {
        id: "hydration-7",
        title: "Well Watered",
        description: "Hit your water goal 7 days in a row",
        xp_reward: 75,
        criterion: Criterion::WaterStreakAtLeast(7),
    },
    Achievement {
        id: "days-30",
        title: "Regular",
        description: "Complete 30 days overall",
        xp_reward: 150,
        criterion: Criterion::CompletedDaysAtLeast(30),
    },
    Achievement {
        id: "perfect-1",
        title: "Bullseye",
        description: "Land every macro within 5% of goal for a day",
        xp_reward: 60,
        criterion: Criterion::PerfectDaysAtLeast(1),
    },
    Achievement {
        id: "perfect-5",
        title: "Precision Eater",
        description: "Record 5 perfect days",
        xp_reward: 200,
        criterion: Criterion::PerfectDaysAtLeast(5),
    },
    Achievement {
        id: "level-5",
        title: "Climbing",
        description: "Reach level 5",
        xp_reward: 100,
        criterion: Criterion::LevelAtLeast(5),
    },
    Achievement {
        id: "recipes-10",
        title: "Curious Cook",
        description: "Discover 10 recipes with the AI",
        xp_reward: 80,
        criterion: Criterion::RecipesGeneratedAtLeast(10),
    },
    Achievement {
        id: "favorites-5",
        title: "Collector",
        description: "Save 5 favorite recipes",
        xp_reward: 40,
        criterion: Criterion::FavoriteRecipesAtLeast(5),
    },
    Achievement {
        id: "athlete-mode",
        title: "Beast Mode",
        description: "Activate athlete mode",
        xp_reward: 30,
        criterion: Criterion::AthleteModeUsed,
    },
    Achievement {
        id: "active-10",
        title: "In Motion",
        description: "Log 10 physical activities",
        xp_reward: 90,
        criterion: Criterion::ActivitiesLoggedAtLeast(10),
    },
];

/// Look up an achievement by id
#[must_use]
pub fn achievement_by_id(id: &str) -> Option<&'static Achievement> {
    ALL_ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Scan the catalog and unlock every achievement whose predicate now passes.
///
/// Runs to a fixed point: XP rewards can cross a level threshold and satisfy
/// a level criterion in the same evaluation. Unlocks are processed in catalog
/// order with popups staggered by batch position; each unlock awards XP
/// exactly once.
pub fn evaluate_unlocks(
    profile: &mut UserProfile,
    curve: &dyn XpCurve,
    context: &AchievementContext,
) -> Vec<NotificationIntent> {
    let mut intents = Vec::new();
    let mut batch_index: u64 = 0;

    loop {
        let newly_unlocked: Vec<&'static Achievement> = ALL_ACHIEVEMENTS
            .iter()
            .filter(|achievement| {
                !profile.has_achievement(achievement.id)
                    && achievement.criterion.is_met(profile, context)
            })
            .collect();

        if newly_unlocked.is_empty() {
            return intents;
        }

        for achievement in newly_unlocked {
            profile.achievements.push(achievement.id.to_owned());
            info!(id = achievement.id, title = achievement.title, "achievement unlocked");

            intents.push(NotificationIntent::achievement(
                format!("🎉 Achievement: {}", achievement.title),
                batch_index,
            ));

            // The XP toast and any level-up banner inherit the popup's slot
            // in the stagger sequence.
            let stagger = batch_index * crate::constants::notification_timing::ACHIEVEMENT_STAGGER_MS;
            for mut intent in award_xp(
                profile,
                curve,
                achievement.xp_reward,
                &format!("Achievement: {}", achievement.title),
            ) {
                intent.delay_ms += stagger;
                intents.push(intent);
            }

            batch_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::xp::DefaultXpCurve;

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<_> = ALL_ACHIEVEMENTS.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ALL_ACHIEVEMENTS.len());
    }

    #[test]
    fn test_unlock_is_monotonic_and_not_rewarded_twice() {
        let mut profile = UserProfile::default();
        profile.has_generated_plan = true;

        let context = AchievementContext::default();
        let first = evaluate_unlocks(&mut profile, &DefaultXpCurve, &context);
        assert!(profile.has_achievement("first-plan"));
        assert!(!first.is_empty());
        let xp_after_first = profile.xp;

        let second = evaluate_unlocks(&mut profile, &DefaultXpCurve, &context);
        assert!(second.is_empty(), "already-unlocked must not re-evaluate");
        assert_eq!(profile.xp, xp_after_first);
    }

    #[test]
    fn test_batch_unlocks_stagger_popups() {
        let mut profile = UserProfile::default();
        profile.streak = 7;
        profile.water_streak = 7;

        let intents = evaluate_unlocks(&mut profile, &DefaultXpCurve, &AchievementContext::default());
        let popups: Vec<_> = intents
            .iter()
            .filter(|i| i.kind == crate::notifications::NotificationKind::Achievement)
            .collect();
        assert_eq!(popups.len(), 3); // streak-3, streak-7, hydration-7
        assert!(popups[0].delay_ms < popups[1].delay_ms);
        assert!(popups[1].delay_ms < popups[2].delay_ms);
    }

    #[test]
    fn test_xp_rewards_can_cascade_into_level_achievements() {
        struct TinyCurve;
        impl XpCurve for TinyCurve {
            fn xp_for_next_level(&self, level: u32) -> u32 {
                10 + level
            }
        }

        let mut profile = UserProfile::default();
        profile.streak = 30; // streak-3 + streak-7 + streak-30 rewards: 550 XP
        let _ = evaluate_unlocks(&mut profile, &TinyCurve, &AchievementContext::default());
        assert!(profile.level >= 5);
        assert!(
            profile.has_achievement("level-5"),
            "level achievement must unlock in the same evaluation"
        );
    }

    #[test]
    fn test_favorite_recipes_come_from_context() {
        let mut profile = UserProfile::default();
        let context = AchievementContext { favorite_recipes: 5 };
        evaluate_unlocks(&mut profile, &DefaultXpCurve, &context);
        assert!(profile.has_achievement("favorites-5"));
    }
}
