// ABOUTME: User profile aggregate and supporting enums for the NutriBot core
// ABOUTME: PlanKey, BillingCycle, physiology types, and the UserProfile root document
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entitlements::credits::CreditStore;
use crate::entitlements::ledger::UsageLedger;
use crate::errors::AppError;
use crate::models::nutrition::MacroTracker;

/// Subscription plan key
///
/// The effective plan a request is evaluated against may differ from the
/// stored plan: an active trial resolves to [`PlanKey::Pro`] regardless of
/// subscription state.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanKey {
    /// Free tier with restricted limits
    Basic,
    /// Paid tier with expanded or unlimited access
    Pro,
}

impl PlanKey {
    /// Get display name for this plan
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Pro => "Pro",
        }
    }

    /// Convert to string for storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }
}

impl Display for PlanKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            _ => Err(AppError::invalid_input(format!("Invalid plan key: {s}"))),
        }
    }
}

/// Billing cycle for an active subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

/// User gender, used by the macro goal calculation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

/// Self-reported activity level, used by the macro goal calculation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    #[default]
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Multiplier applied to basal metabolic rate
    #[must_use]
    pub const fn factor(&self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

/// Diet difficulty selected by the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DietDifficulty {
    #[default]
    Normal,
    Athlete,
}

/// One entry in the append-only weight history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    /// When the weight was recorded
    pub date: DateTime<Utc>,
    /// Weight in kilograms
    pub weight_kg: f64,
}

/// A logged physical activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    /// Unique log identifier
    pub id: Uuid,
    /// Day the activity was performed
    pub date: NaiveDate,
    /// Kind of activity (free text from the user or the AI parser)
    pub activity_type: String,
    /// Duration in minutes
    pub duration_minutes: u32,
    /// Estimated calories burned
    pub calories_burned: u32,
}

/// Root aggregate for a single account.
///
/// Exactly one profile exists per account; it is owned by the session
/// controller and mutated only through its handlers. Every component of the
/// entitlement and progression machinery operates on this document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Whether onboarding completed for this profile
    pub is_registered: bool,
    /// Display name
    pub name: String,
    /// Account email, also the persistence key
    pub email: String,

    // Physiology
    pub age: u32,
    pub gender: Gender,
    /// Height in centimeters
    pub height_cm: f64,
    pub activity_level: ActivityLevel,
    /// Weight at registration, in kilograms
    pub initial_weight_kg: f64,
    /// Current weight in kilograms
    pub weight_kg: f64,
    /// Append-only weight history, ascending by date, one entry per day
    pub weight_history: Vec<WeightEntry>,
    /// Target weight in kilograms
    pub weight_goal_kg: f64,

    // Hydration
    /// Water consumed today, in liters
    pub water_liters: f64,
    /// Daily water goal, in liters
    pub water_goal_liters: f64,

    /// Macro tracker (current intake vs. calculated goals)
    pub macros: MacroTracker,

    /// Diet difficulty driving the macro calculation
    pub diet_difficulty: DietDifficulty,
    /// Whether athlete mode was ever activated
    pub athlete_mode_used: bool,

    // Subscription
    pub is_subscribed: bool,
    pub current_plan: Option<PlanKey>,
    pub billing_cycle: Option<BillingCycle>,
    /// End of the registration trial window
    pub trial_end: DateTime<Utc>,

    /// Daily and weekly plan-quota counters
    pub usage: UsageLedger,
    /// Purchased top-up credits, disjoint from plan quota
    pub purchased_uses: CreditStore,

    // Progression
    /// XP within the current level, always below the level threshold
    pub xp: u32,
    /// Current level, starts at 1
    pub level: u32,
    /// Consecutive completed days
    pub streak: u32,
    /// Consecutive completed days with the water goal met
    pub water_streak: u32,
    /// Completed calendar days, ascending, no duplicates
    pub completed_days: Vec<NaiveDate>,
    /// Days where every macro landed within 5% of goal
    pub perfect_days_count: u32,
    /// Unlocked achievement ids, in unlock order, never removed
    pub achievements: Vec<String>,
    /// Achievement pinned on the profile card
    pub featured_achievement_id: Option<String>,

    /// First-generation-is-free flag, set permanently after the first
    /// successful AI plan generation
    pub has_generated_plan: bool,
    /// Lifetime count of AI recipe searches
    pub total_recipes_generated: u32,

    /// Logged physical activities, newest first
    pub activity_logs: Vec<ActivityLog>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            is_registered: false,
            name: "Visitor".into(),
            email: String::new(),
            age: 30,
            gender: Gender::Male,
            height_cm: 175.0,
            activity_level: ActivityLevel::Sedentary,
            initial_weight_kg: 75.0,
            weight_kg: 75.0,
            weight_history: Vec::new(),
            weight_goal_kg: 70.0,
            water_liters: 0.0,
            water_goal_liters: 2.5,
            macros: MacroTracker::default(),
            diet_difficulty: DietDifficulty::Normal,
            athlete_mode_used: false,
            is_subscribed: false,
            current_plan: None,
            billing_cycle: None,
            trial_end: Utc::now(),
            usage: UsageLedger::default(),
            purchased_uses: CreditStore::default(),
            xp: 0,
            level: 1,
            streak: 0,
            water_streak: 0,
            completed_days: Vec::new(),
            perfect_days_count: 0,
            achievements: Vec::new(),
            featured_achievement_id: None,
            has_generated_plan: false,
            total_recipes_generated: 0,
            activity_logs: Vec::new(),
        }
    }
}

impl UserProfile {
    /// Create a fresh profile at registration, with zeroed counters and a
    /// trial window starting now.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, trial_days: i64) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            email: email.into(),
            trial_end: now + Duration::days(trial_days),
            usage: UsageLedger::new(now),
            ..Self::default()
        }
    }

    /// Whether the registration trial is still active
    #[must_use]
    pub fn is_trial_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_subscribed && now < self.trial_end
    }

    /// Resolve the plan a request is evaluated against.
    ///
    /// An active trial grants the top tier regardless of `current_plan`;
    /// otherwise subscribers use their stored plan and everyone else falls
    /// back to `basic`.
    #[must_use]
    pub fn effective_plan(&self, now: DateTime<Utc>) -> PlanKey {
        if self.is_trial_active(now) {
            return PlanKey::Pro;
        }
        if self.is_subscribed {
            self.current_plan.unwrap_or(PlanKey::Basic)
        } else {
            PlanKey::Basic
        }
    }

    /// The most recently completed day, if any
    #[must_use]
    pub fn last_completed_day(&self) -> Option<NaiveDate> {
        self.completed_days.last().copied()
    }

    /// Whether the given achievement id is already unlocked
    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }

    /// Normalize invariants after deserialization: `completed_days` sorted
    /// and deduplicated, `level` at least 1.
    ///
    /// Loaded documents predating a field pick up serde defaults; this step
    /// repairs ordering invariants that defaults cannot express.
    pub fn normalize(&mut self) {
        self.completed_days.sort_unstable();
        self.completed_days.dedup();
        if self.level == 0 {
            self.level = 1;
        }
    }
}
