// ABOUTME: Session controller owning the user profile and session document exclusively
// ABOUTME: Account lifecycle, non-AI handlers, persistence, and achievement re-evaluation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Session Controller
//!
//! The single owner of mutable session state. Components operate on the
//! profile through the controller's handlers; no component retains its own
//! copy. Persistence is write-after-every-mutation: each handler commits the
//! full document before returning.

/// Gated AI operations
pub mod ops;

pub use ops::{image_data_url, AdjustableMacro};

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::NutritionAi;
use crate::calculations::{apply_macro_goals, goals_are_stale};
use crate::config::AppConfig;
use crate::constants::{guest, xp_amounts};
use crate::entitlements::{EntitlementGate, FeatureKey, GateDecision};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::nutrition::{DailyPlan, MacroTotals, Recipe};
use crate::models::session::SessionDocument;
use crate::models::user::{
    ActivityLog, BillingCycle, DietDifficulty, PlanKey, UserProfile, WeightEntry,
};
use crate::notifications::{NotificationIntent, NotificationScheduler};
use crate::progression::{
    apply_streak_decay, award_xp, evaluate_unlocks, mark_day_completed, AchievementContext,
    DefaultXpCurve, XpCurve,
};
use crate::storage::SessionStore;

/// Top-level controller for one signed-in session
pub struct SessionController {
    store: Arc<dyn SessionStore>,
    ai: Arc<dyn NutritionAi>,
    gate: EntitlementGate,
    curve: Box<dyn XpCurve>,
    config: AppConfig,
    scheduler: NotificationScheduler,
    current_email: Option<String>,
    document: SessionDocument,
    /// True while a gated AI operation is in flight
    processing: bool,
}

impl SessionController {
    /// Create a controller over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        ai: Arc<dyn NutritionAi>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            ai,
            gate: EntitlementGate::new(),
            curve: Box::new(DefaultXpCurve),
            config,
            scheduler: NotificationScheduler::new(),
            current_email: None,
            document: SessionDocument::default(),
            processing: false,
        }
    }

    /// Replace the level curve collaborator
    #[must_use]
    pub fn with_curve(mut self, curve: Box<dyn XpCurve>) -> Self {
        self.curve = curve;
        self
    }

    // ========================================================================
    // Read-only state for rendering
    // ========================================================================

    /// The signed-in profile
    #[must_use]
    pub const fn profile(&self) -> &UserProfile {
        &self.document.profile
    }

    /// The full session document
    #[must_use]
    pub const fn document(&self) -> &SessionDocument {
        &self.document
    }

    /// Email of the signed-in account, if any
    #[must_use]
    pub fn current_email(&self) -> Option<&str> {
        self.current_email.as_deref()
    }

    /// Whether a gated AI operation is currently in flight
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    /// The presentation-side notification scheduler
    pub fn scheduler_mut(&mut self) -> &mut NotificationScheduler {
        &mut self.scheduler
    }

    // ========================================================================
    // Account lifecycle
    // ========================================================================

    /// Resume the previous session, if a sign-in marker exists.
    ///
    /// A corrupted store is fatal for the session: the marker is cleared and
    /// the controller resets to a clean default profile.
    ///
    /// # Errors
    ///
    /// Returns storage errors other than corruption.
    pub async fn resume(&mut self) -> AppResult<bool> {
        let marker = match self.store.current_user().await {
            Ok(marker) => marker,
            Err(e) if e.code == ErrorCode::CorruptedSession => {
                warn!("session store corrupted, forcing logout");
                self.force_reset().await?;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let Some(email) = marker else {
            return Ok(false);
        };

        match self.login(&email).await {
            Ok(()) => Ok(true),
            Err(e) if e.code == ErrorCode::CorruptedSession => {
                warn!(email, "stored session unreadable, forcing logout");
                self.force_reset().await?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Register a new account and sign it in.
    ///
    /// The profile starts with zeroed counters, freshly calculated macro
    /// goals, an initial weight history entry, and a trial window opening
    /// now.
    ///
    /// # Errors
    ///
    /// Fails when an account already exists for the email.
    pub async fn register(&mut self, name: &str, email: &str) -> AppResult<()> {
        if self.store.load(email).await?.is_some() {
            return Err(AppError::account_already_exists(email));
        }

        let mut profile = UserProfile::new(name, email, self.config.trial_days);
        profile.is_registered = true;
        apply_macro_goals(&mut profile);
        profile.weight_history = vec![WeightEntry {
            date: Utc::now(),
            weight_kg: profile.weight_kg,
        }];

        info!(email, trial_days = self.config.trial_days, "account registered");
        self.document = SessionDocument::for_profile(profile);
        self.current_email = Some(email.to_owned());
        self.store.set_current_user(Some(email)).await?;
        self.commit().await
    }

    /// Sign in to an existing account and run the load-time corrections:
    /// default fill, macro goal migration, ledger reconciliation, and
    /// streak decay.
    ///
    /// # Errors
    ///
    /// Fails when no account exists, or with
    /// [`ErrorCode::CorruptedSession`] when the stored blob cannot be read.
    pub async fn login(&mut self, email: &str) -> AppResult<()> {
        let mut document = self
            .store
            .load(email)
            .await?
            .ok_or_else(|| AppError::account_not_found(email))?;

        document.fill_missing_defaults();

        if document.profile.is_registered && goals_are_stale(&document.profile) {
            debug!(email, "migrating stale macro goals at load");
            apply_macro_goals(&mut document.profile);
        }

        let now = Utc::now();
        document.profile.usage.reconcile(now);
        apply_streak_decay(&mut document.profile, now.date_naive());

        self.document = document;
        self.current_email = Some(email.to_owned());
        self.store.set_current_user(Some(email)).await?;
        info!(email, "session loaded");
        self.after_mutation().await
    }

    /// Sign in as the shared guest account, creating it on first use
    pub async fn guest_login(&mut self) -> AppResult<()> {
        if self.store.load(guest::EMAIL).await?.is_none() {
            let mut profile = UserProfile::new(guest::NAME, guest::EMAIL, self.config.trial_days);
            profile.is_registered = true;
            apply_macro_goals(&mut profile);
            self.store
                .save(guest::EMAIL, &SessionDocument::for_profile(profile))
                .await?;
        }
        self.login(guest::EMAIL).await
    }

    /// Sign out, resetting in-memory state to a clean default profile.
    ///
    /// Stored account data is kept for the next sign-in.
    pub async fn logout(&mut self) -> AppResult<()> {
        info!(email = ?self.current_email, "signing out");
        self.current_email = None;
        self.document = SessionDocument::default();
        self.store.set_current_user(None).await
    }

    /// Clear the sign-in marker and reset to defaults after fatal corruption
    async fn force_reset(&mut self) -> AppResult<()> {
        self.current_email = None;
        self.document = SessionDocument::default();
        self.store.set_current_user(None).await
    }

    // ========================================================================
    // Persistence and achievement re-evaluation
    // ========================================================================

    /// Write the full document for the signed-in account
    async fn commit(&self) -> AppResult<()> {
        let Some(email) = self.current_email.as_deref() else {
            return Ok(());
        };
        self.store.save(email, &self.document).await
    }

    /// Re-scan the achievement catalog, surface any unlocks, and persist.
    ///
    /// Runs after every profile mutation; unlock evaluation is idempotent so
    /// repeated runs are harmless.
    async fn after_mutation(&mut self) -> AppResult<()> {
        let context = AchievementContext {
            favorite_recipes: self.document.favorite_recipes.len(),
        };
        let intents = evaluate_unlocks(&mut self.document.profile, self.curve.as_ref(), &context);
        self.scheduler.submit_all(intents);
        self.commit().await
    }

    /// Submit one intent and persist
    async fn notify_and_commit(&mut self, intent: NotificationIntent) -> AppResult<()> {
        self.scheduler.submit(intent);
        self.after_mutation().await
    }

    // ========================================================================
    // Entitlements
    // ========================================================================

    /// Check-and-consume quota for a feature, surfacing denial notifications
    /// and the upsell signal.
    ///
    /// The decision completes synchronously; callers invoke the AI only
    /// after an approval, so concurrent requests cannot double-spend.
    pub fn check_and_increment_usage(&mut self, key: FeatureKey, amount: u32) -> GateDecision {
        let decision = self
            .gate
            .authorize(&mut self.document.profile, key, amount, Utc::now());
        if let GateDecision::Denied(denial) = &decision {
            self.scheduler
                .submit(NotificationIntent::error(denial.to_error().message));
        }
        decision
    }

    /// Credit a purchased top-up pack.
    ///
    /// Billing is validated by an external collaborator before this call;
    /// the pack is credited unconditionally.
    pub async fn purchase_feature_pack(
        &mut self,
        key: FeatureKey,
        pack_size: u32,
        price: f64,
    ) -> AppResult<()> {
        self.document.profile.purchased_uses.add_pack(key, pack_size);
        info!(feature = %key, pack_size, price, "feature pack purchased");
        self.notify_and_commit(NotificationIntent::success(format!(
            "Pack of {pack_size} uses purchased for ${price:.2}!"
        )))
        .await
    }

    // ========================================================================
    // Subscription lifecycle
    // ========================================================================

    /// Activate a subscription
    pub async fn subscribe(&mut self, plan: PlanKey, cycle: BillingCycle) -> AppResult<()> {
        let profile = &mut self.document.profile;
        profile.is_subscribed = true;
        profile.current_plan = Some(plan);
        profile.billing_cycle = Some(cycle);
        info!(plan = %plan, "subscription activated");
        self.notify_and_commit(NotificationIntent::success(
            "Subscription active! Welcome to Pro.",
        ))
        .await
    }

    /// Switch to another plan
    pub async fn change_subscription(&mut self, plan: PlanKey) -> AppResult<()> {
        self.document.profile.current_plan = Some(plan);
        self.notify_and_commit(NotificationIntent::success(format!(
            "Your plan is now {}.",
            plan.display_name()
        )))
        .await
    }

    /// Cancel the subscription, also expiring any trial immediately
    pub async fn cancel_subscription(&mut self) -> AppResult<()> {
        let profile = &mut self.document.profile;
        profile.is_subscribed = false;
        profile.current_plan = None;
        profile.billing_cycle = None;
        profile.trial_end = Utc::now() - Duration::days(1);
        self.notify_and_commit(NotificationIntent::info("Your subscription was cancelled."))
            .await
    }

    // ========================================================================
    // Progression handlers
    // ========================================================================

    /// Award XP for an external reason
    pub async fn add_xp(&mut self, base_amount: u32, reason: &str) -> AppResult<()> {
        let intents = award_xp(
            &mut self.document.profile,
            self.curve.as_ref(),
            base_amount,
            reason,
        );
        self.scheduler.submit_all(intents);
        self.after_mutation().await
    }

    /// Mark today's goal as completed
    pub async fn complete_today(&mut self) -> AppResult<()> {
        let today = Utc::now().date_naive();
        let intents = mark_day_completed(&mut self.document.profile, self.curve.as_ref(), today);
        self.scheduler.submit_all(intents);
        self.after_mutation().await
    }

    /// Pin an achievement on the profile card
    pub async fn set_featured_achievement(&mut self, id: Option<String>) -> AppResult<()> {
        self.document.profile.featured_achievement_id = id;
        self.after_mutation().await
    }

    // ========================================================================
    // Daily tracking handlers
    // ========================================================================

    /// Add (or remove, with a negative amount) water, floored at zero
    pub async fn add_water(&mut self, liters: f64) -> AppResult<()> {
        let profile = &mut self.document.profile;
        profile.water_liters = (profile.water_liters + liters).max(0.0);
        self.after_mutation().await
    }

    /// Log a meal's macros against today's tracker, with XP
    pub async fn log_meal(&mut self, totals: MacroTotals) -> AppResult<()> {
        let intents = award_xp(
            &mut self.document.profile,
            self.curve.as_ref(),
            xp_amounts::LOG_MEAL,
            "Meal logged",
        );
        self.scheduler.submit_all(intents);
        self.document.profile.macros.log(&totals);
        self.after_mutation().await
    }

    /// Record today's weight, replacing an earlier entry from the same day,
    /// and recalculate macro goals
    pub async fn update_weight(&mut self, weight_kg: f64) -> AppResult<()> {
        if !(20.0..=400.0).contains(&weight_kg) {
            return Err(AppError::invalid_input(format!(
                "implausible weight: {weight_kg} kg"
            )));
        }

        let now = Utc::now();
        let today = now.date_naive();
        let profile = &mut self.document.profile;
        profile.weight_kg = weight_kg;

        let entry = WeightEntry {
            date: now,
            weight_kg,
        };
        if let Some(existing) = profile
            .weight_history
            .iter_mut()
            .find(|e| e.date.date_naive() == today)
        {
            *existing = entry;
        } else {
            profile.weight_history.push(entry);
        }
        profile
            .weight_history
            .sort_by_key(|e| e.date);

        apply_macro_goals(profile);
        self.after_mutation().await
    }

    /// Change diet difficulty, recalculating goals; first athlete activation
    /// is recorded for the achievement
    pub async fn set_diet_difficulty(&mut self, difficulty: DietDifficulty) -> AppResult<()> {
        let profile = &mut self.document.profile;
        profile.diet_difficulty = difficulty;
        if difficulty == DietDifficulty::Athlete && !profile.athlete_mode_used {
            profile.athlete_mode_used = true;
        }
        apply_macro_goals(profile);
        self.after_mutation().await
    }

    /// Update physiology fields and recalculate macro goals
    pub async fn update_physiology(
        &mut self,
        age: Option<u32>,
        height_cm: Option<f64>,
        weight_goal_kg: Option<f64>,
        activity_level: Option<crate::models::user::ActivityLevel>,
    ) -> AppResult<()> {
        let profile = &mut self.document.profile;
        if let Some(age) = age {
            profile.age = age;
        }
        if let Some(height) = height_cm {
            profile.height_cm = height;
        }
        if let Some(goal) = weight_goal_kg {
            profile.weight_goal_kg = goal;
        }
        if let Some(level) = activity_level {
            profile.activity_level = level;
        }
        apply_macro_goals(profile);
        self.after_mutation().await
    }

    /// Log a physical activity with XP and a confirmation toast
    pub async fn log_activity(
        &mut self,
        activity_type: impl Into<String>,
        duration_minutes: u32,
        calories_burned: u32,
    ) -> AppResult<()> {
        let activity_type = activity_type.into();
        let log = ActivityLog {
            id: Uuid::new_v4(),
            date: Utc::now().date_naive(),
            activity_type: activity_type.clone(),
            duration_minutes,
            calories_burned,
        };
        self.document.profile.activity_logs.insert(0, log);

        let intents = award_xp(
            &mut self.document.profile,
            self.curve.as_ref(),
            xp_amounts::LOG_ACTIVITY,
            "Activity logged",
        );
        self.scheduler.submit_all(intents);
        self.notify_and_commit(NotificationIntent::success(format!(
            "Activity \"{activity_type}\" logged!"
        )))
        .await
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Toggle a daily plan in favorites, keeping newest first
    pub async fn toggle_favorite_plan(&mut self, plan: DailyPlan) -> AppResult<()> {
        let favorites = &mut self.document.favorite_plans;
        if let Some(position) = favorites.iter().position(|p| p.date == plan.date) {
            favorites.remove(position);
        } else {
            favorites.push(plan);
            favorites.sort_by(|a, b| b.date.cmp(&a.date));
        }
        self.after_mutation().await
    }

    /// Replace a favorited plan after editing
    pub async fn update_favorite_plan(&mut self, plan: DailyPlan) -> AppResult<()> {
        for favorite in &mut self.document.favorite_plans {
            if favorite.date == plan.date {
                *favorite = plan;
                break;
            }
        }
        self.after_mutation().await
    }

    /// Toggle a recipe in favorites
    pub async fn toggle_favorite_recipe(&mut self, recipe: Recipe) -> AppResult<()> {
        let favorites = &mut self.document.favorite_recipes;
        if let Some(position) = favorites.iter().position(|r| r.id == recipe.id) {
            favorites.remove(position);
        } else {
            favorites.push(recipe);
        }
        self.after_mutation().await
    }

    /// Copy a favorited plan onto today's slot in the meal plan
    pub async fn use_favorite_as_today(&mut self, favorite: &DailyPlan) -> AppResult<()> {
        let today = Utc::now().date_naive();
        let mut plan = favorite.clone();
        plan.date = today;
        self.document.meal_plan.insert(today, plan);
        self.after_mutation().await
    }
}

// ============================================================================
// Internal plumbing shared with the gated operations
// ============================================================================

impl SessionController {
    /// The AI collaborator
    pub(crate) fn ai(&self) -> &dyn NutritionAi {
        self.ai.as_ref()
    }

    pub(crate) fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    pub(crate) fn submit_intent(&mut self, intent: NotificationIntent) {
        self.scheduler.submit(intent);
    }

    pub(crate) async fn persist_after_mutation(&mut self) -> AppResult<()> {
        self.after_mutation().await
    }

    /// Run a profile transform that returns notification intents, forwarding
    /// them to the scheduler
    pub(crate) fn with_profile_mut<F>(&mut self, transform: F)
    where
        F: FnOnce(&mut UserProfile, &dyn XpCurve) -> Vec<NotificationIntent>,
    {
        let intents = transform(&mut self.document.profile, self.curve.as_ref());
        self.scheduler.submit_all(intents);
    }

    pub(crate) fn merge_meal_plans(
        &mut self,
        plans: std::collections::BTreeMap<chrono::NaiveDate, DailyPlan>,
    ) {
        self.document.meal_plan.extend(plans);
    }

    pub(crate) fn insert_meal_plan(&mut self, plan: DailyPlan) {
        self.document.meal_plan.insert(plan.date, plan);
    }

    /// Replace the meal with a matching id inside one day's plan
    pub(crate) fn replace_meal(&mut self, date: chrono::NaiveDate, meal: crate::models::nutrition::Meal) {
        if let Some(plan) = self.document.meal_plan.get_mut(&date) {
            if let Some(slot) = plan.meals.iter_mut().find(|m| m.id == meal.id) {
                *slot = meal;
            }
        }
    }

    pub(crate) fn push_chat_message(&mut self, message: crate::ai::ChatMessage) {
        self.document.chat_messages.push(message);
    }
}
