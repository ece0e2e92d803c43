// ABOUTME: Gated AI operations: entitlement check, invocation, sanitization, side effects
// ABOUTME: Quota consumed at gating is never refunded when the AI call fails
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Gated AI Operations
//!
//! Every operation follows the same state machine:
//! `Idle → Gating → (Rejected | Invoking) → (Succeeded | Failed) → Idle`.
//!
//! Gating consumes quota synchronously before the AI future is awaited, so
//! two concurrent invocations of the same feature cannot both pass on the
//! last quota unit. A failed invocation (transport failure or sanitizer
//! rejection) surfaces one error notification and leaves domain state
//! untouched; the quota consumed at the gating step stands, since the
//! external service was still invoked.

use std::collections::BTreeMap;

use base64::Engine as _;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::ai::sanitize::{
    sanitize_daily_plan, sanitize_macro_totals, sanitize_meal, sanitize_recipe,
};
use crate::ai::{self, ChatMessage, ChatStream};
use crate::constants::xp_amounts;
use crate::entitlements::{FeatureKey, GateDecision};
use crate::errors::{AppError, AppResult};
use crate::models::nutrition::{FoodItem, MacroTotals, Recipe};
use crate::notifications::NotificationIntent;
use crate::progression::award_xp;
use crate::session::SessionController;

/// Macros the AI can rebalance a day toward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustableMacro {
    Protein,
    Carbs,
    Fat,
}

impl AdjustableMacro {
    /// Wire name of the macro
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Protein => "protein",
            Self::Carbs => "carbs",
            Self::Fat => "fat",
        }
    }
}

/// Encode raw image bytes as the data URL the relay expects
#[must_use]
pub fn image_data_url(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

impl SessionController {
    /// Gating step: approve or surface the denial and stop.
    ///
    /// On approval the quota is already consumed when this returns.
    fn gate(&mut self, key: FeatureKey, amount: u32) -> AppResult<()> {
        match self.check_and_increment_usage(key, amount) {
            GateDecision::Approved { source } => {
                debug!(feature = %key, ?source, "gated operation approved");
                Ok(())
            }
            GateDecision::Denied(denial) => Err(denial.to_error()),
        }
    }

    /// Transition into `Invoking` with a loading toast
    fn begin_invocation(&mut self, loading_message: &str) {
        self.set_processing(true);
        self.submit_intent(NotificationIntent::loading(loading_message));
    }

    /// `Invoking → Succeeded`: success toast, plan-generation side effects,
    /// achievement re-evaluation, persist
    async fn finish_success(
        &mut self,
        success_message: &str,
        plan_generation: bool,
    ) -> AppResult<()> {
        self.set_processing(false);
        self.submit_intent(NotificationIntent::success(success_message));
        if plan_generation {
            self.mark_plan_generated();
        }
        self.persist_after_mutation().await
    }

    /// `Invoking → Failed`: one error toast, no domain mutation, no quota
    /// refund. Already-consumed usage is persisted.
    async fn finish_failure(&mut self, error: AppError) -> AppError {
        self.set_processing(false);
        warn!(code = ?error.code, "gated AI operation failed");
        self.submit_intent(NotificationIntent::error(error.message.clone()));
        if let Err(persist_error) = self.persist_after_mutation().await {
            warn!(error = %persist_error, "failed to persist after AI failure");
        }
        error
    }

    /// Permanently record that a plan generation succeeded, with its XP award
    fn mark_plan_generated(&mut self) {
        self.with_profile_mut(|profile, curve| {
            profile.has_generated_plan = true;
            award_xp(profile, curve, xp_amounts::PLAN_GENERATED, "AI plan generated")
        });
    }

    // ========================================================================
    // Plan generation
    // ========================================================================

    /// Generate a full week of daily plans starting at `week_start`
    pub async fn generate_weekly_plan(
        &mut self,
        week_start: NaiveDate,
        observation: Option<&str>,
    ) -> AppResult<()> {
        self.gate(FeatureKey::WeeklyPlanGenerations, 1)?;
        self.begin_invocation("Generating a plan for the whole week...");

        let result =
            ai::generate_weekly_plan(self.ai(), self.profile(), week_start, observation).await;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        let mut sanitized = BTreeMap::new();
        for (date, plan) in raw {
            if let Some(plan) = sanitize_daily_plan(plan) {
                sanitized.insert(date, plan);
            }
        }
        if sanitized.is_empty() {
            let error = AppError::malformed_ai_output("weekly plan contained no valid days");
            return Err(self.finish_failure(error).await);
        }

        self.merge_meal_plans(sanitized);
        self.finish_success("Weekly plan ready!", true).await
    }

    /// Generate (or replace) the plan for a single day
    pub async fn generate_daily_plan(&mut self, date: NaiveDate) -> AppResult<()> {
        self.gate(FeatureKey::DailyPlanGenerations, 1)?;
        self.begin_invocation("Generating your daily plan...");

        let scaffold = crate::models::nutrition::DailyPlan {
            date,
            meals: Vec::new(),
        };
        let result =
            ai::regenerate_daily_plan(self.ai(), self.profile(), &scaffold, None).await;
        self.apply_daily_plan_result(result, "Daily plan generated!", true)
            .await
    }

    /// Import a plan from pasted chat text
    pub async fn import_plan_from_chat(&mut self, text: &str) -> AppResult<()> {
        self.gate(FeatureKey::ChatImports, 1)?;
        self.begin_invocation("Importing plan from chat...");

        let result = ai::parse_meal_plan_text(self.ai(), text).await;
        self.apply_daily_plan_result(result, "Plan imported!", true).await
    }

    /// Regenerate the plan for a day that already exists
    pub async fn regenerate_day(
        &mut self,
        date: NaiveDate,
        meal_count: Option<u32>,
    ) -> AppResult<()> {
        let Some(current) = self.document().meal_plan.get(&date).cloned() else {
            return Err(AppError::invalid_input(format!("no plan for {date}")));
        };

        self.gate(FeatureKey::DayRegenerations, 1)?;
        self.begin_invocation("Recreating your plan for the day...");

        let result =
            ai::regenerate_daily_plan(self.ai(), self.profile(), &current, meal_count).await;
        self.apply_daily_plan_result(result, "Plan updated!", true).await
    }

    /// Rebalance one day's plan toward a macro goal
    pub async fn adjust_day_for_macro(
        &mut self,
        date: NaiveDate,
        macro_to_fix: AdjustableMacro,
    ) -> AppResult<()> {
        let Some(current) = self.document().meal_plan.get(&date).cloned() else {
            return Err(AppError::invalid_input(format!("no plan for {date}")));
        };

        self.gate(FeatureKey::MacroAdjustments, 1)?;
        self.begin_invocation(&format!("Adjusting {}...", macro_to_fix.as_str()));

        let result =
            ai::adjust_daily_plan_for_macro(self.ai(), self.profile(), &current, macro_to_fix.as_str())
                .await;
        self.apply_daily_plan_result(result, "Plan adjusted!", false).await
    }

    /// Shared `Succeeded`/`Failed` handling for operations producing one day
    async fn apply_daily_plan_result(
        &mut self,
        result: AppResult<crate::models::nutrition::DailyPlan>,
        success_message: &str,
        plan_generation: bool,
    ) -> AppResult<()> {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        let Some(plan) = sanitize_daily_plan(raw) else {
            let error = AppError::malformed_ai_output("the AI returned an invalid plan");
            return Err(self.finish_failure(error).await);
        };

        self.insert_meal_plan(plan);
        self.finish_success(success_message, plan_generation).await
    }

    // ========================================================================
    // Meal-level operations
    // ========================================================================

    /// Regenerate one meal from a user prompt
    pub async fn regenerate_meal(
        &mut self,
        date: NaiveDate,
        meal_id: uuid::Uuid,
        prompt: &str,
    ) -> AppResult<()> {
        let Some(original) = self
            .document()
            .meal_plan
            .get(&date)
            .and_then(|plan| plan.meals.iter().find(|m| m.id == meal_id))
            .cloned()
        else {
            return Err(AppError::invalid_input("meal not found in plan"));
        };

        self.gate(FeatureKey::ItemSwaps, 1)?;
        self.begin_invocation("Recreating your meal...");

        let result =
            ai::regenerate_meal_from_prompt(self.ai(), prompt, &original, self.profile()).await;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        let Some(mut meal) = sanitize_meal(raw) else {
            let error = AppError::malformed_ai_output("the AI returned an invalid meal");
            return Err(self.finish_failure(error).await);
        };
        meal.id = meal_id; // Keep the slot stable for the UI

        self.replace_meal(date, meal);
        self.finish_success("Meal updated!", false).await
    }

    /// Swap one food item inside a meal for an AI-suggested substitute
    pub async fn swap_item(
        &mut self,
        date: NaiveDate,
        meal_id: uuid::Uuid,
        item_to_swap: &FoodItem,
    ) -> AppResult<()> {
        let Some(meal_context) = self
            .document()
            .meal_plan
            .get(&date)
            .and_then(|plan| plan.meals.iter().find(|m| m.id == meal_id))
            .cloned()
        else {
            return Err(AppError::invalid_input("meal not found in plan"));
        };

        self.gate(FeatureKey::ItemSwaps, 1)?;
        self.begin_invocation(&format!("Swapping {}...", item_to_swap.name));

        let result =
            ai::get_food_substitution(self.ai(), item_to_swap, &meal_context, self.profile()).await;
        let substitute = match result {
            Ok(substitute) => substitute,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        let mut updated = meal_context;
        for item in &mut updated.items {
            if item.name == item_to_swap.name {
                *item = substitute.clone();
            }
        }
        let Some(updated) = sanitize_meal(updated) else {
            let error = AppError::malformed_ai_output("substitution produced an invalid meal");
            return Err(self.finish_failure(error).await);
        };

        self.replace_meal(date, updated);
        self.finish_success("Item swapped!", false).await
    }

    // ========================================================================
    // Lists, analyses, recipes
    // ========================================================================

    /// Build a shopping list covering the plans stored for `dates`
    pub async fn generate_shopping_list(&mut self, dates: &[NaiveDate]) -> AppResult<String> {
        let plans: Vec<_> = dates
            .iter()
            .filter_map(|date| self.document().meal_plan.get(date).cloned())
            .collect();
        if plans.is_empty() {
            return Err(AppError::invalid_input("no plans stored for those dates"));
        }

        self.gate(FeatureKey::ShoppingLists, 1)?;
        self.begin_invocation("Building your shopping list...");

        match ai::generate_shopping_list(self.ai(), &plans).await {
            Ok(list) => {
                self.finish_success("Shopping list ready!", false).await?;
                Ok(list)
            }
            Err(e) => Err(self.finish_failure(e).await),
        }
    }

    /// Estimate a meal's macros from a description or a photo.
    ///
    /// Image analysis is metered separately from text analysis; the caller
    /// logs the returned totals explicitly if the user confirms them.
    pub async fn analyze_meal(
        &mut self,
        description: Option<&str>,
        image_data_url: Option<&str>,
    ) -> AppResult<MacroTotals> {
        let result = match (image_data_url, description) {
            (Some(image), _) => {
                self.gate(FeatureKey::MealAnalysesImage, 1)?;
                self.begin_invocation("Analyzing your photo...");
                ai::analyze_meal_from_image(self.ai(), image).await
            }
            (None, Some(text)) => {
                self.gate(FeatureKey::MealAnalysesText, 1)?;
                self.begin_invocation("Analyzing your meal...");
                ai::analyze_meal_from_text(self.ai(), text).await
            }
            (None, None) => {
                return Err(AppError::invalid_input("nothing to analyze"));
            }
        };

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => return Err(self.finish_failure(e).await),
        };
        let Some(totals) = sanitize_macro_totals(raw) else {
            let error = AppError::malformed_ai_output("meal analysis returned invalid macros");
            return Err(self.finish_failure(error).await);
        };

        self.finish_success("Analysis complete!", false).await?;
        Ok(totals)
    }

    /// Narrative analysis of the user's progress history
    pub async fn analyze_progress(&mut self) -> AppResult<String> {
        self.gate(FeatureKey::ProgressAnalyses, 1)?;
        self.begin_invocation("Analyzing your progress...");

        match ai::analyze_progress(self.ai(), self.profile()).await {
            Ok(analysis) => {
                self.finish_success("Progress analysis ready!", false).await?;
                Ok(analysis)
            }
            Err(e) => Err(self.finish_failure(e).await),
        }
    }

    /// Search recipes; each requested recipe consumes one quota unit
    pub async fn find_recipes(&mut self, query: &str, num_recipes: u32) -> AppResult<Vec<Recipe>> {
        self.gate(FeatureKey::RecipeSearches, num_recipes)?;
        self.begin_invocation("Searching recipes...");

        let raw = match ai::find_recipes(self.ai(), query, self.profile(), num_recipes).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        let recipes: Vec<Recipe> = raw.into_iter().filter_map(sanitize_recipe).collect();
        if recipes.is_empty() {
            let error = AppError::malformed_ai_output("recipe search returned nothing usable");
            return Err(self.finish_failure(error).await);
        }

        self.finish_success("Recipes found!", false).await?;
        Ok(recipes)
    }

    /// Generate an illustration for a recipe, returning a data URL
    pub async fn generate_recipe_image(&mut self, prompt: &str) -> AppResult<String> {
        self.gate(FeatureKey::ImageGenerations, 1)?;
        self.begin_invocation("Generating image...");

        let image: String = match ai::invoke_typed(
            self.ai(),
            ai::AiAction::GenerateImageFromPrompt,
            serde_json::json!({ "prompt": prompt }),
        )
        .await
        {
            Ok(image) => image,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        if image.is_empty() {
            let error = AppError::malformed_ai_output("image generation returned empty data");
            return Err(self.finish_failure(error).await);
        }

        self.finish_success("Image ready!", false).await?;
        Ok(image)
    }

    // ========================================================================
    // Chat
    // ========================================================================

    /// Send a chat message, returning the streamed reply.
    ///
    /// The user message is recorded in the history on approval; the caller
    /// reassembles the stream and records the assistant reply via
    /// [`SessionController::record_assistant_reply`] once complete.
    pub async fn send_chat_message(&mut self, message: &str) -> AppResult<ChatStream> {
        self.gate(FeatureKey::ChatInteractions, 1)?;

        let history = self.document().chat_messages.clone();
        let result = self.ai().invoke_stream(message, &history).await;
        match result {
            Ok(stream) => {
                self.push_chat_message(ChatMessage::user(message));
                self.persist_after_mutation().await?;
                Ok(stream)
            }
            Err(e) => Err(self.finish_failure(e).await),
        }
    }

    /// Record the reassembled assistant reply after the stream completes
    pub async fn record_assistant_reply(&mut self, content: &str) -> AppResult<()> {
        self.push_chat_message(ChatMessage::assistant(content));
        self.persist_after_mutation().await
    }

    /// Answer a nutrition question, metered as a chat interaction
    pub async fn get_food_info(
        &mut self,
        question: &str,
        meal_context: Option<&crate::models::nutrition::Meal>,
    ) -> AppResult<String> {
        self.gate(FeatureKey::ChatInteractions, 1)?;

        match ai::get_food_info(self.ai(), question, meal_context).await {
            Ok(answer) => Ok(answer),
            Err(e) => Err(self.finish_failure(e).await),
        }
    }

    /// Parse a free-text activity description and log the result.
    ///
    /// The parse is metered as a chat interaction; the log itself awards the
    /// usual activity XP.
    pub async fn log_activity_from_text(&mut self, description: &str) -> AppResult<()> {
        self.gate(FeatureKey::ChatInteractions, 1)?;
        self.begin_invocation("Reading your activity...");

        let analysis = match ai::analyze_activity_from_text(self.ai(), description).await {
            Ok(analysis) => analysis,
            Err(e) => return Err(self.finish_failure(e).await),
        };

        self.set_processing(false);
        self.log_activity(
            analysis.activity_type,
            analysis.duration_minutes,
            analysis.calories_burned,
        )
        .await
    }
}
