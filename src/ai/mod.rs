// ABOUTME: AI collaborator abstraction: typed actions, chat messages, and streaming
// ABOUTME: Defines the NutritionAi trait plus typed service wrappers over raw invoke
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # AI Collaborator Interface
//!
//! The core never talks to an LLM provider directly. Everything flows
//! through the [`NutritionAi`] trait: request/response actions carry a typed
//! action name and a JSON payload, and conversational chat uses a streaming
//! variant that yields cumulative-text chunks. Errors surface as a single
//! human-readable message; the core does not interpret provider codes beyond
//! succeeded vs. failed.

/// Relay client implementation over HTTP
pub mod relay;
/// Structural validation of AI output
pub mod sanitize;

use std::pin::Pin;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::Stream;

use crate::errors::{AppError, AppResult};
use crate::models::nutrition::{
    ActivityAnalysis, DailyPlan, FoodItem, MacroTotals, Meal, Recipe,
};
use crate::models::user::UserProfile;

pub use relay::RelayClient;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in the chat history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Request/response actions understood by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiAction {
    ParseMealPlanText,
    RegenerateDailyPlan,
    AdjustDailyPlanForMacro,
    GenerateWeeklyPlan,
    RegenerateMealFromPrompt,
    AnalyzeMealFromText,
    AnalyzeMealFromImage,
    AnalyzeProgress,
    GenerateShoppingList,
    GetFoodInfo,
    GetFoodSubstitution,
    GenerateImageFromPrompt,
    FindRecipes,
    AnalyzeActivityFromText,
}

impl AiAction {
    /// Wire name of the action
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ParseMealPlanText => "parseMealPlanText",
            Self::RegenerateDailyPlan => "regenerateDailyPlan",
            Self::AdjustDailyPlanForMacro => "adjustDailyPlanForMacro",
            Self::GenerateWeeklyPlan => "generateWeeklyPlan",
            Self::RegenerateMealFromPrompt => "regenerateMealFromPrompt",
            Self::AnalyzeMealFromText => "analyzeMealFromText",
            Self::AnalyzeMealFromImage => "analyzeMealFromImage",
            Self::AnalyzeProgress => "analyzeProgress",
            Self::GenerateShoppingList => "generateShoppingList",
            Self::GetFoodInfo => "getFoodInfo",
            Self::GetFoodSubstitution => "getFoodSubstitution",
            Self::GenerateImageFromPrompt => "generateImageFromPrompt",
            Self::FindRecipes => "findRecipes",
            Self::AnalyzeActivityFromText => "analyzeActivityFromText",
        }
    }
}

impl std::fmt::Display for AiAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// A chunk of a streaming chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text delta for this chunk; the consumer reassembles cumulative text
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
}

/// Stream type for chat responses.
///
/// Bounded only by the server; not restartable mid-stream.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AppError>> + Send>>;

// ============================================================================
// Collaborator Trait
// ============================================================================

/// The external AI collaborator.
///
/// Implementations own transport and provider selection; callers see typed
/// actions and JSON payloads only.
#[async_trait]
pub trait NutritionAi: Send + Sync {
    /// Perform a request/response action
    async fn invoke(&self, action: AiAction, payload: serde_json::Value)
        -> AppResult<serde_json::Value>;

    /// Send a chat message and stream the reply
    async fn invoke_stream(&self, message: &str, history: &[ChatMessage]) -> AppResult<ChatStream>;
}

/// Invoke an action and deserialize the result into `T`
///
/// # Errors
///
/// Returns [`AppError::malformed_ai_output`] when the payload does not match
/// the expected shape, and propagates invocation failures unchanged.
pub async fn invoke_typed<T: DeserializeOwned>(
    ai: &dyn NutritionAi,
    action: AiAction,
    payload: serde_json::Value,
) -> AppResult<T> {
    let raw = ai.invoke(action, payload).await?;
    serde_json::from_value(raw)
        .map_err(|e| AppError::malformed_ai_output(format!("{action}: {e}")))
}

// ============================================================================
// Typed service wrappers
// ============================================================================

/// Generate a full week of daily plans, keyed by date
pub async fn generate_weekly_plan(
    ai: &dyn NutritionAi,
    profile: &UserProfile,
    week_start: NaiveDate,
    observation: Option<&str>,
) -> AppResult<std::collections::BTreeMap<NaiveDate, DailyPlan>> {
    invoke_typed(
        ai,
        AiAction::GenerateWeeklyPlan,
        json!({ "userData": profile, "weekStartDate": week_start, "observation": observation }),
    )
    .await
}

/// Regenerate a single daily plan
pub async fn regenerate_daily_plan(
    ai: &dyn NutritionAi,
    profile: &UserProfile,
    current_plan: &DailyPlan,
    meal_count: Option<u32>,
) -> AppResult<DailyPlan> {
    invoke_typed(
        ai,
        AiAction::RegenerateDailyPlan,
        json!({ "userData": profile, "currentPlan": current_plan, "numberOfMeals": meal_count }),
    )
    .await
}

/// Parse a plan out of free chat text
pub async fn parse_meal_plan_text(ai: &dyn NutritionAi, text: &str) -> AppResult<DailyPlan> {
    invoke_typed(ai, AiAction::ParseMealPlanText, json!({ "text": text })).await
}

/// Rebalance one day toward a macro goal
pub async fn adjust_daily_plan_for_macro(
    ai: &dyn NutritionAi,
    profile: &UserProfile,
    current_plan: &DailyPlan,
    macro_to_fix: &str,
) -> AppResult<DailyPlan> {
    invoke_typed(
        ai,
        AiAction::AdjustDailyPlanForMacro,
        json!({ "userData": profile, "currentPlan": current_plan, "macroToFix": macro_to_fix }),
    )
    .await
}

/// Regenerate one meal from a user prompt
pub async fn regenerate_meal_from_prompt(
    ai: &dyn NutritionAi,
    prompt: &str,
    meal: &Meal,
    profile: &UserProfile,
) -> AppResult<Meal> {
    invoke_typed(
        ai,
        AiAction::RegenerateMealFromPrompt,
        json!({ "prompt": prompt, "meal": meal, "userData": profile }),
    )
    .await
}

/// Estimate macros from a text description of a meal
pub async fn analyze_meal_from_text(
    ai: &dyn NutritionAi,
    description: &str,
) -> AppResult<MacroTotals> {
    invoke_typed(
        ai,
        AiAction::AnalyzeMealFromText,
        json!({ "description": description }),
    )
    .await
}

/// Estimate macros from a photo of a meal (data URL)
pub async fn analyze_meal_from_image(
    ai: &dyn NutritionAi,
    image_data_url: &str,
) -> AppResult<MacroTotals> {
    invoke_typed(
        ai,
        AiAction::AnalyzeMealFromImage,
        json!({ "imageDataUrl": image_data_url }),
    )
    .await
}

/// Narrative progress analysis over the profile history
pub async fn analyze_progress(ai: &dyn NutritionAi, profile: &UserProfile) -> AppResult<String> {
    invoke_typed(ai, AiAction::AnalyzeProgress, json!({ "userData": profile })).await
}

/// Build a shopping list from a week of plans
pub async fn generate_shopping_list(
    ai: &dyn NutritionAi,
    week_plan: &[DailyPlan],
) -> AppResult<String> {
    invoke_typed(
        ai,
        AiAction::GenerateShoppingList,
        json!({ "weekPlan": week_plan }),
    )
    .await
}

/// Answer a nutrition question, optionally in the context of a meal
pub async fn get_food_info(
    ai: &dyn NutritionAi,
    question: &str,
    meal_context: Option<&Meal>,
) -> AppResult<String> {
    invoke_typed(
        ai,
        AiAction::GetFoodInfo,
        json!({ "question": question, "mealContext": meal_context }),
    )
    .await
}

/// Suggest a substitute for one food item
pub async fn get_food_substitution(
    ai: &dyn NutritionAi,
    item_to_swap: &FoodItem,
    meal_context: &Meal,
    profile: &UserProfile,
) -> AppResult<FoodItem> {
    invoke_typed(
        ai,
        AiAction::GetFoodSubstitution,
        json!({ "itemToSwap": item_to_swap, "mealContext": meal_context, "userData": profile }),
    )
    .await
}

/// Search recipes matching a query and the user's preferences
pub async fn find_recipes(
    ai: &dyn NutritionAi,
    query: &str,
    profile: &UserProfile,
    num_recipes: u32,
) -> AppResult<Vec<Recipe>> {
    invoke_typed(
        ai,
        AiAction::FindRecipes,
        json!({ "query": query, "userData": profile, "numRecipes": num_recipes }),
    )
    .await
}

/// Parse a free-text activity description into a structured log entry
pub async fn analyze_activity_from_text(
    ai: &dyn NutritionAi,
    description: &str,
) -> AppResult<ActivityAnalysis> {
    invoke_typed(
        ai,
        AiAction::AnalyzeActivityFromText,
        json!({ "description": description }),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names_match_serde() {
        for action in [
            AiAction::ParseMealPlanText,
            AiAction::GenerateWeeklyPlan,
            AiAction::AnalyzeMealFromImage,
            AiAction::FindRecipes,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_chat_message_constructors() {
        let message = ChatMessage::user("hello");
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }
}
