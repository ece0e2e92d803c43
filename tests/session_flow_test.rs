// ABOUTME: Integration tests for the session controller and gated AI operations
// ABOUTME: End-to-end flows over a mock AI collaborator and the session stores
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::Mutex;

use nutribot_core::ai::{AiAction, ChatMessage, ChatStream, NutritionAi, StreamChunk};
use nutribot_core::config::{AppConfig, LogLevel};
use nutribot_core::entitlements::FeatureKey;
use nutribot_core::errors::{AppError, AppResult, ErrorCode};
use nutribot_core::session::SessionController;
use nutribot_core::storage::{JsonFileStore, MemoryStore, SessionStore};

// ============================================================================
// Mock AI collaborator
// ============================================================================

#[derive(Default)]
struct MockAi {
    responses: Mutex<HashMap<&'static str, serde_json::Value>>,
    fail_with: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
    stream_chunks: Vec<String>,
}

impl MockAi {
    fn new() -> Self {
        Self::default()
    }

    async fn respond(&self, action: &'static str, value: serde_json::Value) {
        self.responses.lock().await.insert(action, value);
    }

    async fn fail(&self, message: &str) {
        *self.fail_with.lock().await = Some(message.to_owned());
    }

    async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl NutritionAi for MockAi {
    async fn invoke(
        &self,
        action: AiAction,
        _payload: serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        self.calls.lock().await.push(action.as_str().to_owned());
        if let Some(message) = self.fail_with.lock().await.clone() {
            return Err(AppError::ai_invocation_failed(message));
        }
        self.responses
            .lock()
            .await
            .get(action.as_str())
            .cloned()
            .ok_or_else(|| AppError::ai_invocation_failed(format!("no stub for {action}")))
    }

    async fn invoke_stream(
        &self,
        _message: &str,
        _history: &[ChatMessage],
    ) -> AppResult<ChatStream> {
        if let Some(message) = self.fail_with.lock().await.clone() {
            return Err(AppError::ai_invocation_failed(message));
        }
        let chunks: Vec<Result<StreamChunk, AppError>> = self
            .stream_chunks
            .iter()
            .map(|delta| {
                Ok(StreamChunk {
                    delta: delta.clone(),
                    is_final: false,
                })
            })
            .chain(std::iter::once(Ok(StreamChunk {
                delta: String::new(),
                is_final: true,
            })))
            .collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn test_config() -> AppConfig {
    AppConfig {
        relay_url: "http://localhost:0/unused".into(),
        relay_timeout_secs: 1,
        trial_days: 7,
        store_path: std::env::temp_dir().join("nutribot-test-unused.json"),
        log_level: LogLevel::Info,
    }
}

fn controller_with(ai: Arc<MockAi>) -> SessionController {
    SessionController::new(Arc::new(MemoryStore::new()), ai, test_config())
}

fn valid_plan_json(date: &str) -> serde_json::Value {
    json!({
        "date": date,
        "meals": [
            {
                "id": "6f2a5c1e-8d53-4f4e-9b2a-3c9d3a6f1b00",
                "name": "Breakfast",
                "time": "07:30",
                "items": [
                    { "name": "Oats", "portion": "80 g", "calories": 300.0 },
                    { "name": "Banana", "portion": "1 unit", "calories": 90.0 }
                ],
                "totals": { "calories": 390.0, "carbs": 70.0, "protein": 12.0, "fat": 6.0 }
            }
        ]
    })
}

async fn registered_controller(ai: Arc<MockAi>) -> SessionController {
    let mut session = controller_with(ai);
    session.register("Ana", "ana@example.com").await.unwrap();
    session
}

// ============================================================================
// Registration and trial
// ============================================================================

#[tokio::test]
async fn test_registration_opens_trial_and_persists() {
    let ai = Arc::new(MockAi::new());
    let mut session = registered_controller(ai).await;

    assert!(session.profile().is_registered);
    assert!(session.profile().is_trial_active(chrono::Utc::now()));
    assert_eq!(session.current_email(), Some("ana@example.com"));
    assert!(session.profile().macros.calories.goal > 0.0);
    assert_eq!(session.profile().weight_history.len(), 1);

    // Trial grants a pro-only feature.
    let decision = session.check_and_increment_usage(FeatureKey::ProgressAnalyses, 1);
    assert!(decision.is_approved());
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let ai = Arc::new(MockAi::new());

    let mut first = SessionController::new(store.clone(), ai.clone(), test_config());
    first.register("Ana", "ana@example.com").await.unwrap();

    let mut second = SessionController::new(store, ai, test_config());
    let error = second.register("Ana", "ana@example.com").await.unwrap_err();
    assert_eq!(error.code, ErrorCode::AccountAlreadyExists);
}

// ============================================================================
// Gated operation: success path
// ============================================================================

#[tokio::test]
async fn test_daily_plan_generation_success_flow() {
    let ai = Arc::new(MockAi::new());
    ai.respond("regenerateDailyPlan", valid_plan_json("2024-05-01"))
        .await;
    let mut session = registered_controller(ai.clone()).await;

    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    session.generate_daily_plan(date).await.unwrap();

    // Domain state updated, flag set permanently, fixed XP awarded.
    assert!(session.document().meal_plan.contains_key(&date));
    assert!(session.profile().has_generated_plan);
    assert!(session.profile().xp > 0 || session.profile().level > 1);

    // The first generation was exempt: no ledger consumption.
    assert_eq!(
        session.profile().usage.count(FeatureKey::DailyPlanGenerations),
        0
    );

    // The second generation is metered.
    session.generate_daily_plan(date).await.unwrap();
    assert_eq!(
        session.profile().usage.count(FeatureKey::DailyPlanGenerations),
        1
    );
    assert_eq!(ai.call_count().await, 2);
}

#[tokio::test]
async fn test_first_plan_unlocks_achievement() {
    let ai = Arc::new(MockAi::new());
    ai.respond("regenerateDailyPlan", valid_plan_json("2024-05-01"))
        .await;
    let mut session = registered_controller(ai).await;

    session
        .generate_daily_plan(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .await
        .unwrap();

    assert!(session.profile().has_achievement("first-plan"));
}

// ============================================================================
// Gated operation: failure paths
// ============================================================================

#[tokio::test]
async fn test_failed_invocation_keeps_consumed_quota() {
    let ai = Arc::new(MockAi::new());
    let mut session = registered_controller(ai.clone()).await;

    ai.fail("model overloaded").await;
    let date_count_before = session.document().meal_plan.len();

    let error = session.import_plan_from_chat("monday: oats").await.unwrap_err();
    assert_eq!(error.code, ErrorCode::AiInvocationFailed);

    // Usage consumed at the gating step is not refunded, and no domain
    // state was touched.
    assert_eq!(session.profile().usage.count(FeatureKey::ChatImports), 1);
    assert_eq!(session.document().meal_plan.len(), date_count_before);
}

#[tokio::test]
async fn test_malformed_output_is_distinct_failure_without_mutation() {
    let ai = Arc::new(MockAi::new());
    // Structurally hopeless: a plan with no meals.
    ai.respond("parseMealPlanText", json!({ "date": "2024-05-02", "meals": [] }))
        .await;
    let mut session = registered_controller(ai).await;

    let error = session.import_plan_from_chat("tuesday: air").await.unwrap_err();
    assert_eq!(error.code, ErrorCode::MalformedAiOutput);
    assert!(session.document().meal_plan.is_empty());
    // Quota still consumed: the external service was invoked.
    assert_eq!(session.profile().usage.count(FeatureKey::ChatImports), 1);
}

#[tokio::test]
async fn test_denied_operation_never_reaches_the_ai() {
    let ai = Arc::new(MockAi::new());
    let mut session = registered_controller(ai.clone()).await;
    // End the trial so the basic plan applies; images are unavailable.
    session.cancel_subscription().await.unwrap();
    let pending_before = session.scheduler_mut().pending();

    let error = session.generate_recipe_image("a salad").await.unwrap_err();
    assert_eq!(error.code, ErrorCode::FeatureUnavailable);
    assert_eq!(ai.call_count().await, 0);
    // The denial surfaced a notification intent for the UI.
    assert!(session.scheduler_mut().pending() > pending_before);
}

// ============================================================================
// Exhaustion then purchase
// ============================================================================

#[tokio::test]
async fn test_exhaustion_then_purchase_end_to_end() {
    let ai = Arc::new(MockAi::new());
    ai.respond(
        "analyzeMealFromText",
        json!({ "calories": 420.0, "carbs": 40.0, "protein": 25.0, "fat": 12.0 }),
    )
    .await;
    let mut session = registered_controller(ai).await;
    session.cancel_subscription().await.unwrap(); // basic: 2 text analyses/day

    session.analyze_meal(Some("rice and beans"), None).await.unwrap();
    session.analyze_meal(Some("chicken salad"), None).await.unwrap();

    let error = session
        .analyze_meal(Some("one more"), None)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::LimitReached);

    session
        .purchase_feature_pack(FeatureKey::MealAnalysesText, 5, 9.90)
        .await
        .unwrap();
    session.analyze_meal(Some("now it works"), None).await.unwrap();
    assert_eq!(
        session
            .profile()
            .purchased_uses
            .balance(FeatureKey::MealAnalysesText),
        4
    );
    // The plan-quota counter is untouched by the credit spend.
    assert_eq!(
        session.profile().usage.count(FeatureKey::MealAnalysesText),
        2
    );
}

// ============================================================================
// Chat streaming
// ============================================================================

#[tokio::test]
async fn test_chat_stream_reassembles_and_records_history() {
    let mut ai = MockAi::new();
    ai.stream_chunks = vec!["Eat ".into(), "more ".into(), "protein.".into()];
    let ai = Arc::new(ai);
    let mut session = registered_controller(ai).await;

    let mut stream = session.send_chat_message("what should I eat?").await.unwrap();
    let mut reply = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        reply.push_str(&chunk.delta);
        if chunk.is_final {
            break;
        }
    }
    drop(stream);
    assert_eq!(reply, "Eat more protein.");

    session.record_assistant_reply(&reply).await.unwrap();
    let history = &session.document().chat_messages;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "Eat more protein.");
}

// ============================================================================
// Persistence edge cases
// ============================================================================

#[tokio::test]
async fn test_corrupted_store_forces_clean_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");
    tokio::fs::write(&path, b"{ not json at all").await.unwrap();

    let store = Arc::new(JsonFileStore::new(path));
    let ai = Arc::new(MockAi::new());
    let mut session = SessionController::new(store, ai, test_config());

    // Resume does not error out: the session resets to a clean profile.
    assert!(!session.resume().await.unwrap());
    assert!(session.current_email().is_none());

    // The store is usable again afterwards.
    session.register("Ana", "ana@example.com").await.unwrap();
    assert_eq!(session.current_email(), Some("ana@example.com"));
}

#[tokio::test]
async fn test_stale_document_fields_default_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");
    // A document written by an older build: profile only, no usage ledger,
    // favorites, or chat history.
    let blob = json!({
        "nutribot_users": {
            "ana@example.com": {
                "profile": { "name": "Ana", "email": "ana@example.com", "is_registered": true }
            }
        },
        "nutribot_current_user": "ana@example.com"
    });
    tokio::fs::write(&path, serde_json::to_vec(&blob).unwrap())
        .await
        .unwrap();

    let store = Arc::new(JsonFileStore::new(path));
    let ai = Arc::new(MockAi::new());
    let mut session = SessionController::new(store, ai, test_config());

    assert!(session.resume().await.unwrap());
    assert_eq!(session.profile().name, "Ana");
    assert_eq!(session.profile().level, 1);
    assert!(session.document().favorite_plans.is_empty());
    assert!(session.document().chat_messages.is_empty());
}

#[tokio::test]
async fn test_logout_resets_memory_but_keeps_account() {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let ai = Arc::new(MockAi::new());
    let mut session = SessionController::new(store.clone(), ai, test_config());

    session.register("Ana", "ana@example.com").await.unwrap();
    session.add_xp(80, "setup").await.unwrap();
    session.logout().await.unwrap();

    assert!(session.current_email().is_none());
    assert_eq!(session.profile().xp, 0);

    // The account document survives for the next sign-in.
    session.login("ana@example.com").await.unwrap();
    assert!(session.profile().xp > 0);
}

#[tokio::test]
async fn test_guest_login_creates_registered_guest() {
    let ai = Arc::new(MockAi::new());
    let mut session = controller_with(ai);
    session.guest_login().await.unwrap();
    assert!(session.profile().is_registered);
    assert_eq!(session.current_email(), Some("guest@nutribot.dev"));
}

// ============================================================================
// Subscription effects on progression
// ============================================================================

#[tokio::test]
async fn test_subscriber_xp_multiplier_applies() {
    let ai = Arc::new(MockAi::new());
    let mut session = registered_controller(ai).await;
    session
        .subscribe(
            nutribot_core::models::user::PlanKey::Pro,
            nutribot_core::models::user::BillingCycle::Monthly,
        )
        .await
        .unwrap();

    session.add_xp(100, "test").await.unwrap();
    // 100 * 1.5 = 150: crosses the level-1 threshold (100) leaving 50.
    assert_eq!(session.profile().level, 2);
    assert_eq!(session.profile().xp, 50);
}
